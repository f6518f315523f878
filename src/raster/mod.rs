//! 栅格缓冲区
//!
//! 解码管线中间和末端的两种像素缓冲区：
//!
//! - [`SampleBuffer`]: 解压后的样本，每个样本展开为一个 `u16`，
//!   像素优先、通道其次排列
//! - [`CanonicalRgba`]: 颜色转换后的 8 位 RGBA，交给显示表面
//!
//! 两者在构造时都检查缓冲区长度与尺寸一致。

use std::fmt::{self, Display};

mod image;
mod normalize;
mod photometrics;

pub use normalize::{normalize, scale_to_u8, SIXTEEN_BIT_SHIFT};
pub use photometrics::{
    ExtraSamples, FillOrder, PhotometricInterpretation, PlanarConfiguration, SampleFormat,
};

/// 栅格操作过程中可能出现的错误
#[derive(Debug)]
pub enum RasterError {
    /// 缓冲区大小与尺寸不匹配
    BufferSize {
        /// 按尺寸计算的元素数
        expected: usize,
        /// 实际元素数
        actual: usize,
    },
    /// 无法分配指定元素数的缓冲区
    Allocation {
        /// 请求的元素数，溢出时为 `None`
        len: Option<usize>,
    },
}

impl Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::BufferSize { expected, actual } => {
                write!(f, "缓冲区大小不匹配: 需要 {expected}, 实际 {actual}")
            }
            RasterError::Allocation { len: Some(len) } => write!(f, "无法分配 {len} 个元素"),
            RasterError::Allocation { len: None } => write!(f, "缓冲区长度溢出"),
        }
    }
}

impl std::error::Error for RasterError {}

/// 可失败地分配全零向量
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>, RasterError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| RasterError::Allocation { len: Some(len) })?;
    v.resize(len, T::default());
    Ok(v)
}

/// 解压后的样本缓冲区
///
/// 长度恒为 宽 × 高 × 每像素样本数。样本保持原始位深的数值，
/// 例如 4 位样本的取值范围是 0..=15。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleBuffer {
    /// 图像尺寸 (宽度, 高度)
    pub dimensions: (u32, u32),
    /// 每个像素的样本数
    pub samples_per_pixel: u16,
    /// 每个样本的位数
    pub bits_per_sample: u16,
    /// 样本数据
    pub samples: Vec<u16>,
}

impl SampleBuffer {
    /// 创建样本缓冲区，长度不符时返回 `BufferSize`
    pub fn new(
        dimensions: (u32, u32),
        samples_per_pixel: u16,
        bits_per_sample: u16,
        samples: Vec<u16>,
    ) -> Result<Self, RasterError> {
        let expected = Self::required_len(dimensions, samples_per_pixel);
        if samples.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            dimensions,
            samples_per_pixel,
            bits_per_sample,
            samples,
        })
    }

    /// 创建全零缓冲区
    pub fn blank(dimensions: (u32, u32), samples_per_pixel: u16, bits_per_sample: u16) -> Self {
        Self {
            dimensions,
            samples_per_pixel,
            bits_per_sample,
            samples: vec![0; Self::required_len(dimensions, samples_per_pixel)],
        }
    }

    /// 创建全零缓冲区，内存不足时返回 `Allocation` 而不是中止进程
    pub fn try_blank(
        dimensions: (u32, u32),
        samples_per_pixel: u16,
        bits_per_sample: u16,
    ) -> Result<Self, RasterError> {
        let len = (dimensions.0 as usize)
            .checked_mul(dimensions.1 as usize)
            .and_then(|n| n.checked_mul(samples_per_pixel as usize));
        Ok(Self {
            dimensions,
            samples_per_pixel,
            bits_per_sample,
            samples: try_zeroed(len.ok_or(RasterError::Allocation { len: None })?)?,
        })
    }

    fn required_len(dimensions: (u32, u32), samples_per_pixel: u16) -> usize {
        dimensions.0 as usize * dimensions.1 as usize * samples_per_pixel as usize
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// 获取指定位置像素的全部样本
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u16]> {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return None;
        }
        let spp = self.samples_per_pixel as usize;
        let start = (y as usize * self.dimensions.0 as usize + x as usize) * spp;
        self.samples.get(start..start + spp)
    }
}

impl Display for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SampleBuffer({}x{}, {}x{}位)",
            self.dimensions.0, self.dimensions.1, self.samples_per_pixel, self.bits_per_sample
        )
    }
}

/// 规范化的 8 位 RGBA 图像
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRgba {
    /// 图像尺寸 (宽度, 高度)
    pub dimensions: (u32, u32),
    /// R, G, B, A 交错排列，长度为 宽 × 高 × 4
    pub buffer: Vec<u8>,
}

impl CanonicalRgba {
    /// 创建 RGBA 图像，长度不符时返回 `BufferSize`
    pub fn new(dimensions: (u32, u32), buffer: Vec<u8>) -> Result<Self, RasterError> {
        let expected = dimensions.0 as usize * dimensions.1 as usize * 4;
        if buffer.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(Self { dimensions, buffer })
    }

    /// 创建全透明的黑色图像
    pub fn blank(dimensions: (u32, u32)) -> Self {
        Self {
            dimensions,
            buffer: vec![0; dimensions.0 as usize * dimensions.1 as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// 获取指定位置的 RGBA 值
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return None;
        }
        let start = (y as usize * self.dimensions.0 as usize + x as usize) * 4;
        self.buffer
            .get(start..start + 4)
            .and_then(|p| p.try_into().ok())
    }
}

impl Display for CanonicalRgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CanonicalRgba({}x{}, {}字节)",
            self.dimensions.0,
            self.dimensions.1,
            self.buffer.len()
        )
    }
}
