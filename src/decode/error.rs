//! 解码管线错误
//!
//! [`CanvasError`] 是整条管线（base64 → 容器 → 解压 → 颜色转换 → 显示）
//! 对外暴露的唯一错误类型。各层自己的错误通过 `From` 转换进来：
//!
//! - [`TiffError`] 中的文件头和截断错误映射为 `UnsupportedContainer` 和
//!   `TruncatedData`，其余标签错误保留为 `BadTiff`
//! - [`DecompressError`] 中的不支持的压缩方式映射为 `UnsupportedCompression`
//! - [`RasterError`] 保留为 `RasterizationError`
//!
//! 所有错误都在向显示表面写入任何像素之前产生。

use super::compression::{Compression, DecompressError};
use crate::raster::RasterError;
use crate::tiff::TiffError;
use std::fmt;
use std::sync::PoisonError;

/// 管线操作的结果类型
pub type CanvasResult<T> = Result<T, CanvasError>;

/// 解码和显示过程中可能出现的错误
#[derive(Debug)]
pub enum CanvasError {
    /// 输入不是合法的 base64 文本
    MalformedEncoding(base64::DecodeError),
    /// 缺少或无法识别 TIFF 文件头
    UnsupportedContainer,
    /// 目录、指针或数据块引用了缓冲区之外的字节
    TruncatedData,
    /// 必需标签缺失或无效
    BadTiff(TiffError),
    /// 未实现的压缩方式
    UnsupportedCompression(Compression),
    /// 数据块解压后的字节数少于其几何尺寸要求
    CorruptStrip {
        /// 数据块索引
        chunk: usize,
        /// 按尺寸计算的字节数
        expected: usize,
        /// 实际得到的字节数
        actual: usize,
    },
    /// 数据块的压缩流本身无法解码
    Decompression {
        /// 数据块索引
        chunk: usize,
        /// 解码器错误
        source: DecompressError,
    },
    /// 调色板索引超出调色板长度
    PaletteIndexOutOfRange {
        /// 样本中的索引
        index: usize,
        /// 调色板条目数
        len: usize,
    },
    /// 显示表面不可写
    SurfaceUnavailable(String),
    /// 容器中没有任何页
    NoPagesFound,
    /// 栅格缓冲区尺寸不一致
    RasterizationError(RasterError),
    /// 位深、样本格式、光度解释或布局不在支持范围内
    NotSupported(String),
    /// 图像像素数超过配置的上限
    LimitExceeded {
        /// 图像像素数
        pixels: u64,
        /// 允许的上限
        limit: u64,
    },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::MalformedEncoding(e) => write!(f, "base64编码无效: {e}"),
            CanvasError::UnsupportedContainer => write!(f, "不是受支持的TIFF容器"),
            CanvasError::TruncatedData => write!(f, "数据被截断"),
            CanvasError::BadTiff(e) => write!(f, "TIFF结构错误: {e}"),
            CanvasError::UnsupportedCompression(c) => write!(f, "不支持的压缩方式: {c:?}"),
            CanvasError::CorruptStrip {
                chunk,
                expected,
                actual,
            } => write!(
                f,
                "数据块 {chunk} 已损坏: 需要 {expected} 字节, 实际 {actual} 字节"
            ),
            CanvasError::Decompression { chunk, source } => {
                write!(f, "数据块 {chunk} 解压失败: {source}")
            }
            CanvasError::PaletteIndexOutOfRange { index, len } => {
                write!(f, "调色板索引越界: {index} >= {len}")
            }
            CanvasError::SurfaceUnavailable(reason) => write!(f, "显示表面不可用: {reason}"),
            CanvasError::NoPagesFound => write!(f, "TIFF中没有任何页"),
            CanvasError::RasterizationError(e) => write!(f, "栅格错误: {e}"),
            CanvasError::NotSupported(what) => write!(f, "不支持: {what}"),
            CanvasError::LimitExceeded { pixels, limit } => {
                write!(f, "图像过大: {pixels} 像素, 上限 {limit}")
            }
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::MalformedEncoding(e) => Some(e),
            CanvasError::BadTiff(e) => Some(e),
            CanvasError::Decompression { source, .. } => Some(source),
            CanvasError::RasterizationError(e) => Some(e),
            _ => None,
        }
    }
}

/// 从 TIFF 错误转换
///
/// 文件头和截断错误直接映射为顶层分类
impl From<TiffError> for CanvasError {
    fn from(e: TiffError) -> Self {
        match e {
            TiffError::UnsupportedContainer => CanvasError::UnsupportedContainer,
            TiffError::TruncatedData => CanvasError::TruncatedData,
            tiff_error => CanvasError::BadTiff(tiff_error),
        }
    }
}

impl From<base64::DecodeError> for CanvasError {
    fn from(e: base64::DecodeError) -> Self {
        CanvasError::MalformedEncoding(e)
    }
}

impl From<RasterError> for CanvasError {
    fn from(e: RasterError) -> Self {
        CanvasError::RasterizationError(e)
    }
}

impl CanvasError {
    /// 把某个数据块的解码器错误放到顶层分类中
    pub(crate) fn from_chunk(chunk: usize, e: DecompressError) -> Self {
        match e {
            DecompressError::CompressionNotSupported(c) => CanvasError::UnsupportedCompression(c),
            DecompressError::PredictorNotSupported(p, bits) => {
                CanvasError::NotSupported(format!("{bits} 位样本上的预测器 {p:?}"))
            }
            source => CanvasError::Decompression { chunk, source },
        }
    }
}

/// 显示表面的锁被毒化时视为表面不可用
impl<G> From<PoisonError<G>> for CanvasError {
    fn from(e: PoisonError<G>) -> Self {
        CanvasError::SurfaceUnavailable(format!("{e}"))
    }
}
