//! 渲染器模块
//!
//! 串联整条管线：base64 → 字节 → IFD 链 → 第一页解压 → 颜色转换 → 显示表面。
//! 所有解码都在触碰表面之前完成，任何失败都不会改变表面内容。

use super::{present, Surface};
use crate::decode::{decompress, CanvasError, CanvasResult, Page};
use crate::raster::{normalize, CanonicalRgba, PhotometricInterpretation};
use crate::source;
use crate::tiff::Tiff;
use tracing::*;

/// 容器中没有任何页时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPages {
    /// 返回 [`CanvasError::NoPagesFound`]
    #[default]
    Error,
    /// 什么也不做，返回 [`RenderOutcome::Skipped`]
    Ignore,
}

/// 一次渲染的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// 已写入表面
    Presented {
        /// 图像宽度
        width: u32,
        /// 图像高度
        height: u32,
    },
    /// 输入为空或没有任何页，表面未改变
    Skipped,
    /// 已有更新的渲染开始，本次结果被丢弃
    Superseded,
}

/// 解码后的第一页及其元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// 规范 RGBA 像素
    pub rgba: CanonicalRgba,
    /// 原始的光度解释
    pub interpretation: PhotometricInterpretation,
    /// 容器中的页数
    pub page_count: usize,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }
}

/// 默认允许的最大像素数（6400 万）
pub const DEFAULT_PIXEL_LIMIT: u64 = 64_000_000;

/// 渲染构建器
///
/// 用于配置解码上限和空容器策略
#[derive(Debug, Clone)]
pub struct RenderBuilder {
    /// 允许的最大像素数
    pub pixel_limit: Option<u64>,
    /// 空容器的处理方式
    pub empty_pages: EmptyPages,
}

impl Default for RenderBuilder {
    fn default() -> Self {
        Self {
            pixel_limit: Some(DEFAULT_PIXEL_LIMIT),
            empty_pages: EmptyPages::default(),
        }
    }
}

impl RenderBuilder {
    /// 创建默认配置：最多 [`DEFAULT_PIXEL_LIMIT`] 像素，空容器报错
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据最大兆像素限制图像尺寸
    pub fn with_mp_limit(mut self, max_megapixels: f64) -> Self {
        self.pixel_limit = Some((max_megapixels.max(0.0) * 1e6) as u64);
        self
    }

    /// 限制图像的最大像素数
    pub fn with_pixel_limit(mut self, max_pixels: u64) -> Self {
        self.pixel_limit = Some(max_pixels);
        self
    }

    /// 取消尺寸限制，只受可用内存约束
    pub fn without_pixel_limit(mut self) -> Self {
        self.pixel_limit = None;
        self
    }

    /// 设置空容器的处理方式
    pub fn with_empty_pages(mut self, empty_pages: EmptyPages) -> Self {
        self.empty_pages = empty_pages;
        self
    }

    /// 解码 base64 文本的第一页
    ///
    /// 输入为空白时返回 `Ok(None)`；容器没有页且配置为 [`EmptyPages::Ignore`]
    /// 时同样返回 `Ok(None)`。
    pub fn decode(&self, base64: &str) -> CanvasResult<Option<DecodedImage>> {
        if source::strip_data_url(base64).trim().is_empty() {
            debug!("输入为空, 跳过");
            return Ok(None);
        }
        let bytes = source::decode_base64(base64)?;
        self.decode_bytes(&bytes)
    }

    /// 解码内存中 TIFF 文件的第一页
    pub fn decode_bytes(&self, bytes: &[u8]) -> CanvasResult<Option<DecodedImage>> {
        let tiff = Tiff::parse(bytes)?;
        let page_count = tiff.ifds.len();

        let Some(ifd) = tiff.ifd0() else {
            return match self.empty_pages {
                EmptyPages::Error => Err(CanvasError::NoPagesFound),
                EmptyPages::Ignore => {
                    debug!("TIFF中没有任何页, 跳过");
                    Ok(None)
                }
            };
        };

        let page = Page::from_ifd(ifd, tiff.endian, bytes.len() as u64)?;
        debug!("第一页 (共 {page_count} 页): {page}");

        if let Some(limit) = self.pixel_limit {
            let (chunk_width, chunk_height) = page.chunk_dimensions();
            let pixels = page
                .pixel_count()
                .max(chunk_width as u64 * chunk_height as u64);
            if pixels > limit {
                return Err(CanvasError::LimitExceeded { pixels, limit });
            }
        }

        let samples = decompress(bytes, &page)?;
        let rgba = normalize(&samples, &page)?;

        Ok(Some(DecodedImage {
            rgba,
            interpretation: page.interpretation,
            page_count,
        }))
    }

    /// 解码 base64 文本并写入表面
    pub fn render<S: Surface + ?Sized>(
        &self,
        base64: &str,
        surface: &mut S,
    ) -> CanvasResult<RenderOutcome> {
        let decoded = self.decode(base64)?;
        Self::present_decoded(decoded, surface)
    }

    /// 解码内存中的 TIFF 文件并写入表面
    pub fn render_bytes<S: Surface + ?Sized>(
        &self,
        bytes: &[u8],
        surface: &mut S,
    ) -> CanvasResult<RenderOutcome> {
        let decoded = self.decode_bytes(bytes)?;
        Self::present_decoded(decoded, surface)
    }

    pub(crate) fn present_decoded<S: Surface + ?Sized>(
        decoded: Option<DecodedImage>,
        surface: &mut S,
    ) -> CanvasResult<RenderOutcome> {
        let Some(image) = decoded else {
            return Ok(RenderOutcome::Skipped);
        };
        let (width, height) = image.rgba.dimensions;
        present(&image.rgba.buffer, width, height, surface)?;
        Ok(RenderOutcome::Presented { width, height })
    }
}

/// 以默认配置把 base64 编码的 TIFF 的第一页渲染到表面
pub fn render_tiff<S: Surface + ?Sized>(
    base64: &str,
    surface: &mut S,
) -> CanvasResult<RenderOutcome> {
    RenderBuilder::new().render(base64, surface)
}
