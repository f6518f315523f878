//! 显示适配
//!
//! 本模块把规范 RGBA 图像交给宿主提供的绘图表面。主要包括:
//! - [`Surface`] 绘图表面的抽象，宿主实现它即可接入任意后端
//! - [`MemorySurface`] 内存中的表面，用于测试和离屏渲染
//! - [`present`] 调整表面尺寸并整体写入像素
//! - [`RenderBuilder`] 和 [`render_tiff`] 串联整条解码管线
//! - [`TiffCanvas`] 保证同一表面上的多次渲染不会交错写入

use crate::decode::{CanvasError, CanvasResult};
use std::fmt;

mod canvas;
mod renderer;

pub use canvas::{RenderTicket, TiffCanvas};
pub use renderer::{
    render_tiff, DecodedImage, EmptyPages, RenderBuilder, RenderOutcome, DEFAULT_PIXEL_LIMIT,
};

/// 表面拒绝写入的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceError(pub String);

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SurfaceError {}

impl From<SurfaceError> for CanvasError {
    fn from(e: SurfaceError) -> Self {
        CanvasError::SurfaceUnavailable(e.0)
    }
}

/// 宿主提供的绘图表面
///
/// 表面归宿主所有，核心只负责调整尺寸并写入一次像素。
pub trait Surface {
    /// 表面当前是否可写
    fn is_available(&self) -> bool {
        true
    }

    /// 调整表面尺寸，原有内容作废
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;

    /// 写入完整的 RGBA 像素，长度为 宽 × 高 × 4
    fn write_pixels(&mut self, rgba: &[u8]) -> Result<(), SurfaceError>;
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        (**self).resize(width, height)
    }

    fn write_pixels(&mut self, rgba: &[u8]) -> Result<(), SurfaceError> {
        (**self).write_pixels(rgba)
    }
}

/// 内存中的绘图表面
///
/// 可以被分离（[`MemorySurface::detach`]）以模拟已经失效的绘图目标。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemorySurface {
    dimensions: (u32, u32),
    pixels: Vec<u8>,
    attached: bool,
    writes: usize,
}

impl MemorySurface {
    /// 创建可写的空表面
    pub fn new() -> Self {
        Self {
            attached: true,
            ..Default::default()
        }
    }

    /// 创建不可写的表面
    pub fn detached() -> Self {
        Self::default()
    }

    /// 将表面标记为不可写，保留已有内容
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 成功写入的次数
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// 获取指定位置的 RGBA 值
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return None;
        }
        let start = (y as usize * self.dimensions.0 as usize + x as usize) * 4;
        self.pixels
            .get(start..start + 4)
            .and_then(|p| p.try_into().ok())
    }
}

impl Surface for MemorySurface {
    fn is_available(&self) -> bool {
        self.attached
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(SurfaceError("表面已分离".into()));
        }
        self.dimensions = (width, height);
        self.pixels = vec![0; width as usize * height as usize * 4];
        Ok(())
    }

    fn write_pixels(&mut self, rgba: &[u8]) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(SurfaceError("表面已分离".into()));
        }
        if rgba.len() != self.pixels.len() {
            return Err(SurfaceError(format!(
                "像素长度 {} 与表面尺寸 {:?} 不符",
                rgba.len(),
                self.dimensions
            )));
        }
        self.pixels.copy_from_slice(rgba);
        self.writes += 1;
        Ok(())
    }
}

/// 将 RGBA 像素整体写入表面
///
/// 先检查像素长度和表面是否可写，两者都满足后才调整尺寸并写入，
/// 因此失败时表面保持原状。
///
/// # 错误
///
/// * 像素长度与尺寸不符时返回 `RasterizationError`
/// * 表面不可写时返回 `SurfaceUnavailable`
pub fn present<S: Surface + ?Sized>(
    rgba: &[u8],
    width: u32,
    height: u32,
    surface: &mut S,
) -> CanvasResult<()> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(crate::raster::RasterError::BufferSize {
            expected,
            actual: rgba.len(),
        }
        .into());
    }
    if !surface.is_available() {
        return Err(CanvasError::SurfaceUnavailable("表面不可写".into()));
    }
    surface.resize(width, height)?;
    surface.write_pixels(rgba)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_resizes_and_overwrites() {
        let mut surface = MemorySurface::new();
        present(&[1, 2, 3, 4, 5, 6, 7, 8], 2, 1, &mut surface).unwrap();
        assert_eq!(surface.dimensions(), (2, 1));
        present(&[9, 9, 9, 9], 1, 1, &mut surface).unwrap();
        assert_eq!(surface.dimensions(), (1, 1));
        assert_eq!(surface.pixels(), &[9, 9, 9, 9]);
        assert_eq!(surface.write_count(), 2);
    }

    #[test]
    fn wrong_length_leaves_surface_untouched() {
        let mut surface = MemorySurface::new();
        present(&[1, 2, 3, 4], 1, 1, &mut surface).unwrap();
        assert!(matches!(
            present(&[0; 7], 2, 1, &mut surface),
            Err(CanvasError::RasterizationError(_))
        ));
        assert_eq!(surface.pixel(0, 0), Some([1, 2, 3, 4]));
    }
}
