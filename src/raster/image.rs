//! `CanonicalRgba` 与 image 库之间的转换

#![cfg(feature = "image")]

use super::{CanonicalRgba, RasterError};
use image::{DynamicImage, RgbaImage};

impl TryFrom<CanonicalRgba> for RgbaImage {
    type Error = RasterError;

    fn try_from(rgba: CanonicalRgba) -> Result<Self, Self::Error> {
        let (width, height) = rgba.dimensions;
        let actual = rgba.buffer.len();
        RgbaImage::from_raw(width, height, rgba.buffer).ok_or(RasterError::BufferSize {
            expected: width as usize * height as usize * 4,
            actual,
        })
    }
}

impl CanonicalRgba {
    /// 转换为 `image::RgbaImage`，用于保存为 PNG 等格式
    pub fn into_image(self) -> Result<RgbaImage, RasterError> {
        self.try_into()
    }

    /// 从任意 `DynamicImage` 创建，先转换为 8 位 RGBA
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        Self {
            dimensions: rgba.dimensions(),
            buffer: rgba.into_raw(),
        }
    }
}
