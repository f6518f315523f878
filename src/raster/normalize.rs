//! 颜色转换
//!
//! 将任意受支持的光度解释和位深的样本转换为 8 位 RGBA。
//!
//! 位深换算规则：
//!
//! - 不足 8 位：按比例放大，`v * 255 / (2^bits - 1)`
//! - 8 位：原样
//! - 9 到 16 位：保留最高 8 位，16 位即右移 [`SIXTEEN_BIT_SHIFT`]

use super::{CanonicalRgba, ExtraSamples, PhotometricInterpretation, RasterError, SampleBuffer};
use crate::decode::{CanvasError, CanvasResult, Page};
use crate::tiff::{TagId, TiffError};

/// 16 位样本转为 8 位时右移的位数（保留高字节）
pub const SIXTEEN_BIT_SHIFT: u16 = 8;

/// 将 `bits` 位的样本值换算为 8 位
pub fn scale_to_u8(value: u16, bits: u16) -> u8 {
    match bits {
        0 => 0,
        8 => value as u8,
        16 => (value >> SIXTEEN_BIT_SHIFT) as u8,
        1..=7 => {
            let max = (1u32 << bits) - 1;
            (value as u32 * 255 / max) as u8
        }
        _ => value.checked_shr((bits - 8) as u32).unwrap_or(0) as u8,
    }
}

/// alpha 通道的位置和是否预乘
#[derive(Clone, Copy)]
struct Alpha {
    index: usize,
    premultiplied: bool,
}

fn find_alpha(page: &Page, color_samples: usize) -> Option<Alpha> {
    if page.samples_per_pixel as usize <= color_samples {
        return None;
    }
    let premultiplied = match page.extra_samples.first() {
        Some(ExtraSamples::AssociatedAlpha) => true,
        Some(ExtraSamples::UnassociatedAlpha) | None => false,
        Some(_) => return None,
    };
    Some(Alpha {
        index: color_samples,
        premultiplied,
    })
}

/// 撤销预乘：`c * 255 / a`，四舍五入，a 为 0 时结果为 0
fn unpremultiply(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8
}

/// 全范围 (JFIF) YCbCr 转 RGB
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        clamp(y + 1.402 * cr),
        clamp(y - 0.344_136 * cb - 0.714_136 * cr),
        clamp(y + 1.772 * cb),
    ]
}

/// 将样本转换为规范 RGBA
///
/// # 错误
///
/// * 样本缓冲区与页面尺寸不一致时返回 `RasterizationError`
/// * 调色板索引越界时返回 `PaletteIndexOutOfRange`
/// * 光度解释不受支持时返回 `NotSupported`
pub fn normalize(samples: &SampleBuffer, page: &Page) -> CanvasResult<CanonicalRgba> {
    let spp = page.samples_per_pixel as usize;
    let expected = page.pixel_count() as usize * spp;
    if samples.dimensions != page.dimensions
        || samples.samples_per_pixel != page.samples_per_pixel
        || samples.samples.len() != expected
    {
        return Err(RasterError::BufferSize {
            expected,
            actual: samples.samples.len(),
        }
        .into());
    }

    let interpretation = page.interpretation;
    let color_samples = interpretation
        .color_samples()
        .ok_or_else(|| CanvasError::NotSupported(format!("光度解释 {interpretation:?}")))?
        as usize;
    let palette = match interpretation {
        PhotometricInterpretation::Palette => Some(
            page.palette
                .as_ref()
                .ok_or(TiffError::MissingTag(TagId::ColorMap))?,
        ),
        _ => None,
    };
    let alpha = find_alpha(page, color_samples);
    let bits = page.bits_per_sample;
    let scale = |v: u16| scale_to_u8(v, bits);

    let mut buffer = Vec::with_capacity(page.pixel_count() as usize * 4);
    for pixel in samples.samples.chunks_exact(spp) {
        let [r, g, b] = match interpretation {
            PhotometricInterpretation::WhiteIsZero => {
                let v = 255 - scale(pixel[0]);
                [v, v, v]
            }
            PhotometricInterpretation::BlackIsZero => {
                let v = scale(pixel[0]);
                [v, v, v]
            }
            PhotometricInterpretation::RGB => [scale(pixel[0]), scale(pixel[1]), scale(pixel[2])],
            PhotometricInterpretation::Palette => {
                let index = pixel[0] as usize;
                let palette = palette.ok_or(TiffError::MissingTag(TagId::ColorMap))?;
                let entry = palette
                    .get(index)
                    .ok_or(CanvasError::PaletteIndexOutOfRange {
                        index,
                        len: palette.len(),
                    })?;
                entry.map(|c| (c >> 8) as u8)
            }
            PhotometricInterpretation::CMYK => {
                let [c, m, y, k] = [0, 1, 2, 3].map(|i| scale(pixel[i]) as u16);
                [c, m, y].map(|v| 255 - (v + k).min(255) as u8)
            }
            PhotometricInterpretation::YCbCr => {
                ycbcr_to_rgb(scale(pixel[0]), scale(pixel[1]), scale(pixel[2]))
            }
            other => return Err(CanvasError::NotSupported(format!("光度解释 {other:?}"))),
        };

        match alpha {
            Some(Alpha {
                index,
                premultiplied,
            }) => {
                let a = scale(pixel[index]);
                if premultiplied {
                    buffer.extend_from_slice(&[
                        unpremultiply(r, a),
                        unpremultiply(g, a),
                        unpremultiply(b, a),
                        a,
                    ]);
                } else {
                    buffer.extend_from_slice(&[r, g, b, a]);
                }
            }
            None => buffer.extend_from_slice(&[r, g, b, 255]),
        }
    }

    Ok(CanonicalRgba::new(page.dimensions, buffer)?)
}
