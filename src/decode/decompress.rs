//! 像素解压
//!
//! 逐个数据块执行：定位字节范围 → 解压 → 位序反转 → 逐行撤销预测 →
//! 展开为 `u16` 样本 → 按数据块几何写入绝对位置。数据块在文件中的顺序
//! 与其在图像中的位置无关。

use super::error::{CanvasError, CanvasResult};
use super::page::Page;
use crate::raster::{self, FillOrder, PlanarConfiguration, SampleBuffer};
use crate::tiff::Endian;
use tracing::*;

/// 解压一页的全部数据块
///
/// # 参数
///
/// * `buf` - 整个 TIFF 文件
/// * `page` - 要解压的页面
///
/// # 错误
///
/// * 压缩方式未实现时返回 `UnsupportedCompression`
/// * 数据块不在缓冲区内时返回 `TruncatedData`
/// * 解压结果短于数据块尺寸时返回 `CorruptStrip`
/// * 整页缓冲区无法分配时返回 `RasterizationError`
pub fn decompress(buf: &[u8], page: &Page) -> CanvasResult<SampleBuffer> {
    if !page.compression.is_supported() {
        return Err(CanvasError::UnsupportedCompression(page.compression));
    }
    page.predictor
        .check(page.bits_per_sample)
        .map_err(|e| CanvasError::from_chunk(0, e))?;

    let bits = page.bits_per_sample;
    let spp = page.samples_per_pixel as usize;
    let chunk_spp = page.chunk_samples_per_pixel();
    let width = page.width() as usize;
    let row_bytes = page.chunk_row_bytes();
    let (chunk_width, _) = page.chunk_dimensions();

    // 第一个数据块通过校验后才分配整页缓冲区
    let mut first = Some(decode_chunk(buf, page, 0)?);
    let mut out = SampleBuffer::try_blank(page.dimensions, page.samples_per_pixel, bits)?;
    // 一行样本的复用缓冲区
    let mut scratch: Vec<u16> = raster::try_zeroed(chunk_width as usize * chunk_spp)?;

    for index in 0..page.chunk_count() {
        let mut data = match first.take() {
            Some(data) => data,
            None => decode_chunk(buf, page, index)?,
        };

        if page.fill_order == FillOrder::LsbFirst {
            data.iter_mut().for_each(|b| *b = b.reverse_bits());
        }

        let (plane, x0, y0) = page.chunk_origin(index);
        let (cols, rows) = page.chunk_visible(index);
        let (x0, y0, cols) = (x0 as usize, y0 as usize, cols as usize);

        for (r, row) in data
            .chunks_exact_mut(row_bytes)
            .take(rows as usize)
            .enumerate()
        {
            page.predictor
                .unpredict_row(row, chunk_spp, bits, page.endian)
                .map_err(|e| CanvasError::from_chunk(index, e))?;
            unpack_row(row, bits, page.endian, &mut scratch);

            let line = (y0 + r) * width + x0;
            match page.planar {
                PlanarConfiguration::Planar => {
                    for (x, sample) in scratch[..cols].iter().enumerate() {
                        out.samples[(line + x) * spp + plane] = *sample;
                    }
                }
                _ => {
                    let dst = line * spp;
                    out.samples[dst..dst + cols * spp].copy_from_slice(&scratch[..cols * spp]);
                }
            }
        }
    }

    Ok(out)
}

/// 取出并解压一个数据块，结果恰好为数据块尺寸
///
/// 解码器输出被限制在尺寸加一个字节，多出的部分只记录警告后截断。
fn decode_chunk(buf: &[u8], page: &Page, index: usize) -> CanvasResult<Vec<u8>> {
    let raw = page
        .chunk_byte_range(index)
        .and_then(|range| buf.get(range))
        .ok_or(CanvasError::TruncatedData)?;
    let expected = page.chunk_decoded_len(index);
    let mut data = page
        .compression
        .decode(raw, expected.saturating_add(1))
        .map_err(|e| CanvasError::from_chunk(index, e))?;

    if data.len() < expected {
        return Err(CanvasError::CorruptStrip {
            chunk: index,
            expected,
            actual: data.len(),
        });
    }
    if data.len() > expected {
        warn!("数据块 {index} 解压后多于所需的 {expected} 字节, 已截断");
        data.truncate(expected);
    }
    trace!("数据块 {index}: {} -> {} 字节", raw.len(), data.len());
    Ok(data)
}

/// 将一行字节展开为样本
///
/// 不足 8 位的样本按高位在前的顺序读取；16 位样本按文件字节序读取。
/// 填满 `out` 后停止，行尾多余的填充位被忽略。
pub fn unpack_row(row: &[u8], bits: u16, endian: Endian, out: &mut [u16]) {
    match bits {
        8 => out
            .iter_mut()
            .zip(row)
            .for_each(|(slot, byte)| *slot = *byte as u16),
        16 => out
            .iter_mut()
            .zip(row.chunks_exact(2))
            .for_each(|(slot, pair)| *slot = endian.sample_u16([pair[0], pair[1]])),
        1 | 2 | 4 => {
            let per_byte = (8 / bits) as usize;
            let mask = (1u16 << bits) - 1;
            for (i, slot) in out.iter_mut().enumerate() {
                let byte = row.get(i / per_byte).copied().unwrap_or(0) as u16;
                let shift = 8 - bits as usize * (i % per_byte + 1);
                *slot = (byte >> shift) & mask;
            }
        }
        _ => {
            let mask = (1u32 << bits) - 1;
            let mut bytes = row.iter();
            let mut acc = 0u32;
            let mut available = 0u16;
            for slot in out.iter_mut() {
                while available < bits {
                    acc = (acc << 8) | bytes.next().copied().unwrap_or(0) as u32;
                    available += 8;
                }
                available -= bits;
                *slot = ((acc >> available) & mask) as u16;
                acc &= (1u32 << available) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_one_bit_msb_first() {
        let mut out = [0u16; 10];
        unpack_row(&[0b1010_0001, 0b1100_0000], 1, Endian::Little, &mut out);
        assert_eq!(out, [1, 0, 1, 0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn unpack_four_bit_nibbles() {
        let mut out = [0u16; 3];
        unpack_row(&[0xA5, 0xF0], 4, Endian::Big, &mut out);
        assert_eq!(out, [0xA, 0x5, 0xF]);
    }

    #[test]
    fn unpack_twelve_bit_crosses_bytes() {
        let mut out = [0u16; 2];
        unpack_row(&[0xAB, 0xCD, 0xEF], 12, Endian::Little, &mut out);
        assert_eq!(out, [0xABC, 0xDEF]);
    }

    #[test]
    fn unpack_sixteen_bit_uses_byte_order() {
        let mut out = [0u16; 2];
        unpack_row(&[0x12, 0x34, 0xFF, 0x00], 16, Endian::Little, &mut out);
        assert_eq!(out, [0x3412, 0x00FF]);
        unpack_row(&[0x12, 0x34, 0xFF, 0x00], 16, Endian::Big, &mut out);
        assert_eq!(out, [0x1234, 0xFF00]);
    }
}
