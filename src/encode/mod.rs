//! 基线 TIFF 编码
//!
//! 把 [`SampleBuffer`] 写成 TIFF 文件，每个 [`EncoderPage`] 对应链上的一个 IFD。
//! 支持条带和瓦片、交错和分平面存储、None/LZW/Deflate/PackBits 压缩、水平
//! 预测器、调色板、位序以及大小端和 BigTIFF。
//!
//! 写入顺序：
//! 1. 写入文件头和全部 IFD，数据块偏移量和字节数先填 0
//! 2. 依次追加压缩后的数据块
//! 3. 回到标签值的位置填入真实的偏移量和字节数
//!
//! # 示例
//!
//! ```no_run
//! use tiffcanvas::encode::{Encoder, EncoderPage, SupportedCompression};
//! use tiffcanvas::raster::{PhotometricInterpretation, SampleBuffer};
//!
//! let samples = SampleBuffer::new((2, 2), 1, 8, vec![0, 64, 128, 255]).unwrap();
//! let page = EncoderPage::new(samples, PhotometricInterpretation::BlackIsZero)
//!     .with_compression(SupportedCompression::Lzw);
//! let bytes = Encoder::new().with_page(page).encode_to_vec().unwrap();
//! ```

use crate::decode::{ChunkLayout, Compression, Page, Palette, Predictor};
use crate::raster::{
    CanonicalRgba, ExtraSamples, FillOrder, PhotometricInterpretation, PlanarConfiguration,
    SampleBuffer,
};
use crate::tiff::{Endian, TagData, TagId, Tiff, TiffVariant};
use std::io::{Cursor, Seek, SeekFrom, Write};

mod error;

pub use error::{EncodeError, EncodeResult};

/// 编码器支持的压缩方式
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SupportedCompression {
    /// 不压缩
    Uncompressed,
    /// LZW 无损压缩
    Lzw,
    /// Deflate/ZIP 压缩
    Deflate,
    /// PackBits 行程编码
    PackBits,
}

impl From<SupportedCompression> for Compression {
    fn from(c: SupportedCompression) -> Self {
        match c {
            SupportedCompression::Uncompressed => Compression::Uncompressed,
            SupportedCompression::Lzw => Compression::Lzw,
            SupportedCompression::Deflate => Compression::DeflateAdobe,
            SupportedCompression::PackBits => Compression::PackBits,
        }
    }
}

/// 要写入的一页
#[derive(Debug, Clone)]
pub struct EncoderPage {
    samples: SampleBuffer,
    interpretation: PhotometricInterpretation,
    compression: SupportedCompression,
    predictor: Predictor,
    layout: Option<ChunkLayout>,
    planar: PlanarConfiguration,
    palette: Option<Palette>,
    fill_order: FillOrder,
    extra_samples: Vec<ExtraSamples>,
}

impl EncoderPage {
    /// 创建页面，默认不压缩、单个条带、交错存储
    pub fn new(samples: SampleBuffer, interpretation: PhotometricInterpretation) -> Self {
        Self {
            samples,
            interpretation,
            compression: SupportedCompression::Uncompressed,
            predictor: Predictor::No,
            layout: None,
            planar: PlanarConfiguration::Chunky,
            palette: None,
            fill_order: FillOrder::MsbFirst,
            extra_samples: vec![],
        }
    }

    /// 从规范 RGBA 图像创建 8 位 RGBA 页面（非预乘 alpha）
    pub fn from_rgba(rgba: &CanonicalRgba) -> Self {
        let samples = SampleBuffer {
            dimensions: rgba.dimensions,
            samples_per_pixel: 4,
            bits_per_sample: 8,
            samples: rgba.buffer.iter().map(|v| *v as u16).collect(),
        };
        Self::new(samples, PhotometricInterpretation::RGB)
            .with_extra_samples(vec![ExtraSamples::UnassociatedAlpha])
    }

    pub fn with_compression(mut self, compression: SupportedCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    /// 使用瓦片存储
    pub fn with_tiles(mut self, tile_width: u32, tile_height: u32) -> Self {
        self.layout = Some(ChunkLayout::Tiles {
            tile_width,
            tile_height,
        });
        self
    }

    /// 使用条带存储，每个条带 `rows_per_strip` 行
    pub fn with_rows_per_strip(mut self, rows_per_strip: u32) -> Self {
        self.layout = Some(ChunkLayout::Strips { rows_per_strip });
        self
    }

    /// 设置是否分平面存储
    pub fn with_planar(mut self, planar: bool) -> Self {
        self.planar = if planar {
            PlanarConfiguration::Planar
        } else {
            PlanarConfiguration::Chunky
        };
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_fill_order(mut self, fill_order: FillOrder) -> Self {
        self.fill_order = fill_order;
        self
    }

    pub fn with_extra_samples(mut self, extra_samples: Vec<ExtraSamples>) -> Self {
        self.extra_samples = extra_samples;
        self
    }

    /// 借用解码端的页面模型计算数据块几何
    fn geometry(&self, endian: Endian) -> EncodeResult<Page> {
        let samples = &self.samples;
        if samples.width() == 0 || samples.height() == 0 {
            return Err(EncodeError::InvalidPage("图像尺寸为 0".into()));
        }
        if !(1..=16).contains(&samples.bits_per_sample) {
            return Err(EncodeError::InvalidPage(format!(
                "{} 位样本",
                samples.bits_per_sample
            )));
        }
        let expected =
            samples.width() as usize * samples.height() as usize * samples.samples_per_pixel as usize;
        if samples.samples_per_pixel == 0 || samples.samples.len() != expected {
            return Err(crate::raster::RasterError::BufferSize {
                expected,
                actual: samples.samples.len(),
            }
            .into());
        }
        let layout = match self.layout {
            None => ChunkLayout::Strips {
                rows_per_strip: samples.height(),
            },
            Some(ChunkLayout::Strips { rows_per_strip }) => ChunkLayout::Strips {
                rows_per_strip: rows_per_strip.clamp(1, samples.height()),
            },
            Some(ChunkLayout::Tiles {
                tile_width,
                tile_height,
            }) if tile_width == 0 || tile_height == 0 => {
                return Err(EncodeError::InvalidPage("瓦片尺寸为 0".into()))
            }
            Some(tiles) => tiles,
        };
        if (self.interpretation == PhotometricInterpretation::Palette) != self.palette.is_some() {
            return Err(EncodeError::InvalidPage(
                "调色板必须且只能与 Palette 光度解释一起使用".into(),
            ));
        }
        let planar = if samples.samples_per_pixel == 1 {
            PlanarConfiguration::Chunky
        } else {
            self.planar
        };

        Ok(Page {
            dimensions: samples.dimensions,
            bits_per_sample: samples.bits_per_sample,
            samples_per_pixel: samples.samples_per_pixel,
            interpretation: self.interpretation,
            compression: self.compression.into(),
            predictor: self.predictor,
            planar,
            fill_order: self.fill_order,
            layout,
            offsets: vec![],
            byte_counts: vec![],
            palette: self.palette.clone(),
            extra_samples: self.extra_samples.clone(),
            endian,
        })
    }

    /// 生成全部压缩后的数据块，顺序与 [`Page::chunk_origin`] 一致
    fn chunks(&self, page: &Page) -> EncodeResult<Vec<Vec<u8>>> {
        let bits = page.bits_per_sample;
        let spp = page.samples_per_pixel as usize;
        let chunk_spp = page.chunk_samples_per_pixel();
        let (chunk_width, _) = page.chunk_dimensions();
        let (width, height) = page.dimensions;
        let row_bytes = page.chunk_row_bytes();

        let mut row_samples = vec![0u16; chunk_width as usize * chunk_spp];
        let mut chunks = Vec::with_capacity(page.chunk_count());
        for index in 0..page.chunk_count() {
            let (plane, x0, y0) = page.chunk_origin(index);
            let rows = page.chunk_rows(index);
            let mut data = Vec::with_capacity(rows as usize * row_bytes);

            for r in 0..rows {
                let y = y0 + r;
                for (x, pixel) in row_samples.chunks_exact_mut(chunk_spp).enumerate() {
                    let px = x0 + x as u32;
                    for (s, slot) in pixel.iter_mut().enumerate() {
                        *slot = if px < width && y < height {
                            let channel = if chunk_spp == 1 && spp > 1 { plane } else { s };
                            self.samples.samples
                                [(y as usize * width as usize + px as usize) * spp + channel]
                        } else {
                            0
                        };
                    }
                }
                let mut row = pack_row(&row_samples, bits, page.endian);
                row.resize(row_bytes, 0);
                page.predictor
                    .predict_row(&mut row, chunk_spp, bits, page.endian)?;
                if page.fill_order == FillOrder::LsbFirst {
                    row.iter_mut().for_each(|b| *b = b.reverse_bits());
                }
                data.extend_from_slice(&row);
            }

            chunks.push(page.compression.encode(&data)?);
        }
        Ok(chunks)
    }
}

/// 将一行样本打包为字节，`unpack_row` 的逆运算
///
/// 不足 8 位的样本高位在前，行尾补 0 到字节边界
pub fn pack_row(samples: &[u16], bits: u16, endian: Endian) -> Vec<u8> {
    match bits {
        8 => samples.iter().map(|v| *v as u8).collect(),
        16 => samples.iter().flat_map(|v| endian.sample_bytes(*v)).collect(),
        _ => {
            let mask = (1u32 << bits) - 1;
            let mut out = Vec::with_capacity((samples.len() * bits as usize).div_ceil(8));
            let mut acc = 0u32;
            let mut pending = 0u16;
            for v in samples {
                acc = (acc << bits) | (*v as u32 & mask);
                pending += bits;
                while pending >= 8 {
                    pending -= 8;
                    out.push((acc >> pending) as u8);
                    acc &= (1u32 << pending) - 1;
                }
            }
            if pending > 0 {
                out.push((acc << (8 - pending)) as u8);
            }
            out
        }
    }
}

/// TIFF 文件编码器
#[derive(Debug, Clone)]
pub struct Encoder {
    endian: Endian,
    variant: TiffVariant,
    pages: Vec<EncoderPage>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// 创建编码器：小端、标准 TIFF、没有页
    pub fn new() -> Self {
        Self {
            endian: Endian::Little,
            variant: TiffVariant::Normal,
            pages: vec![],
        }
    }

    /// 设置字节序
    ///
    /// * `big` - true 表示大端，false 表示小端
    pub fn with_big_endian(mut self, big: bool) -> Self {
        self.endian = if big { Endian::Big } else { Endian::Little };
        self
    }

    /// 设置是否使用 BigTIFF 格式
    pub fn with_big_tiff(mut self, big: bool) -> Self {
        self.variant = if big {
            TiffVariant::Big
        } else {
            TiffVariant::Normal
        };
        self
    }

    /// 追加一页
    pub fn with_page(mut self, page: EncoderPage) -> Self {
        self.pages.push(page);
        self
    }

    /// 执行编码
    ///
    /// `writer` 必须位于起始位置。没有任何页时写出一个空的 IFD 链。
    pub fn encode<W: Write + Seek>(&self, writer: &mut W) -> EncodeResult<()> {
        let endian = self.endian;

        let mut tiff = Tiff {
            endian,
            variant: self.variant,
            ifds: vec![],
        };
        let mut all_chunks = vec![];

        for encoder_page in self.pages.iter() {
            let page = encoder_page.geometry(endian)?;
            let chunks = encoder_page.chunks(&page)?;
            let n = chunks.len();
            let spp = page.samples_per_pixel;

            let ifd = tiff.add_ifd();
            ifd.set_tag(TagId::ImageWidth, TagData::from_long(page.width()), endian);
            ifd.set_tag(TagId::ImageLength, TagData::from_long(page.height()), endian);
            ifd.set_tag(
                TagId::BitsPerSample,
                TagData::Short(vec![page.bits_per_sample; spp as usize]),
                endian,
            );
            ifd.set_tag(
                TagId::Compression,
                TagData::from_short(page.compression.into()),
                endian,
            );
            ifd.set_tag(
                TagId::PhotometricInterpretation,
                TagData::from_short(page.interpretation.into()),
                endian,
            );
            ifd.set_tag(TagId::SamplesPerPixel, TagData::from_short(spp), endian);
            ifd.set_tag(
                TagId::SampleFormat,
                TagData::Short(vec![1; spp as usize]),
                endian,
            );
            ifd.set_tag(TagId::Software, TagData::from_string("tiffcanvas"), endian);

            if spp > 1 {
                ifd.set_tag(
                    TagId::PlanarConfiguration,
                    TagData::from_short(page.planar.into()),
                    endian,
                );
            }
            if page.predictor != Predictor::No {
                ifd.set_tag(
                    TagId::Predictor,
                    TagData::from_short(page.predictor.into()),
                    endian,
                );
            }
            if page.fill_order != FillOrder::MsbFirst {
                ifd.set_tag(
                    TagId::FillOrder,
                    TagData::from_short(page.fill_order.into()),
                    endian,
                );
            }
            if let Some(palette) = &page.palette {
                ifd.set_tag(TagId::ColorMap, TagData::Short(palette.to_color_map()), endian);
            }
            if !page.extra_samples.is_empty() {
                ifd.set_tag(
                    TagId::ExtraSamples,
                    TagData::Short(page.extra_samples.iter().map(|v| (*v).into()).collect()),
                    endian,
                );
            }
            if page.interpretation == PhotometricInterpretation::YCbCr {
                ifd.set_tag(TagId::YCbCrSubSampling, TagData::Short(vec![1, 1]), endian);
            }

            let placeholder = match self.variant {
                TiffVariant::Normal => TagData::Long(vec![0; n]),
                TiffVariant::Big => TagData::Long8(vec![0; n]),
            };
            let (offset_tag, count_tag) = match page.layout {
                ChunkLayout::Strips { rows_per_strip } => {
                    ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(rows_per_strip), endian);
                    (TagId::StripOffsets, TagId::StripByteCounts)
                }
                ChunkLayout::Tiles {
                    tile_width,
                    tile_height,
                } => {
                    ifd.set_tag(TagId::TileWidth, TagData::from_long(tile_width), endian);
                    ifd.set_tag(TagId::TileLength, TagData::from_long(tile_height), endian);
                    (TagId::TileOffsets, TagId::TileByteCounts)
                }
            };
            ifd.set_tag(offset_tag, placeholder, endian);
            ifd.set_tag(count_tag, TagData::Long(vec![0; n]), endian);
            ifd.sort();

            all_chunks.push((offset_tag, count_tag, chunks));
        }

        // 编码TIFF头部和IFD
        let tag_offsets = tiff.encode(writer)?;

        // 追加数据块并记录位置
        let mut chunk_positions = Vec::with_capacity(all_chunks.len());
        for (_, _, chunks) in all_chunks.iter() {
            let mut positions = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                positions.push(writer.stream_position()?);
                writer.write_all(chunk)?;
            }
            chunk_positions.push(positions);
        }
        let end = writer.stream_position()?;

        // 回填偏移量和字节数
        for (i, (offset_tag, count_tag, chunks)) in all_chunks.iter().enumerate() {
            if let Some(position) = tag_offsets[i].get(&u16::from(*offset_tag)) {
                writer.seek(SeekFrom::Start(*position))?;
                let bytes = match self.variant {
                    TiffVariant::Normal => endian.encode_all(
                        &chunk_positions[i]
                            .iter()
                            .map(|v| u32::try_from(*v))
                            .collect::<Result<Vec<u32>, _>>()
                            .map_err(|_| {
                                EncodeError::InvalidPage("偏移量超出 32 位, 请使用 BigTIFF".into())
                            })?,
                    ),
                    TiffVariant::Big => endian.encode_all(&chunk_positions[i]),
                };
                writer.write_all(&bytes)?;
            }

            if let Some(position) = tag_offsets[i].get(&u16::from(*count_tag)) {
                writer.seek(SeekFrom::Start(*position))?;
                let counts = chunks
                    .iter()
                    .map(|c| u32::try_from(c.len()))
                    .collect::<Result<Vec<u32>, _>>()
                    .map_err(|_| EncodeError::InvalidPage("数据块超过 4GB".into()))?;
                writer.write_all(&endian.encode_all(&counts))?;
            }
        }
        writer.seek(SeekFrom::Start(end))?;

        Ok(())
    }

    /// 编码到内存
    pub fn encode_to_vec(&self) -> EncodeResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.encode(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::unpack_row;

    #[test]
    fn pack_row_inverts_unpack_row() {
        let samples = [5u16, 0, 7, 3, 1];
        for bits in [3u16, 4, 12] {
            let packed = pack_row(&samples, bits, Endian::Big);
            let mut unpacked = [0u16; 5];
            unpack_row(&packed, bits, Endian::Big, &mut unpacked);
            assert_eq!(unpacked, samples, "{bits} 位");
        }
    }

    #[test]
    fn one_bit_rows_pad_to_byte() {
        assert_eq!(pack_row(&[1, 0, 1], 1, Endian::Little), vec![0b1010_0000]);
    }

    #[test]
    fn palette_without_palette_interpretation_is_rejected() {
        let samples = SampleBuffer::blank((1, 1), 1, 8);
        let page = EncoderPage::new(samples, PhotometricInterpretation::BlackIsZero)
            .with_palette(Palette::from_entries(vec![[0, 0, 0]]));
        assert!(matches!(
            Encoder::new().with_page(page).encode_to_vec(),
            Err(EncodeError::InvalidPage(_))
        ));
    }
}
