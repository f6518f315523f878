//! 页面模型
//!
//! [`Page`] 是从 IFD 中整理出的、解码一页所需的全部信息：尺寸、样本布局、
//! 颜色解释、压缩方式和数据块位置。构造时完成所有校验，之后的解压和颜色
//! 转换可以直接依赖这些字段。

use super::compression::{Compression, Predictor};
use super::error::{CanvasError, CanvasResult};
use crate::raster::{
    ExtraSamples, FillOrder, PhotometricInterpretation, PlanarConfiguration, SampleFormat,
};
use crate::tiff::{Endian, Ifd, TagId, TiffError};
use std::fmt::Display;
use std::ops::Range;
use tracing::*;

/// 数据块的组织方式
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChunkLayout {
    /// 条带：整行宽度，每块 `rows_per_strip` 行，最后一块可能更短
    Strips {
        /// 每个条带的行数
        rows_per_strip: u32,
    },
    /// 瓦片：固定尺寸的矩形，边缘瓦片按完整尺寸存储
    Tiles {
        /// 瓦片宽度
        tile_width: u32,
        /// 瓦片高度
        tile_height: u32,
    },
}

/// 调色板
///
/// ColorMap 标签按 全部 R、全部 G、全部 B 的顺序存放 16 位分量
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Palette {
    entries: Vec<[u16; 3]>,
}

impl Palette {
    /// 从 ColorMap 标签的值创建
    ///
    /// 长度为 0 或不是 3 的倍数时返回 `None`
    pub fn from_color_map(values: &[u16]) -> Option<Self> {
        if values.is_empty() || values.len() % 3 != 0 {
            return None;
        }
        let n = values.len() / 3;
        let entries = (0..n)
            .map(|i| [values[i], values[n + i], values[2 * n + i]])
            .collect();
        Some(Self { entries })
    }

    /// 从 RGB 条目创建
    pub fn from_entries(entries: Vec<[u16; 3]>) -> Self {
        Self { entries }
    }

    /// 转换回 ColorMap 标签的布局
    pub fn to_color_map(&self) -> Vec<u16> {
        (0..3)
            .flat_map(|channel| self.entries.iter().map(move |entry| entry[channel]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按索引查找颜色
    pub fn get(&self, index: usize) -> Option<[u16; 3]> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[[u16; 3]] {
        &self.entries
    }
}

/// 一页图像的元数据
#[derive(Clone, Debug)]
pub struct Page {
    /// 图像尺寸 (宽度, 高度)
    pub dimensions: (u32, u32),
    /// 每个样本的位数（所有通道一致）
    pub bits_per_sample: u16,
    /// 每个像素的样本数，包括额外样本
    pub samples_per_pixel: u16,
    /// 像素值的解释方式
    pub interpretation: PhotometricInterpretation,
    /// 压缩方式
    pub compression: Compression,
    /// 压缩预测器
    pub predictor: Predictor,
    /// 分量存储方式
    pub planar: PlanarConfiguration,
    /// 字节内的位序
    pub fill_order: FillOrder,
    /// 条带或瓦片
    pub layout: ChunkLayout,
    /// 数据块偏移量
    pub offsets: Vec<u64>,
    /// 数据块字节数
    pub byte_counts: Vec<u64>,
    /// 调色板，仅当解释方式为 Palette 时存在
    pub palette: Option<Palette>,
    /// 额外样本信息
    pub extra_samples: Vec<ExtraSamples>,
    /// 字节序
    pub endian: Endian,
}

impl Page {
    /// 从 IFD 创建页面并校验
    ///
    /// # 参数
    ///
    /// * `ifd` - 图像文件目录
    /// * `endian` - 文件字节序
    /// * `buffer_len` - 整个文件的字节数，所有数据块都必须位于其中
    ///
    /// # 错误
    ///
    /// * 必需标签缺失或取值无效时返回 `BadTiff`
    /// * 数据块越过缓冲区末尾时返回 `TruncatedData`
    /// * 无压缩数据块的字节数少于其尺寸时返回 `CorruptStrip`
    /// * 位深、样本格式、光度解释或布局不受支持时返回 `NotSupported`
    pub fn from_ifd(ifd: &Ifd, endian: Endian, buffer_len: u64) -> CanvasResult<Self> {
        let width: u32 = ifd.get_tag_value(TagId::ImageWidth)?;
        let height: u32 = ifd.get_tag_value(TagId::ImageLength)?;
        if width == 0 {
            return Err(TiffError::BadTag(TagId::ImageWidth).into());
        }
        if height == 0 {
            return Err(TiffError::BadTag(TagId::ImageLength).into());
        }

        let samples_per_pixel = ifd
            .get_optional_value::<u16>(TagId::SamplesPerPixel)?
            .unwrap_or(1);
        if samples_per_pixel == 0 {
            return Err(TiffError::BadTag(TagId::SamplesPerPixel).into());
        }

        let bits_per_sample = Self::read_bits_per_sample(ifd, samples_per_pixel)?;

        if ifd.has_tag(TagId::SampleFormat) {
            let formats = ifd.get_tag_values::<u16>(TagId::SampleFormat)?;
            if let Some(format) = formats
                .into_iter()
                .map(SampleFormat::from)
                .find(|f| *f != SampleFormat::Unsigned)
            {
                return Err(CanvasError::NotSupported(format!("样本格式 {format:?}")));
            }
        }

        let interpretation = match ifd.get_optional_value::<u16>(TagId::PhotometricInterpretation)? {
            Some(v) => PhotometricInterpretation::from(v),
            None => {
                let guess = if samples_per_pixel <= 2 {
                    PhotometricInterpretation::BlackIsZero
                } else {
                    PhotometricInterpretation::RGB
                };
                warn!("缺少光度解释标签, 按 {guess:?} 处理");
                guess
            }
        };
        let color_samples = interpretation
            .color_samples()
            .ok_or_else(|| CanvasError::NotSupported(format!("光度解释 {interpretation:?}")))?;
        if samples_per_pixel < color_samples {
            return Err(TiffError::BadTag(TagId::SamplesPerPixel).into());
        }

        let compression: Compression = ifd
            .get_optional_value::<u16>(TagId::Compression)?
            .unwrap_or(1)
            .into();
        let predictor: Predictor = ifd
            .get_optional_value::<u16>(TagId::Predictor)?
            .unwrap_or(1)
            .into();

        let planar = if samples_per_pixel == 1 {
            PlanarConfiguration::Chunky
        } else {
            match PlanarConfiguration::from(
                ifd.get_optional_value::<u16>(TagId::PlanarConfiguration)?
                    .unwrap_or(1),
            ) {
                PlanarConfiguration::Unknown => {
                    return Err(TiffError::BadTag(TagId::PlanarConfiguration).into())
                }
                planar => planar,
            }
        };

        let fill_order = match FillOrder::from(
            ifd.get_optional_value::<u16>(TagId::FillOrder)?
                .unwrap_or(1),
        ) {
            FillOrder::Unknown => return Err(TiffError::BadTag(TagId::FillOrder).into()),
            order => order,
        };

        let extra_samples = if ifd.has_tag(TagId::ExtraSamples) {
            ifd.get_tag_values::<u16>(TagId::ExtraSamples)?
                .into_iter()
                .map(ExtraSamples::from)
                .collect()
        } else {
            vec![]
        };
        // 没有 ExtraSamples 标签时最多容忍一个未声明的附加通道
        if samples_per_pixel as usize > color_samples as usize + extra_samples.len().max(1) {
            return Err(TiffError::BadTag(TagId::SamplesPerPixel).into());
        }

        let palette = if interpretation == PhotometricInterpretation::Palette {
            let values = ifd.get_tag_values::<u16>(TagId::ColorMap)?;
            Some(Palette::from_color_map(&values).ok_or(TiffError::BadTag(TagId::ColorMap))?)
        } else {
            None
        };

        if interpretation == PhotometricInterpretation::YCbCr {
            // 缺省的子采样是 2x2
            let subsampling = if ifd.has_tag(TagId::YCbCrSubSampling) {
                ifd.get_tag_values::<u16>(TagId::YCbCrSubSampling)?
            } else {
                vec![2, 2]
            };
            if subsampling != [1, 1] {
                return Err(CanvasError::NotSupported(format!(
                    "YCbCr 子采样 {subsampling:?}"
                )));
            }
        }

        let (layout, offset_tag, count_tag) = if ifd.has_tag(TagId::TileWidth) {
            let tile_width: u32 = ifd.get_tag_value(TagId::TileWidth)?;
            let tile_height: u32 = ifd.get_tag_value(TagId::TileLength)?;
            if tile_width == 0 {
                return Err(TiffError::BadTag(TagId::TileWidth).into());
            }
            if tile_height == 0 {
                return Err(TiffError::BadTag(TagId::TileLength).into());
            }
            (
                ChunkLayout::Tiles {
                    tile_width,
                    tile_height,
                },
                TagId::TileOffsets,
                TagId::TileByteCounts,
            )
        } else {
            // 常见写法是用 2^32-1 表示整幅图像只有一个条带
            let rows_per_strip = ifd
                .get_optional_value::<u32>(TagId::RowsPerStrip)?
                .unwrap_or(height)
                .min(height);
            if rows_per_strip == 0 {
                return Err(TiffError::BadTag(TagId::RowsPerStrip).into());
            }
            (
                ChunkLayout::Strips { rows_per_strip },
                TagId::StripOffsets,
                TagId::StripByteCounts,
            )
        };

        let mut page = Self {
            dimensions: (width, height),
            bits_per_sample,
            samples_per_pixel,
            interpretation,
            compression,
            predictor,
            planar,
            fill_order,
            layout,
            offsets: ifd.get_tag_values(offset_tag)?,
            byte_counts: vec![],
            palette,
            extra_samples,
            endian,
        };

        let expected_chunks = page.chunk_count();
        if page.offsets.len() < expected_chunks {
            return Err(TiffError::BadTag(offset_tag).into());
        }

        page.byte_counts = if ifd.has_tag(count_tag) {
            ifd.get_tag_values(count_tag)?
        } else if expected_chunks == 1 && compression == Compression::Uncompressed {
            let (_, rows) = page.chunk_dimensions();
            let inferred = rows as u64 * page.chunk_row_bytes() as u64;
            debug!("推断唯一数据块的字节数: {inferred}");
            vec![inferred]
        } else {
            return Err(TiffError::MissingTag(count_tag).into());
        };

        if page.offsets.len() != page.byte_counts.len() {
            return Err(TiffError::BadTag(count_tag).into());
        }
        for (offset, count) in page.offsets.iter().zip(page.byte_counts.iter()) {
            match offset.checked_add(*count) {
                Some(end) if end <= buffer_len => {}
                _ => return Err(CanvasError::TruncatedData),
            }
        }
        // 无压缩数据块的字节数即解压后的长度，不足时无需分配就能判定损坏
        if compression == Compression::Uncompressed {
            for index in 0..expected_chunks {
                let expected = page.chunk_decoded_len(index);
                let actual = page.byte_counts[index];
                if actual < expected as u64 {
                    return Err(CanvasError::CorruptStrip {
                        chunk: index,
                        expected,
                        actual: actual as usize,
                    });
                }
            }
        }

        Ok(page)
    }

    fn read_bits_per_sample(ifd: &Ifd, samples_per_pixel: u16) -> CanvasResult<u16> {
        let values = if ifd.has_tag(TagId::BitsPerSample) {
            ifd.get_tag_values::<u16>(TagId::BitsPerSample)?
        } else {
            vec![1]
        };
        let first = *values
            .first()
            .ok_or(TiffError::BadTag(TagId::BitsPerSample))?;
        if values.len() != 1 && values.len() != samples_per_pixel as usize {
            return Err(TiffError::BadTag(TagId::BitsPerSample).into());
        }
        if values.iter().any(|v| *v != first) {
            return Err(CanvasError::NotSupported(format!(
                "各通道位深不一致: {values:?}"
            )));
        }
        if !(1..=16).contains(&first) {
            return Err(CanvasError::NotSupported(format!("{first} 位样本")));
        }
        Ok(first)
    }

    /// 计算图像总像素数（以百万为单位）
    pub fn megapixels(&self) -> f64 {
        (self.dimensions.0 as f64 * self.dimensions.1 as f64) / 1e6
    }

    /// 图像总像素数
    pub fn pixel_count(&self) -> u64 {
        self.dimensions.0 as u64 * self.dimensions.1 as u64
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// 样本平面数：分平面存储时等于每像素样本数，否则为 1
    pub fn planes(&self) -> usize {
        match self.planar {
            PlanarConfiguration::Planar => self.samples_per_pixel as usize,
            _ => 1,
        }
    }

    /// 每个数据块中每像素的样本数
    pub fn chunk_samples_per_pixel(&self) -> usize {
        match self.planar {
            PlanarConfiguration::Planar => 1,
            _ => self.samples_per_pixel as usize,
        }
    }

    /// 数据块的标称尺寸 (宽度, 高度)
    pub fn chunk_dimensions(&self) -> (u32, u32) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => (self.dimensions.0, rows_per_strip),
            ChunkLayout::Tiles {
                tile_width,
                tile_height,
            } => (tile_width, tile_height),
        }
    }

    /// 水平方向的数据块数
    pub fn chunks_across(&self) -> usize {
        self.dimensions.0.div_ceil(self.chunk_dimensions().0) as usize
    }

    /// 垂直方向的数据块数
    pub fn chunks_down(&self) -> usize {
        self.dimensions.1.div_ceil(self.chunk_dimensions().1) as usize
    }

    /// 覆盖整幅图像所需的数据块数
    pub fn chunk_count(&self) -> usize {
        self.chunks_across() * self.chunks_down() * self.planes()
    }

    /// 数据块在图像中的位置 (平面, x0, y0)
    ///
    /// 数据块按平面、行、列的顺序编号
    pub fn chunk_origin(&self, index: usize) -> (usize, u32, u32) {
        let per_plane = self.chunks_across() * self.chunks_down();
        let plane = index / per_plane;
        let rem = index % per_plane;
        let (chunk_width, chunk_height) = self.chunk_dimensions();
        let x0 = (rem % self.chunks_across()) as u32 * chunk_width;
        let y0 = (rem / self.chunks_across()) as u32 * chunk_height;
        (plane, x0, y0)
    }

    /// 数据块实际存储的行数
    ///
    /// 最后一个条带只存储图像内的行，瓦片总是完整存储
    pub fn chunk_rows(&self, index: usize) -> u32 {
        let (_, _, y0) = self.chunk_origin(index);
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => rows_per_strip.min(self.dimensions.1 - y0),
            ChunkLayout::Tiles { tile_height, .. } => tile_height,
        }
    }

    /// 数据块在图像内可见部分的尺寸 (列数, 行数)
    pub fn chunk_visible(&self, index: usize) -> (u32, u32) {
        let (_, x0, y0) = self.chunk_origin(index);
        let (chunk_width, chunk_height) = self.chunk_dimensions();
        (
            chunk_width.min(self.dimensions.0 - x0),
            chunk_height.min(self.dimensions.1 - y0),
        )
    }

    /// 数据块中一行的字节数，每行按字节对齐
    pub fn chunk_row_bytes(&self) -> usize {
        let bits = self.chunk_dimensions().0 as usize
            * self.chunk_samples_per_pixel()
            * self.bits_per_sample as usize;
        bits.div_ceil(8)
    }

    /// 数据块解压后应有的字节数
    pub fn chunk_decoded_len(&self, index: usize) -> usize {
        self.chunk_rows(index) as usize * self.chunk_row_bytes()
    }

    /// 数据块在文件中的字节范围
    pub fn chunk_byte_range(&self, index: usize) -> Option<Range<usize>> {
        let start = usize::try_from(*self.offsets.get(index)?).ok()?;
        let len = usize::try_from(*self.byte_counts.get(index)?).ok()?;
        Some(start..start.checked_add(len)?)
    }
}

impl Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Page({}x{}, {}x{}位, {:?}, {:?}, {:?}, {:?}, {} 个数据块)",
            self.dimensions.0,
            self.dimensions.1,
            self.samples_per_pixel,
            self.bits_per_sample,
            self.interpretation,
            self.compression,
            self.planar,
            self.layout,
            self.chunk_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::TagData;

    fn gray_ifd(width: u32, height: u32, rows_per_strip: u32, offsets: Vec<u32>) -> Ifd {
        let endian = Endian::Little;
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(width), endian);
        ifd.set_tag(TagId::ImageLength, TagData::from_long(height), endian);
        ifd.set_tag(TagId::BitsPerSample, TagData::from_short(8), endian);
        ifd.set_tag(TagId::PhotometricInterpretation, TagData::from_short(1), endian);
        ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(rows_per_strip), endian);
        let counts = vec![width * rows_per_strip; offsets.len()];
        ifd.set_tag(TagId::StripOffsets, TagData::Long(offsets), endian);
        ifd.set_tag(TagId::StripByteCounts, TagData::Long(counts), endian);
        ifd
    }

    #[test]
    fn palette_reads_planar_color_map() {
        let palette = Palette::from_color_map(&[1, 2, 10, 20, 100, 200]).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get(0), Some([1, 10, 100]));
        assert_eq!(palette.get(1), Some([2, 20, 200]));
        assert_eq!(palette.to_color_map(), vec![1, 2, 10, 20, 100, 200]);
        assert!(Palette::from_color_map(&[1, 2]).is_none());
    }

    #[test]
    fn strip_geometry_clips_last_strip() {
        let ifd = gray_ifd(5, 7, 3, vec![8, 23, 38]);
        let page = Page::from_ifd(&ifd, Endian::Little, 100).unwrap();
        assert_eq!(page.chunk_count(), 3);
        assert_eq!(page.chunk_origin(2), (0, 0, 6));
        assert_eq!(page.chunk_rows(2), 1);
        assert_eq!(page.chunk_decoded_len(2), 5);
    }

    #[test]
    fn too_few_strips_is_rejected() {
        let ifd = gray_ifd(5, 7, 3, vec![8, 23]);
        assert!(matches!(
            Page::from_ifd(&ifd, Endian::Little, 100),
            Err(CanvasError::BadTiff(TiffError::BadTag(TagId::StripOffsets)))
        ));
    }

    #[test]
    fn strip_past_buffer_end_is_truncated_data() {
        let ifd = gray_ifd(5, 7, 3, vec![8, 23, 90]);
        assert!(matches!(
            Page::from_ifd(&ifd, Endian::Little, 100),
            Err(CanvasError::TruncatedData)
        ));
    }

    #[test]
    fn short_uncompressed_count_is_rejected_up_front() {
        let endian = Endian::Little;
        let mut ifd = gray_ifd(200_000, 1, 1, vec![8]);
        ifd.set_tag(TagId::ImageLength, TagData::from_long(200_000), endian);
        ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(200_000), endian);
        ifd.set_tag(TagId::StripByteCounts, TagData::from_long(1), endian);
        assert!(matches!(
            Page::from_ifd(&ifd, endian, 111),
            Err(CanvasError::CorruptStrip {
                chunk: 0,
                expected: 40_000_000_000,
                actual: 1
            })
        ));

        // 压缩数据的字节数与尺寸无关
        ifd.set_tag(TagId::Compression, TagData::from_short(8), endian);
        assert!(Page::from_ifd(&ifd, endian, 111).is_ok());
    }

    #[test]
    fn tile_geometry_orders_by_row_then_column() {
        let endian = Endian::Little;
        let mut ifd = gray_ifd(40, 20, 20, vec![]);
        ifd.0.retain(|t| t.code != u16::from(TagId::StripOffsets));
        ifd.0.retain(|t| t.code != u16::from(TagId::StripByteCounts));
        ifd.set_tag(TagId::TileWidth, TagData::from_long(16), endian);
        ifd.set_tag(TagId::TileLength, TagData::from_long(16), endian);
        ifd.set_tag(TagId::TileOffsets, TagData::Long(vec![0; 6]), endian);
        ifd.set_tag(TagId::TileByteCounts, TagData::Long(vec![256; 6]), endian);
        let page = Page::from_ifd(&ifd, endian, 256).unwrap();
        assert_eq!(page.chunks_across(), 3);
        assert_eq!(page.chunks_down(), 2);
        assert_eq!(page.chunk_origin(4), (0, 16, 16));
        assert_eq!(page.chunk_visible(5), (8, 4));
        assert_eq!(page.chunk_rows(5), 16);
    }
}
