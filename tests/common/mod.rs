#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use std::io::{Cursor, Seek, SeekFrom, Write};
use tiffcanvas::encode::{Encoder, EncoderPage};
use tiffcanvas::raster::{PhotometricInterpretation, SampleBuffer};
use tiffcanvas::tiff::{Endian, TagData, TagId, Tiff, TiffVariant};
use tiffcanvas::{DecodedImage, RenderBuilder};

pub fn b64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// 按 (x, y) 生成 8 位灰度样本
pub fn gray8(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> SampleBuffer {
    let samples = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| f(x, y) as u16)
        .collect();
    SampleBuffer::new((width, height), 1, 8, samples).unwrap()
}

/// 按 (x, y) 生成多通道样本
pub fn samples(
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    bits: u16,
    f: impl Fn(u32, u32) -> Vec<u16>,
) -> SampleBuffer {
    let data = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| f(x, y))
        .collect();
    SampleBuffer::new((width, height), samples_per_pixel, bits, data).unwrap()
}

pub fn encode(page: EncoderPage) -> Vec<u8> {
    Encoder::new().with_page(page).encode_to_vec().unwrap()
}

pub fn encode_gray8(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    encode(EncoderPage::new(
        gray8(width, height, f),
        PhotometricInterpretation::BlackIsZero,
    ))
}

pub fn decode(bytes: &[u8]) -> DecodedImage {
    RenderBuilder::new()
        .decode_bytes(bytes)
        .unwrap()
        .expect("至少一页")
}

/// 手工组装单页小端 TIFF
///
/// `tags` 中不需要包含 `offset_tag`，它由本函数写入。数据块按 `write_order`
/// 的顺序追加到文件末尾，偏移量按数据块编号回填。
pub fn assemble<I: Into<u16>>(
    tags: Vec<(I, TagData)>,
    offset_tag: TagId,
    chunks: &[Vec<u8>],
    write_order: &[usize],
) -> Vec<u8> {
    let endian = Endian::Little;
    let mut tiff = Tiff {
        endian,
        variant: TiffVariant::Normal,
        ifds: vec![],
    };
    let ifd = tiff.add_ifd();
    for (id, data) in tags {
        ifd.set_tag(id, data, endian);
    }
    ifd.set_tag(offset_tag, TagData::Long(vec![0; chunks.len()]), endian);
    ifd.sort();

    let mut cursor = Cursor::new(Vec::new());
    let tag_offsets = tiff.encode(&mut cursor).unwrap();

    let mut positions = vec![0u32; chunks.len()];
    for &index in write_order {
        positions[index] = cursor.position() as u32;
        cursor.write_all(&chunks[index]).unwrap();
    }

    let position = tag_offsets[0][&u16::from(offset_tag)];
    cursor.seek(SeekFrom::Start(position)).unwrap();
    cursor.write_all(&endian.encode_all(&positions)).unwrap();
    cursor.into_inner()
}

/// 基本的 8 位灰度条带标签
pub fn gray_strip_tags(width: u32, height: u32, rows_per_strip: u32, counts: Vec<u32>) -> Vec<(TagId, TagData)> {
    vec![
        (TagId::ImageWidth, TagData::from_long(width)),
        (TagId::ImageLength, TagData::from_long(height)),
        (TagId::BitsPerSample, TagData::from_short(8)),
        (TagId::Compression, TagData::from_short(1)),
        (TagId::PhotometricInterpretation, TagData::from_short(1)),
        (TagId::RowsPerStrip, TagData::from_long(rows_per_strip)),
        (TagId::StripByteCounts, TagData::Long(counts)),
    ]
}
