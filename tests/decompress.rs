mod common;

use common::*;
use tiffcanvas::decode::{decompress, Predictor};
use tiffcanvas::encode::{EncoderPage, SupportedCompression};
use tiffcanvas::raster::{FillOrder, PhotometricInterpretation};
use tiffcanvas::tiff::{TagData, TagId, Tiff};
use tiffcanvas::{CanvasError, Compression, Page, RenderBuilder};

fn first_page(bytes: &[u8]) -> Page {
    let tiff = Tiff::parse(bytes).unwrap();
    Page::from_ifd(tiff.ifd0().unwrap(), tiff.endian, bytes.len() as u64).unwrap()
}

fn checker(x: u32, y: u32) -> u8 {
    ((x * 37 + y * 11) % 256) as u8
}

#[test]
fn multiple_strips_are_stacked() {
    let bytes = encode(
        EncoderPage::new(gray8(6, 7, checker), PhotometricInterpretation::BlackIsZero)
            .with_rows_per_strip(3),
    );
    let page = first_page(&bytes);
    assert_eq!(page.chunk_count(), 3);

    let samples = decompress(&bytes, &page).unwrap();
    assert_eq!(samples, gray8(6, 7, checker));
}

#[test]
fn every_codec_decodes_to_the_same_samples() {
    let expected = gray8(13, 9, checker);
    for compression in [
        SupportedCompression::Uncompressed,
        SupportedCompression::Lzw,
        SupportedCompression::Deflate,
        SupportedCompression::PackBits,
    ] {
        let bytes = encode(
            EncoderPage::new(expected.clone(), PhotometricInterpretation::BlackIsZero)
                .with_compression(compression)
                .with_rows_per_strip(4),
        );
        let page = first_page(&bytes);
        assert_eq!(page.compression, Compression::from(compression));
        assert_eq!(decompress(&bytes, &page).unwrap(), expected, "{compression:?}");
    }
}

#[test]
fn horizontal_predictor_8_and_16_bit() {
    let rgb = samples(10, 4, 3, 8, |x, y| {
        vec![(x * 20) as u16, (y * 50) as u16, ((x + y) * 9) as u16]
    });
    let bytes = encode(
        EncoderPage::new(rgb.clone(), PhotometricInterpretation::RGB)
            .with_compression(SupportedCompression::Lzw)
            .with_predictor(Predictor::Horizontal),
    );
    assert_eq!(decompress(&bytes, &first_page(&bytes)).unwrap(), rgb);

    let deep = samples(9, 5, 1, 16, |x, y| vec![(x as u16) * 7000 + y as u16]);
    let bytes = encode(
        EncoderPage::new(deep.clone(), PhotometricInterpretation::BlackIsZero)
            .with_compression(SupportedCompression::Deflate)
            .with_predictor(Predictor::Horizontal),
    );
    assert_eq!(decompress(&bytes, &first_page(&bytes)).unwrap(), deep);
}

#[test]
fn planar_samples_are_interleaved() {
    let rgb = samples(3, 5, 3, 8, |x, y| vec![x as u16, y as u16, 200]);
    let bytes = encode(
        EncoderPage::new(rgb.clone(), PhotometricInterpretation::RGB)
            .with_planar(true)
            .with_rows_per_strip(2),
    );
    let page = first_page(&bytes);
    // 3 个平面，每个平面 3 个条带
    assert_eq!(page.chunk_count(), 9);
    assert_eq!(decompress(&bytes, &page).unwrap(), rgb);

    let image = decode(&bytes);
    assert_eq!(image.rgba.pixel(2, 4), Some([2, 4, 200, 255]));
}

#[test]
fn tiles_crop_at_the_right_and_bottom_edges() {
    let expected = gray8(20, 11, checker);
    let bytes = encode(
        EncoderPage::new(expected.clone(), PhotometricInterpretation::BlackIsZero)
            .with_tiles(16, 16)
            .with_compression(SupportedCompression::Deflate),
    );
    let page = first_page(&bytes);
    assert_eq!(page.chunk_count(), 2);
    assert_eq!(decompress(&bytes, &page).unwrap(), expected);
}

#[test]
fn tiles_are_placed_by_index_not_file_order() {
    let tags = vec![
        (TagId::ImageWidth, TagData::from_long(4)),
        (TagId::ImageLength, TagData::from_long(4)),
        (TagId::BitsPerSample, TagData::from_short(8)),
        (TagId::PhotometricInterpretation, TagData::from_short(1)),
        (TagId::TileWidth, TagData::from_long(2)),
        (TagId::TileLength, TagData::from_long(2)),
        (TagId::TileByteCounts, TagData::Long(vec![4; 4])),
    ];
    let chunks: Vec<Vec<u8>> = (0..4u8).map(|i| vec![10 + i; 4]).collect();
    let bytes = assemble(tags, TagId::TileOffsets, &chunks, &[3, 1, 2, 0]);

    let image = decode(&bytes);
    let gray = |x, y| image.rgba.pixel(x, y).unwrap()[0];
    assert_eq!(gray(0, 0), 10);
    assert_eq!(gray(3, 0), 11);
    assert_eq!(gray(1, 3), 12);
    assert_eq!(gray(3, 3), 13);
}

#[test]
fn lsb_first_fill_order() {
    let bilevel = samples(11, 3, 1, 1, |x, y| vec![((x + y) % 3 == 0) as u16]);
    let bytes = encode(
        EncoderPage::new(bilevel.clone(), PhotometricInterpretation::BlackIsZero)
            .with_fill_order(FillOrder::LsbFirst),
    );
    let page = first_page(&bytes);
    assert_eq!(page.fill_order, FillOrder::LsbFirst);
    assert_eq!(decompress(&bytes, &page).unwrap(), bilevel);

    let image = decode(&bytes);
    assert_eq!(image.rgba.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(image.rgba.pixel(1, 0), Some([0, 0, 0, 255]));
}

#[test]
fn short_strip_is_corrupt() {
    // 2x2 的条带只提供了 3 个字节
    let bytes = assemble(
        gray_strip_tags(2, 2, 2, vec![3]),
        TagId::StripOffsets,
        &[vec![1, 2, 3]],
        &[0],
    );
    assert!(matches!(
        RenderBuilder::new().decode_bytes(&bytes),
        Err(CanvasError::CorruptStrip {
            chunk: 0,
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn long_strip_is_truncated_to_geometry() {
    let bytes = assemble(
        gray_strip_tags(2, 1, 1, vec![5]),
        TagId::StripOffsets,
        &[vec![1, 2, 3, 4, 5]],
        &[0],
    );
    let image = decode(&bytes);
    assert_eq!(image.rgba.buffer, vec![1, 1, 1, 255, 2, 2, 2, 255]);
}

#[test]
fn inflated_output_is_bounded_by_geometry() {
    // 64 MiB 的零压缩后只有几十 KiB，图像却只有一个像素
    let bomb = Compression::Deflate.encode(&vec![0u8; 64 << 20]).unwrap();
    let mut tags = gray_strip_tags(1, 1, 1, vec![bomb.len() as u32]);
    tags.retain(|(id, _)| *id != TagId::Compression);
    tags.push((TagId::Compression, TagData::from_short(8)));
    let bytes = assemble(tags, TagId::StripOffsets, &[bomb.clone()], &[0]);

    let page = first_page(&bytes);
    assert_eq!(decompress(&bytes, &page).unwrap().samples, vec![0]);
    let image = RenderBuilder::new().with_pixel_limit(1).decode_bytes(&bytes).unwrap().unwrap();
    assert_eq!(image.rgba.buffer, vec![0, 0, 0, 255]);

    assert_eq!(Compression::Deflate.decode(&bomb, 2).unwrap().len(), 2);
}

#[test]
fn jpeg_compression_is_unsupported() {
    let mut tags = gray_strip_tags(2, 1, 1, vec![2]);
    tags.retain(|(id, _)| *id != TagId::Compression);
    tags.push((TagId::Compression, TagData::from_short(7)));
    let bytes = assemble(tags, TagId::StripOffsets, &[vec![0, 0]], &[0]);
    assert!(matches!(
        RenderBuilder::new().decode_bytes(&bytes),
        Err(CanvasError::UnsupportedCompression(Compression::Jpeg))
    ));
}

#[test]
fn garbage_lzw_is_a_chunk_error() {
    let mut tags = gray_strip_tags(4, 4, 4, vec![6]);
    tags.retain(|(id, _)| *id != TagId::Compression);
    tags.push((TagId::Compression, TagData::from_short(5)));
    let bytes = assemble(
        tags,
        TagId::StripOffsets,
        &[vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]],
        &[0],
    );
    assert!(matches!(
        RenderBuilder::new().decode_bytes(&bytes),
        Err(CanvasError::Decompression { chunk: 0, .. } | CanvasError::CorruptStrip { chunk: 0, .. })
    ));
}

#[test]
fn missing_byte_counts_inferred_for_single_strip() {
    let mut tags = gray_strip_tags(3, 2, 2, vec![]);
    tags.retain(|(id, _)| *id != TagId::StripByteCounts);
    let bytes = assemble(tags, TagId::StripOffsets, &[vec![9, 8, 7, 6, 5, 4]], &[0]);
    let image = decode(&bytes);
    assert_eq!(image.rgba.pixel(2, 1), Some([4, 4, 4, 255]));
}
