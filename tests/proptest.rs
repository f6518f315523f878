mod common;

use common::*;
use proptest::prelude::*;
use tiffcanvas::encode::{EncoderPage, SupportedCompression};
use tiffcanvas::raster::PhotometricInterpretation;
use tiffcanvas::{decode_base64, Compression, RenderBuilder};

fn gray_image() -> impl Strategy<Value = (u32, u32, Vec<u8>)> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            prop::collection::vec(any::<u8>(), (w * h) as usize),
        )
    })
}

fn compression() -> impl Strategy<Value = SupportedCompression> {
    prop_oneof![
        Just(SupportedCompression::Uncompressed),
        Just(SupportedCompression::Lzw),
        Just(SupportedCompression::Deflate),
        Just(SupportedCompression::PackBits),
    ]
}

proptest! {
    #[test]
    fn gray8_decodes_to_identity((w, h, pixels) in gray_image(), compression in compression(), rows in 1u32..8) {
        let bytes = encode(
            EncoderPage::new(
                gray8(w, h, |x, y| pixels[(y * w + x) as usize]),
                PhotometricInterpretation::BlackIsZero,
            )
            .with_compression(compression)
            .with_rows_per_strip(rows),
        );
        let image = decode(&bytes);
        let expected: Vec<u8> = pixels.iter().flat_map(|v| [*v, *v, *v, 255]).collect();
        prop_assert_eq!(image.rgba.buffer, expected);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = RenderBuilder::new().with_pixel_limit(1 << 16).decode_bytes(&bytes);
    }

    #[test]
    fn tiff_header_with_garbage_never_panics(
        little in any::<bool>(),
        tail in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut bytes = if little { b"II*\0".to_vec() } else { b"MM\0*".to_vec() };
        bytes.extend(tail);
        let _ = RenderBuilder::new().with_pixel_limit(1 << 16).decode_bytes(&bytes);
    }

    #[test]
    fn corrupted_file_never_panics(
        (w, h, pixels) in gray_image(),
        flips in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8),
    ) {
        let mut bytes = encode(
            EncoderPage::new(
                gray8(w, h, |x, y| pixels[(y * w + x) as usize]),
                PhotometricInterpretation::BlackIsZero,
            )
            .with_compression(SupportedCompression::Lzw),
        );
        for (index, value) in flips {
            let i = index.index(bytes.len());
            bytes[i] = value;
        }
        let _ = RenderBuilder::new().with_pixel_limit(1 << 16).decode_bytes(&bytes);
    }

    #[test]
    fn packbits_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256), limit in 0usize..1024) {
        if let Ok(out) = Compression::PackBits.decode(&bytes, limit) {
            prop_assert!(out.len() <= limit);
        }
    }

    #[test]
    fn base64_never_panics(text in "\\PC*") {
        let _ = decode_base64(&text);
    }

    #[test]
    fn base64_accepts_what_it_encodes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(decode_base64(&b64(&bytes)).unwrap(), bytes);
    }
}
