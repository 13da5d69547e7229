//! Property-based tests for the ESC/POS encoders.
//!
//! These tests use proptest to generate random valid inputs and verify that
//! encoder invariants hold for all valid input combinations.

use caixa_core::Symbology;
use caixa_protocol::{
    BarcodeOptions, QrOptions, barcode::symbology_code, encode_barcode, encode_qr, encode_raster,
    raster::DEFAULT_THRESHOLD,
};
use image::{GrayImage, Luma};
use proptest::prelude::*;

/// Strategy for (symbology, valid data) pairs.
fn valid_barcode() -> impl Strategy<Value = (Symbology, String)> {
    prop_oneof![
        prop::string::string_regex("[0-9]{12,13}")
            .unwrap()
            .prop_map(|s| (Symbology::Ean13, s)),
        prop::string::string_regex("[0-9]{7,8}")
            .unwrap()
            .prop_map(|s| (Symbology::Ean8, s)),
        prop::string::string_regex("[0-9A-Z $%*+./-]{1,40}")
            .unwrap()
            .prop_map(|s| (Symbology::Code39, s)),
        prop::string::string_regex("([0-9][0-9]){1,20}")
            .unwrap()
            .prop_map(|s| (Symbology::Itf, s)),
        prop::string::string_regex("[ -~]{1,80}")
            .unwrap()
            .prop_map(|s| (Symbology::Code128, s)),
    ]
}

/// Parse the tail of an encoded barcode sequence back into
/// (symbology code, declared length, data).
fn parse_symbol(bytes: &[u8]) -> (u8, usize, &[u8]) {
    // Skip GS h, GS w, GS H (3 bytes each).
    let symbol = &bytes[9..];
    assert_eq!(&symbol[..2], &[0x1D, 0x6B]);
    let code = symbol[2];
    let len = symbol[3] as usize;
    (code, len, &symbol[4..])
}

proptest! {
    /// Property: for all supported symbologies, the emitted bytes recover
    /// (type code, len(value), value) exactly.
    #[test]
    fn prop_barcode_roundtrip((symbology, value) in valid_barcode()) {
        let bytes = encode_barcode(&value, symbology, &BarcodeOptions::default()).unwrap();
        let (code, len, data) = parse_symbol(&bytes);

        prop_assert_eq!(code, symbology_code(symbology));
        prop_assert_eq!(len, value.len());
        prop_assert_eq!(data, value.as_bytes());
    }

    /// Property: raster payload length is ceil(width/8) * height plus one
    /// 8-byte header per 24-row band.
    #[test]
    fn prop_raster_length(width in 1u32..200, height in 1u32..100, seed in any::<u64>()) {
        let image = GrayImage::from_fn(width, height, |x, y| {
            let v = seed.wrapping_mul(u64::from(x * 31 + y * 17 + 1)) % 256;
            Luma([v as u8])
        });
        let bytes = encode_raster(&image, DEFAULT_THRESHOLD).unwrap();

        let bands = height.div_ceil(24) as usize;
        let payload = width.div_ceil(8) as usize * height as usize;
        prop_assert_eq!(bytes.len(), payload + bands * 8);
    }

    /// Property: the QR store sub-command declares exactly payload + 3 bytes,
    /// little-endian, regardless of payload size.
    #[test]
    fn prop_qr_store_length(value in "[ -~]{1,500}") {
        let bytes = encode_qr(&value, &QrOptions::default()).unwrap();
        // Model (9) + size (8) + EC (8) sub-commands precede the store.
        let store = &bytes[25..];
        prop_assert_eq!(&store[..3], &[0x1D, 0x28, 0x6B][..]);
        let declared = u16::from_le_bytes([store[3], store[4]]) as usize;
        prop_assert_eq!(declared, value.len() + 3);
    }
}
