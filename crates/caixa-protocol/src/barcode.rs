//! One-dimensional barcode commands.
//!
//! A barcode print is four commands in sequence: height (`GS h`), module
//! width (`GS w`), HRI text position (`GS H`), then the symbol itself
//! (`GS k m n d1..dn`, the length-prefixed form). Data is validated against
//! the symbology's charset and length rules before any bytes are produced.

use crate::commands::GS;
use crate::error::{ProtocolError, Result};
use caixa_core::Symbology;

/// Position of the human-readable interpretation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HriPosition {
    None,
    Above,
    #[default]
    Below,
    Both,
}

impl HriPosition {
    fn as_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Above => 1,
            Self::Below => 2,
            Self::Both => 3,
        }
    }
}

/// Rendering options for a barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarcodeOptions {
    /// Symbol height in dots.
    pub height: u8,

    /// Module width, 1-6.
    pub width: u8,

    /// HRI text position.
    pub hri: HriPosition,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            height: 80,
            width: 2,
            hri: HriPosition::Below,
        }
    }
}

/// Dialect numeric id for a symbology (`GS k` length-prefixed form).
pub fn symbology_code(symbology: Symbology) -> u8 {
    match symbology {
        Symbology::UpcA => 65,
        Symbology::UpcE => 66,
        Symbology::Ean13 => 67,
        Symbology::Ean8 => 68,
        Symbology::Code39 => 69,
        Symbology::Itf => 70,
        Symbology::Codabar => 71,
        Symbology::Code93 => 72,
        Symbology::Code128 => 73,
    }
}

/// Encode a complete barcode print sequence.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidBarcode`] when the data violates the
/// symbology's rules, or [`ProtocolError::InvalidBarcodeWidth`] when the
/// module width is out of range. No bytes are produced on error.
///
/// # Examples
///
/// ```
/// use caixa_core::Symbology;
/// use caixa_protocol::{BarcodeOptions, encode_barcode};
///
/// let bytes = encode_barcode("7891000315507", Symbology::Ean13, &BarcodeOptions::default())
///     .unwrap();
/// // Tail of the sequence is GS k 67 <len> <data>.
/// let tail = &bytes[bytes.len() - 17..];
/// assert_eq!(&tail[..4], &[0x1D, 0x6B, 67, 13]);
/// ```
pub fn encode_barcode(
    value: &str,
    symbology: Symbology,
    options: &BarcodeOptions,
) -> Result<Vec<u8>> {
    validate(value, symbology)?;

    if !(1..=6).contains(&options.width) {
        return Err(ProtocolError::InvalidBarcodeWidth(options.width));
    }

    let data = value.as_bytes();
    let mut buf = Vec::with_capacity(10 + data.len() + 4);

    // GS h n — height
    buf.extend_from_slice(&[GS, 0x68, options.height]);
    // GS w n — module width
    buf.extend_from_slice(&[GS, 0x77, options.width]);
    // GS H n — HRI position
    buf.extend_from_slice(&[GS, 0x48, options.hri.as_byte()]);
    // GS k m n d1..dn
    buf.extend_from_slice(&[GS, 0x6B, symbology_code(symbology), data.len() as u8]);
    buf.extend_from_slice(data);

    Ok(buf)
}

fn validate(value: &str, symbology: Symbology) -> Result<()> {
    if value.is_empty() {
        return Err(ProtocolError::invalid_barcode(symbology, "empty data"));
    }
    if value.len() > 255 {
        return Err(ProtocolError::invalid_barcode(
            symbology,
            format!("data too long: {} bytes", value.len()),
        ));
    }

    let all_digits = value.bytes().all(|b| b.is_ascii_digit());
    match symbology {
        Symbology::UpcA => expect(symbology, all_digits && (11..=12).contains(&value.len()),
            "expected 11-12 digits"),
        Symbology::UpcE => expect(symbology, all_digits && matches!(value.len(), 6..=8 | 11 | 12),
            "expected 6-8 or 11-12 digits"),
        Symbology::Ean13 => expect(symbology, all_digits && (12..=13).contains(&value.len()),
            "expected 12-13 digits"),
        Symbology::Ean8 => expect(symbology, all_digits && (7..=8).contains(&value.len()),
            "expected 7-8 digits"),
        Symbology::Itf => expect(symbology, all_digits && value.len() % 2 == 0,
            "expected an even number of digits"),
        Symbology::Code39 => expect(
            symbology,
            value
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()
                    || matches!(b, b' ' | b'$' | b'%' | b'*' | b'+' | b'-' | b'.' | b'/')),
            "allowed: 0-9 A-Z space $%*+-./",
        ),
        Symbology::Codabar => expect(
            symbology,
            value
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'A'..=b'D')
                    || matches!(b, b'$' | b'+' | b'-' | b'.' | b'/' | b':')),
            "allowed: 0-9 A-D $+-./:",
        ),
        Symbology::Code93 | Symbology::Code128 => expect(
            symbology,
            value.bytes().all(|b| (0x20..0x7F).contains(&b)),
            "allowed: printable ASCII",
        ),
    }
}

fn expect(symbology: Symbology, ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ProtocolError::invalid_barcode(symbology, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_ean13_sequence() {
        let options = BarcodeOptions {
            height: 100,
            width: 3,
            hri: HriPosition::None,
        };
        let bytes = encode_barcode("7891000315507", Symbology::Ean13, &options).unwrap();

        assert_eq!(&bytes[0..3], &[0x1D, 0x68, 100]); // GS h
        assert_eq!(&bytes[3..6], &[0x1D, 0x77, 3]); // GS w
        assert_eq!(&bytes[6..9], &[0x1D, 0x48, 0]); // GS H
        assert_eq!(&bytes[9..13], &[0x1D, 0x6B, 67, 13]); // GS k m n
        assert_eq!(&bytes[13..], b"7891000315507");
    }

    #[rstest]
    #[case(Symbology::UpcA, "036000291452")]
    #[case(Symbology::Ean8, "96385074")]
    #[case(Symbology::Code39, "CAIXA-123")]
    #[case(Symbology::Itf, "30712345000123")]
    #[case(Symbology::Code128, "Pedido #42")]
    fn test_valid_data_accepted(#[case] symbology: Symbology, #[case] value: &str) {
        assert!(encode_barcode(value, symbology, &BarcodeOptions::default()).is_ok());
    }

    #[rstest]
    #[case(Symbology::Ean13, "12345")] // too short
    #[case(Symbology::Ean13, "78910003155071234")] // too long
    #[case(Symbology::Ean8, "ABCDEFGH")] // not digits
    #[case(Symbology::Itf, "123")] // odd length
    #[case(Symbology::Code39, "lowercase")] // invalid charset
    #[case(Symbology::Code128, "caf\u{e9}")] // non-ASCII
    fn test_invalid_data_rejected(#[case] symbology: Symbology, #[case] value: &str) {
        let err = encode_barcode(value, symbology, &BarcodeOptions::default()).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBarcode { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(encode_barcode("", Symbology::Code128, &BarcodeOptions::default()).is_err());
    }

    #[test]
    fn test_width_out_of_range() {
        let options = BarcodeOptions {
            width: 7,
            ..BarcodeOptions::default()
        };
        let err = encode_barcode("12345678", Symbology::Itf, &options).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBarcodeWidth(7)));
    }

    #[test]
    fn test_symbology_codes() {
        assert_eq!(symbology_code(Symbology::UpcA), 65);
        assert_eq!(symbology_code(Symbology::Ean13), 67);
        assert_eq!(symbology_code(Symbology::Code128), 73);
    }
}
