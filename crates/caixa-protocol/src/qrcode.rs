//! QR code printing via the `GS ( k` sub-command sequence.
//!
//! A QR print is five sub-commands: select model (function 65), select module
//! size (67), select error-correction level (69), store the data in the symbol
//! buffer (80, length-prefixed), and print (81). The printer renders the
//! symbol itself; no client-side rasterization is involved.

use crate::dialect::QrModel;
use crate::error::{ProtocolError, Result};
use bytes::BufMut;

/// Symbol storage ceiling for model 2 QR, minus the 3 header bytes.
const MAX_QR_DATA: usize = 7089;

/// Error-correction level for a QR symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    Low,
    /// ~15% recovery.
    #[default]
    Medium,
    /// ~25% recovery.
    Quality,
    /// ~30% recovery.
    High,
}

impl ErrorCorrection {
    fn as_byte(self) -> u8 {
        match self {
            Self::Low => 48,
            Self::Medium => 49,
            Self::Quality => 50,
            Self::High => 51,
        }
    }
}

/// Rendering options for a QR symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Module size in dots, 1-16.
    pub module_size: u8,

    /// Error-correction level.
    pub ec: ErrorCorrection,

    /// QR model (dialect default is usually Model 2).
    pub model: QrModel,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            module_size: 4,
            ec: ErrorCorrection::Medium,
            model: QrModel::Model2,
        }
    }
}

/// Encode a complete QR print sequence.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidModuleSize`] for a module size outside
/// 1-16, [`ProtocolError::EmptyQrData`] / [`ProtocolError::QrDataTooLong`]
/// for unusable payloads.
///
/// # Examples
///
/// ```
/// use caixa_protocol::{QrOptions, encode_qr};
///
/// let bytes = encode_qr("https://example.com/pix/abc", &QrOptions::default()).unwrap();
/// // First sub-command selects the QR model.
/// assert_eq!(&bytes[..5], &[0x1D, 0x28, 0x6B, 0x04, 0x00]);
/// ```
pub fn encode_qr(value: &str, options: &QrOptions) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyQrData);
    }
    if value.len() > MAX_QR_DATA {
        return Err(ProtocolError::QrDataTooLong {
            len: value.len(),
            max: MAX_QR_DATA,
        });
    }
    if !(1..=16).contains(&options.module_size) {
        return Err(ProtocolError::InvalidModuleSize(options.module_size));
    }

    let data = value.as_bytes();
    let mut buf = Vec::with_capacity(data.len() + 32);

    // Function 65: select model. pL pH cn fn n1 n2.
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41]);
    buf.put_u8(options.model.as_byte());
    buf.put_u8(0x00);

    // Function 67: module size.
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43]);
    buf.put_u8(options.module_size);

    // Function 69: error-correction level.
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45]);
    buf.put_u8(options.ec.as_byte());

    // Function 80: store data. Length prefix covers cn fn m plus the payload.
    let store_len = (data.len() + 3) as u16;
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B]);
    buf.put_u16_le(store_len);
    buf.extend_from_slice(&[0x31, 0x50, 0x30]);
    buf.extend_from_slice(data);

    // Function 81: print the stored symbol.
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

    Ok(buf)
}
