use thiserror::Error;

/// Errors produced while encoding printer commands.
///
/// These are always caller errors (bad data for a symbology, oversized QR
/// payload); a successful encode is guaranteed to be accepted by a compliant
/// printer.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid {symbology} barcode data: {message}")]
    InvalidBarcode { symbology: String, message: String },

    #[error("Barcode width must be 1-6, got {0}")]
    InvalidBarcodeWidth(u8),

    #[error("QR module size must be 1-16, got {0}")]
    InvalidModuleSize(u8),

    #[error("QR data too long: {len} bytes (max {max})")]
    QrDataTooLong { len: usize, max: usize },

    #[error("QR data must not be empty")]
    EmptyQrData,

    #[error("Image has zero width or height")]
    EmptyImage,
}

impl ProtocolError {
    /// Create an invalid-barcode error.
    pub fn invalid_barcode(symbology: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidBarcode {
            symbology: symbology.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
