//! ESC/POS-derived command encoders for thermal receipt printers.
//!
//! Everything in this crate is a pure function from a print/control intent to
//! an exact byte sequence. Encoders never touch a transport; drivers feed the
//! returned buffers into whatever channel they own. That keeps every command
//! unit-testable byte-for-byte and lets dialects be swapped without touching
//! driver logic.
//!
//! # Layout
//!
//! - [`commands`] — the base command set: initialize, alignment, character
//!   styles, feeds, cuts, cash-drawer pulse, codepage selection.
//! - [`barcode`] — one-dimensional barcode commands with per-symbology
//!   validation.
//! - [`qrcode`] — QR symbol printing via the `GS ( k` sub-command sequence.
//! - [`raster`] — 1-bit raster bitmap packing and band transfer.
//! - [`dialect`] — per-brand parameter sets (Epson TM family, Elgin i-series)
//!   capturing the small quirks between otherwise ESC/POS-compatible printers.
//!
//! # Example
//!
//! ```
//! use caixa_protocol::{commands, dialect::Dialect};
//!
//! let dialect = Dialect::epson();
//! let mut job: Vec<u8> = Vec::new();
//! job.extend(dialect.initialize());
//! job.extend(commands::align(caixa_core::Alignment::Center));
//! job.extend(commands::text_line("LOJA EXEMPLO"));
//! job.extend(dialect.cut(true));
//!
//! assert_eq!(&job[..2], &[0x1B, 0x40]); // ESC @
//! ```

pub mod barcode;
pub mod commands;
pub mod dialect;
pub mod error;
pub mod qrcode;
pub mod raster;

pub use barcode::{BarcodeOptions, HriPosition, encode_barcode};
pub use dialect::{Dialect, QrModel};
pub use error::{ProtocolError, Result};
pub use qrcode::{ErrorCorrection, QrOptions, encode_qr};
pub use raster::{addressable_width_px, encode_raster, prepare_raster};
