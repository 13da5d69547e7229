//! Concrete peripheral drivers.

pub mod cash_drawer;
pub mod escpos;
pub mod scanner;
pub mod terminal;

pub use cash_drawer::SimulatedCashDrawer;
pub use escpos::EscPosPrinter;
pub use scanner::{
    SerialBarcodeScanner, SimulatedBarcodeReader, SimulatedPixReader, SimulatedReaderHandle,
};
pub use terminal::SimulatedPaymentTerminal;
