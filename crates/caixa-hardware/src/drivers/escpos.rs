//! ESC/POS printer driver.
//!
//! Drives any printer speaking an ESC/POS-derived dialect over any transport.
//! The driver owns exactly one transport and one dialect; all byte sequences
//! come from `caixa-protocol`, all I/O goes through the transport, and every
//! outcome is reflected in the status cell before a result is returned.

use crate::error::{PeripheralError, Result};
use crate::traits::{Peripheral, Printer};
use caixa_core::{
    Alignment, ContentItem, DeviceInfo, DeviceStatus, LineStyle, PeripheralConfig, PeripheralKind,
    Receipt, StatusCell, StatusReport, Symbology, TextStyle,
};
use caixa_protocol::{
    BarcodeOptions, Dialect, QrOptions, commands, encode_barcode, encode_qr, encode_raster,
    prepare_raster,
    raster::{DEFAULT_THRESHOLD, addressable_width_px},
};
use caixa_transport::{AnyTransport, MockTransport, MockTransportHandle, Transport};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Font A is 12 dots wide on the supported dialects.
const FONT_A_DOT_WIDTH: u32 = 12;

/// Deadline for best-effort status read-back.
const STATUS_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A thermal receipt printer speaking an ESC/POS-derived dialect.
#[derive(Debug)]
pub struct EscPosPrinter {
    id: String,
    name: String,
    dialect: Dialect,
    transport: AnyTransport,
    status: StatusCell,
    drawer_enabled: bool,
    paper_width_mm: u32,
    dpi: u32,
    threshold: u8,
}

impl EscPosPrinter {
    /// Build a printer from its configuration. The dialect comes from the
    /// driver name, the transport from the connection declaration. No I/O.
    pub fn new(config: &PeripheralConfig) -> Result<Self> {
        let dialect =
            Dialect::by_name(&config.driver).ok_or_else(|| PeripheralError::UnsupportedDriver {
                kind: config.kind,
                driver: config.driver.clone(),
            })?;
        let transport = AnyTransport::from_config(config)?;
        Self::with_transport(config, transport, dialect)
    }

    /// Build a simulated printer backed by a mock transport. The handle
    /// exposes every byte the driver emits.
    pub fn simulated(config: &PeripheralConfig) -> Result<(Self, MockTransportHandle)> {
        let (mock, handle) = MockTransport::new();
        let printer = Self::with_transport(config, AnyTransport::Mock(mock), Dialect::epson())?;
        Ok((printer, handle))
    }

    /// Build a printer over an explicit transport and dialect.
    pub fn with_transport(
        config: &PeripheralConfig,
        transport: AnyTransport,
        dialect: Dialect,
    ) -> Result<Self> {
        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            dialect,
            transport,
            status: StatusCell::new(),
            drawer_enabled: config.opt_bool("cash_drawer_enabled", false)?,
            paper_width_mm: config.opt_u32("paper_width_mm", 80)?,
            dpi: config.opt_u32("dpi", 203)?,
            threshold: config.opt_u32("raster_threshold", u32::from(DEFAULT_THRESHOLD))? as u8,
        })
    }

    /// Addressable dots across the configured paper.
    pub fn width_px(&self) -> u32 {
        addressable_width_px(self.paper_width_mm, self.dpi)
    }

    /// Character columns in Font A.
    pub fn columns(&self) -> usize {
        (self.width_px() / FONT_A_DOT_WIDTH) as usize
    }

    /// Dialect in use.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Write a command buffer with Busy/Online/Error bookkeeping.
    async fn send(&mut self, what: &str, bytes: &[u8]) -> Result<()> {
        self.status
            .transition(DeviceStatus::Busy, format!("{what} in progress"));

        match self.transport.write(bytes).await {
            Ok(n) => {
                debug!(id = %self.id, what, bytes = n, "printer command sent");
                self.status.transition(DeviceStatus::Online, "Idle");
                Ok(())
            }
            Err(e) => {
                warn!(id = %self.id, what, error = %e, "printer write failed");
                let mut details = BTreeMap::new();
                details.insert("operation".to_string(), what.to_string());
                details.insert("error".to_string(), e.to_string());
                self.status.transition_with_details(
                    DeviceStatus::Error,
                    format!("{what} failed"),
                    details,
                );
                Err(e.into())
            }
        }
    }

    /// Query the printer's real-time status byte (`DLE EOT 1`).
    ///
    /// Serial printers answer reliably; USB is best-effort and a timeout
    /// leaves the current status untouched (optimistic).
    pub async fn query_status(&mut self) -> Result<StatusReport> {
        if self.status.status() == DeviceStatus::Disconnected {
            return Ok(self.status.report());
        }

        self.transport
            .write(&commands::status_request(1))
            .await
            .map_err(|e| self.to_error("status query", e))?;

        match self.transport.read(STATUS_READ_TIMEOUT).await {
            Ok(bytes) if !bytes.is_empty() => {
                if bytes[0] & commands::STATUS_OFFLINE_BIT != 0 {
                    self.status
                        .transition(DeviceStatus::Warning, "Printer reports offline");
                } else {
                    self.status.transition(DeviceStatus::Online, "Idle");
                }
            }
            // No answer: USB printers often cannot be polled. Keep the
            // current state rather than inventing one.
            Ok(_) | Err(caixa_transport::TransportError::Timeout { .. }) => {}
            Err(e) => return Err(self.to_error("status read", e)),
        }

        Ok(self.status.report())
    }

    fn to_error(
        &self,
        what: &str,
        e: caixa_transport::TransportError,
    ) -> PeripheralError {
        let mut details = BTreeMap::new();
        details.insert("operation".to_string(), what.to_string());
        details.insert("error".to_string(), e.to_string());
        self.status
            .transition_with_details(DeviceStatus::Error, format!("{what} failed"), details);
        e.into()
    }

    fn render_text(&self, value: &str, align: Alignment, style: &TextStyle) -> Vec<u8> {
        let mut buf = commands::align(align);
        buf.extend(commands::char_size(
            if style.double_width { 2 } else { 1 },
            if style.double_height { 2 } else { 1 },
        ));
        buf.extend(commands::bold(style.bold));
        buf.extend(commands::underline(style.underline));
        buf.extend(commands::text_line(value));
        buf
    }

    /// Load an image off the async runtime and pack it for the print head.
    async fn load_raster(&self, path: &str) -> Result<Vec<u8>> {
        let owned = path.to_string();
        let img = tokio::task::spawn_blocking(move || image::open(owned))
            .await
            .map_err(|e| PeripheralError::Image(format!("image load task failed: {e}")))??;

        let gray = prepare_raster(&img, self.width_px())?;
        Ok(encode_raster(&gray, self.threshold)?)
    }

    async fn render_item(&self, item: &ContentItem) -> Result<Vec<u8>> {
        match item {
            ContentItem::Text {
                value,
                align,
                style,
            } => Ok(self.render_text(value, *align, style)),
            ContentItem::Line { style } => Ok(match style {
                LineStyle::Solid => commands::separator('-', self.columns()),
                LineStyle::Dashed => {
                    let pattern: String = "- ".chars().cycle().take(self.columns()).collect();
                    commands::text_line(&pattern)
                }
                LineStyle::Blank => commands::feed(1),
            }),
            ContentItem::Barcode { value, symbology } => {
                let mut buf = commands::align(Alignment::Center);
                buf.extend(encode_barcode(value, *symbology, &BarcodeOptions::default())?);
                buf.extend(commands::align(Alignment::Left));
                Ok(buf)
            }
            ContentItem::QrCode { value, size } => {
                let options = QrOptions {
                    module_size: *size,
                    model: self.dialect.qr_model,
                    ..QrOptions::default()
                };
                let mut buf = commands::align(Alignment::Center);
                buf.extend(encode_qr(value, &options)?);
                buf.extend(commands::align(Alignment::Left));
                Ok(buf)
            }
            ContentItem::Image { path } => self.load_raster(path).await,
        }
    }

    async fn render_receipt(&self, receipt: &Receipt) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for section in &receipt.sections {
            for item in &section.items {
                buf.extend(self.render_item(item).await?);
            }
            buf.extend(commands::feed(1));
        }
        Ok(buf)
    }
}

impl Peripheral for EscPosPrinter {
    async fn initialize(&mut self) -> Result<()> {
        if let Err(e) = self.transport.connect().await {
            return Err(self.to_error("initialize", e));
        }
        if let Err(e) = self.transport.write(&self.dialect.initialize()).await {
            return Err(self.to_error("initialize", e));
        }

        self.status.transition(DeviceStatus::Online, "Initialized");
        debug!(id = %self.id, dialect = self.dialect.name, "printer initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        let closed = self.transport.close().await;
        self.status
            .transition(DeviceStatus::Disconnected, "Shut down");
        closed.map_err(Into::into)
    }

    fn status(&self) -> StatusReport {
        self.status.report()
    }

    fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), format!("ESC/POS ({})", self.dialect.name))
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::Printer
    }
}

impl Printer for EscPosPrinter {
    async fn print_text(&mut self, text: &str) -> Result<()> {
        let bytes = commands::text_line(text);
        self.send("print_text", &bytes).await
    }

    async fn print_receipt(&mut self, receipt: &Receipt) -> Result<()> {
        let bytes = self.render_receipt(receipt).await?;
        self.send("print_receipt", &bytes).await
    }

    async fn cut_paper(&mut self, partial: bool) -> Result<()> {
        let bytes = self.dialect.cut(partial);
        self.send("cut_paper", &bytes).await
    }

    async fn print_image(&mut self, path: &str) -> Result<()> {
        let bytes = self.load_raster(path).await?;
        self.send("print_image", &bytes).await
    }

    async fn print_barcode(&mut self, value: &str, symbology: Symbology) -> Result<()> {
        let bytes = encode_barcode(value, symbology, &BarcodeOptions::default())?;
        self.send("print_barcode", &bytes).await
    }

    async fn print_qrcode(&mut self, value: &str, size: u8) -> Result<()> {
        let options = QrOptions {
            module_size: size,
            model: self.dialect.qr_model,
            ..QrOptions::default()
        };
        let bytes = encode_qr(value, &options)?;
        self.send("print_qrcode", &bytes).await
    }

    async fn open_cash_drawer(&mut self) -> Result<()> {
        if !self.drawer_enabled {
            return Err(PeripheralError::capability_disabled("cash_drawer"));
        }
        let bytes = self.dialect.drawer_pulse();
        self.send("open_cash_drawer", &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caixa_core::Section;

    fn simulated() -> (EscPosPrinter, MockTransportHandle) {
        let config = PeripheralConfig::new("printer-1", PeripheralKind::Printer, "simulated");
        EscPosPrinter::simulated(&config).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_emits_init_sequence() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();

        assert_eq!(printer.status().status, DeviceStatus::Online);
        assert_eq!(&handle.written()[..2], &[0x1B, 0x40]);
    }

    #[tokio::test]
    async fn test_write_failure_transitions_to_error() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();

        handle.set_fail_writes(true);
        let err = printer.print_text("hello").await.unwrap_err();
        assert!(matches!(err, PeripheralError::Transport(_)));

        let report = printer.status();
        assert_eq!(report.status, DeviceStatus::Error);
        assert_eq!(report.details.get("operation").unwrap(), "print_text");
    }

    #[tokio::test]
    async fn test_error_recovers_on_next_success() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();

        handle.set_fail_writes(true);
        let _ = printer.print_text("x").await;
        assert_eq!(printer.status().status, DeviceStatus::Error);

        handle.set_fail_writes(false);
        printer.print_text("y").await.unwrap();
        assert_eq!(printer.status().status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn test_cut_paper_bytes() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();
        handle.clear_written();

        printer.cut_paper(true).await.unwrap();
        let written = handle.written();
        // Feed-before-cut then GS V 66 0.
        assert_eq!(&written[written.len() - 4..], &[0x1D, 0x56, 0x42, 0x00]);
    }

    #[tokio::test]
    async fn test_drawer_disabled_rejected_without_io() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();
        handle.clear_written();

        let err = printer.open_cash_drawer().await.unwrap_err();
        assert!(matches!(err, PeripheralError::CapabilityDisabled { .. }));
        assert!(handle.written().is_empty());
        // No status change either; nothing was attempted.
        assert_eq!(printer.status().status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn test_drawer_enabled_sends_pulse() {
        let config = PeripheralConfig::new("printer-1", PeripheralKind::Printer, "simulated")
            .with_option("cash_drawer_enabled", true);
        let (mut printer, handle) = EscPosPrinter::simulated(&config).unwrap();
        printer.initialize().await.unwrap();
        handle.clear_written();

        printer.open_cash_drawer().await.unwrap();
        assert_eq!(handle.written(), vec![0x1B, 0x70, 0x00, 0x19, 0x19]);
    }

    #[tokio::test]
    async fn test_print_receipt_renders_sections() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();
        handle.clear_written();

        let receipt = Receipt::new(
            "printer-1",
            vec![Section::new(vec![
                ContentItem::centered("LOJA", TextStyle::title()),
                ContentItem::Line {
                    style: LineStyle::Solid,
                },
                ContentItem::text("1x Cafe"),
            ])],
        );
        printer.print_receipt(&receipt).await.unwrap();

        let written = handle.written();
        assert!(!written.is_empty());
        // First item is centered: ESC a 1.
        assert_eq!(&written[..3], &[0x1B, 0x61, 0x01]);
        // Body text made it out.
        let text = String::from_utf8_lossy(&written);
        assert!(text.contains("LOJA"));
        assert!(text.contains("1x Cafe"));
        assert_eq!(printer.status().status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn test_print_receipt_rasterizes_embedded_image() {
        let path = std::env::temp_dir().join("caixa-escpos-receipt-logo.png");
        image::GrayImage::from_pixel(16, 16, image::Luma([0u8]))
            .save(&path)
            .unwrap();

        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();
        handle.clear_written();

        let receipt = Receipt::new(
            "printer-1",
            vec![Section::new(vec![ContentItem::Image {
                path: path.to_string_lossy().into_owned(),
            }])],
        );
        printer.print_receipt(&receipt).await.unwrap();

        // Raster band header GS v 0 must appear in the stream.
        let written = handle.written();
        assert!(written.windows(3).any(|w| w == [0x1D, 0x76, 0x30]));
        assert_eq!(printer.status().status, DeviceStatus::Online);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_shutdown_from_any_state() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();

        handle.set_fail_writes(true);
        let _ = printer.print_text("x").await;
        assert_eq!(printer.status().status, DeviceStatus::Error);

        printer.shutdown().await.unwrap();
        assert_eq!(printer.status().status, DeviceStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_query_status_serial_style_offline_bit() {
        let (mut printer, handle) = simulated();
        printer.initialize().await.unwrap();

        handle.push_read(vec![commands::STATUS_OFFLINE_BIT]);
        let report = printer.query_status().await.unwrap();
        assert_eq!(report.status, DeviceStatus::Warning);

        handle.push_read(vec![0x00]);
        let report = printer.query_status().await.unwrap();
        assert_eq!(report.status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn test_query_status_timeout_is_optimistic() {
        let (mut printer, _handle) = simulated();
        printer.initialize().await.unwrap();

        // No scripted read: behaves like a USB printer with no IN endpoint.
        let report = printer.query_status().await.unwrap();
        assert_eq!(report.status, DeviceStatus::Online);
    }

    #[test]
    fn test_columns_from_paper_width() {
        let config = PeripheralConfig::new("p", PeripheralKind::Printer, "simulated")
            .with_option("paper_width_mm", 80)
            .with_option("dpi", 203);
        let (printer, _) = EscPosPrinter::simulated(&config).unwrap();
        assert_eq!(printer.width_px(), 632);
        assert_eq!(printer.columns(), 52);
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let config = PeripheralConfig::new("p", PeripheralKind::Printer, "daruma");
        assert!(matches!(
            EscPosPrinter::new(&config),
            Err(PeripheralError::UnsupportedDriver { .. })
        ));
    }
}
