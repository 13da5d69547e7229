//! Full scenarios a collaborator would drive: configure, initialize, use,
//! shut down.

use caixa_core::{
    ContentItem, DeviceStatus, LineStyle, PaymentMethod, PaymentRequest, PeripheralConfig,
    PeripheralKind, Receipt, Section, Symbology, TextStyle,
};
use caixa_hardware::{Peripheral, PeripheralError, PeripheralManager};
use std::time::Duration;

#[tokio::test]
async fn test_simulated_printer_full_session() {
    let manager = PeripheralManager::new();
    let controls = manager
        .add(&PeripheralConfig::new(
            "printer-1",
            PeripheralKind::Printer,
            "simulated",
        ))
        .await
        .unwrap();
    let tap = controls.printer_tap().unwrap().clone();

    manager.initialize("printer-1").await.unwrap();
    assert_eq!(
        manager.status("printer-1").await.unwrap().status,
        DeviceStatus::Online
    );

    let receipt = Receipt::new(
        "printer-1",
        vec![
            Section::new(vec![
                ContentItem::centered("LOJA EXEMPLO", TextStyle::title()),
                ContentItem::Line {
                    style: LineStyle::Dashed,
                },
            ]),
            Section::new(vec![
                ContentItem::text("1x Cafe ............ R$ 5,00"),
                ContentItem::Barcode {
                    value: "7891000315507".to_string(),
                    symbology: Symbology::Ean13,
                },
                ContentItem::QrCode {
                    value: "https://example.com/nota/123".to_string(),
                    size: 4,
                },
            ]),
        ],
    );

    let printer = manager.get("printer-1").await.unwrap();
    {
        let mut printer = printer.lock().await;
        printer.print_receipt(&receipt).await.unwrap();
        printer.cut_paper(true).await.unwrap();
    }
    assert_eq!(
        manager.status("printer-1").await.unwrap().status,
        DeviceStatus::Online
    );

    let written = tap.written();
    // Initialize sequence went out first.
    assert_eq!(&written[..2], &[0x1B, 0x40]);
    // The cut went out last.
    assert_eq!(&written[written.len() - 4..], &[0x1D, 0x56, 0x42, 0x00]);
    // Barcode and QR payloads are embedded in the stream.
    let stream = String::from_utf8_lossy(&written);
    assert!(stream.contains("7891000315507"));
    assert!(stream.contains("https://example.com/nota/123"));

    manager.shutdown("printer-1").await.unwrap();
    assert_eq!(
        manager.status("printer-1").await.unwrap().status,
        DeviceStatus::Disconnected
    );
}

#[tokio::test]
async fn test_cash_drawer_warning_then_auto_close() {
    let manager = PeripheralManager::new();
    manager
        .add(
            &PeripheralConfig::new("drawer-1", PeripheralKind::CashDrawer, "simulated")
                .with_option("auto_close_ms", 30),
        )
        .await
        .unwrap();
    manager.initialize("drawer-1").await.unwrap();

    let drawer = manager.get("drawer-1").await.unwrap();
    drawer.lock().await.open_cash_drawer().await.unwrap();
    assert_eq!(
        manager.status("drawer-1").await.unwrap().status,
        DeviceStatus::Warning
    );

    // The close must be visible on a plain status read, without a fleet
    // poll touching the device.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        manager.status("drawer-1").await.unwrap().status,
        DeviceStatus::Online
    );

    let snapshot = manager.check_all_status().await;
    assert_eq!(snapshot["drawer-1"].status, DeviceStatus::Online);
}

#[tokio::test]
async fn test_payment_terminal_session_with_receipt() {
    let manager = PeripheralManager::new();
    manager
        .add(
            &PeripheralConfig::new("terminal-1", PeripheralKind::PaymentTerminal, "simulated")
                .with_option("delay_ms", 5),
        )
        .await
        .unwrap();
    manager.initialize("terminal-1").await.unwrap();

    let terminal = manager.get("terminal-1").await.unwrap();
    let result = {
        let terminal = terminal.lock().await;
        terminal
            .process_payment(&PaymentRequest::new(PaymentMethod::Credit, 35_90))
            .await
            .unwrap()
    };
    assert!(result.success);

    let receipt = terminal
        .lock()
        .await
        .receipt_for(&result.transaction_id)
        .unwrap();
    assert!(receipt.item_count() > 0);

    // The settled receipt prints on a (different) printer.
    manager
        .add(&PeripheralConfig::new(
            "printer-1",
            PeripheralKind::Printer,
            "simulated",
        ))
        .await
        .unwrap();
    manager.initialize("printer-1").await.unwrap();
    let printer = manager.get("printer-1").await.unwrap();
    printer.lock().await.print_receipt(&receipt).await.unwrap();
}

#[tokio::test]
async fn test_capability_mismatch_through_manager() {
    let manager = PeripheralManager::new();
    manager
        .add(&PeripheralConfig::new(
            "terminal-1",
            PeripheralKind::PaymentTerminal,
            "simulated",
        ))
        .await
        .unwrap();
    manager.initialize("terminal-1").await.unwrap();

    let terminal = manager.get("terminal-1").await.unwrap();
    let err = terminal
        .lock()
        .await
        .print_text("not a printer")
        .await
        .unwrap_err();
    assert!(matches!(err, PeripheralError::Unsupported { .. }));
}

#[tokio::test]
async fn test_scanner_read_through_session_handle() {
    let manager = PeripheralManager::new();
    let controls = manager
        .add(&PeripheralConfig::new(
            "scanner-1",
            PeripheralKind::BarcodeReader,
            "simulated",
        ))
        .await
        .unwrap();

    // Direct reads instead of the event loop: add without initialize-spawned
    // loop competing for the scan.
    let scanner = manager.get("scanner-1").await.unwrap();
    scanner.lock().await.initialize().await.unwrap();

    controls.reader().unwrap().simulate_scan("789123456");
    let symbol = scanner
        .lock()
        .await
        .read_barcode(Duration::from_millis(200))
        .await
        .unwrap();
    assert_eq!(symbol.as_deref(), Some("789123456"));
}
