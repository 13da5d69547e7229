//! USB bulk-endpoint transport.
//!
//! Resolves a device by vendor/product id (hex `vid:pid`) or by explicit
//! decimal `bus:address`, claims the first interface exposing a bulk-OUT
//! endpoint, and streams command bytes through it. libusb calls are blocking,
//! so they run on the blocking pool with the device handle behind an `Arc`.
//!
//! Reads are best-effort: many USB printers expose no usable bulk-IN
//! endpoint, and when none is found `read` reports a timeout rather than an
//! error. Drivers treat USB status as optimistic.

use crate::error::{Result, TransportError};
use caixa_core::CoreError;
use rusb::{Direction, GlobalContext, TransferType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How a USB device is selected from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbSelector {
    /// Vendor and product id, parsed from hex `vid:pid` (e.g. `04b8:0202`).
    VidPid { vid: u16, pid: u16 },

    /// Bus number and device address, parsed from decimal `bus:address`.
    BusAddress { bus: u8, address: u8 },
}

impl UsbSelector {
    /// Parse a selector from its textual address form. Four-hex-digit halves
    /// mean `vid:pid`; anything else is tried as decimal `bus:address`.
    pub fn parse(addr: &str) -> std::result::Result<Self, CoreError> {
        let (left, right) = addr.split_once(':').ok_or_else(|| {
            CoreError::config(format!("Malformed USB address '{addr}': expected vid:pid or bus:address"))
        })?;

        if left.len() == 4 && right.len() == 4 {
            if let (Ok(vid), Ok(pid)) =
                (u16::from_str_radix(left, 16), u16::from_str_radix(right, 16))
            {
                return Ok(Self::VidPid { vid, pid });
            }
        }

        match (left.parse::<u8>(), right.parse::<u8>()) {
            (Ok(bus), Ok(address)) => Ok(Self::BusAddress { bus, address }),
            _ => Err(CoreError::config(format!(
                "Malformed USB address '{addr}': expected vid:pid or bus:address"
            ))),
        }
    }
}

/// Claimed endpoints of an open device.
#[derive(Debug)]
struct UsbChannel {
    handle: Arc<rusb::DeviceHandle<GlobalContext>>,
    interface: u8,
    endpoint_out: u8,
    endpoint_in: Option<u8>,
}

/// USB transport over a claimed bulk-OUT endpoint.
#[derive(Debug)]
pub struct UsbTransport {
    selector: UsbSelector,
    timeout: Duration,
    channel: Option<UsbChannel>,
}

impl UsbTransport {
    /// Create a transport from a textual USB address. No I/O until
    /// [`connect`](Self::connect).
    pub fn new(addr: &str, timeout: Duration) -> std::result::Result<Self, CoreError> {
        Ok(Self {
            selector: UsbSelector::parse(addr)?,
            timeout,
            channel: None,
        })
    }

    /// Device selector in use.
    pub fn selector(&self) -> UsbSelector {
        self.selector
    }

    fn open_channel(selector: UsbSelector) -> Result<UsbChannel> {
        let devices = rusb::devices()?;
        let device = devices
            .iter()
            .find(|d| match selector {
                UsbSelector::VidPid { vid, pid } => d
                    .device_descriptor()
                    .map(|desc| desc.vendor_id() == vid && desc.product_id() == pid)
                    .unwrap_or(false),
                UsbSelector::BusAddress { bus, address } => {
                    d.bus_number() == bus && d.address() == address
                }
            })
            .ok_or_else(|| TransportError::not_found(format!("USB device {selector:?}")))?;

        let handle = device.open()?;
        handle.set_auto_detach_kernel_driver(true).ok();

        let config = device.active_config_descriptor()?;
        for interface in config.interfaces() {
            for descriptor in interface.descriptors() {
                let mut out_ep = None;
                let mut in_ep = None;
                for endpoint in descriptor.endpoint_descriptors() {
                    if endpoint.transfer_type() == TransferType::Bulk {
                        match endpoint.direction() {
                            Direction::Out => out_ep = Some(endpoint.address()),
                            Direction::In => in_ep = Some(endpoint.address()),
                        }
                    }
                }
                if let Some(endpoint_out) = out_ep {
                    let number = descriptor.interface_number();
                    handle.claim_interface(number)?;
                    return Ok(UsbChannel {
                        handle: Arc::new(handle),
                        interface: number,
                        endpoint_out,
                        endpoint_in: in_ep,
                    });
                }
            }
        }

        Err(TransportError::not_found(format!(
            "no bulk-OUT endpoint on USB device {selector:?}"
        )))
    }
}

impl crate::Transport for UsbTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let selector = self.selector;
        let channel = tokio::task::spawn_blocking(move || Self::open_channel(selector))
            .await
            .map_err(|e| TransportError::io(format!("usb open task failed: {e}")))??;

        debug!(
            selector = ?self.selector,
            endpoint_out = channel.endpoint_out,
            endpoint_in = ?channel.endpoint_in,
            "usb transport connected"
        );
        self.channel = Some(channel);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let channel = self
            .channel
            .as_ref()
            .ok_or_else(|| TransportError::not_connected(format!("{:?}", self.selector)))?;

        let handle = Arc::clone(&channel.handle);
        let endpoint = channel.endpoint_out;
        let timeout = self.timeout;
        let data = bytes.to_vec();

        let written = tokio::task::spawn_blocking(move || {
            let mut offset = 0;
            while offset < data.len() {
                offset += handle.write_bulk(endpoint, &data[offset..], timeout)?;
            }
            Ok::<usize, rusb::Error>(data.len())
        })
        .await
        .map_err(|e| TransportError::io(format!("usb write task failed: {e}")))??;

        Ok(written)
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let channel = self
            .channel
            .as_ref()
            .ok_or_else(|| TransportError::not_connected(format!("{:?}", self.selector)))?;

        // No IN endpoint: report a timeout, not a failure (status is
        // best-effort on USB printers).
        let Some(endpoint) = channel.endpoint_in else {
            return Err(TransportError::timeout(timeout));
        };

        let handle = Arc::clone(&channel.handle);
        let bytes = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; 64];
            let n = handle.read_bulk(endpoint, &mut buf, timeout)?;
            buf.truncate(n);
            Ok::<Vec<u8>, rusb::Error>(buf)
        })
        .await
        .map_err(|e| TransportError::io(format!("usb read task failed: {e}")))??;

        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            let handle = Arc::clone(&channel.handle);
            let interface = channel.interface;
            let released = tokio::task::spawn_blocking(move || handle.release_interface(interface))
                .await;
            if let Ok(Err(e)) = released {
                warn!(selector = ?self.selector, error = %e, "usb interface release failed");
            }
            debug!(selector = ?self.selector, "usb transport closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.channel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transport;

    #[test]
    fn test_selector_parse_vid_pid() {
        assert_eq!(
            UsbSelector::parse("04b8:0202").unwrap(),
            UsbSelector::VidPid {
                vid: 0x04B8,
                pid: 0x0202
            }
        );
    }

    #[test]
    fn test_selector_parse_bus_address() {
        assert_eq!(
            UsbSelector::parse("3:12").unwrap(),
            UsbSelector::BusAddress {
                bus: 3,
                address: 12
            }
        );
    }

    #[test]
    fn test_selector_parse_invalid() {
        assert!(UsbSelector::parse("noseparator").is_err());
        assert!(UsbSelector::parse("zz:yy").is_err());
        assert!(UsbSelector::parse("300:12").is_err());
    }

    #[tokio::test]
    async fn test_io_before_connect() {
        let mut transport = UsbTransport::new("04b8:0202", Duration::from_millis(100)).unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(b"x").await.unwrap_err(),
            TransportError::NotConnected(_)
        ));
        // Close from the never-connected state stays idempotent.
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }
}
