//! Serial port transport.
//!
//! Opens a serial device path with configurable baud rate, parity and stop
//! bits. Serial printers are the only family that reliably answers status
//! queries, so `read` here is a real read, unlike the USB best-effort path.

use crate::error::{Result, TransportError};
use caixa_core::{CoreError, PeripheralConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// Serial transport over a device path such as `/dev/ttyUSB0`.
#[derive(Debug)]
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    parity: Parity,
    stop_bits: StopBits,
    timeout: Duration,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Create a transport with explicit line settings.
    pub fn new(
        path: impl Into<String>,
        baud_rate: u32,
        parity: Parity,
        stop_bits: StopBits,
        timeout: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            parity,
            stop_bits,
            timeout,
            stream: None,
        }
    }

    /// Create a transport from a configuration's options map.
    ///
    /// Options: `baud_rate` (default 9600), `parity` (`none`/`even`/`odd`),
    /// `stop_bits` (`1`/`2`).
    pub fn from_options(
        path: &str,
        config: &PeripheralConfig,
        timeout: Duration,
    ) -> std::result::Result<Self, CoreError> {
        let baud_rate = config.opt_u32("baud_rate", 9600)?;

        let parity = match config.opt_str("parity", "none")?.as_str() {
            "none" => Parity::None,
            "even" => Parity::Even,
            "odd" => Parity::Odd,
            other => {
                return Err(CoreError::invalid_option(
                    "parity",
                    format!("expected none/even/odd, got {other}"),
                ));
            }
        };

        let stop_bits = match config.opt_u32("stop_bits", 1)? {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => {
                return Err(CoreError::invalid_option(
                    "stop_bits",
                    format!("expected 1 or 2, got {other}"),
                ));
            }
        };

        Ok(Self::new(path, baud_rate, parity, stop_bits, timeout))
    }

    /// Device path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl crate::Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .data_bits(DataBits::Eight)
            .timeout(self.timeout)
            .open_native_async()?;

        debug!(path = %self.path, baud = self.baud_rate, "serial transport connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::not_connected(self.path.clone()))?;

        tokio::time::timeout(self.timeout, stream.write_all(bytes))
            .await
            .map_err(|_| TransportError::timeout(self.timeout))??;
        Ok(bytes.len())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::not_connected(self.path.clone()))?;

        let mut buf = vec![0u8; 256];
        let n = tokio::time::timeout(timeout, stream.read(&mut buf))
            .await
            .map_err(|_| TransportError::timeout(timeout))??;
        buf.truncate(n);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<()> {
        if self.stream.take().is_some() {
            debug!(path = %self.path, "serial transport closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transport;
    use caixa_core::{ConnectionType, PeripheralKind};

    fn config_with(options: &[(&str, serde_json::Value)]) -> PeripheralConfig {
        let mut config = PeripheralConfig::new("p1", PeripheralKind::Printer, "elgin")
            .with_connection(ConnectionType::Serial)
            .with_device_path("/dev/ttyUSB0");
        for (key, value) in options {
            config = config.with_option(*key, value.clone());
        }
        config
    }

    #[test]
    fn test_from_options_defaults() {
        let config = config_with(&[]);
        let transport =
            SerialTransport::from_options("/dev/ttyUSB0", &config, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.baud_rate, 9600);
        assert_eq!(transport.parity, Parity::None);
        assert_eq!(transport.stop_bits, StopBits::One);
    }

    #[test]
    fn test_from_options_explicit() {
        let config = config_with(&[
            ("baud_rate", 115200.into()),
            ("parity", "odd".into()),
            ("stop_bits", 2.into()),
        ]);
        let transport =
            SerialTransport::from_options("/dev/ttyUSB0", &config, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.baud_rate, 115200);
        assert_eq!(transport.parity, Parity::Odd);
        assert_eq!(transport.stop_bits, StopBits::Two);
    }

    #[test]
    fn test_from_options_invalid() {
        let config = config_with(&[("stop_bits", 3.into())]);
        assert!(
            SerialTransport::from_options("/dev/ttyUSB0", &config, Duration::from_secs(1)).is_err()
        );
    }

    #[tokio::test]
    async fn test_missing_device_not_found() {
        let mut transport = SerialTransport::new(
            "/dev/ttyNOPE99",
            9600,
            Parity::None,
            StopBits::One,
            Duration::from_millis(100),
        );
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::NotFound(_) | TransportError::Io(_)
        ));
        // Close from the failed state is still fine.
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_io_before_connect() {
        let mut transport = SerialTransport::new(
            "/dev/ttyUSB0",
            9600,
            Parity::None,
            StopBits::One,
            Duration::from_millis(100),
        );
        assert!(matches!(
            transport.write(b"x").await.unwrap_err(),
            TransportError::NotConnected(_)
        ));
        assert!(matches!(
            transport.read(Duration::from_millis(10)).await.unwrap_err(),
            TransportError::NotConnected(_)
        ));
    }
}
