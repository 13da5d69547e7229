//! TCP socket transport.
//!
//! Network thermal printers listen on a raw socket (conventionally port 9100)
//! and accept command bytes as-is. The transport applies its own deadline to
//! connect, write and read; it never relies on OS defaults.

use crate::error::{Result, TransportError};
use caixa_core::CoreError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// TCP transport to `host:port`.
#[derive(Debug)]
pub struct TcpTransport {
    addr: String,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a transport for `host:port`. Validates the address shape only;
    /// no I/O until [`connect`](Self::connect).
    pub fn new(addr: impl Into<String>, timeout: Duration) -> std::result::Result<Self, CoreError> {
        let addr = addr.into();
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| CoreError::config(format!("Malformed address '{addr}': expected host:port")))?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(CoreError::config(format!(
                "Malformed address '{addr}': expected host:port"
            )));
        }
        Ok(Self {
            addr,
            timeout,
            stream: None,
        })
    }

    /// Target address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl crate::Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| TransportError::timeout(self.timeout))??;
        stream.set_nodelay(true).ok();

        debug!(addr = %self.addr, "tcp transport connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::not_connected(self.addr.clone()))?;

        tokio::time::timeout(self.timeout, stream.write_all(bytes))
            .await
            .map_err(|_| TransportError::timeout(self.timeout))??;
        Ok(bytes.len())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::not_connected(self.addr.clone()))?;

        let mut buf = vec![0u8; 4096];
        let n = tokio::time::timeout(timeout, stream.read(&mut buf))
            .await
            .map_err(|_| TransportError::timeout(timeout))??;

        if n == 0 {
            return Err(TransportError::io("connection closed by peer"));
        }
        buf.truncate(n);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                // Already half-closed sockets are fine; close stays idempotent.
                warn!(addr = %self.addr, error = %e, "tcp shutdown failed");
            }
            debug!(addr = %self.addr, "tcp transport closed");
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
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_address_validation() {
        assert!(TcpTransport::new("192.168.0.50:9100", Duration::from_secs(1)).is_ok());
        assert!(TcpTransport::new("printer.local:9100", Duration::from_secs(1)).is_ok());
        assert!(TcpTransport::new("no-port-here", Duration::from_secs(1)).is_err());
        assert!(TcpTransport::new(":9100", Duration::from_secs(1)).is_err());
        assert!(TcpTransport::new("host:notaport", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_connect_write_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let mut transport =
            TcpTransport::new(addr.to_string(), Duration::from_secs(1)).unwrap();
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        // Connecting twice is a no-op.
        transport.connect().await.unwrap();

        let n = transport.write(&[0x1B, 0x40]).await.unwrap();
        assert_eq!(n, 2);
        transport.close().await.unwrap();
        assert!(!transport.is_connected());

        assert_eq!(server.await.unwrap(), vec![0x1B, 0x40]);
    }

    #[tokio::test]
    async fn test_write_before_connect() {
        let mut transport =
            TcpTransport::new("127.0.0.1:1".to_string(), Duration::from_secs(1)).unwrap();
        let err = transport.write(b"x").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Hold the connection open without ever writing.
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let mut transport =
            TcpTransport::new(addr.to_string(), Duration::from_secs(1)).unwrap();
        transport.connect().await.unwrap();

        let err = transport.read(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_close_idempotent_from_any_state() {
        let mut transport =
            TcpTransport::new("127.0.0.1:1".to_string(), Duration::from_secs(1)).unwrap();
        // Never connected; close twice must still succeed.
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }
}
