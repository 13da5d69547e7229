//! In-memory transport for simulated devices and tests.
//!
//! The transport half implements [`Transport`](crate::Transport); the control
//! handle lets a test (or a simulated driver) inspect everything that was
//! written, script read responses and inject failures. Both halves share the
//! same state, so assertions see writes immediately.

use crate::error::{Result, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    written: Vec<u8>,
    reads: VecDeque<Vec<u8>>,
    fail_connect: bool,
    fail_writes: bool,
    fail_close: bool,
}

/// Mock transport half.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Control handle for a [`MockTransport`].
///
/// # Examples
///
/// ```
/// use caixa_transport::{MockTransport, Transport};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut transport, handle) = MockTransport::new();
/// transport.connect().await.unwrap();
/// transport.write(&[0x1B, 0x40]).await.unwrap();
///
/// assert_eq!(handle.written(), vec![0x1B, 0x40]);
///
/// handle.push_read(vec![0x12]);
/// let status = transport.read(Duration::from_millis(10)).await.unwrap();
/// assert_eq!(status, vec![0x12]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport/handle pair.
    pub fn new() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockTransportHandle { state },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new().0
    }
}

impl crate::Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.fail_connect {
            return Err(TransportError::not_found("mock device unplugged"));
        }
        state.connected = true;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::not_connected("mock transport"));
        }
        if state.fail_writes {
            return Err(TransportError::io("mock write failure"));
        }
        state.written.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::not_connected("mock transport"));
        }
        match state.reads.pop_front() {
            Some(bytes) => Ok(bytes),
            None => Err(TransportError::timeout(timeout)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.connected = false;
        if state.fail_close {
            return Err(TransportError::io("mock close failure"));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

impl MockTransportHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Clear the write capture.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// Queue bytes for the next `read` call.
    pub fn push_read(&self, bytes: Vec<u8>) {
        self.lock().reads.push_back(bytes);
    }

    /// Make subsequent `connect` calls fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Make subsequent `write` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make subsequent `close` calls fail (the transport still disconnects).
    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Whether the transport half is currently connected.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transport;

    #[tokio::test]
    async fn test_write_capture() {
        let (mut transport, handle) = MockTransport::new();
        transport.connect().await.unwrap();
        transport.write(b"ab").await.unwrap();
        transport.write(b"cd").await.unwrap();
        assert_eq!(handle.written(), b"abcd");
    }

    #[tokio::test]
    async fn test_scripted_reads_then_timeout() {
        let (mut transport, handle) = MockTransport::new();
        transport.connect().await.unwrap();
        handle.push_read(vec![1]);
        handle.push_read(vec![2]);

        assert_eq!(transport.read(Duration::from_millis(1)).await.unwrap(), vec![1]);
        assert_eq!(transport.read(Duration::from_millis(1)).await.unwrap(), vec![2]);
        assert!(matches!(
            transport.read(Duration::from_millis(1)).await.unwrap_err(),
            TransportError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let (mut transport, handle) = MockTransport::new();
        handle.set_fail_connect(true);
        assert!(transport.connect().await.is_err());

        handle.set_fail_connect(false);
        transport.connect().await.unwrap();

        handle.set_fail_writes(true);
        assert!(matches!(
            transport.write(b"x").await.unwrap_err(),
            TransportError::Io(_)
        ));
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let (mut transport, handle) = MockTransport::new();
        transport.connect().await.unwrap();
        assert!(handle.is_connected());
        transport.close().await.unwrap();
        assert!(!handle.is_connected());
        // Idempotent.
        transport.close().await.unwrap();
        assert!(transport.write(b"x").await.is_err());
    }
}
