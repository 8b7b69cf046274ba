//! Serialized command channel
//!
//! Owns the serial transport and enforces at most one in-flight
//! request/response exchange on the half-duplex bus. Any number of callers
//! may submit concurrently; a capacity-1 gate linearizes them. A per-call
//! timeout is raced against a session-wide cancellation, so `close()`
//! unblocks every pending caller promptly.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use serde::{Deserialize, Serialize};

use super::{frame, serial, ChannelError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, POLL_INTERVAL};

/// Byte-oriented transport the channel drives
///
/// The real bus is a [`tokio_serial::SerialStream`]; tests and demo mode
/// substitute in-memory pipes.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Boxed transport handle
pub type DynTransport = Box<dyn Transport>;

/// Channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Default response timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ChannelConfig {
    /// Default timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Serialized command channel over one serial transport
///
/// The channel has-a transport; the raw port is never reachable around the
/// gate. Closing is terminal: create a new channel to reconnect.
pub struct CommandChannel {
    writer: Mutex<WriteHalf<DynTransport>>,
    gate: Semaphore,
    cancel: CancellationToken,
    latest: Arc<Mutex<Option<Vec<u8>>>>,
    listener: JoinHandle<()>,
}

impl CommandChannel {
    /// Open the serial port named in `config` and start the listener
    pub fn open(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let port = serial::open_port(&config.port_name, config.baud_rate)?;
        Ok(Self::with_transport(Box::new(port)))
    }

    /// Build a channel over an already-open transport
    pub fn with_transport(transport: DynTransport) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        let cancel = CancellationToken::new();
        let latest = Arc::new(Mutex::new(None));
        let listener = tokio::spawn(listen(reader, Arc::clone(&latest), cancel.clone()));

        Self {
            writer: Mutex::new(writer),
            gate: Semaphore::new(1),
            cancel,
            latest,
            listener,
        }
    }

    /// Send `request` and wait for the next complete response frame
    ///
    /// Callers suspend until the bus is free, then until a response arrives,
    /// `timeout` expires, or the channel is closed. The gate is released on
    /// every exit path.
    pub async fn send_and_receive(
        &self,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        // Wait for any in-flight exchange to finish.
        let _permit = tokio::select! {
            permit = self.gate.acquire() => permit.map_err(|_| ChannelError::Canceled)?,
            _ = self.cancel.cancelled() => return Err(ChannelError::Canceled),
        };

        // Drop any frame left over from a previous exchange so the poll loop
        // below cannot return a stale response for this request.
        self.latest.lock().await.take();

        {
            let mut writer = self.writer.lock().await;
            writer.write_all(request).await?;
            writer.flush().await?;
        }
        debug!(len = request.len(), "request written");

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(response) = self.latest.lock().await.take() {
                debug!(len = response.len(), "response captured");
                return Ok(response);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ChannelError::Timeout);
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ChannelError::Canceled),
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Cancel every pending call and stop the listener. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
        self.gate.close();
        self.listener.abort();
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background listener: accumulate incoming bytes and cut complete frames
///
/// The wire has no delimiter, but the response length is fixed once the
/// byte-count field is in hand, so frames are cut at that boundary rather
/// than trusting arrival timing.
async fn listen(
    mut reader: ReadHalf<DynTransport>,
    latest: Arc<Mutex<Option<Vec<u8>>>>,
    cancel: CancellationToken,
) {
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; 256];

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => return,
            res = reader.read(&mut buf) => match res {
                Ok(0) => {
                    debug!("transport closed by peer");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("serial read failed: {e}");
                    return;
                }
            },
        };
        pending.extend_from_slice(&buf[..n]);

        while pending.len() >= 3 {
            let need = frame::response_len(pending[2]);
            if pending.len() < need {
                break;
            }
            let complete: Vec<u8> = pending.drain(..need).collect();
            debug!(len = complete.len(), "frame received");
            *latest.lock().await = Some(complete);
        }
    }
}
