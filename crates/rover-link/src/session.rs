//! The link session: one duplex stream, its read loop, and its state.
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!      ^                        |                  |
//!      +----- fail/cancel ------+                  |
//!      +------ disconnect / read or write failure -+
//! ```
//!
//! Every transition is reported on the session's event channel exactly
//! once, in order, together with the inbound chunks. A connection is
//! identified by a generation number so a read loop or a stalled writer
//! from an earlier connection can never tear down a later one.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::connector::{BoxedStream, Connector};
use crate::error::LinkError;
use crate::types::{ConnectionState, LinkEvent, LinkEventRx, LinkEventTx};

type SharedWriter = Arc<tokio::sync::Mutex<WriteHalf<BoxedStream>>>;

enum SessionState {
    Disconnected {
        last_remote: Option<String>,
    },
    Connecting {
        remote_id: String,
        generation: u64,
        cancel: oneshot::Sender<()>,
    },
    Connected {
        remote_id: String,
        generation: u64,
        writer: SharedWriter,
        shutdown: oneshot::Sender<()>,
    },
}

impl SessionState {
    fn connection_state(&self) -> ConnectionState {
        match self {
            SessionState::Disconnected { .. } => ConnectionState::Disconnected,
            SessionState::Connecting { .. } => ConnectionState::Connecting,
            SessionState::Connected { .. } => ConnectionState::Connected,
        }
    }

    fn remote_id(&self) -> Option<&str> {
        match self {
            SessionState::Disconnected { last_remote } => last_remote.as_deref(),
            SessionState::Connecting { remote_id, .. } | SessionState::Connected { remote_id, .. } => {
                Some(remote_id)
            }
        }
    }

    fn generation(&self) -> Option<u64> {
        match self {
            SessionState::Disconnected { .. } => None,
            SessionState::Connecting { generation, .. } | SessionState::Connected { generation, .. } => {
                Some(*generation)
            }
        }
    }
}

struct Inner {
    connector: Arc<dyn Connector>,
    config: LinkConfig,
    state: Mutex<SessionState>,
    events: LinkEventTx,
    next_generation: AtomicU64,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold the state lock so events keep transition order.
    fn emit(&self, event: LinkEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.events.send(event);
    }

    fn emit_state(&self, state: ConnectionState, remote_id: Option<String>) {
        info!(
            "Link {} ({})",
            state,
            remote_id.as_deref().unwrap_or("-")
        );
        self.emit(LinkEvent::StateChanged { state, remote_id });
    }

    /// End connection `generation` if it is still the current one.
    ///
    /// Returns false when something else already ended it.
    fn teardown(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if state.generation() != Some(generation) {
            return false;
        }

        let remote_id = state.remote_id().map(str::to_string);
        let previous = std::mem::replace(
            &mut *state,
            SessionState::Disconnected {
                last_remote: remote_id.clone(),
            },
        );
        match previous {
            SessionState::Connected { shutdown, .. } => {
                let _ = shutdown.send(());
            }
            SessionState::Connecting { cancel, .. } => {
                let _ = cancel.send(());
            }
            SessionState::Disconnected { .. } => {}
        }

        self.emit_state(ConnectionState::Disconnected, remote_id);
        true
    }

    /// Forward one chunk, unless connection `generation` has ended.
    fn emit_inbound(&self, generation: u64, chunk: Bytes) -> bool {
        let state = self.lock_state();
        if state.generation() != Some(generation) {
            return false;
        }
        self.emit(LinkEvent::Inbound(chunk));
        true
    }
}

/// Handle to a link session. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct LinkSession {
    inner: Arc<Inner>,
}

impl LinkSession {
    /// Create a disconnected session and the receiving end of its events.
    pub fn new(connector: Arc<dyn Connector>, config: LinkConfig) -> (LinkSession, LinkEventRx) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            connector,
            config,
            state: Mutex::new(SessionState::Disconnected { last_remote: None }),
            events,
            next_generation: AtomicU64::new(1),
        };

        (
            LinkSession {
                inner: Arc::new(inner),
            },
            events_rx,
        )
    }

    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_state().connection_state()
    }

    /// Current device, or the last one while disconnected.
    pub fn remote_id(&self) -> Option<String> {
        self.inner.lock_state().remote_id().map(str::to_string)
    }

    /// Open the stream to `remote_id` and start the read loop.
    ///
    /// Only valid while disconnected. A concurrent [`LinkSession::disconnect`]
    /// aborts the attempt with [`LinkError::Cancelled`].
    pub async fn connect(&self, remote_id: &str) -> Result<(), LinkError> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut state = self.inner.lock_state();
            if !matches!(*state, SessionState::Disconnected { .. }) {
                warn!("Connect to {} refused: link is {}", remote_id, state.connection_state());
                return Err(LinkError::AlreadyConnected);
            }
            *state = SessionState::Connecting {
                remote_id: remote_id.to_string(),
                generation,
                cancel: cancel_tx,
            };
            self.inner
                .emit_state(ConnectionState::Connecting, Some(remote_id.to_string()));
        }

        let timeout = self.inner.config.connect_timeout();
        let attempt = tokio::time::timeout(timeout, self.inner.connector.connect(remote_id));

        let outcome = tokio::select! {
            res = attempt => match res {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(LinkError::DeviceUnreachable(e.to_string())),
                Err(_) => Err(LinkError::DeviceUnreachable(format!(
                    "no answer within {} ms",
                    timeout.as_millis()
                ))),
            },
            // Fires on an explicit cancel and when the sender is dropped.
            _ = cancel_rx => Err(LinkError::Cancelled),
        };

        let (reader, shutdown_rx) = {
            let mut state = self.inner.lock_state();
            let current = matches!(
                *state,
                SessionState::Connecting { generation: g, .. } if g == generation
            );

            let stream = match outcome {
                Ok(stream) if current => stream,
                Ok(_) => {
                    debug!("Connect to {} finished after being cancelled", remote_id);
                    return Err(LinkError::Cancelled);
                }
                Err(e) => {
                    error!("Connect to {} failed: {}", remote_id, e);
                    if current {
                        *state = SessionState::Disconnected {
                            last_remote: Some(remote_id.to_string()),
                        };
                        self.inner
                            .emit_state(ConnectionState::Disconnected, Some(remote_id.to_string()));
                    }
                    return Err(e);
                }
            };

            let (reader, writer) = tokio::io::split(stream);
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            *state = SessionState::Connected {
                remote_id: remote_id.to_string(),
                generation,
                writer: Arc::new(tokio::sync::Mutex::new(writer)),
                shutdown: shutdown_tx,
            };
            self.inner
                .emit_state(ConnectionState::Connected, Some(remote_id.to_string()));
            (reader, shutdown_rx)
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            run_read_loop(inner, reader, shutdown_rx, generation).await;
        });

        Ok(())
    }

    /// Write one payload.
    ///
    /// Concurrent writers are serialized; a payload is never interleaved
    /// with another. An I/O failure or timeout ends the connection.
    pub async fn write(&self, payload: &[u8]) -> Result<(), LinkError> {
        let (writer, generation) = {
            let state = self.inner.lock_state();
            match &*state {
                SessionState::Connected {
                    writer, generation, ..
                } => (writer.clone(), *generation),
                _ => return Err(LinkError::NotConnected),
            }
        };

        let result = {
            let mut guard = writer.lock().await;
            tokio::time::timeout(
                self.inner.config.write_timeout(),
                write_payload(&mut guard, payload),
            )
            .await
        };

        let reason = match result {
            Ok(Ok(())) => {
                debug!("Sent {} bytes", payload.len());
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "write blocked for more than {} ms",
                self.inner.config.write_timeout_ms
            ),
        };

        error!("Write failed: {}", reason);
        self.inner.teardown(generation);
        Err(LinkError::StreamClosed(reason))
    }

    /// Close the stream, or abandon a connect in progress.
    ///
    /// Idempotent: calling it while disconnected does nothing.
    pub fn disconnect(&self) {
        let generation = self.inner.lock_state().generation();
        match generation {
            Some(generation) => {
                self.inner.teardown(generation);
            }
            None => debug!("Disconnect requested while already disconnected"),
        }
    }
}

async fn write_payload(writer: &mut WriteHalf<BoxedStream>, payload: &[u8]) -> io::Result<()> {
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Read bounded chunks until the stream fails or the session tells us to
/// stop, forwarding each chunk as one event.
async fn run_read_loop(
    inner: Arc<Inner>,
    mut reader: ReadHalf<BoxedStream>,
    mut shutdown: oneshot::Receiver<()>,
    generation: u64,
) {
    let mut buf = vec![0u8; inner.config.read_chunk_size.max(1)];

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => break None,
            res = reader.read(&mut buf) => match res {
                Ok(0) => break Some("closed by peer".to_string()),
                Ok(n) => {
                    debug!("Read {} bytes", n);
                    if !inner.emit_inbound(generation, Bytes::copy_from_slice(&buf[..n])) {
                        break None;
                    }
                }
                Err(e) => break Some(e.to_string()),
            },
        }
    };

    match reason {
        Some(reason) => {
            if inner.teardown(generation) {
                warn!("Link lost: {}", reason);
            }
        }
        None => debug!("Read loop for connection {} stopped", generation),
    }
}
