//! Request/response correlation over the player's IPC stream.
//!
//! One background reader owns the read half of the stream. Each decoded
//! line is either a response, delivered to the slot registered under its
//! `request_id`, or an event, broadcast to subscribers. Writes go through
//! a queue drained by a writer task, so [`PlayerChannel::close`] never has
//! to wait on I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::endpoint;
use crate::error::{PlayerError, PlayerResult};
use crate::player::Player;
use crate::protocol::{self, Incoming, PlayerEvent, PropertyValue, Response};

/// How long a command waits for its response before the channel gives up.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_BUFFER: usize = 64;

/// Lifecycle of a channel. Commands are only accepted in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Ready,
    Closing,
}

type Slot = oneshot::Sender<PlayerResult<Response>>;

#[derive(Debug)]
struct Shared {
    state: Mutex<ChannelState>,
    pending: Mutex<HashMap<u64, Slot>>,
    outbox: Mutex<Option<mpsc::UnboundedSender<String>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<PlayerEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Mutex::new(ChannelState::Disconnected),
            pending: Mutex::new(HashMap::new()),
            outbox: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            events,
        }
    }

    fn state(&self) -> ChannelState {
        *lock(&self.state)
    }

    fn set_state(&self, next: ChannelState) {
        *lock(&self.state) = next;
    }

    /// Register a response slot. Holding the state lock while inserting
    /// means a concurrent shutdown either sees the slot or we see it closing.
    fn register(&self, id: u64, slot: Slot) -> PlayerResult<()> {
        let state = lock(&self.state);
        if *state != ChannelState::Ready {
            return Err(PlayerError::NotConnected);
        }
        lock(&self.pending).insert(id, slot);
        drop(state);
        Ok(())
    }

    fn forget(&self, id: u64) {
        lock(&self.pending).remove(&id);
    }

    fn send(&self, line: String) -> bool {
        lock(&self.outbox)
            .as_ref()
            .is_some_and(|outbox| outbox.send(line).is_ok())
    }

    fn resolve(&self, response: Response) {
        let slot = lock(&self.pending).remove(&response.request_id);
        match slot {
            Some(slot) => {
                slot.send(Ok(response)).ok();
            }
            None => log::debug!(
                "Dropping response for unknown request {}",
                response.request_id
            ),
        }
    }

    /// Tear the channel down and fail every waiting command. Idempotent.
    fn shutdown(&self) {
        {
            let mut state = lock(&self.state);
            if matches!(*state, ChannelState::Disconnected | ChannelState::Closing) {
                return;
            }
            *state = ChannelState::Closing;
        }

        lock(&self.outbox).take();
        let waiting: Vec<Slot> = lock(&self.pending).drain().map(|(_, slot)| slot).collect();
        if !waiting.is_empty() {
            log::debug!("Failing {} in-flight player command(s)", waiting.len());
        }
        for slot in waiting {
            slot.send(Err(PlayerError::ChannelClosed)).ok();
        }
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }

        self.set_state(ChannelState::Disconnected);
    }
}

/// A live connection to the player's control endpoint.
#[derive(Debug)]
pub struct PlayerChannel {
    shared: Arc<Shared>,
    endpoint: String,
    next_request_id: AtomicU64,
    next_observer_id: AtomicU64,
    timeout: Duration,
}

impl PlayerChannel {
    /// Connect with the default command timeout. An empty endpoint means
    /// the platform default.
    pub async fn connect(endpoint: &str) -> PlayerResult<Self> {
        Self::connect_with_timeout(endpoint, DEFAULT_COMMAND_TIMEOUT).await
    }

    pub async fn connect_with_timeout(endpoint: &str, timeout: Duration) -> PlayerResult<Self> {
        let endpoint = if endpoint.is_empty() {
            endpoint::default_endpoint()
        } else {
            endpoint.to_string()
        };

        let shared = Arc::new(Shared::new());
        shared.set_state(ChannelState::Connecting);

        let stream = match endpoint::open(&endpoint).await {
            Ok(stream) => stream,
            Err(source) => {
                shared.set_state(ChannelState::Disconnected);
                return Err(PlayerError::NoPlayer { endpoint, source });
            }
        };
        log::debug!("Connected to player at {endpoint}");

        let (read_half, write_half) = tokio::io::split(stream);
        let (outbox, queue) = mpsc::unbounded_channel();
        *lock(&shared.outbox) = Some(outbox);
        shared.set_state(ChannelState::Ready);

        let reader = tokio::spawn(read_loop(Arc::clone(&shared), read_half));
        let writer = tokio::spawn(write_loop(Arc::clone(&shared), write_half, queue));
        lock(&shared.tasks).extend([reader, writer]);

        Ok(Self {
            shared,
            endpoint,
            next_request_id: AtomicU64::new(1),
            next_observer_id: AtomicU64::new(1),
            timeout,
        })
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Receive spontaneous player events. Slow subscribers lose the oldest
    /// events rather than holding up responses.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    /// Ask the player to emit `property-change` events for `name`.
    /// Returns the observer id carried by those events.
    pub async fn observe_property(&self, name: &str) -> PlayerResult<u64> {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.command(vec![json!("observe_property"), json!(id), json!(name)])
            .await?;
        Ok(id)
    }

    /// Release the stream and fail any waiting command with
    /// [`PlayerError::ChannelClosed`]. Safe to call more than once and from
    /// any thread.
    pub fn close(&self) {
        if self.shared.state() != ChannelState::Disconnected {
            log::debug!("Closing player channel to {}", self.endpoint);
        }
        self.shared.shutdown();
    }

    async fn send_command(&self, args: Vec<Value>) -> PlayerResult<PropertyValue> {
        let name = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let line = protocol::encode(&args, id)?;

        let (slot, answer) = oneshot::channel();
        self.shared.register(id, slot)?;
        log::trace!("-> {}", line.trim_end());
        if !self.shared.send(line) {
            self.shared.forget(id);
            return Err(PlayerError::ChannelClosed);
        }

        let response = match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(PlayerError::ChannelClosed),
            Err(_) => {
                log::warn!(
                    "Player did not answer {name:?} within {:?}; closing channel",
                    self.timeout
                );
                self.shared.shutdown();
                return Err(PlayerError::Timeout {
                    command: name,
                    after: self.timeout,
                });
            }
        };

        if response.is_success() {
            Ok(PropertyValue::from(response.data))
        } else {
            Err(PlayerError::CommandFailed {
                command: name,
                message: response.error,
            })
        }
    }
}

impl Drop for PlayerChannel {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

#[async_trait]
impl Player for PlayerChannel {
    async fn command(&self, args: Vec<Value>) -> PlayerResult<PropertyValue> {
        self.send_command(args).await
    }
}

async fn read_loop<R>(shared: Arc<Shared>, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                log::trace!("<- {line}");
                match protocol::decode(&line) {
                    Ok(Some(Incoming::Response(response))) => shared.resolve(response),
                    Ok(Some(Incoming::Event(event))) => {
                        // No subscribers is not an error.
                        shared.events.send(event).ok();
                    }
                    Ok(None) => {}
                    Err(e) => break e.to_string(),
                }
            }
            Ok(None) => break "player closed the connection".to_string(),
            Err(e) => break format!("read failed: {e}"),
        }
    };
    log::debug!("Player reader stopped: {reason}");
    shared.shutdown();
}

async fn write_loop<W>(shared: Arc<Shared>, mut writer: W, mut queue: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            log::debug!("Player writer stopped: {e}");
            shared.shutdown();
            return;
        }
    }
    writer.shutdown().await.ok();
}
