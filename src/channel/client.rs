//! WebSocket client for the live commentary channel.
//!
//! # Flow
//!
//! ```text
//! connect ws://…/ws/commentary                      [Connecting]
//!   └─▶ wait for {"status":"ready"} or the announce delay
//!         └─▶ send {"job_id": "<id>"}               [Announced]
//!               └─▶ first inbound frame             [Streaming]
//!                     ├─ commentary / status / error → ChannelEvent
//!                     ├─ malformed JSON → logged, skipped
//!                     └─ close frame / drop / error  [Closed]
//! ```
//!
//! [`run_channel`] drives one channel to completion and reports everything
//! as [`ChannelEvent`]s.  [`ChannelHandle`] runs it as a tokio task and
//! aborts that task when dropped.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::config::{BackendConfig, ChannelConfig};
use crate::protocol::{ChannelMessage, CommentaryEvent, JobAnnouncement, JobId, ProtocolError};

use super::state::{ChannelState, CloseKind};

/// How long to wait for our close frame to flush once the channel is over.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// ChannelError
// ---------------------------------------------------------------------------

/// Errors that end a channel early.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The WebSocket handshake failed.
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The job announcement could not be written.
    #[error("cannot send job announcement: {0}")]
    Send(String),

    /// The socket failed mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The announcement could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ---------------------------------------------------------------------------
// ChannelSettings
// ---------------------------------------------------------------------------

/// Everything one channel needs besides the job id.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Full WebSocket URL, including `/ws/commentary`.
    pub url: String,
    /// Longest wait between socket open and announcing the job id.
    pub announce_delay: Duration,
    /// `status` value that lets the announcement go out early.
    pub ready_status: String,
    /// `status` values that mark the job as finished.
    pub terminal_statuses: Vec<String>,
}

impl ChannelSettings {
    pub fn from_config(backend: &BackendConfig, channel: &ChannelConfig) -> Self {
        Self {
            url: backend.commentary_ws_url(),
            announce_delay: Duration::from_millis(channel.announce_delay_ms),
            ready_status: channel.ready_status.clone(),
            terminal_statuses: channel.terminal_statuses.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelEvent
// ---------------------------------------------------------------------------

/// Everything a channel reports to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The state machine moved.
    State(ChannelState),
    /// The WebSocket handshake completed.
    Opened,
    /// A commentary line arrived.
    Commentary(CommentaryEvent),
    /// A status frame arrived.
    Status {
        status: String,
        message: Option<String>,
    },
    /// The server reported an error; the channel stays open.
    ServerError(String),
    /// The transport failed; the channel is about to close.
    TransportError(String),
    /// Final event of every channel.
    Closed(CloseKind),
}

// ---------------------------------------------------------------------------
// run_channel
// ---------------------------------------------------------------------------

/// Connect, announce `job_id`, and stream until the channel ends.
///
/// Always finishes with `State(Closed)` followed by `Closed(kind)`, and
/// returns the same `kind`.  Events are dropped silently if the receiver has
/// gone away.
pub async fn run_channel(
    settings: ChannelSettings,
    job_id: JobId,
    events: mpsc::Sender<ChannelEvent>,
) -> CloseKind {
    let mut link = ChannelLink::new(&settings, events);

    let kind = match link.drive(&settings, &job_id).await {
        Ok(kind) => kind,
        Err(e) => {
            log::error!("channel: job {job_id}: {e}");
            link.emit(ChannelEvent::TransportError(e.to_string())).await;
            CloseKind::Failed
        }
    };

    log::info!("channel: job {job_id} ended ({kind:?})");
    link.set_state(ChannelState::Closed).await;
    link.emit(ChannelEvent::Closed(kind)).await;
    kind
}

/// What to do after one inbound frame.
enum Flow {
    Continue,
    /// The server signalled readiness; announce now.
    Ready,
    End(CloseKind),
}

/// Per-channel bookkeeping around the event sender.
struct ChannelLink {
    events: mpsc::Sender<ChannelEvent>,
    state: ChannelState,
    terminal_seen: bool,
    ready_status: String,
    terminal_statuses: Vec<String>,
}

impl ChannelLink {
    fn new(settings: &ChannelSettings, events: mpsc::Sender<ChannelEvent>) -> Self {
        Self {
            events,
            state: ChannelState::Disconnected,
            terminal_seen: false,
            ready_status: settings.ready_status.clone(),
            terminal_statuses: settings.terminal_statuses.clone(),
        }
    }

    async fn drive(
        &mut self,
        settings: &ChannelSettings,
        job_id: &JobId,
    ) -> Result<CloseKind, ChannelError> {
        self.set_state(ChannelState::Connecting).await;
        log::info!("channel: connecting to {} for job {job_id}", settings.url);

        let (socket, _response) =
            connect_async(settings.url.as_str())
                .await
                .map_err(|e| ChannelError::Connect {
                    url: settings.url.clone(),
                    reason: e.to_string(),
                })?;
        self.emit(ChannelEvent::Opened).await;

        let (mut sink, mut stream) = socket.split();

        // ── Handshake: readiness or deadline, whichever comes first ──────
        let deadline = tokio::time::sleep(settings.announce_delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                frame = stream.next() => match self.handle_frame(frame).await? {
                    Flow::Continue => {}
                    Flow::Ready => {
                        log::debug!("channel: server ready before deadline");
                        break;
                    }
                    Flow::End(kind) => {
                        let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
                        return Ok(kind);
                    }
                },
            }
        }

        // ── Announce ─────────────────────────────────────────────────────
        let payload = JobAnnouncement::new(job_id).to_json()?;
        log::info!("channel: announcing {payload}");
        sink.send(Message::Text(payload))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        self.set_state(ChannelState::Announced).await;

        // ── Stream ───────────────────────────────────────────────────────
        let kind = loop {
            let frame = stream.next().await;
            match self.handle_frame(frame).await? {
                Flow::Continue | Flow::Ready => {}
                Flow::End(kind) => break kind,
            }
        };

        let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
        Ok(kind)
    }

    async fn handle_frame(
        &mut self,
        frame: Option<Result<Message, tungstenite::Error>>,
    ) -> Result<Flow, ChannelError> {
        match frame {
            None => Ok(Flow::End(self.end_without_close())),
            Some(Err(e)) if is_disconnect(&e) => {
                log::warn!("channel: socket went away: {e}");
                Ok(Flow::End(self.end_without_close()))
            }
            Some(Err(e)) => Err(ChannelError::Transport(e.to_string())),
            Some(Ok(Message::Text(text))) => {
                if self.state == ChannelState::Announced {
                    self.set_state(ChannelState::Streaming).await;
                }
                Ok(self.dispatch(&text).await)
            }
            Some(Ok(Message::Close(frame))) => {
                log::info!("channel: server closed the channel ({frame:?})");
                Ok(Flow::End(CloseKind::Completed))
            }
            Some(Ok(_)) => Ok(Flow::Continue),
        }
    }

    async fn dispatch(&mut self, raw: &str) -> Flow {
        log::debug!("channel: received {raw}");

        let message = match ChannelMessage::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("channel: skipping frame: {e}");
                return Flow::Continue;
            }
        };

        match message {
            ChannelMessage::Commentary(event) => {
                self.emit(ChannelEvent::Commentary(event)).await;
                Flow::Continue
            }
            ChannelMessage::Status { status, message } => {
                log::info!(
                    "channel: status {status}: {}",
                    message.as_deref().unwrap_or("")
                );
                let ready = self.state == ChannelState::Connecting && status == self.ready_status;
                if self.terminal_statuses.contains(&status) {
                    self.terminal_seen = true;
                }
                self.emit(ChannelEvent::Status { status, message }).await;
                if ready {
                    Flow::Ready
                } else {
                    Flow::Continue
                }
            }
            ChannelMessage::Error { error } => {
                log::error!("channel: server error: {error}");
                self.emit(ChannelEvent::ServerError(error)).await;
                Flow::Continue
            }
            ChannelMessage::Unrecognized => {
                log::debug!("channel: ignoring unrecognised frame");
                Flow::Continue
            }
        }
    }

    fn end_without_close(&self) -> CloseKind {
        if self.terminal_seen {
            CloseKind::Completed
        } else {
            CloseKind::Dropped
        }
    }

    async fn set_state(&mut self, state: ChannelState) {
        if self.state != state {
            self.state = state;
            self.emit(ChannelEvent::State(state)).await;
        }
    }

    async fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event).await;
    }
}

/// Errors that mean "the peer went away" rather than "the transport broke".
fn is_disconnect(e: &tungstenite::Error) -> bool {
    use std::io::ErrorKind;
    use tungstenite::error::ProtocolError;

    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        tungstenite::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::UnexpectedEof
                | ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// ChannelHandle
// ---------------------------------------------------------------------------

/// Owned handle to a running channel task.
///
/// Dropping the handle aborts the task, which drops the socket.  Only one
/// handle should exist per upload cycle.
pub struct ChannelHandle {
    job_id: JobId,
    task: JoinHandle<CloseKind>,
}

impl ChannelHandle {
    /// Spawn [`run_channel`] on the current tokio runtime.
    pub fn spawn(
        settings: ChannelSettings,
        job_id: JobId,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        let task = tokio::spawn(run_channel(settings, job_id.clone(), events));
        Self { job_id, task }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Tear the channel down now.
    pub fn close(self) {
        log::info!("channel: tearing down channel for job {}", self.job_id);
        drop(self);
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
