//! Session orchestrator: drives one upload cycle at a time.
//!
//! [`SessionOrchestrator`] owns the backend client and the live channel of
//! the current cycle.  It reacts to [`SessionCommand`]s from the UI and to
//! [`ChannelEvent`]s from the channel task, and reports everything back as
//! [`SessionMessage`]s stamped with the cycle they belong to.
//!
//! # Cycle flow
//!
//! ```text
//! SessionCommand::Start { path, cycle }
//!   └─▶ tear down previous channel (socket dropped, its events discarded)
//!         └─▶ "Uploading video..."
//!               ├─ Err → "Error uploading video: <e>"              [error]
//!               └─ Ok  → JobAccepted, "Video uploaded successfully! Processing..."
//!                     └─▶ spawn ChannelHandle
//!                           ├─ Opened         → "Connected! Waiting for commentary..."
//!                           ├─ Commentary     → forwarded
//!                           ├─ ServerError    → "Error: <msg>"                [error]
//!                           ├─ TransportError → "Connection error"            [error]
//!                           └─ Closed
//!                                ├─ Completed → "Processing complete!"
//!                                ├─ Dropped   → "Connection closed before processing finished" [error]
//!                                └─ Failed    → (already reported)
//! ```
//!
//! The upload is awaited inline, so a second `Start` sent while an upload is
//! in flight waits in the command queue until that upload has finished.
//! Commands are polled before channel events, and a new cycle number takes
//! effect before anything of the new cycle is reported.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::channel::{ChannelEvent, ChannelHandle, ChannelSettings, ChannelState, CloseKind};
use crate::upload::JobBackend;

use super::state::{SessionCommand, SessionMessage, SessionUpdate, StatusBanner};

/// Buffer between one channel task and the orchestrator.
const CHANNEL_EVENT_BUFFER: usize = 64;

pub const MSG_UPLOADING: &str = "Uploading video...";
pub const MSG_UPLOADED: &str = "Video uploaded successfully! Processing...";
pub const MSG_CONNECTED: &str = "Connected! Waiting for commentary...";
pub const MSG_CONNECTION_ERROR: &str = "Connection error";
pub const MSG_COMPLETE: &str = "Processing complete!";
pub const MSG_DROPPED: &str = "Connection closed before processing finished";

// ---------------------------------------------------------------------------
// ActiveCycle
// ---------------------------------------------------------------------------

/// The channel of the current cycle together with its event receiver.
///
/// Dropping it aborts the channel task and discards any events still
/// queued, so nothing from an old cycle reaches the UI.
struct ActiveCycle {
    handle: ChannelHandle,
    events: mpsc::Receiver<ChannelEvent>,
}

async fn next_event(active: &mut Option<ActiveCycle>) -> Option<ChannelEvent> {
    match active {
        Some(cycle) => cycle.events.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// SessionOrchestrator
// ---------------------------------------------------------------------------

/// Runs upload cycles on behalf of the UI.
///
/// Create with [`SessionOrchestrator::new`], then spawn [`run`](Self::run)
/// on the tokio runtime.
pub struct SessionOrchestrator {
    backend: Arc<dyn JobBackend>,
    channel: ChannelSettings,
    updates: mpsc::Sender<SessionMessage>,
    active: Option<ActiveCycle>,
    /// Cycle number of the most recent `Start`.
    cycle: u64,
}

impl SessionOrchestrator {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        channel: ChannelSettings,
        updates: mpsc::Sender<SessionMessage>,
    ) -> Self {
        Self {
            backend,
            channel,
            updates,
            active: None,
            cycle: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, then tear down the running cycle.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = next_event(&mut self.active) => match event {
                    Some(event) => self.handle_event(event).await,
                    // Channel task finished and dropped its sender.
                    None => self.active = None,
                },
            }
        }

        self.teardown();
        log::info!("session: command channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start { path, cycle } => self.start(path, cycle).await,
            SessionCommand::Stop => {
                if self.teardown() {
                    self.send(SessionUpdate::ChannelState(ChannelState::Disconnected))
                        .await;
                }
            }
            SessionCommand::CheckHealth => {
                let health = self.backend.health().await;
                log::info!("session: {}", health.label());
                self.send(SessionUpdate::Health(health)).await;
            }
        }
    }

    async fn start(&mut self, path: PathBuf, cycle: u64) {
        if self.teardown() {
            self.send(SessionUpdate::ChannelState(ChannelState::Disconnected))
                .await;
        }
        self.cycle = cycle;

        log::info!("session: cycle {cycle}: uploading {}", path.display());
        self.status(StatusBanner::success(MSG_UPLOADING)).await;

        let receipt = match self.backend.upload(&path).await {
            Ok(receipt) => receipt,
            Err(e) => {
                log::error!("session: upload of {} failed: {e}", path.display());
                self.status(StatusBanner::error(format!("Error uploading video: {e}")))
                    .await;
                return;
            }
        };

        let job_id = receipt.job_id.clone();
        log::info!("session: backend accepted job {job_id}");
        self.send(SessionUpdate::JobAccepted(receipt)).await;
        self.status(StatusBanner::success(MSG_UPLOADED)).await;

        let (tx, rx) = mpsc::channel(CHANNEL_EVENT_BUFFER);
        let handle = ChannelHandle::spawn(self.channel.clone(), job_id.clone(), tx);
        self.active = Some(ActiveCycle { handle, events: rx });

        // Informational only; the channel is the source of truth.
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.job_status(&job_id).await {
                Ok(status) => log::info!("session: job {job_id} status: {status}"),
                Err(e) => log::debug!("session: job {job_id} status unavailable: {e}"),
            }
        });
    }

    /// Drop the current cycle, if any.  Returns `true` if one was running.
    fn teardown(&mut self) -> bool {
        match self.active.take() {
            Some(cycle) => {
                cycle.handle.close();
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Channel event handler
    // -----------------------------------------------------------------------

    async fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::State(state) => {
                self.send(SessionUpdate::ChannelState(state)).await;
            }
            ChannelEvent::Opened => {
                self.status(StatusBanner::success(MSG_CONNECTED)).await;
            }
            ChannelEvent::Commentary(line) => {
                self.send(SessionUpdate::Commentary(line)).await;
            }
            ChannelEvent::Status { status, message } => {
                log::debug!(
                    "session: job status {status} {}",
                    message.as_deref().unwrap_or("")
                );
            }
            ChannelEvent::ServerError(error) => {
                self.status(StatusBanner::error(format!("Error: {error}")))
                    .await;
            }
            ChannelEvent::TransportError(reason) => {
                log::warn!("session: {reason}");
                self.status(StatusBanner::error(MSG_CONNECTION_ERROR)).await;
            }
            ChannelEvent::Closed(kind) => match kind {
                CloseKind::Completed => {
                    self.status(StatusBanner::success(MSG_COMPLETE)).await;
                }
                CloseKind::Dropped => {
                    self.status(StatusBanner::error(MSG_DROPPED)).await;
                }
                CloseKind::Failed => {}
            },
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn status(&self, banner: StatusBanner) {
        self.send(SessionUpdate::Status(banner)).await;
    }

    async fn send(&self, update: SessionUpdate) {
        let message = SessionMessage {
            cycle: self.cycle,
            update,
        };
        if self.updates.send(message).await.is_err() {
            log::debug!("session: UI has gone away, dropping update");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::channel::testing::{scripted_server, Script, Step};
    use crate::protocol::{JobId, UploadReceipt};
    use crate::session::state::StatusKind;
    use crate::upload::{HealthStatus, UploadError};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Hands out job ids in order; `fail_with` turns every upload into an
    /// HTTP error instead.
    struct MockBackend {
        jobs: Mutex<VecDeque<String>>,
        fail_with: Option<u16>,
        uploads: Mutex<Vec<PathBuf>>,
    }

    impl MockBackend {
        fn jobs(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                jobs: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
                fail_with: None,
                uploads: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                jobs: Mutex::new(VecDeque::new()),
                fail_with: Some(status),
                uploads: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobBackend for MockBackend {
        async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError> {
            self.uploads.lock().unwrap().push(path.to_path_buf());
            if let Some(code) = self.fail_with {
                return Err(UploadError::Status(code));
            }
            let id = self
                .jobs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(UploadError::MissingJobId)?;
            Ok(UploadReceipt {
                job_id: JobId::new(id),
                filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                size: Some(1024),
                message: None,
            })
        }

        async fn health(&self) -> HealthStatus {
            HealthStatus::Healthy
        }

        async fn job_status(&self, _job_id: &JobId) -> Result<String, UploadError> {
            Ok("processing".into())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Running {
        commands: mpsc::Sender<SessionCommand>,
        updates: mpsc::Receiver<SessionMessage>,
        task: tokio::task::JoinHandle<()>,
        seen: Vec<SessionMessage>,
    }

    fn spawn(backend: Arc<dyn JobBackend>, url: &str) -> Running {
        let settings = ChannelSettings {
            url: url.to_string(),
            announce_delay: Duration::from_millis(20),
            ready_status: "ready".into(),
            terminal_statuses: vec!["complete".into()],
        };
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (upd_tx, upd_rx) = mpsc::channel(64);
        let task = tokio::spawn(SessionOrchestrator::new(backend, settings, upd_tx).run(cmd_rx));
        Running {
            commands: cmd_tx,
            updates: upd_rx,
            task,
            seen: Vec::new(),
        }
    }

    impl Running {
        async fn send(&self, command: SessionCommand) {
            self.commands.send(command).await.unwrap();
        }

        /// Collect updates until one matches `done`.
        async fn until(&mut self, done: impl Fn(&SessionUpdate) -> bool) {
            let updates = &mut self.updates;
            let seen = &mut self.seen;
            tokio::time::timeout(Duration::from_secs(5), async {
                while let Some(message) = updates.recv().await {
                    let finished = done(&message.update);
                    seen.push(message);
                    if finished {
                        return;
                    }
                }
                panic!("update channel closed early");
            })
            .await
            .expect("expected update did not arrive");
        }

        /// Stop the orchestrator and return everything it reported.
        async fn shutdown(self) -> Vec<SessionMessage> {
            drop(self.commands);
            self.task.await.unwrap();
            self.seen
        }
    }

    fn start(path: &str, cycle: u64) -> SessionCommand {
        SessionCommand::Start {
            path: path.into(),
            cycle,
        }
    }

    fn updates(seen: &[SessionMessage]) -> Vec<SessionUpdate> {
        seen.iter().map(|m| m.update.clone()).collect()
    }

    fn is_status(message: &'static str) -> impl Fn(&SessionUpdate) -> bool {
        move |u| matches!(u, SessionUpdate::Status(b) if b.message == message)
    }

    fn banners(seen: &[SessionMessage]) -> Vec<StatusBanner> {
        seen.iter()
            .filter_map(|m| match &m.update {
                SessionUpdate::Status(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    fn lines(seen: &[SessionMessage]) -> Vec<String> {
        seen.iter()
            .filter_map(|m| match &m.update {
                SessionUpdate::Commentary(c) => Some(c.display_line()),
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn full_cycle_reports_progress_in_order() {
        let (url, server) = scripted_server(vec![Script::steps(vec![
            Step::send(r#"{"commentary":"Goal!","timestamp":95}"#),
            Step::send(r#"{"commentary":"What a strike"}"#),
            Step::Close,
        ])])
        .await;

        let mut run = spawn(MockBackend::jobs(&["abc123"]), &url);
        run.send(start("match.mp4", 1)).await;
        run.until(is_status(MSG_COMPLETE)).await;
        let seen = run.shutdown().await;
        let logs = server.await.unwrap();

        assert!(seen.iter().all(|m| m.cycle == 1));
        assert_eq!(logs[0].received, vec![r#"{"job_id":"abc123"}"#.to_string()]);
        assert_eq!(lines(&seen), vec!["[1:35] Goal!", "What a strike"]);
        assert_eq!(
            banners(&seen),
            vec![
                StatusBanner::success(MSG_UPLOADING),
                StatusBanner::success(MSG_UPLOADED),
                StatusBanner::success(MSG_CONNECTED),
                StatusBanner::success(MSG_COMPLETE),
            ]
        );
        let seen = updates(&seen);
        let accepted = seen
            .iter()
            .find_map(|u| match u {
                SessionUpdate::JobAccepted(r) => Some(r.job_id.as_str().to_string()),
                _ => None,
            })
            .expect("job accepted");
        assert_eq!(accepted, "abc123");
        assert!(seen.contains(&SessionUpdate::ChannelState(ChannelState::Streaming)));
    }

    #[tokio::test]
    async fn upload_failure_opens_no_channel() {
        let mut run = spawn(MockBackend::failing(500), "ws://127.0.0.1:1/ws/commentary");
        run.send(start("match.mp4", 1)).await;
        run.until(|u| matches!(u, SessionUpdate::Status(b) if b.kind == StatusKind::Error))
            .await;
        let seen = run.shutdown().await;

        assert_eq!(
            banners(&seen),
            vec![
                StatusBanner::success(MSG_UPLOADING),
                StatusBanner::error("Error uploading video: Upload failed (HTTP 500)"),
            ]
        );
        assert!(!updates(&seen)
            .iter()
            .any(|u| matches!(u, SessionUpdate::ChannelState(_) | SessionUpdate::JobAccepted(_))));
    }

    #[tokio::test]
    async fn new_start_tears_down_previous_channel() {
        let (url, server) = scripted_server(vec![
            Script::steps(vec![Step::send(r#"{"commentary":"first half"}"#)]),
            Script::steps(vec![
                Step::send(r#"{"commentary":"second half"}"#),
                Step::Close,
            ]),
        ])
        .await;

        let mut run = spawn(MockBackend::jobs(&["job-1", "job-2"]), &url);
        run.send(start("one.mp4", 1)).await;
        run.until(|u| matches!(u, SessionUpdate::Commentary(_))).await;

        run.send(start("two.mp4", 2)).await;
        run.until(is_status(MSG_COMPLETE)).await;
        let seen = run.shutdown().await;
        let logs = server.await.unwrap();

        assert!(logs[0].client_gone);
        assert_eq!(logs[0].received, vec![r#"{"job_id":"job-1"}"#.to_string()]);
        assert_eq!(logs[1].received, vec![r#"{"job_id":"job-2"}"#.to_string()]);
        assert_eq!(lines(&seen), vec!["first half", "second half"]);

        // Everything after the second upload starts belongs to cycle 2.
        let uploading = SessionUpdate::Status(StatusBanner::success(MSG_UPLOADING));
        let second = seen
            .iter()
            .position(|m| m.update == uploading && m.cycle == 2)
            .expect("second upload reported");
        assert!(seen[..second].iter().all(|m| m.cycle == 1));
        assert!(seen[second..].iter().all(|m| m.cycle == 2));

        let first_half: Vec<u64> = seen
            .iter()
            .filter(|m| matches!(&m.update, SessionUpdate::Commentary(c) if c.text == "first half"))
            .map(|m| m.cycle)
            .collect();
        assert_eq!(first_half, vec![1]);

        let completions: Vec<u64> = seen
            .iter()
            .filter(|m| m.update == SessionUpdate::Status(StatusBanner::success(MSG_COMPLETE)))
            .map(|m| m.cycle)
            .collect();
        assert_eq!(completions, vec![2]);
    }

    #[tokio::test]
    async fn stop_closes_the_live_channel() {
        let (url, server) = scripted_server(vec![Script::steps(vec![Step::send(
            r#"{"commentary":"Kick off"}"#,
        )])])
        .await;

        let mut run = spawn(MockBackend::jobs(&["abc123"]), &url);
        run.send(start("match.mp4", 1)).await;
        run.until(|u| matches!(u, SessionUpdate::Commentary(_))).await;

        run.send(SessionCommand::Stop).await;
        run.until(|u| *u == SessionUpdate::ChannelState(ChannelState::Disconnected))
            .await;
        let seen = run.shutdown().await;
        let logs = server.await.unwrap();

        assert!(logs[0].client_gone);
        assert_eq!(lines(&seen), vec!["Kick off"]);
        assert!(!banners(&seen).iter().any(|b| b.message == MSG_COMPLETE));
    }

    #[tokio::test]
    async fn stop_without_a_cycle_reports_nothing() {
        let mut run = spawn(MockBackend::jobs(&[]), "ws://127.0.0.1:1/ws/commentary");
        run.send(SessionCommand::Stop).await;
        run.send(SessionCommand::CheckHealth).await;
        run.until(|u| matches!(u, SessionUpdate::Health(_))).await;
        let seen = run.shutdown().await;

        assert_eq!(updates(&seen), vec![SessionUpdate::Health(HealthStatus::Healthy)]);
    }

    #[tokio::test]
    async fn server_error_is_shown_and_stream_continues() {
        let (url, server) = scripted_server(vec![Script::steps(vec![
            Step::send(r#"{"error":"bad frame"}"#),
            Step::send(r#"{"commentary":"Play resumes"}"#),
            Step::Close,
        ])])
        .await;

        let mut run = spawn(MockBackend::jobs(&["abc123"]), &url);
        run.send(start("match.mp4", 1)).await;
        run.until(is_status(MSG_COMPLETE)).await;
        let seen = run.shutdown().await;
        server.await.unwrap();

        assert!(banners(&seen).contains(&StatusBanner::error("Error: bad frame")));
        assert_eq!(lines(&seen), vec!["Play resumes"]);
    }

    #[tokio::test]
    async fn hangup_is_reported_as_dropped() {
        let (url, server) = scripted_server(vec![Script::steps(vec![
            Step::send(r#"{"commentary":"Into the box"}"#),
            Step::Hangup,
        ])])
        .await;

        let mut run = spawn(MockBackend::jobs(&["abc123"]), &url);
        run.send(start("match.mp4", 1)).await;
        run.until(is_status(MSG_DROPPED)).await;
        let seen = run.shutdown().await;
        server.await.unwrap();

        assert!(!banners(&seen).iter().any(|b| b.message == MSG_COMPLETE));
        assert_eq!(
            banners(&seen).last(),
            Some(&StatusBanner::error(MSG_DROPPED))
        );
    }

    #[tokio::test]
    async fn unreachable_channel_shows_connection_error() {
        let mut run = spawn(
            MockBackend::jobs(&["abc123"]),
            "ws://127.0.0.1:1/ws/commentary",
        );
        run.send(start("match.mp4", 1)).await;
        run.until(|u| *u == SessionUpdate::ChannelState(ChannelState::Closed))
            .await;
        let seen = run.shutdown().await;

        let shown = banners(&seen);
        assert!(shown.contains(&StatusBanner::error(MSG_CONNECTION_ERROR)));
        assert!(!shown.iter().any(|b| b.message == MSG_COMPLETE || b.message == MSG_DROPPED));
    }

    #[tokio::test]
    async fn health_check_is_forwarded() {
        let mut run = spawn(MockBackend::jobs(&[]), "ws://127.0.0.1:1/ws/commentary");
        run.send(SessionCommand::CheckHealth).await;
        run.until(|u| matches!(u, SessionUpdate::Health(_))).await;
        let seen = run.shutdown().await;

        assert_eq!(
            seen,
            vec![SessionMessage {
                cycle: 0,
                update: SessionUpdate::Health(HealthStatus::Healthy),
            }]
        );
    }
}
