//! Messages between the UI and the session orchestrator, plus the status
//! banner model.
//!
//! ```text
//! UI ──SessionCommand──▶ SessionOrchestrator ──SessionMessage──▶ UI
//! ```
//!
//! Every `Start` carries a cycle number chosen by the UI.  The orchestrator
//! stamps each update with the cycle it belongs to, so the UI can drop
//! anything still queued from a cycle it has already abandoned.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::channel::ChannelState;
use crate::protocol::{CommentaryEvent, UploadReceipt};
use crate::upload::HealthStatus;

// ---------------------------------------------------------------------------
// StatusBanner
// ---------------------------------------------------------------------------

/// How a banner message is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    Success,
    Error,
    #[default]
    Neutral,
}

/// One message in the status area.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusBanner {
    pub message: String,
    pub kind: StatusKind,
}

impl StatusBanner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Error,
        }
    }

    /// Nothing to show.
    pub fn is_blank(&self) -> bool {
        self.message.is_empty()
    }
}

/// The status area: the current banner and when it was set.
///
/// A success banner reverts to a blank neutral one after the configured
/// delay, unless something newer replaced it first.  Error and neutral
/// banners stay until replaced.
#[derive(Debug, Clone)]
pub struct StatusLine {
    banner: StatusBanner,
    since: Instant,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            banner: StatusBanner::default(),
            since: Instant::now(),
        }
    }
}

impl StatusLine {
    pub fn banner(&self) -> &StatusBanner {
        &self.banner
    }

    pub fn set(&mut self, banner: StatusBanner, now: Instant) {
        self.banner = banner;
        self.since = now;
    }

    /// Revert an expired success banner.  Returns `true` if it changed.
    pub fn expire(&mut self, now: Instant, revert_after: Duration) -> bool {
        let expired = self.banner.kind == StatusKind::Success
            && now.saturating_duration_since(self.since) >= revert_after;
        if expired {
            self.banner = StatusBanner::default();
            self.since = now;
        }
        expired
    }

    /// Time left before a success banner reverts, for repaint scheduling.
    pub fn remaining(&self, now: Instant, revert_after: Duration) -> Option<Duration> {
        (self.banner.kind == StatusKind::Success)
            .then(|| revert_after.saturating_sub(now.saturating_duration_since(self.since)))
    }
}

// ---------------------------------------------------------------------------
// SessionCommand / SessionUpdate
// ---------------------------------------------------------------------------

/// Commands sent from the UI thread to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Tear down any running cycle, upload this file and open its channel.
    Start { path: PathBuf, cycle: u64 },
    /// Tear down the running cycle, if any.
    Stop,
    /// Query the backend's health endpoint.
    CheckHealth,
}

/// Progress delivered from the orchestrator to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Replace the status banner.
    Status(StatusBanner),
    /// A commentary line for the feed and the speaker.
    Commentary(CommentaryEvent),
    /// The channel state machine moved.
    ChannelState(ChannelState),
    /// The backend accepted an upload.
    JobAccepted(UploadReceipt),
    /// Result of a health check.
    Health(HealthStatus),
}

/// A [`SessionUpdate`] tagged with the cycle it was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMessage {
    pub cycle: u64,
    pub update: SessionUpdate,
}

impl SessionMessage {
    /// Whether the UI should apply this update while showing `current`.
    ///
    /// Health results describe the backend, not a cycle, and always apply.
    pub fn applies_to(&self, current: u64) -> bool {
        self.cycle == current || matches!(self.update, SessionUpdate::Health(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
