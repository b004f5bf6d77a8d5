//! Live channel state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting
//!              ──job id sent──▶ Announced
//!              ──first inbound frame──▶ Streaming
//! any state ──close / drop / transport error──▶ Closed
//! ```

/// Phase of one live commentary channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No channel for the current cycle.
    Disconnected,
    /// Socket opening or open, job id not yet announced.
    Connecting,
    /// Job id sent, nothing received since.
    Announced,
    /// Frames are arriving for the announced job.
    Streaming,
    /// The channel has ended; no more frames will be processed.
    Closed,
}

impl ChannelState {
    /// `true` while the channel can still deliver commentary.
    ///
    /// ```
    /// use match_commentator::channel::ChannelState;
    ///
    /// assert!(!ChannelState::Disconnected.is_open());
    /// assert!(ChannelState::Connecting.is_open());
    /// assert!(ChannelState::Streaming.is_open());
    /// assert!(!ChannelState::Closed.is_open());
    /// ```
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ChannelState::Connecting | ChannelState::Announced | ChannelState::Streaming
        )
    }

    /// Short label for the UI status bar.
    pub fn label(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "Disconnected",
            ChannelState::Connecting => "Connecting",
            ChannelState::Announced => "Waiting for commentary",
            ChannelState::Streaming => "Live",
            ChannelState::Closed => "Closed",
        }
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState::Disconnected
    }
}

/// How a channel ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// The server closed the socket with a close frame, or had already sent
    /// a terminal status before the socket went away.
    Completed,
    /// The socket went away without a close frame or terminal status.
    Dropped,
    /// A transport error ended the channel (already reported separately).
    Failed,
}
