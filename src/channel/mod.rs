//! Live commentary channel.
//!
//! One WebSocket per upload cycle: connect, announce the job id once, then
//! turn every inbound frame into a [`ChannelEvent`].  The channel never
//! reconnects; the user starts a new cycle by picking a file again.

pub mod client;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{run_channel, ChannelError, ChannelEvent, ChannelHandle, ChannelSettings};
pub use state::{ChannelState, CloseKind};
