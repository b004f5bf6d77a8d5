//! Upload-and-listen cycles, and the messages the UI exchanges with them.

pub mod runner;
pub mod state;

pub use runner::SessionOrchestrator;
pub use state::{
    SessionCommand, SessionMessage, SessionUpdate, StatusBanner, StatusKind, StatusLine,
};
