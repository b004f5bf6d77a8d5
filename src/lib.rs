//! Match Commentator: pick a match video, upload it to the commentary
//! backend, and follow the generated play-by-play live, on screen and aloud.
//!
//! * [`upload`]: multipart upload, health check and job status over HTTP.
//! * [`channel`]: the WebSocket that streams commentary for one job.
//! * [`protocol`]: wire types for both.
//! * [`session`]: the orchestrator that runs one upload cycle at a time.
//! * [`speech`]: text-to-speech playback on its own thread.
//! * [`app`]: the egui window.

pub mod app;
pub mod channel;
pub mod config;
pub mod preview;
pub mod protocol;
pub mod session;
pub mod speech;
pub mod upload;
