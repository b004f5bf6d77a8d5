//! Spoken commentary.
//!
//! The [`SpeechPlayer`] owns a [`SpeechEngine`] on its own thread and
//! applies the configured queueing policy.  Voice choice happens once at
//! start-up through [`select_voice`].

pub mod engine;
pub mod player;
pub mod voice;

pub use engine::{default_engine_factory, EngineFactory, SpeechEngine, SpeechError, UtteranceParams};
pub use player::SpeechPlayer;
pub use voice::{select_voice, VoiceInfo};
