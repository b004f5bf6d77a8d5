//! Configuration module for the match commentator client.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for the cross-platform config directory, and TOML persistence
//! via `AppConfig::load` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::{AppPaths, CONFIG_ENV};
pub use settings::{AppConfig, BackendConfig, ChannelConfig, SpeechConfig, SpeechPolicy, UiConfig};
