//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a hand-edited file only needs the
//! keys it wants to override.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Where the job-processing backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base HTTP URL of the backend API (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Base WebSocket URL.  `None` derives it from `base_url` by mapping
    /// `http` → `ws` and `https` → `wss`.
    pub ws_url: Option<String>,
    /// Seconds to wait for the TCP connection to the backend.  There is no
    /// overall request timeout: uploads of large videos may take a while.
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            ws_url: None,
            connect_timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    /// `POST` target for video uploads.
    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url.trim_end_matches('/'))
    }

    /// `GET` target for the liveness check.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url.trim_end_matches('/'))
    }

    /// `GET` target for the status of a single job.
    pub fn job_status_url(&self, job_id: &str) -> String {
        format!("{}/status/{job_id}", self.base_url.trim_end_matches('/'))
    }

    /// WebSocket endpoint that streams commentary for an announced job.
    ///
    /// ```
    /// use match_commentator::config::BackendConfig;
    ///
    /// let cfg = BackendConfig::default();
    /// assert_eq!(cfg.commentary_ws_url(), "ws://localhost:8000/ws/commentary");
    /// ```
    pub fn commentary_ws_url(&self) -> String {
        let base = match &self.ws_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let http = self.base_url.trim_end_matches('/');
                if let Some(rest) = http.strip_prefix("https://") {
                    format!("wss://{rest}")
                } else if let Some(rest) = http.strip_prefix("http://") {
                    format!("ws://{rest}")
                } else {
                    http.to_string()
                }
            }
        };
        format!("{base}/ws/commentary")
    }
}

// ---------------------------------------------------------------------------
// ChannelConfig
// ---------------------------------------------------------------------------

/// Settings for the live commentary channel handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Longest wait (ms) between the socket opening and announcing the job
    /// id.  The announcement goes out earlier if the server signals readiness.
    pub announce_delay_ms: u64,
    /// `status` value a server sends to signal it is ready for the job id.
    pub ready_status: String,
    /// `status` values that mark the job as finished.
    pub terminal_statuses: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            announce_delay_ms: 100,
            ready_status: "ready".into(),
            terminal_statuses: vec!["complete".into(), "done".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechPolicy
// ---------------------------------------------------------------------------

/// What happens when a new line arrives while another is being spoken.
///
/// | Variant | Behaviour                                                  |
/// |---------|------------------------------------------------------------|
/// | Preempt | cancel the current utterance and speak the new line        |
/// | Queue   | speak lines in order; drop the oldest pending on overflow  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechPolicy {
    /// Each new line cancels the previous utterance.  Bursts are lossy.
    Preempt,
    /// Bounded FIFO with drop-oldest overflow.
    Queue,
}

impl Default for SpeechPolicy {
    fn default() -> Self {
        Self::Preempt
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for speaking commentary lines aloud.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak commentary at all.
    pub enabled: bool,
    /// Rate multiplier relative to the engine's normal rate.
    pub rate: f32,
    /// Pitch multiplier relative to the engine's normal pitch.
    pub pitch: f32,
    /// Volume as a fraction of the engine's maximum (0.0 – 1.0).
    pub volume: f32,
    /// Pause (ms) between cancelling an utterance and starting the next one.
    pub cancel_delay_ms: u64,
    /// Preempt or queue.
    pub policy: SpeechPolicy,
    /// Maximum pending lines under [`SpeechPolicy::Queue`].
    pub queue_capacity: usize,
    /// Language tag prefix a voice must carry to be preferred.
    pub language_prefix: String,
    /// Name fragments that mark a higher-quality voice.
    pub preferred_voice_markers: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 1.1,
            pitch: 1.0,
            volume: 1.0,
            cancel_delay_ms: 100,
            policy: SpeechPolicy::default(),
            queue_capacity: 4,
            language_prefix: "en".into(),
            preferred_voice_markers: vec![
                "Natural".into(),
                "Google".into(),
                "Microsoft".into(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds before a success banner drops back to neutral styling.
    pub status_revert_secs: u64,
    /// Fade-in duration (ms) for new commentary lines.
    pub fade_in_ms: u64,
    /// Initial window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
    /// Zoom applied to all text and widgets (1.0 = egui default).
    pub font_scale: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_revert_secs: 3,
            fade_in_ms: 300,
            window_size: (900.0, 640.0),
            font_scale: 1.0,
        }
    }
}

impl UiConfig {
    /// `font_scale` limited to a range egui renders sensibly.
    pub fn zoom_factor(&self) -> f32 {
        if self.font_scale.is_finite() {
            self.font_scale.clamp(0.5, 3.0)
        } else {
            1.0
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use match_commentator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("{}", config.backend.upload_url());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend endpoints.
    pub backend: BackendConfig,
    /// Live channel handshake.
    pub channel: ChannelConfig,
    /// Speech playback.
    pub speech: SpeechConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::resolve().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
