//! Speech engine trait and the platform implementation.
//!
//! [`SpeechEngine`] is what the player thread drives.  It is deliberately not
//! `Send`: some platform backends must stay on the thread that created them,
//! so engines are built *on* the player thread from an [`EngineFactory`].
//!
//! [`NativeSpeechEngine`] wraps the `tts` crate and is only compiled with the
//! `native-tts` feature.  Without it, [`default_engine_factory`] reports the
//! speech facility as unavailable.

use thiserror::Error;

use super::voice::VoiceInfo;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors raised by speech engines.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// There is no usable speech facility on this machine / build.
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected an operation.
    #[error("speech backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// UtteranceParams
// ---------------------------------------------------------------------------

/// Prosody for one utterance, relative to the engine's own scale.
///
/// `rate` and `pitch` multiply the engine's normal value; `volume` is a
/// fraction of its maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtteranceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for UtteranceParams {
    fn default() -> Self {
        Self {
            rate: 1.1,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// A text-to-speech backend driven from a single thread.
pub trait SpeechEngine {
    /// Voices the backend offers.  An empty list is fine.
    fn voices(&mut self) -> Result<Vec<VoiceInfo>, SpeechError>;

    /// Stop whatever is being spoken right now.
    fn cancel(&mut self) -> Result<(), SpeechError>;

    /// Start speaking `text`.  Returns once the utterance is queued.
    fn speak(
        &mut self,
        text: &str,
        voice: Option<&VoiceInfo>,
        params: &UtteranceParams,
    ) -> Result<(), SpeechError>;

    /// `true` while an utterance is playing.
    fn is_speaking(&mut self) -> Result<bool, SpeechError>;
}

/// Builds the engine on the player thread.
pub type EngineFactory = Box<dyn FnOnce() -> Result<Box<dyn SpeechEngine>, SpeechError> + Send>;

/// Factory for the engine compiled into this build.
pub fn default_engine_factory() -> EngineFactory {
    #[cfg(feature = "native-tts")]
    {
        Box::new(|| {
            NativeSpeechEngine::new().map(|engine| Box::new(engine) as Box<dyn SpeechEngine>)
        })
    }

    #[cfg(not(feature = "native-tts"))]
    {
        Box::new(|| {
            Err(SpeechError::Unavailable(
                "this build has no speech backend (enable the `native-tts` feature)".into(),
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// NativeSpeechEngine
// ---------------------------------------------------------------------------

/// Platform speech synthesis through the `tts` crate.
#[cfg(feature = "native-tts")]
pub struct NativeSpeechEngine {
    tts: tts::Tts,
    features: tts::Features,
    voices: Vec<tts::Voice>,
}

#[cfg(feature = "native-tts")]
impl NativeSpeechEngine {
    pub fn new() -> Result<Self, SpeechError> {
        let tts = tts::Tts::default().map_err(|e| SpeechError::Unavailable(e.to_string()))?;
        let features = tts.supported_features();
        Ok(Self {
            tts,
            features,
            voices: Vec::new(),
        })
    }

    fn apply(&mut self, voice: Option<&VoiceInfo>, params: &UtteranceParams) -> Result<(), SpeechError> {
        if self.features.rate {
            let rate = (self.tts.normal_rate() * params.rate)
                .clamp(self.tts.min_rate(), self.tts.max_rate());
            self.tts.set_rate(rate).map_err(backend)?;
        }
        if self.features.pitch {
            let pitch = (self.tts.normal_pitch() * params.pitch)
                .clamp(self.tts.min_pitch(), self.tts.max_pitch());
            self.tts.set_pitch(pitch).map_err(backend)?;
        }
        if self.features.volume {
            let volume = (self.tts.max_volume() * params.volume)
                .clamp(self.tts.min_volume(), self.tts.max_volume());
            self.tts.set_volume(volume).map_err(backend)?;
        }
        if let (true, Some(wanted)) = (self.features.voice, voice) {
            if let Some(v) = self.voices.iter().find(|v| v.id() == wanted.id) {
                self.tts.set_voice(v).map_err(backend)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "native-tts")]
fn backend(e: tts::Error) -> SpeechError {
    SpeechError::Backend(e.to_string())
}

#[cfg(feature = "native-tts")]
impl SpeechEngine for NativeSpeechEngine {
    fn voices(&mut self) -> Result<Vec<VoiceInfo>, SpeechError> {
        if !self.features.voice {
            return Ok(Vec::new());
        }
        self.voices = self.tts.voices().map_err(backend)?;
        Ok(self
            .voices
            .iter()
            .map(|v| VoiceInfo::new(v.id(), v.name(), v.language().as_str()))
            .collect())
    }

    fn cancel(&mut self) -> Result<(), SpeechError> {
        if self.features.stop {
            self.tts.stop().map_err(backend)?;
        }
        Ok(())
    }

    fn speak(
        &mut self,
        text: &str,
        voice: Option<&VoiceInfo>,
        params: &UtteranceParams,
    ) -> Result<(), SpeechError> {
        self.apply(voice, params)?;
        self.tts.speak(text, false).map_err(backend)?;
        Ok(())
    }

    fn is_speaking(&mut self) -> Result<bool, SpeechError> {
        if !self.features.is_speaking {
            return Ok(false);
        }
        self.tts.is_speaking().map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_sportscaster_pace() {
        let p = UtteranceParams::default();
        assert_eq!(p.rate, 1.1);
        assert_eq!(p.pitch, 1.0);
        assert_eq!(p.volume, 1.0);
    }

    #[test]
    fn plain_build_includes_native_backend() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let manifest = std::fs::read_to_string(path).expect("read manifest");
        let manifest: toml::Value = toml::from_str(&manifest).expect("parse manifest");
        let defaults = manifest["features"]["default"]
            .as_array()
            .expect("default feature list");
        assert!(defaults.iter().any(|f| f.as_str() == Some("native-tts")));
    }

    #[cfg(not(feature = "native-tts"))]
    #[test]
    fn build_without_backend_reports_unavailable() {
        let factory = default_engine_factory();
        assert!(matches!(factory(), Err(SpeechError::Unavailable(_))));
    }
}
