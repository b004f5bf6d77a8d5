//! Speech player: a dedicated OS thread that owns the speech engine.
//!
//! The UI hands lines to [`SpeechPlayer::say`], which never blocks.  The
//! worker thread applies the configured [`SpeechPolicy`]:
//!
//! * `Preempt`: cancel the current utterance, wait the cancel delay, speak
//!   the new line.  Rapid bursts cut earlier lines short or skip them.
//! * `Queue`: keep up to `queue_capacity` pending lines, speak them in order
//!   as the engine goes idle, and discard the oldest pending line when a new
//!   one would overflow the queue.
//!
//! Dropping the player closes its command channel; the worker exits after
//! the command it is currently handling.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::{SpeechConfig, SpeechPolicy};

use super::engine::{EngineFactory, SpeechEngine, SpeechError, UtteranceParams};
use super::voice::{select_voice, VoiceInfo};

/// How often the queue worker checks whether the engine has gone idle.
const QUEUE_POLL: Duration = Duration::from_millis(50);

enum SpeechCommand {
    Say(String),
    Stop,
}

// ---------------------------------------------------------------------------
// PlayerSettings
// ---------------------------------------------------------------------------

/// The parts of [`SpeechConfig`] the worker needs.
#[derive(Debug, Clone)]
struct PlayerSettings {
    policy: SpeechPolicy,
    cancel_delay: Duration,
    queue_capacity: usize,
    params: UtteranceParams,
    language_prefix: String,
    markers: Vec<String>,
}

impl PlayerSettings {
    fn from_config(config: &SpeechConfig) -> Self {
        Self {
            policy: config.policy,
            cancel_delay: Duration::from_millis(config.cancel_delay_ms),
            queue_capacity: config.queue_capacity.max(1),
            params: UtteranceParams {
                rate: config.rate,
                pitch: config.pitch,
                volume: config.volume.clamp(0.0, 1.0),
            },
            language_prefix: config.language_prefix.clone(),
            markers: config.preferred_voice_markers.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechPlayer
// ---------------------------------------------------------------------------

/// Handle to the speech worker thread.
pub struct SpeechPlayer {
    tx: Option<Sender<SpeechCommand>>,
    thread: Option<JoinHandle<()>>,
    voice: Option<VoiceInfo>,
}

impl SpeechPlayer {
    /// Spawn the worker, build the engine on it, and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns the factory's error (typically [`SpeechError::Unavailable`])
    /// when no engine could be created; the worker has exited by then.
    pub fn start(config: &SpeechConfig, factory: EngineFactory) -> Result<Self, SpeechError> {
        let settings = PlayerSettings::from_config(config);
        let (tx, rx) = mpsc::channel::<SpeechCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Option<VoiceInfo>, SpeechError>>();

        let thread = std::thread::Builder::new()
            .name("speech-player".into())
            .spawn(move || {
                let mut engine = match factory() {
                    Ok(engine) => engine,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let voices = engine.voices().unwrap_or_else(|e| {
                    log::warn!("speech: cannot list voices: {e}");
                    Vec::new()
                });
                let voice =
                    select_voice(&voices, &settings.language_prefix, &settings.markers).cloned();
                match &voice {
                    Some(v) => log::info!("speech: using voice {} ({})", v.name, v.language),
                    None => log::info!("speech: using platform default voice"),
                }
                let _ = ready_tx.send(Ok(voice.clone()));

                let mut worker = Worker {
                    engine,
                    voice,
                    settings,
                };
                match worker.settings.policy {
                    SpeechPolicy::Preempt => worker.run_preempt(rx),
                    SpeechPolicy::Queue => worker.run_queue(rx),
                }
                log::debug!("speech: worker exiting");
            })
            .map_err(|e| SpeechError::Unavailable(format!("cannot spawn speech thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(voice)) => Ok(Self {
                tx: Some(tx),
                thread: Some(thread),
                voice,
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(SpeechError::Unavailable("speech thread exited during start-up".into()))
            }
        }
    }

    /// Speak `text` according to the configured policy.  Never blocks.
    pub fn say(&self, text: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(SpeechCommand::Say(text.into()));
        }
    }

    /// Silence the current utterance and forget pending lines.
    pub fn stop(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(SpeechCommand::Stop);
        }
    }

    /// The voice picked at start-up; `None` means the platform default.
    pub fn voice(&self) -> Option<&VoiceInfo> {
        self.voice.as_ref()
    }

    /// Close the command channel and wait for the worker to finish the
    /// commands already sent.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SpeechPlayer {
    fn drop(&mut self) {
        self.join();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    engine: Box<dyn SpeechEngine>,
    voice: Option<VoiceInfo>,
    settings: PlayerSettings,
}

impl Worker {
    fn run_preempt(&mut self, rx: Receiver<SpeechCommand>) {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                SpeechCommand::Say(text) => {
                    self.cancel();
                    std::thread::sleep(self.settings.cancel_delay);
                    self.speak(&text);
                }
                SpeechCommand::Stop => self.cancel(),
            }
        }
    }

    fn run_queue(&mut self, rx: Receiver<SpeechCommand>) {
        let mut pending: VecDeque<String> = VecDeque::new();

        loop {
            let cmd = if pending.is_empty() {
                match rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                }
            } else {
                match rx.recv_timeout(QUEUE_POLL) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            };

            match cmd {
                Some(SpeechCommand::Say(text)) => {
                    pending.push_back(text);
                    while pending.len() > self.settings.queue_capacity {
                        if let Some(dropped) = pending.pop_front() {
                            log::debug!("speech: queue full, dropping {dropped:?}");
                        }
                    }
                }
                Some(SpeechCommand::Stop) => {
                    pending.clear();
                    self.cancel();
                }
                None => {}
            }

            if pending.is_empty() {
                continue;
            }
            let busy = self.engine.is_speaking().unwrap_or_else(|e| {
                log::warn!("speech: is_speaking failed: {e}");
                false
            });
            if !busy {
                if let Some(next) = pending.pop_front() {
                    self.speak(&next);
                }
            }
        }
    }

    fn cancel(&mut self) {
        if let Err(e) = self.engine.cancel() {
            log::warn!("speech: cancel failed: {e}");
        }
    }

    fn speak(&mut self, text: &str) {
        log::debug!("speech: speaking {text:?}");
        if let Err(e) = self
            .engine
            .speak(text, self.voice.as_ref(), &self.settings.params)
        {
            log::warn!("speech: speak failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
