//! Match commentator window, an egui/eframe application.
//!
//! # Architecture
//!
//! [`CommentatorApp`] is the top-level [`eframe::App`].  It owns the UI
//! state, the [`SpeechPlayer`] and two channel endpoints:
//!
//! * `command_tx`: sends [`SessionCommand`]s to the session orchestrator.
//! * `update_rx`: receives [`SessionMessage`]s from the orchestrator; drained
//!   with `try_recv` at the start of every frame.
//!
//! Each selected file starts a new cycle number.  Messages stamped with an
//! older cycle are discarded, so a feed never mixes two uploads.
//!
//! # Layout
//!
//! | Area | Content |
//! |------|---------|
//! | Top bar | title, channel state, settings toggle |
//! | File row | path field, Load button (files can also be dropped on the window) |
//! | File summary | selected file name, size, type, job id |
//! | Status | banner; success reverts after 3 s, errors stay |
//! | Feed | commentary lines, newest at the bottom, each fading in |
//! | Settings (side panel) | endpoints, speech options, save to `settings.toml` |

use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::channel::ChannelState;
use crate::config::{AppConfig, AppPaths, SpeechPolicy};
use crate::preview::VideoPreview;
use crate::protocol::UploadReceipt;
use crate::session::{
    SessionCommand, SessionMessage, SessionUpdate, StatusBanner, StatusKind, StatusLine,
};
use crate::speech::SpeechPlayer;
use crate::upload::HealthStatus;

const SUCCESS_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const MUTED_COLOR: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

/// Shown in the feed between selecting a file and the first line.
const FEED_PLACEHOLDER: &str = "Processing video...";

// ---------------------------------------------------------------------------
// CommentaryFeed
// ---------------------------------------------------------------------------

/// One rendered commentary line.
#[derive(Debug, Clone)]
pub struct FeedLine {
    pub text: String,
    arrived: Instant,
}

impl FeedLine {
    /// Opacity for the fade-in animation, `0.0..=1.0`.
    fn opacity(&self, now: Instant, fade_in: Duration) -> f32 {
        if fade_in.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.arrived);
        (elapsed.as_secs_f32() / fade_in.as_secs_f32()).min(1.0)
    }
}

/// Append-only list of rendered lines; cleared only when a new file is
/// selected.
#[derive(Debug, Default)]
pub struct CommentaryFeed {
    lines: Vec<FeedLine>,
}

impl CommentaryFeed {
    pub fn push(&mut self, text: String, now: Instant) {
        self.lines.push(FeedLine { text, arrived: now });
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[FeedLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `true` while the newest line is still fading in.
    fn animating(&self, now: Instant, fade_in: Duration) -> bool {
        self.lines
            .last()
            .is_some_and(|line| line.opacity(now, fade_in) < 1.0)
    }
}

// ---------------------------------------------------------------------------
// CommentatorApp
// ---------------------------------------------------------------------------

/// eframe application: the commentary viewer.
pub struct CommentatorApp {
    // ── Cycle state ──────────────────────────────────────────────────────
    /// Number of the current cycle; bumped on every file selection.
    cycle: u64,
    /// Local preview of the selected file.
    pub preview: Option<VideoPreview>,
    /// Receipt of the last accepted upload.
    pub job: Option<UploadReceipt>,
    /// Rendered commentary for the current cycle.
    pub feed: CommentaryFeed,
    /// Phase of the live channel.
    pub channel_state: ChannelState,
    status: StatusLine,

    // ── Speech ───────────────────────────────────────────────────────────
    speech: Option<SpeechPlayer>,
    /// Why speech is unavailable, when it is.
    speech_error: Option<String>,
    /// Open modal notice about missing speech.
    pub speech_notice: Option<String>,
    /// The notice was dismissed during this cycle.
    speech_notice_dismissed: bool,

    // ── UI state ─────────────────────────────────────────────────────────
    path_input: String,
    show_settings: bool,
    health: Option<HealthStatus>,
    /// Outcome of the last "Save settings" click.
    settings_note: Option<StatusBanner>,

    // ── Channels ─────────────────────────────────────────────────────────
    command_tx: mpsc::Sender<SessionCommand>,
    update_rx: mpsc::Receiver<SessionMessage>,

    config: AppConfig,
    paths: AppPaths,
}

impl CommentatorApp {
    /// Create a new [`CommentatorApp`].
    ///
    /// * `command_tx`: sender end of the session command channel.
    /// * `update_rx`: receiver end of the session update channel.
    /// * `speech`: the started player, or why it could not start.
    /// * `config`: loaded application configuration.
    pub fn new(
        command_tx: mpsc::Sender<SessionCommand>,
        update_rx: mpsc::Receiver<SessionMessage>,
        speech: Result<SpeechPlayer, String>,
        config: AppConfig,
    ) -> Self {
        let (speech, speech_error) = match speech {
            Ok(player) => (Some(player), None),
            Err(reason) => (None, Some(reason)),
        };
        Self {
            cycle: 0,
            preview: None,
            job: None,
            feed: CommentaryFeed::default(),
            channel_state: ChannelState::Disconnected,
            status: StatusLine::default(),
            speech,
            speech_error,
            speech_notice: None,
            speech_notice_dismissed: false,
            path_input: String::new(),
            show_settings: false,
            health: None,
            settings_note: None,
            command_tx,
            update_rx,
            config,
            paths: AppPaths::resolve(),
        }
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    // ── File selection ───────────────────────────────────────────────────

    /// Preview `path`, clear the feed, then ask the orchestrator to upload.
    ///
    /// The preview and the clear happen before anything touches the network.
    /// Anything the previous cycle still has in flight is ignored from here on.
    pub fn select_file(&mut self, path: PathBuf) {
        self.cycle += 1;
        log::info!("ui: cycle {}: selected {}", self.cycle, path.display());

        self.channel_state = ChannelState::Disconnected;
        self.preview = Some(VideoPreview::from_path(&path));
        self.feed.clear();
        self.job = None;
        self.speech_notice = None;
        self.speech_notice_dismissed = false;
        if let Some(player) = &self.speech {
            player.stop();
        }

        let start = SessionCommand::Start {
            path,
            cycle: self.cycle,
        };
        if let Err(e) = self.command_tx.try_send(start) {
            log::error!("ui: cannot reach the session orchestrator: {e}");
        }
    }

    fn send(&self, command: SessionCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("ui: command dropped: {e}");
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending session updates (non-blocking).
    pub fn poll_updates(&mut self, now: Instant) {
        while let Ok(message) = self.update_rx.try_recv() {
            if !message.applies_to(self.cycle) {
                log::debug!(
                    "ui: dropping update from cycle {} (now {})",
                    message.cycle,
                    self.cycle
                );
                continue;
            }
            match message.update {
                SessionUpdate::Status(banner) => self.status.set(banner, now),
                SessionUpdate::Commentary(event) => {
                    self.feed.push(event.display_line(), now);
                    self.speak(&event.text);
                }
                SessionUpdate::ChannelState(state) => self.channel_state = state,
                SessionUpdate::JobAccepted(receipt) => self.job = Some(receipt),
                SessionUpdate::Health(health) => self.health = Some(health),
            }
        }
    }

    /// Advance timers: revert an expired success banner.
    pub fn tick(&mut self, now: Instant) {
        self.status.expire(now, self.revert_after());
    }

    fn speak(&mut self, text: &str) {
        if !self.config.speech.enabled {
            return;
        }
        match &self.speech {
            Some(player) => player.say(text),
            None if !self.speech_notice_dismissed && self.speech_notice.is_none() => {
                let reason = self
                    .speech_error
                    .clone()
                    .unwrap_or_else(|| "no speech backend".into());
                self.speech_notice = Some(format!(
                    "Speech synthesis is not available on this system, so commentary \
                     will not be read aloud.\n\n{reason}"
                ));
            }
            None => {}
        }
    }

    /// Write the current settings to `settings.toml` and remember the outcome
    /// for the settings panel.
    fn save_settings(&mut self) {
        let file = &self.paths.settings_file;
        self.settings_note = Some(match self.config.save_to(file) {
            Ok(()) => {
                log::info!("ui: settings saved to {}", file.display());
                StatusBanner::success(format!("Saved to {}", file.display()))
            }
            Err(e) => {
                log::error!("ui: cannot save settings to {}: {e}", file.display());
                StatusBanner::error(format!("Could not save settings: {e}"))
            }
        });
    }

    fn set_speech_enabled(&mut self, enabled: bool) {
        self.config.speech.enabled = enabled;
        if !enabled {
            if let Some(player) = &self.speech {
                player.stop();
            }
        }
    }

    fn dismiss_speech_notice(&mut self) {
        self.speech_notice = None;
        self.speech_notice_dismissed = true;
    }

    fn revert_after(&self) -> Duration {
        Duration::from_secs(self.config.ui.status_revert_secs)
    }

    fn fade_in(&self) -> Duration {
        Duration::from_millis(self.config.ui.fade_in_ms)
    }

    // ── Panel renderers ──────────────────────────────────────────────────

    fn draw_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Match Commentator");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new("Settings").selected(self.show_settings))
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }
                let color = if self.channel_state.is_open() {
                    SUCCESS_COLOR
                } else {
                    MUTED_COLOR
                };
                ui.label(egui::RichText::new(self.channel_state.label()).color(color));
            });
        });
    }

    fn draw_file_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Video file:");
            let width = (ui.available_width() - 130.0).max(120.0);
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.path_input)
                    .hint_text("path to a video, or drop a file on the window")
                    .desired_width(width),
            );
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let load = ui.button("Load").clicked();
            if (submitted || load) && !self.path_input.trim().is_empty() {
                let path = PathBuf::from(self.path_input.trim());
                self.select_file(path);
            }
            if ui
                .add_enabled(self.channel_state.is_open(), egui::Button::new("Stop"))
                .clicked()
            {
                self.send(SessionCommand::Stop);
            }
        });
    }

    fn draw_file_summary(&self, ui: &mut egui::Ui) {
        let Some(preview) = &self.preview else {
            ui.label(egui::RichText::new("No video selected").color(MUTED_COLOR));
            return;
        };
        ui.label(egui::RichText::new(preview.selected_label()).strong());
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(preview.size_label()).color(MUTED_COLOR));
            ui.label(egui::RichText::new(preview.content_type()).color(MUTED_COLOR));
            if let Some(job) = &self.job {
                ui.label(
                    egui::RichText::new(format!("job {}", job.job_id)).color(MUTED_COLOR),
                );
            }
        });
    }

    fn draw_status(&self, ui: &mut egui::Ui) {
        let banner = self.status.banner();
        if banner.is_blank() {
            return;
        }
        let color = match banner.kind {
            StatusKind::Success => SUCCESS_COLOR,
            StatusKind::Error => ERROR_COLOR,
            StatusKind::Neutral => ui.visuals().text_color(),
        };
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(banner.message.as_str()).color(color));
        });
    }

    fn draw_feed(&self, ui: &mut egui::Ui, now: Instant) {
        ui.label(egui::RichText::new("Live Commentary").strong());
        let fade_in = self.fade_in();
        let base = ui.visuals().text_color();

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.feed.is_empty() {
                    if self.preview.is_some() {
                        ui.label(egui::RichText::new(FEED_PLACEHOLDER).color(MUTED_COLOR));
                    }
                    return;
                }
                for line in self.feed.lines() {
                    let color = base.gamma_multiply(line.opacity(now, fade_in));
                    ui.label(egui::RichText::new(line.text.as_str()).color(color));
                    ui.add_space(6.0);
                }
            });
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui) {
        let backend = &self.config.backend;
        egui::Grid::new("settings_grid")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("Backend");
                ui.label(backend.base_url.as_str());
                ui.end_row();

                ui.label("Commentary channel");
                ui.label(backend.commentary_ws_url());
                ui.end_row();

                ui.label("Voice");
                let voice = match (&self.speech, &self.speech_error) {
                    (Some(player), _) => match player.voice() {
                        Some(voice) => format!("{} ({})", voice.name, voice.language),
                        None => "platform default voice".into(),
                    },
                    (None, Some(reason)) => reason.clone(),
                    (None, None) => "disabled".into(),
                };
                ui.label(voice);
                ui.end_row();

                ui.label("Config folder");
                ui.label(self.paths.config_dir.display().to_string());
                ui.end_row();
            });

        ui.add_space(6.0);
        let mut enabled = self.config.speech.enabled;
        if ui.checkbox(&mut enabled, "Speak commentary").changed() {
            self.set_speech_enabled(enabled);
        }
        if enabled && self.speech.is_none() {
            ui.label(
                egui::RichText::new("The voice starts on the next launch.").color(MUTED_COLOR),
            );
        }

        ui.horizontal(|ui| {
            ui.label("When a new line arrives");
            let policy = &mut self.config.speech.policy;
            ui.radio_value(policy, SpeechPolicy::Preempt, "interrupt");
            ui.radio_value(policy, SpeechPolicy::Queue, "queue");
        });
        ui.label(egui::RichText::new("Speech policy applies on restart.").color(MUTED_COLOR));

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Save settings").clicked() {
                self.save_settings();
            }
            if let Some(note) = &self.settings_note {
                let color = match note.kind {
                    StatusKind::Error => ERROR_COLOR,
                    _ => SUCCESS_COLOR,
                };
                ui.label(egui::RichText::new(note.message.as_str()).color(color));
            }
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Check backend").clicked() {
                self.send(SessionCommand::CheckHealth);
            }
            if let Some(health) = &self.health {
                let color = match health {
                    HealthStatus::Healthy => SUCCESS_COLOR,
                    _ => ERROR_COLOR,
                };
                ui.label(egui::RichText::new(health.label()).color(color));
            }
        });
    }

    fn draw_speech_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.speech_notice.clone() else {
            return;
        };
        let mut dismissed = false;
        let modal = egui::Modal::new(egui::Id::new("speech_notice")).show(ctx, |ui| {
            ui.set_width(360.0);
            ui.heading("Speech unavailable");
            ui.add_space(6.0);
            ui.label(notice);
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
        if dismissed || modal.should_close() {
            self.dismiss_speech_notice();
        }
    }

    fn take_dropped_file(&self, ctx: &egui::Context) -> Option<PathBuf> {
        ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for CommentatorApp {
    /// Called every frame by eframe.  Polls the update channel, advances
    /// timers, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // --- Poll non-blocking channel -------------------------------------
        self.poll_updates(now);
        self.tick(now);

        if let Some(path) = self.take_dropped_file(ctx) {
            self.path_input = path.display().to_string();
            self.select_file(path);
        }

        // --- Schedule repaints ---------------------------------------------
        // Updates arrive from another thread, so keep polling while a
        // channel is live.
        if self.channel_state.is_open() || self.feed.animating(now, self.fade_in()) {
            ctx.request_repaint_after(Duration::from_millis(33));
        } else if let Some(left) = self.status.remaining(now, self.revert_after()) {
            ctx.request_repaint_after(left);
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            self.draw_top_bar(ui);
        });

        if self.show_settings {
            egui::SidePanel::right("settings")
                .resizable(false)
                .default_width(300.0)
                .show(ctx, |ui| {
                    ui.heading("Settings");
                    ui.separator();
                    self.draw_settings(ui);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_file_row(ui);
            ui.separator();
            self.draw_file_summary(ui);
            ui.add_space(6.0);
            self.draw_status(ui);
            ui.separator();
            self.draw_feed(ui, now);
        });

        self.draw_speech_notice(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ui: window closing");
        if let Some(player) = self.speech.take() {
            player.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
