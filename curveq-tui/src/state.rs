use std::time::Instant;

use curveq_core::{
    ApplyOutcome, AudioSession, CurveConfig, CurveEditor,
    commands::AudioResponse,
    engine::AudioEngineHandle,
};
use strum::{EnumIter, IntoEnumIterator};

/// Sample rate assumed for the filter chain until a file is loaded
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub path: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum SettingsOption {
    #[strum(to_string = "Blend")]
    Blend,
    #[strum(to_string = "Gaussian width")]
    Sigma,
    #[strum(to_string = "Band sampling")]
    Sampling,
    #[strum(to_string = "Gain range")]
    GainRange,
    #[strum(to_string = "Follow curve frequency")]
    CurveFrequency,
    #[strum(to_string = "Pin anchor x")]
    LockAnchors,
}

#[derive(Debug, Clone)]
pub struct SettingsState {
    pub items: Vec<SettingsOption>,
    pub selected_index: usize,
}

impl SettingsState {
    pub fn new() -> Self {
        Self {
            items: SettingsOption::iter().collect(),
            selected_index: 0,
        }
    }

    pub fn selected(&self) -> Option<SettingsOption> {
        self.items.get(self.selected_index).copied()
    }

    pub fn next_item(&mut self) {
        if !self.items.is_empty() {
            self.selected_index = (self.selected_index + 1) % self.items.len();
        }
    }

    pub fn prev_item(&mut self) {
        if !self.items.is_empty() {
            self.selected_index = (self.selected_index + self.items.len() - 1) % self.items.len();
        }
    }
}

pub struct AppState {
    pub editor: CurveEditor,
    pub audio: AudioSession,
    pub playback: PlaybackStatus,
    pub track: Option<TrackInfo>,
    pub settings: SettingsState,
    pub status_message: String,
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new(config: CurveConfig) -> Self {
        Self {
            editor: CurveEditor::new(config),
            audio: AudioSession::default(),
            playback: PlaybackStatus::default(),
            track: None,
            settings: SettingsState::new(),
            status_message: "No file loaded".to_string(),
            error_message: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackStatus::Playing
    }

    /// One scheduler tick: let deferred releases fire, push band params if
    /// the curve moved, pull a fresh spectrum.
    pub fn tick(&mut self, now: Instant) {
        self.editor.tick(now);

        let snapshot = self.editor.snapshot();
        if self.audio.apply(&snapshot, self.editor.config()) == ApplyOutcome::Failed {
            self.error_message = Some("Audio engine rejected the filter update".to_string());
        }
        self.audio.refresh_spectrum();
    }

    pub fn handle_response(&mut self, response: AudioResponse, handle: &AudioEngineHandle) {
        match response {
            AudioResponse::Loaded {
                path,
                sample_rate,
                channels,
            } => {
                // new stream, new chain: forces a full push at the right rate
                self.audio.attach(Box::new(handle.chain(sample_rate)));
                self.status_message = format!("Loaded {}", path);
                self.error_message = None;
                self.track = Some(TrackInfo {
                    path,
                    sample_rate,
                    channels,
                });
            }
            AudioResponse::Playing => {
                self.playback = PlaybackStatus::Playing;
                self.status_message = "Playing".to_string();
            }
            AudioResponse::Paused => {
                self.playback = PlaybackStatus::Paused;
                self.status_message = "Paused".to_string();
            }
            AudioResponse::Stopped => {
                self.playback = PlaybackStatus::Stopped;
                self.status_message = "Stopped".to_string();
            }
            AudioResponse::Error(e) => {
                log::error!("Engine error: {}", e);
                self.error_message = Some(e);
            }
            AudioResponse::Shutdown => {
                self.playback = PlaybackStatus::Idle;
                self.status_message = "Audio engine shut down".to_string();
            }
        }
    }
}
