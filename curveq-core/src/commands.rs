use crate::bands::FilterParam;

/// Commands sent from the TUI to the audio engine
#[derive(Debug, Clone)]
pub enum AudioCommand {
    /// Decode a file and start playing it through the filter chain
    Load(String),
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Stop playback and drop the current source
    Stop,
    /// Replace every filter stage, one param per band
    SetStages(Vec<FilterParam>),
    /// Shutdown the audio engine
    Quit,
}

/// Responses sent from the audio engine to the TUI
#[derive(Debug, Clone)]
pub enum AudioResponse {
    /// A file was opened and queued on the output
    Loaded {
        path: String,
        sample_rate: u32,
        channels: u16,
    },
    /// Playback has started
    Playing,
    /// Playback has been paused
    Paused,
    /// Playback has been stopped
    Stopped,
    /// An error occurred
    Error(String),
    /// Engine is shutting down
    Shutdown,
}
