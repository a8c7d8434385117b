use std::{fs::File, thread::JoinHandle};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, unbounded};
use rodio::{
    Decoder, DeviceTrait, OutputStream, OutputStreamBuilder, Sink, Source,
    cpal::{self, traits::HostTrait},
};

use crate::{
    bands::FilterParam,
    commands::{AudioCommand, AudioResponse},
    dsp::spectrum::{DEFAULT_FFT_SIZE, SpectrumAnalyzer},
    session::AudioChain,
    source::{AnalysisTap, EqSource, StageSlot},
};

/// Default output device with a sink attached to its mixer
struct Output {
    _stream: OutputStream,
    sink: Sink,
    device_name: String,
}

impl Output {
    fn try_new_default() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device found")?;

        let device_name = device.name().unwrap_or_else(|_| "(unknown)".to_string());

        let stream_builder = OutputStreamBuilder::from_device(device)
            .context("Cannot create output stream builder from device")?;

        let mut stream = stream_builder
            .open_stream()
            .context("Cannot create stream output")?;
        // rodio prints to stderr on drop, which would tear the terminal UI
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());

        Ok(Output {
            _stream: stream,
            sink,
            device_name,
        })
    }
}

/// Owns playback. Runs on its own thread and is driven by [`AudioCommand`]s.
pub struct AudioEngine {
    cmd_rx: Receiver<AudioCommand>,
    resp_tx: Sender<AudioResponse>,
    stages: StageSlot,
    tap: AnalysisTap,
}

/// The UI side of the engine's channels
pub struct AudioEngineHandle {
    pub cmd_tx: Sender<AudioCommand>,
    pub resp_rx: Receiver<AudioResponse>,
    tap: AnalysisTap,
}

impl AudioEngineHandle {
    /// Filter chain for a stream playing at `sample_rate`
    pub fn chain(&self, sample_rate: u32) -> EngineChain {
        EngineChain::new(self.cmd_tx.clone(), self.tap.clone(), sample_rate)
    }
}

impl AudioEngine {
    pub fn new() -> (AudioEngine, AudioEngineHandle) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (resp_tx, resp_rx) = unbounded();
        let tap = AnalysisTap::new();

        let engine = AudioEngine {
            cmd_rx,
            resp_tx,
            stages: StageSlot::new(),
            tap: tap.clone(),
        };
        let handle = AudioEngineHandle {
            cmd_tx,
            resp_rx,
            tap,
        };
        (engine, handle)
    }

    /// Move the engine onto a dedicated thread.
    ///
    /// The output stream is opened there since it can't cross threads on
    /// every platform. Without a device the engine still runs and answers
    /// every command, it just has nothing to play on.
    pub fn spawn(self) -> anyhow::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("curveq-audio".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn audio engine thread")
    }

    fn run(self) {
        let output = match Output::try_new_default() {
            Ok(output) => {
                log::info!("Audio output: {}", output.device_name);
                Some(output)
            }
            Err(e) => {
                log::error!("Audio output unavailable: {:#}", e);
                self.respond(AudioResponse::Error(format!("{:#}", e)));
                None
            }
        };

        while let Ok(cmd) = self.cmd_rx.recv() {
            log::trace!("engine command: {:?}", cmd);
            match self.handle_command(cmd, output.as_ref()) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    log::error!("{:#}", e);
                    self.respond(AudioResponse::Error(format!("{:#}", e)));
                }
            }
        }

        log::info!("Audio engine stopped");
    }

    /// Returns Ok(false) once the engine should shut down
    fn handle_command(&self, cmd: AudioCommand, output: Option<&Output>) -> anyhow::Result<bool> {
        match cmd {
            AudioCommand::SetStages(params) => {
                self.stages.store(params)?;
            }
            AudioCommand::Load(path) => {
                let output = output.context("No audio output to play on")?;
                let file = File::open(&path).context("Failed to open the file")?;
                let decoder =
                    Decoder::try_from(file).context("Failed to decode the opened audio file")?;
                let sample_rate = decoder.sample_rate();
                let channels = decoder.channels();

                let source = EqSource::new(decoder, self.stages.clone(), self.tap.clone());
                output.sink.stop();
                output.sink.append(source);
                output.sink.play();

                log::info!("Loaded {} ({} Hz, {} ch)", path, sample_rate, channels);
                self.respond(AudioResponse::Loaded {
                    path,
                    sample_rate,
                    channels,
                });
                self.respond(AudioResponse::Playing);
            }
            AudioCommand::Play => {
                if let Some(output) = output {
                    output.sink.play();
                    self.respond(AudioResponse::Playing);
                }
            }
            AudioCommand::Pause => {
                if let Some(output) = output {
                    output.sink.pause();
                    self.respond(AudioResponse::Paused);
                }
            }
            AudioCommand::Stop => {
                if let Some(output) = output {
                    output.sink.stop();
                }
                self.respond(AudioResponse::Stopped);
            }
            AudioCommand::Quit => {
                if let Some(output) = output {
                    output.sink.stop();
                }
                self.respond(AudioResponse::Shutdown);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn respond(&self, response: AudioResponse) {
        // the UI may already be gone during shutdown
        let _ = self.resp_tx.send(response);
    }
}

/// [`AudioChain`] backed by the engine thread.
///
/// Stages travel over the command channel; the spectrum is computed here,
/// on the caller's thread, from the samples the playing source taps.
pub struct EngineChain {
    cmd_tx: Sender<AudioCommand>,
    tap: AnalysisTap,
    analyzer: SpectrumAnalyzer,
    scratch: Vec<f32>,
    sample_rate: u32,
    heard_audio: bool,
}

impl EngineChain {
    pub fn new(cmd_tx: Sender<AudioCommand>, tap: AnalysisTap, sample_rate: u32) -> Self {
        Self {
            cmd_tx,
            tap,
            analyzer: SpectrumAnalyzer::new(DEFAULT_FFT_SIZE),
            scratch: Vec::new(),
            sample_rate,
            heard_audio: false,
        }
    }
}

impl AudioChain for EngineChain {
    fn set_stages(&mut self, params: &[FilterParam]) -> anyhow::Result<()> {
        self.cmd_tx
            .send(AudioCommand::SetStages(params.to_vec()))
            .context("Audio engine is not running")
    }

    fn magnitudes(&mut self, out: &mut Vec<u8>) -> bool {
        self.tap.drain_into(&mut self.scratch);
        if !self.scratch.is_empty() {
            self.analyzer
                .push_interleaved(&self.scratch, self.tap.channels());
            self.scratch.clear();
            self.heard_audio = true;
        }
        if !self.heard_audio {
            return false;
        }

        out.clear();
        out.extend_from_slice(self.analyzer.analyze());
        true
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::{BAND_FREQUENCIES, flat_params};

    #[test]
    fn chain_sends_stages_to_the_engine() {
        let (engine, handle) = AudioEngine::new();
        let mut chain = handle.chain(44_100);
        assert_eq!(chain.sample_rate(), 44_100);

        chain.set_stages(&flat_params(&BAND_FREQUENCIES)).unwrap();
        match engine.cmd_rx.try_recv() {
            Ok(AudioCommand::SetStages(params)) => assert_eq!(params.len(), 30),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chain_fails_once_the_engine_is_gone() {
        let (engine, handle) = AudioEngine::new();
        let mut chain = handle.chain(48_000);
        drop(engine);
        assert!(chain.set_stages(&[]).is_err());
    }

    #[test]
    fn stages_are_stored_without_an_output() {
        let (engine, _handle) = AudioEngine::new();
        let keep_running = engine
            .handle_command(
                AudioCommand::SetStages(flat_params(&BAND_FREQUENCIES)),
                None,
            )
            .unwrap();
        assert!(keep_running);
        assert_eq!(engine.stages.current().len(), 30);
    }

    #[test]
    fn load_without_output_is_an_error() {
        let (engine, _handle) = AudioEngine::new();
        let result = engine.handle_command(AudioCommand::Load("missing.wav".into()), None);
        assert!(result.is_err());
    }

    #[test]
    fn quit_stops_the_loop() {
        let (engine, handle) = AudioEngine::new();
        let keep_running = engine.handle_command(AudioCommand::Quit, None).unwrap();
        assert!(!keep_running);
        assert!(matches!(
            handle.resp_rx.try_recv(),
            Ok(AudioResponse::Shutdown)
        ));
    }

    #[test]
    fn spectrum_appears_once_audio_is_tapped() {
        let (_engine, handle) = AudioEngine::new();
        let mut chain = handle.chain(48_000);
        let mut out = Vec::new();
        assert!(!chain.magnitudes(&mut out));

        handle.tap.set_channels(1);
        let tone: Vec<f32> = (0..DEFAULT_FFT_SIZE)
            .map(|n| (2.0 * std::f32::consts::PI * 100.0 * n as f32 / 2048.0).sin())
            .collect();
        assert!(handle.tap.push(&tone));

        assert!(chain.magnitudes(&mut out));
        assert_eq!(out.len(), DEFAULT_FFT_SIZE / 2);
        assert!(out.iter().any(|&b| b > 0));
        // nothing new tapped, the last spectrum is still reported
        assert!(chain.magnitudes(&mut out));
    }
}
