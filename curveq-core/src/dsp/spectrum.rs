use std::{collections::VecDeque, f32::consts::PI, sync::Arc};

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex};

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DB: f32 = -100.0;
pub const DEFAULT_MAX_DB: f32 = -30.0;

/// Magnitude spectrum of the most recent `fft_size` samples, as bytes.
///
/// Each analysis windows the newest block with a Hann window, smooths
/// magnitudes over time and maps [min_db, max_db] onto 0..=255, the same
/// scale the browser analyser node uses.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    history: VecDeque<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft_size", &self.fft_size)
            .field("buffered", &self.history.len())
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// `fft_size` is rounded up to a power of two (minimum 32)
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        let bins = fft_size / 2;

        Self {
            fft,
            fft_size,
            window: hann(fft_size),
            history: VecDeque::with_capacity(fft_size),
            input,
            output,
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            smoothing: DEFAULT_SMOOTHING,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 0.99);
    }

    /// Append interleaved samples, mixed down to mono
    pub fn push_interleaved(&mut self, samples: &[f32], channels: u16) {
        let channels = channels.max(1) as usize;
        for frame in samples.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if self.history.len() == self.fft_size {
                self.history.pop_front();
            }
            self.history.push_back(mono);
        }
    }

    /// Run one analysis over the buffered block and return the byte spectrum.
    /// Missing history is treated as silence.
    pub fn analyze(&mut self) -> &[u8] {
        let missing = self.fft_size - self.history.len();
        for (i, slot) in self.input.iter_mut().enumerate() {
            let sample = if i < missing {
                0.0
            } else {
                self.history[i - missing]
            };
            *slot = sample * self.window[i];
        }

        if let Err(e) = self.fft.process(&mut self.input, &mut self.output) {
            log::warn!("spectrum analysis failed: {}", e);
            return &self.bytes;
        }

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_db - self.min_db;
        for (bin, value) in self.output.iter().take(self.smoothed.len()).enumerate() {
            let magnitude = value.norm() * scale;
            let smoothed = self.smoothing * self.smoothed[bin] + (1.0 - self.smoothing) * magnitude;
            self.smoothed[bin] = smoothed;

            let db = 20.0 * smoothed.log10();
            let scaled = (db - self.min_db) / range * 255.0;
            self.bytes[bin] = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }
        &self.bytes
    }

    /// Last result of [`Self::analyze`]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / len as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_a_power_of_two() {
        let analyzer = SpectrumAnalyzer::new(1500);
        assert_eq!(analyzer.fft_size(), 2048);
        assert_eq!(analyzer.bin_count(), 1024);
        assert_eq!(SpectrumAnalyzer::new(0).fft_size(), 32);
    }

    #[test]
    fn silence_is_all_zero() {
        let mut analyzer = SpectrumAnalyzer::new(DEFAULT_FFT_SIZE);
        analyzer.push_interleaved(&vec![0.0; 4096], 2);
        assert!(analyzer.analyze().iter().all(|&b| b == 0));
        // nothing buffered at all
        let mut empty = SpectrumAnalyzer::new(DEFAULT_FFT_SIZE);
        assert!(empty.analyze().iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        analyzer.set_smoothing(0.0);
        let bin = 64;
        let samples: Vec<f32> = (0..1024)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / 1024.0).sin())
            .collect();
        analyzer.push_interleaved(&samples, 1);
        let bytes = analyzer.analyze();
        let peak = bytes
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .map(|(i, _)| i);
        assert_eq!(bytes[bin], 255);
        assert!(peak.is_some_and(|i| (i as i64 - bin as i64).abs() <= 1));
        assert_eq!(bytes[400], 0);
    }

    #[test]
    fn history_keeps_only_the_newest_block() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        analyzer.push_interleaved(&vec![1.0; 200], 1);
        assert_eq!(analyzer.history.len(), 64);
        analyzer.reset();
        assert!(analyzer.history.is_empty());
    }
}
