// Filter bank driven by the curve: one biquad stage per band.
// Coefficients follow the RBJ Audio EQ Cookbook.

use std::f32::consts::PI;

use crate::{
    bands::{FilterParam, FilterShape},
    mapping::{MAX_FREQUENCY, MIN_FREQUENCY},
};

pub const DEFAULT_Q: f32 = 0.707;

/// Keep centre frequencies safely below nyquist
const MAX_NYQUIST_FRACTION: f32 = 0.45;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterStage {
    pub shape: FilterShape,
    /// centre / corner frequency of the filter (in Hz)
    pub freq: f32,
    /// Filter gain in dB
    pub gain: f32,
    /// Filter Q Factor/resonance
    pub q: f32,
}

impl FilterStage {
    pub fn new(shape: FilterShape, freq: f32, gain: f32) -> Self {
        Self {
            shape,
            freq,
            gain,
            q: DEFAULT_Q,
        }
    }

    /// Response of this stage in dB at `frequency_hz`
    pub fn magnitude_db(&self, frequency_hz: f32, sample_rate: f32) -> f32 {
        // ensure that frequency is not below zero or greater than nyquist frequency
        if frequency_hz <= 0.0 || frequency_hz >= sample_rate / 2.0 {
            return 0.0;
        }

        let (b0, b1, b2, a0, a1, a2) = self.raw_coefficients(sample_rate);

        // Evaluate H(z) at z = e^(jw)
        let w = 2.0 * PI * frequency_hz / sample_rate;
        let cos_w = w.cos();
        let cos_2w = (2.0 * w).cos();
        let sin_w = w.sin();
        let sin_2w = (2.0 * w).sin();

        let num_r = b0 + b1 * cos_w + b2 * cos_2w;
        let num_i = b1 * sin_w + b2 * sin_2w;

        let den_r = a0 + a1 * cos_w + a2 * cos_2w;
        let den_i = a1 * sin_w + a2 * sin_2w;

        let mag_sq = (num_r * num_r + num_i * num_i) / (den_r * den_r + den_i * den_i);

        // 10 * log10(|H|^2) == 20 * log10(|H|)
        10.0 * mag_sq.log10()
    }

    fn clamped_freq(&self, sample_rate: f32) -> f32 {
        self.freq
            .clamp(MIN_FREQUENCY, MAX_FREQUENCY)
            .min(sample_rate * MAX_NYQUIST_FRACTION)
    }

    /// (b0, b1, b2, a0, a1, a2) before normalisation
    fn raw_coefficients(&self, sample_rate: f32) -> (f32, f32, f32, f32, f32, f32) {
        let w0 = 2.0 * PI * self.clamped_freq(sample_rate) / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        // amplitude in linear scale (converted from dB)
        // A = 10^(Adb / 40.0)
        let a = 10.0f32.powf(self.gain / 40.0);

        match self.shape {
            FilterShape::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterShape::LowShelf => {
                let sqrt_a = a.sqrt();
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha,
                )
            }
            FilterShape::HighShelf => {
                let sqrt_a = a.sqrt();
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha,
                )
            }
        }
    }
}

impl From<&FilterParam> for FilterStage {
    fn from(param: &FilterParam) -> Self {
        FilterStage::new(param.shape, param.frequency, param.gain)
    }
}

/// Biquad filter (Direct Form II Transposed)
/// $$ y[n] = frac{b0/a0}x[n] + frac{b1/a0}x[n-1] + frac{b2/a0}x[n-2] - frac{a1/a0}y[n-1] - frac{a2/a0}y[n-2] $$
#[derive(Clone, Default, Debug)]
struct Biquad {
    // Coefficients
    a1: f32,
    a2: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    // Previous State
    z1: f32,
    z2: f32,
}

impl Biquad {
    fn process(&mut self, sample: f32) -> f32 {
        // y[n] = b0*x[n] + z1[n-1]
        // z1[n] = b1*x[n] - a1*y[n] + z2[n-1]
        // z2[n] = b2*x[n] - a2*y[n]
        let out = self.b0 * sample + self.z1;
        self.z1 = self.b1 * sample - self.a1 * out + self.z2;
        self.z2 = self.b2 * sample - self.a2 * out;

        out
    }

    /// Recalculate coefficients, keeping the delay line
    fn update(&mut self, stage: &FilterStage, sample_rate: f32) {
        let (b0, b1, b2, a0, a1, a2) = stage.raw_coefficients(sample_rate);

        let inv_a0 = 1.0 / a0;
        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = a1 * inv_a0;
        self.a2 = a2 * inv_a0;
    }
}

/// A chain of filter stages applied to interleaved audio
#[derive(Clone, Debug)]
pub struct Equalizer {
    pub sample_rate: u32,
    stages: Vec<FilterStage>,
    /// [channel][stage]
    processors: Vec<Vec<Biquad>>,
    num_channels: u16,
}

impl Equalizer {
    pub fn new(sample_rate: u32, num_channels: u16) -> Self {
        Self {
            sample_rate,
            stages: Vec::new(),
            processors: Vec::new(),
            num_channels,
        }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Replace every stage. Filter state survives when the stage count is unchanged.
    pub fn set_params(&mut self, params: &[FilterParam]) {
        self.stages = params.iter().map(FilterStage::from).collect();
        self.parameters_changed();
    }

    pub fn process_frame(&mut self, frame: &mut [f32]) {
        let num_ch = self.num_channels as usize;
        if num_ch == 0 {
            return;
        }

        for (i, sample) in frame.iter_mut().enumerate() {
            let channel_idx = i % num_ch;

            if let Some(channel_filters) = self.processors.get_mut(channel_idx) {
                let mut s = *sample;
                for biquad in channel_filters {
                    s = biquad.process(s);
                }
                *sample = s;
            }
        }
    }

    /// Drop all filter state and recompute from scratch
    fn rebuild_processors(&mut self) {
        self.processors.clear();

        for _ in 0..self.num_channels {
            let channel_chain = self
                .stages
                .iter()
                .map(|stage| {
                    let mut bq = Biquad::default();
                    bq.update(stage, self.sample_rate as f32);
                    bq
                })
                .collect();
            self.processors.push(channel_chain);
        }
    }

    fn parameters_changed(&mut self) {
        if self.processors.len() != self.num_channels as usize
            || self
                .processors
                .iter()
                .any(|chain| chain.len() != self.stages.len())
        {
            self.rebuild_processors();
            return;
        }

        let sample_rate = self.sample_rate as f32;
        for channel_filters in &mut self.processors {
            for (biquad, stage) in channel_filters.iter_mut().zip(&self.stages) {
                biquad.update(stage, sample_rate);
            }
        }
    }

    /// Combined response of all stages at one frequency, in dB
    pub fn magnitude_db(&self, frequency_hz: f32) -> f32 {
        self.stages
            .iter()
            .map(|stage| stage.magnitude_db(frequency_hz, self.sample_rate as f32))
            .sum()
    }

    /// Get the combined frequency response curve for plotting
    /// Returns Vector of (Frequency, Gain_dB) points, log spaced over 20 Hz..20 kHz
    pub fn response_curve(&self, width: usize) -> Vec<(f32, f32)> {
        if width == 0 {
            return Vec::new();
        }
        let log_start = MIN_FREQUENCY.ln();
        let log_end = MAX_FREQUENCY.ln();
        let step = (log_end - log_start) / (width.max(2) as f32 - 1.0);

        (0..width)
            .map(|i| {
                let f = (log_start + step * i as f32).exp();
                (f, self.magnitude_db(f))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::{BAND_FREQUENCIES, flat_params};

    #[test]
    fn flat_bank_is_transparent() {
        let mut eq = Equalizer::new(48_000, 2);
        eq.set_params(&flat_params(&BAND_FREQUENCIES));
        for (_, db) in eq.response_curve(64) {
            assert!(db.abs() < 1e-3, "{db}");
        }

        // a steady input long enough for every stage to settle
        let settled = (0..4_800)
            .map(|_| {
                let mut frame = [0.25, -0.5];
                eq.process_frame(&mut frame);
                frame
            })
            .last()
            .unwrap();
        assert!((settled[0] - 0.25).abs() < 1e-4, "{}", settled[0]);
        assert!((settled[1] + 0.5).abs() < 1e-4, "{}", settled[1]);
    }

    #[test]
    fn peaking_stage_hits_its_gain_at_centre() {
        let stage = FilterStage::new(FilterShape::Peaking, 1000.0, 6.0);
        let db = stage.magnitude_db(1000.0, 48_000.0);
        assert!((db - 6.0).abs() < 0.05, "{db}");
        // far away the peak has no effect
        assert!(stage.magnitude_db(30.0, 48_000.0).abs() < 0.2);
    }

    #[test]
    fn shelves_boost_their_side() {
        let low = FilterStage::new(FilterShape::LowShelf, 200.0, 12.0);
        assert!(low.magnitude_db(25.0, 48_000.0) > 11.0);
        assert!(low.magnitude_db(10_000.0, 48_000.0).abs() < 0.5);

        let high = FilterStage::new(FilterShape::HighShelf, 5000.0, -12.0);
        assert!(high.magnitude_db(18_000.0, 48_000.0) < -11.0);
        assert!(high.magnitude_db(50.0, 48_000.0).abs() < 0.5);
    }

    #[test]
    fn stage_count_changes_rebuild() {
        let mut eq = Equalizer::new(44_100, 1);
        eq.set_params(&flat_params(&BAND_FREQUENCIES));
        assert_eq!(eq.stages().len(), 30);
        eq.set_params(&flat_params(&BAND_FREQUENCIES)[..3]);
        assert_eq!(eq.stages().len(), 3);
        let mut frame = [1.0];
        eq.process_frame(&mut frame);
        assert!(frame[0].is_finite());
    }

    #[test]
    fn top_band_survives_low_sample_rates() {
        let mut eq = Equalizer::new(8_000, 1);
        eq.set_params(&[FilterParam {
            frequency: 20_000.0,
            gain: 6.0,
            shape: FilterShape::HighShelf,
        }]);
        let mut frame = [0.5];
        for _ in 0..64 {
            eq.process_frame(&mut frame);
        }
        assert!(frame[0].is_finite());
    }

    #[test]
    fn empty_curve() {
        let eq = Equalizer::new(48_000, 2);
        assert!(eq.response_curve(0).is_empty());
        assert_eq!(eq.magnitude_db(1000.0), 0.0);
    }
}
