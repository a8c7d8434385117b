// Curve-space <-> audio parameter space.
// x is logarithmic in frequency, y is linear in gain.

use crate::{config::CurveConfig, curve::Point};

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20_000.0;

pub const GAIN_RANGE_WIDE_DB: f32 = 40.0;
pub const GAIN_RANGE_NARROW_DB: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapping {
    width: f32,
    height: f32,
    midline_y: f32,
    gain_scale: f32,
    gain_range_db: f32,
    log_min: f64,
    log_max: f64,
}

impl CoordinateMapping {
    pub fn new(config: &CurveConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            midline_y: config.midline_y,
            gain_scale: config.gain_scale,
            gain_range_db: config.gain_range_db.abs(),
            log_min: (MIN_FREQUENCY as f64).log10(),
            log_max: (MAX_FREQUENCY as f64).log10(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn gain_range_db(&self) -> f32 {
        self.gain_range_db
    }

    /// x in [0, width] to Hz on a log scale. x outside the plane saturates.
    pub fn to_frequency(&self, x: f32) -> f32 {
        if !(self.width > 0.0) || x.is_nan() {
            return MIN_FREQUENCY;
        }
        let fraction = (x as f64 / self.width as f64).clamp(0.0, 1.0);
        let log_f = self.log_min + fraction * (self.log_max - self.log_min);
        10f64.powf(log_f) as f32
    }

    /// Inverse of [`Self::to_frequency`]; frequencies outside 20 Hz..20 kHz saturate.
    pub fn to_x(&self, frequency: f32) -> f32 {
        self.unclamped_x(frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY))
    }

    fn unclamped_x(&self, frequency: f32) -> f32 {
        if !(frequency > 0.0) {
            return f32::NEG_INFINITY;
        }
        let fraction = ((frequency as f64).log10() - self.log_min) / (self.log_max - self.log_min);
        (fraction * self.width as f64) as f32
    }

    /// y to dB, clamped to the configured range
    pub fn to_gain(&self, y: f32) -> f32 {
        if !(self.gain_scale > 0.0) {
            return 0.0;
        }
        self.clamp_gain((self.midline_y - y) / self.gain_scale)
    }

    /// dB to y; gains beyond the range are pinned first
    pub fn to_y(&self, gain: f32) -> f32 {
        self.midline_y - self.clamp_gain(gain) * self.gain_scale
    }

    /// Saturating clamp to +/- range. NaN collapses to 0 dB.
    pub fn clamp_gain(&self, gain: f32) -> f32 {
        if gain.is_nan() {
            return 0.0;
        }
        gain.clamp(-self.gain_range_db, self.gain_range_db)
    }

    pub fn point_to_params(&self, point: Point) -> (f32, f32) {
        (self.to_frequency(point.x), self.to_gain(point.y))
    }

    /// Horizontal extent of one analyser bin in curve-space.
    ///
    /// Bin `bin` of an analyser with `bin_count` bins covers
    /// `[bin - 0.5, bin + 0.5] * sample_rate / (2 * bin_count)` Hz. Returns
    /// `None` when that band lies entirely outside 20 Hz..20 kHz.
    pub fn bin_span(&self, bin: usize, bin_count: usize, sample_rate: u32) -> Option<(f32, f32)> {
        if bin_count == 0 || sample_rate == 0 {
            return None;
        }
        let bin_width = sample_rate as f32 / (2 * bin_count) as f32;
        let centre = bin as f32 * bin_width;
        let low = (centre - bin_width / 2.0).max(MIN_FREQUENCY);
        let high = (centre + bin_width / 2.0).min(MAX_FREQUENCY);
        if high <= low {
            return None;
        }
        Some((self.unclamped_x(low), self.unclamped_x(high)))
    }

    /// Analyser byte magnitude (0..=255) to a bar height in curve-space
    pub fn magnitude_to_height(&self, magnitude: u8) -> f32 {
        magnitude as f32 / u8::MAX as f32 * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> CoordinateMapping {
        CoordinateMapping::new(&CurveConfig::default())
    }

    #[test]
    fn frequency_endpoints() {
        let m = mapping();
        assert!((m.to_frequency(0.0) - 20.0).abs() < 1e-3);
        assert!((m.to_frequency(800.0) - 20_000.0).abs() < 1e-1);
        // one decade per third of the plane
        assert!((m.to_frequency(800.0 / 3.0) - 200.0).abs() < 1e-2);
    }

    #[test]
    fn frequency_mapping_is_invertible() {
        let m = mapping();
        for k in 0..=800 {
            let x = k as f32;
            let back = m.to_x(m.to_frequency(x));
            assert!((back - x).abs() <= 1e-6 * m.width(), "x={x} back={back}");
        }
        for k in 0..=300 {
            let f = 20.0 * 10f32.powf(k as f32 / 100.0);
            let back = m.to_frequency(m.to_x(f));
            assert!(((back - f) / f).abs() < 1e-6, "f={f} back={back}");
        }
    }

    #[test]
    fn frequency_mapping_saturates() {
        let m = mapping();
        assert_eq!(m.to_frequency(-50.0), m.to_frequency(0.0));
        assert_eq!(m.to_frequency(1e6), m.to_frequency(800.0));
        assert_eq!(m.to_x(1.0), 0.0);
        assert!((m.to_x(96_000.0) - 800.0).abs() < 1e-3);
    }

    #[test]
    fn gain_is_linear_and_clamped() {
        let m = mapping();
        assert_eq!(m.to_gain(300.0), 0.0);
        assert_eq!(m.to_gain(200.0), 10.0);
        assert_eq!(m.to_gain(450.0), -15.0);
        assert_eq!(m.to_gain(-1000.0), 40.0);
        assert_eq!(m.to_gain(1000.0), -40.0);
        assert_eq!(m.to_gain(f32::NAN), 0.0);
    }

    #[test]
    fn clamp_is_idempotent() {
        let narrow = CoordinateMapping::new(&CurveConfig {
            gain_range_db: GAIN_RANGE_NARROW_DB,
            ..CurveConfig::default()
        });
        for gain in [-100.0, -10.0, -3.5, 0.0, 9.99, 10.0, 55.0] {
            let once = narrow.clamp_gain(gain);
            assert_eq!(narrow.clamp_gain(once), once);
            assert!(once.abs() <= 10.0);
        }
    }

    #[test]
    fn gain_round_trips_through_y() {
        let m = mapping();
        for gain in [-40.0, -12.5, 0.0, 3.0, 40.0] {
            assert!((m.to_gain(m.to_y(gain)) - gain).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_width_plane_degrades() {
        let m = CoordinateMapping::new(&CurveConfig {
            width: 0.0,
            ..CurveConfig::default()
        });
        assert_eq!(m.to_frequency(10.0), MIN_FREQUENCY);
    }

    #[test]
    fn analyser_bins_land_on_the_plane() {
        let m = mapping();
        // 1024 bins at 48 kHz are 23.4 Hz wide
        assert!(m.bin_span(0, 1024, 48_000).is_none());
        let (start, end) = m.bin_span(100, 1024, 48_000).unwrap();
        assert!(start < end);
        let centre = m.to_x(100.0 * 48_000.0 / 2048.0);
        assert!(start < centre && centre < end);
        assert!(m.bin_span(1000, 1024, 48_000).is_none());
        assert_eq!(m.magnitude_to_height(255), 600.0);
        assert_eq!(m.magnitude_to_height(0), 0.0);
    }
}
