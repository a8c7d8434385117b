use strum::{EnumIter, IntoEnumIterator};

use crate::{
    curve::CurveView,
    mapping::{CoordinateMapping, MAX_FREQUENCY},
};

/// ISO-like third-octave centres driving the filter bank
pub const BAND_FREQUENCIES: [f32; 30] = [
    25.0, 31.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0, 500.0,
    630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0, 8000.0,
    10000.0, 12500.0, 16000.0, 20000.0,
];

/// Filter shape of one stage in the bank
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum FilterShape {
    LowShelf,
    #[default]
    Peaking,
    HighShelf,
}

impl FilterShape {
    /// Shelves on the outer bands, peaking in between
    pub fn for_band(index: usize, count: usize) -> FilterShape {
        match (index, count) {
            (_, 0 | 1) => FilterShape::Peaking,
            (0, _) => FilterShape::LowShelf,
            (i, n) if i == n - 1 => FilterShape::HighShelf,
            _ => FilterShape::Peaking,
        }
    }
}

/// Parameters for one filter stage, rebuilt whenever the curve changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParam {
    /// Hz
    pub frequency: f32,
    /// dB
    pub gain: f32,
    pub shape: FilterShape,
}

impl FilterParam {
    pub fn flat(frequency: f32, shape: FilterShape) -> Self {
        Self {
            frequency,
            gain: 0.0,
            shape,
        }
    }
}

/// 0 dB at every band, the bank's state before any curve is applied
pub fn flat_params(bands: &[f32]) -> Vec<FilterParam> {
    let count = bands.len();
    bands
        .iter()
        .enumerate()
        .map(|(i, &f)| FilterParam::flat(f, FilterShape::for_band(i, count)))
        .collect()
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum SamplingMode {
    /// One curve sample per band at t = i / (N - 1)
    #[default]
    PointSample,
    /// Mean gain of the curve across each band's slice of the x axis
    RangeAverage,
}

impl SamplingMode {
    pub fn next(&self) -> SamplingMode {
        let mut modes = SamplingMode::iter();
        for mode in modes.by_ref() {
            if mode == *self {
                break;
            }
        }
        modes.next().unwrap_or(SamplingMode::PointSample)
    }
}

/// Derive one [`FilterParam`] per entry of `bands`, in table order.
///
/// `use_curve_frequency` only applies to [`SamplingMode::PointSample`];
/// range averaging always keeps the nominal band frequency. `steps`
/// controls how densely a Bezier curve is sampled for x lookups.
pub fn sample_bands(
    curve: &CurveView,
    mapping: &CoordinateMapping,
    bands: &[f32],
    mode: SamplingMode,
    use_curve_frequency: bool,
    steps: usize,
) -> Vec<FilterParam> {
    match mode {
        SamplingMode::PointSample => point_sample(curve, mapping, bands, use_curve_frequency),
        SamplingMode::RangeAverage => range_average(curve, mapping, bands, steps),
    }
}

fn point_sample(
    curve: &CurveView,
    mapping: &CoordinateMapping,
    bands: &[f32],
    use_curve_frequency: bool,
) -> Vec<FilterParam> {
    let count = bands.len();
    bands
        .iter()
        .enumerate()
        .map(|(i, &nominal)| {
            let t = if count > 1 {
                i as f32 / (count - 1) as f32
            } else {
                0.0
            };
            let (frequency, gain) = mapping.point_to_params(curve.point_at(t));
            FilterParam {
                frequency: if use_curve_frequency { frequency } else { nominal },
                gain: mapping.clamp_gain(gain),
                shape: FilterShape::for_band(i, count),
            }
        })
        .collect()
}

fn range_average(
    curve: &CurveView,
    mapping: &CoordinateMapping,
    bands: &[f32],
    steps: usize,
) -> Vec<FilterParam> {
    let count = bands.len();
    if count == 0 {
        return Vec::new();
    }
    let lookup = curve.y_lookup(steps);

    bands
        .iter()
        .enumerate()
        .map(|(i, &nominal)| {
            let upper = bands.get(i + 1).copied().unwrap_or(MAX_FREQUENCY);
            let x_start = mapping.to_x(nominal);
            let x_end = mapping.to_x(upper);

            // one sample per pixel at x_start, x_start + 1, ... below x_end;
            // counted in integers since f32 stops resolving +1 past 2^24
            let span = x_end as f64 - x_start as f64;
            let samples = if span > 0.0 { span.ceil() as usize } else { 0 };
            let sum: f64 = (0..samples)
                .map(|k| {
                    let x = (x_start as f64 + k as f64) as f32;
                    mapping.to_gain(lookup.y_at(x)) as f64
                })
                .sum();

            let gain = if samples == 0 {
                0.0
            } else {
                (sum / samples as f64) as f32
            };
            FilterParam {
                frequency: nominal,
                gain: mapping.clamp_gain(gain),
                shape: FilterShape::for_band(i, count),
            }
        })
        .collect()
}
