use std::time::Duration;

use crate::{
    bands::SamplingMode,
    curve::BlendMode,
    error::ConfigError,
    mapping::GAIN_RANGE_WIDE_DB,
};

pub const DEFAULT_WIDTH: f32 = 800.0;
pub const DEFAULT_HEIGHT: f32 = 600.0;
pub const DEFAULT_GAIN_SCALE: f32 = 10.0;
pub const DEFAULT_HIT_RADIUS: f32 = 5.0;
pub const DEFAULT_MAX_POINTS: usize = 16;
pub const DEFAULT_SIGMA: f32 = 60.0;
pub const DEFAULT_POLYLINE_STEPS: usize = 100;
/// Delay between pointer release and the drag session actually ending
pub const DEFAULT_RELEASE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Everything that shapes how the curve is edited and mapped onto filters.
///
/// Curve-space is a `width` x `height` plane with y growing downwards, so a
/// point above `midline_y` boosts and a point below it cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveConfig {
    pub width: f32,
    pub height: f32,
    /// y coordinate that maps to 0 dB
    pub midline_y: f32,
    /// Pixels per dB
    pub gain_scale: f32,
    /// Gains are clamped to +/- this many dB
    pub gain_range_db: f32,
    pub hit_radius: f32,
    /// Upper bound on the total point count, anchors included
    pub max_points: usize,
    pub blend: BlendMode,
    /// Width of one bump in Gaussian blend mode
    pub sigma: f32,
    pub sampling: SamplingMode,
    /// Point-sample mode only: give each band the curve's frequency instead of its nominal one
    pub use_curve_frequency: bool,
    /// Keep anchor x pinned to the domain edges while dragging
    pub lock_anchor_x: bool,
    pub release_debounce: Duration,
    pub polyline_steps: usize,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            midline_y: DEFAULT_HEIGHT / 2.0,
            gain_scale: DEFAULT_GAIN_SCALE,
            gain_range_db: GAIN_RANGE_WIDE_DB,
            hit_radius: DEFAULT_HIT_RADIUS,
            max_points: DEFAULT_MAX_POINTS,
            blend: BlendMode::Bezier,
            sigma: DEFAULT_SIGMA,
            sampling: SamplingMode::PointSample,
            use_curve_frequency: true,
            lock_anchor_x: true,
            release_debounce: DEFAULT_RELEASE_DEBOUNCE,
            polyline_steps: DEFAULT_POLYLINE_STEPS,
        }
    }
}

impl CurveConfig {
    pub fn builder() -> CurveConfigBuilder {
        CurveConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::InvalidPlane {
                width: self.width,
                height: self.height,
            });
        }
        if !(0.0..=self.height).contains(&self.midline_y) {
            return Err(ConfigError::MidlineOutOfPlane(self.midline_y));
        }
        if !(self.gain_scale > 0.0) {
            return Err(ConfigError::InvalidGainScale(self.gain_scale));
        }
        if !(self.gain_range_db > 0.0) {
            return Err(ConfigError::InvalidGainRange(self.gain_range_db));
        }
        if !(self.hit_radius > 0.0) {
            return Err(ConfigError::InvalidHitRadius(self.hit_radius));
        }
        if !(self.sigma > 0.0) {
            return Err(ConfigError::InvalidSigma(self.sigma));
        }
        if self.max_points < 2 {
            return Err(ConfigError::TooFewPoints(self.max_points));
        }
        if self.polyline_steps == 0 {
            return Err(ConfigError::NoPolylineSteps);
        }
        Ok(())
    }
}

/// Builds a [`CurveConfig`] starting from the defaults; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct CurveConfigBuilder {
    config: CurveConfig,
    midline_set: bool,
}

impl CurveConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plane size. The midline follows the new height unless it was set explicitly.
    pub fn plane(mut self, width: f32, height: f32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn midline_y(mut self, midline_y: f32) -> Self {
        self.config.midline_y = midline_y;
        self.midline_set = true;
        self
    }

    pub fn gain_scale(mut self, pixels_per_db: f32) -> Self {
        self.config.gain_scale = pixels_per_db;
        self
    }

    pub fn gain_range_db(mut self, range: f32) -> Self {
        self.config.gain_range_db = range;
        self
    }

    pub fn hit_radius(mut self, radius: f32) -> Self {
        self.config.hit_radius = radius;
        self
    }

    pub fn max_points(mut self, max_points: usize) -> Self {
        self.config.max_points = max_points;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.config.blend = blend;
        self
    }

    pub fn sigma(mut self, sigma: f32) -> Self {
        self.config.sigma = sigma;
        self
    }

    pub fn sampling(mut self, sampling: SamplingMode) -> Self {
        self.config.sampling = sampling;
        self
    }

    pub fn use_curve_frequency(mut self, enabled: bool) -> Self {
        self.config.use_curve_frequency = enabled;
        self
    }

    pub fn lock_anchor_x(mut self, locked: bool) -> Self {
        self.config.lock_anchor_x = locked;
        self
    }

    pub fn release_debounce(mut self, delay: Duration) -> Self {
        self.config.release_debounce = delay;
        self
    }

    pub fn polyline_steps(mut self, steps: usize) -> Self {
        self.config.polyline_steps = steps;
        self
    }

    pub fn build(mut self) -> Result<CurveConfig, ConfigError> {
        if !self.midline_set {
            self.config.midline_y = self.config.height / 2.0;
        }
        self.config.validate()?;
        Ok(self.config)
    }
}
