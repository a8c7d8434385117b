use thiserror::Error;

/// Rejected values from [`crate::config::CurveConfigBuilder::build`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("plane size must be positive, got {width}x{height}")]
    InvalidPlane { width: f32, height: f32 },
    #[error("midline {0} lies outside the plane")]
    MidlineOutOfPlane(f32),
    #[error("gain scale must be positive, got {0}")]
    InvalidGainScale(f32),
    #[error("gain range must be positive, got {0} dB")]
    InvalidGainRange(f32),
    #[error("hit radius must be positive, got {0}")]
    InvalidHitRadius(f32),
    #[error("gaussian sigma must be positive, got {0}")]
    InvalidSigma(f32),
    #[error("at least two control points are required, got a maximum of {0}")]
    TooFewPoints(usize),
    #[error("polyline needs at least one step")]
    NoPolylineSteps,
}
