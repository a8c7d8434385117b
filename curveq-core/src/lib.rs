pub mod bands;
pub mod commands;
pub mod config;
pub mod curve;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod mapping;
pub mod render;
pub mod session;
pub mod source;

pub use bands::{BAND_FREQUENCIES, FilterParam, FilterShape, SamplingMode};
pub use config::{CurveConfig, CurveConfigBuilder};
pub use curve::{BlendMode, ControlPoint, ControlPointSet, Point, PointRole};
pub use error::ConfigError;
pub use interaction::{InteractionOutcome, InteractionState, PointerEvent};
pub use mapping::CoordinateMapping;
pub use session::{ApplyOutcome, AudioChain, AudioSession, CurveEditor, CurveSnapshot};

/// Logger for headless use of the core. Level comes from `RUST_LOG`,
/// `info` when unset. A second call is a no-op.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
