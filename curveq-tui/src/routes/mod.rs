pub mod bands;
pub mod curve;
pub mod log;
pub mod settings;
