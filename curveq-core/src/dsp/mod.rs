pub mod eq;
pub mod spectrum;
