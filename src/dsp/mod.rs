//! Numeric stages applied after extraction: rate conversion, detrending,
//! the single-pole filter cascade, min/max normalization and beat detection.

pub mod iir;
pub mod normalize;
pub mod peaks;
pub mod resample;
