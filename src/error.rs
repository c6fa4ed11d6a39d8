//! Error types for the segmentation pipeline.

use serde::Serialize;
use thiserror::Error;

/// Reasons a single pipeline invocation can fail.
///
/// None of these escape [`crate::pipeline::Pipeline::process`]; they are
/// folded into a failed [`crate::data::model::ProcessingResult`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload could not be decoded into any supported element width.
    #[error("format error: {0}")]
    Format(String),

    /// A stage left fewer samples than the configured minimum.
    #[error("insufficient valid data after {stage}: {len} samples, need at least {min}")]
    InsufficientData {
        stage: &'static str,
        len: usize,
        min: usize,
    },

    /// Signal shorter than one segment window or block.
    #[error("not enough data to segment: {len} samples, one segment needs {needed}")]
    Segmentation { needed: usize, len: usize },

    /// The sink refused the encoded segments.
    #[error("failed to persist segments: {0}")]
    Persistence(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Format(_) => FailureKind::Format,
            PipelineError::InsufficientData { .. } => FailureKind::InsufficientData,
            PipelineError::Segmentation { .. } => FailureKind::Segmentation,
            PipelineError::Persistence(_) => FailureKind::Persistence,
        }
    }
}

/// Failure class carried on a result, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Format,
    InsufficientData,
    Segmentation,
    Persistence,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Format => "format",
            FailureKind::InsufficientData => "insufficient_data",
            FailureKind::Segmentation => "segmentation",
            FailureKind::Persistence => "persistence",
        };
        f.write_str(label)
    }
}

/// Rejected pipeline configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("overlap must be in [0, 1), got {0}")]
    Overlap(f32),

    #[error("filter_low_hz ({low}) must be below filter_high_hz ({high})")]
    FilterBand { low: f32, high: f32 },
}
