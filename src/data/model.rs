use std::fmt;

use serde::Serialize;

use crate::error::{FailureKind, PipelineError};

// ---------------------------------------------------------------------------
// DataRegime – what kind of values a recording holds
// ---------------------------------------------------------------------------

/// Inferred category of a recording's value distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataRegime {
    /// Raw optical counts with a large negative DC offset.
    RawPpg,
    /// Already scaled to roughly [0, 1].
    Normalized,
    /// Unsigned converter readings.
    Adc,
    Unknown,
}

impl fmt::Display for DataRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DataRegime::RawPpg => "raw PPG (with DC offset)",
            DataRegime::Normalized => "normalized [0,1]",
            DataRegime::Adc => "ADC values (unsigned)",
            DataRegime::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Signal – one decoded recording plus what was inferred about it
// ---------------------------------------------------------------------------

/// Decoded samples together with the inferred structure.
#[derive(Debug, Clone)]
pub struct Signal {
    pub samples: Vec<f32>,
    /// Estimated original sampling rate in Hz.
    pub sample_rate_hz: f32,
    /// 1, 2 or 4 interleaved channels.
    pub channels: usize,
    pub regime: DataRegime,
}

// ---------------------------------------------------------------------------
// ValueRange – explicit (min, max) pair
// ---------------------------------------------------------------------------

/// Closed value range used for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    /// Range of the finite values in `values`; `None` if there are none.
    pub fn of(values: &[f32]) -> Option<Self> {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(ValueRange { min: v, max: v }),
                Some(r) => Some(ValueRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Smallest range covering both.
    pub fn union(self, other: ValueRange) -> ValueRange {
        ValueRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

// ---------------------------------------------------------------------------
// Segment – one unit handed to the estimator
// ---------------------------------------------------------------------------

/// A contiguous window cut out of a processed signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index of the first sample in the signal it was cut from.
    pub start: usize,
    pub values: Vec<f32>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Progress and result
// ---------------------------------------------------------------------------

/// Progress notification emitted after each stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingProgress {
    pub stage: &'static str,
    /// In [0, 1]; never decreases within one invocation.
    pub fraction: f32,
    pub message: String,
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    /// Identifiers of persisted segments, in segment order.
    pub output_ids: Vec<String>,
    pub segment_count: usize,
    /// Beats per minute detected in the conditioned channel, when any.
    pub heart_rate_bpm: Option<f32>,
    /// Set only when `success` is false.
    pub failure: Option<FailureKind>,
}

impl ProcessingResult {
    pub fn succeeded(output_ids: Vec<String>, heart_rate_bpm: Option<f32>) -> Self {
        ProcessingResult {
            success: true,
            message: format!("processed successfully, {} segments created", output_ids.len()),
            segment_count: output_ids.len(),
            output_ids,
            heart_rate_bpm,
            failure: None,
        }
    }

    pub fn failed(err: &PipelineError) -> Self {
        ProcessingResult {
            success: false,
            message: err.to_string(),
            output_ids: Vec::new(),
            segment_count: 0,
            heart_rate_bpm: None,
            failure: Some(err.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_skips_non_finite() {
        let range = ValueRange::of(&[f32::NAN, 3.0, -1.0, f32::INFINITY]).unwrap();
        assert_eq!(range, ValueRange { min: -1.0, max: 3.0 });
        assert_eq!(range.span(), 4.0);
        assert_eq!(ValueRange::of(&[f32::NAN]), None);
        assert_eq!(ValueRange::of(&[]), None);
    }

    #[test]
    fn union_widens() {
        let a = ValueRange { min: 0.0, max: 1.0 };
        let b = ValueRange { min: -2.0, max: 0.5 };
        assert_eq!(a.union(b), ValueRange { min: -2.0, max: 1.0 });
    }

    #[test]
    fn failed_result_carries_kind_and_no_outputs() {
        let err = PipelineError::InsufficientData {
            stage: "validation",
            len: 500,
            min: 1000,
        };
        let result = ProcessingResult::failed(&err);
        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::InsufficientData));
        assert!(result.message.contains("insufficient valid data"));
        assert!(result.output_ids.is_empty());
    }
}
