//! Segmentation policies.
//!
//! A policy owns every stage between channel extraction and encoding, so the
//! orchestrator stays the same whichever one is configured:
//!
//! ```text
//!  Windowed:   validate → resample → detrend/filter → windows → per-window normalize
//!  FixedBlock: range → blocks → normalize with the one range
//! ```
//!
//! Both also report a heart-rate estimate from a filtered copy of the channel.

use log::debug;

use crate::config::{PipelineConfig, SegmentationMode};
use crate::data::filter::retain_valid;
use crate::data::model::{Segment, Signal, ValueRange};
use crate::dsp::iir::condition;
use crate::dsp::normalize::{normalize_segment, normalize_with_range};
use crate::dsp::peaks::estimate_heart_rate;
use crate::dsp::resample::resample_linear;
use crate::error::PipelineError;
use crate::progress::ProgressReporter;

// ---------------------------------------------------------------------------
// Pure segmentation helpers
// ---------------------------------------------------------------------------

/// Window length and stride in samples for a duration/overlap at `rate_hz`.
///
/// The stride is at least one sample.
pub fn window_geometry(duration_s: f32, overlap: f32, rate_hz: f32) -> (usize, usize) {
    let window = (duration_s as f64 * rate_hz as f64).round().max(0.0) as usize;
    let stride = (window as f64 * (1.0 - overlap as f64)).round().max(1.0) as usize;
    (window, stride)
}

/// Overlapping windows of `window` samples, advancing by `stride`, while the
/// window fits.
pub fn split_windows(data: &[f32], window: usize, stride: usize) -> Vec<Segment> {
    if window == 0 || stride == 0 {
        return Vec::new();
    }
    (0..)
        .map(|k| k * stride)
        .take_while(|&start| start + window <= data.len())
        .map(|start| Segment {
            start,
            values: data[start..start + window].to_vec(),
        })
        .collect()
}

/// Contiguous blocks of exactly `block_len` samples; the remainder is dropped.
pub fn split_blocks(data: &[f32], block_len: usize) -> Vec<Segment> {
    if block_len == 0 {
        return Vec::new();
    }
    data.chunks_exact(block_len)
        .enumerate()
        .map(|(i, chunk)| Segment {
            start: i * block_len,
            values: chunk.to_vec(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Policy trait
// ---------------------------------------------------------------------------

/// What a policy hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutput {
    pub segments: Vec<Segment>,
    /// Estimated from the conditioned channel; `None` below two beats.
    pub heart_rate_bpm: Option<f32>,
}

/// Turns an extracted channel into normalized segments.
pub trait SegmentationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        config: &PipelineConfig,
        signal: &Signal,
        channel: Vec<f32>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<PolicyOutput, PipelineError>;
}

/// Build the policy selected by `mode`.
pub fn policy_for(mode: &SegmentationMode) -> Box<dyn SegmentationPolicy> {
    match *mode {
        SegmentationMode::Windowed {
            duration_s,
            overlap,
        } => Box::new(Windowed {
            duration_s,
            overlap,
        }),
        SegmentationMode::FixedBlock { block_len } => Box::new(FixedBlock {
            block_len,
            range: None,
        }),
    }
}

/// Report per-segment progress over the 0.6 → 0.8 span while normalizing.
fn normalize_all(
    segments: Vec<Segment>,
    progress: &mut ProgressReporter<'_>,
    normalize: impl Fn(&[f32]) -> Vec<f32>,
) -> Vec<Segment> {
    let total = segments.len();
    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| {
            progress.report(
                "Normalizing",
                0.6 + 0.2 * i as f32 / total as f32,
                format!("normalizing segment {}/{total}", i + 1),
            );
            Segment {
                values: normalize(&segment.values),
                start: segment.start,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Windowed: overlapping windows of the conditioned signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Windowed {
    pub duration_s: f32,
    pub overlap: f32,
}

impl SegmentationPolicy for Windowed {
    fn name(&self) -> &'static str {
        "windowed"
    }

    fn run(
        &self,
        config: &PipelineConfig,
        signal: &Signal,
        channel: Vec<f32>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<PolicyOutput, PipelineError> {
        let valid = retain_valid(&channel, signal.regime, &config.heuristics);
        progress.report(
            "Validating",
            0.3,
            format!("{} of {} samples valid", valid.len(), channel.len()),
        );
        if valid.len() < config.min_valid_samples {
            return Err(PipelineError::InsufficientData {
                stage: "validation",
                len: valid.len(),
                min: config.min_valid_samples,
            });
        }

        let resampled = resample_linear(&valid, signal.sample_rate_hz, config.target_rate_hz);
        progress.report(
            "Resampling",
            0.4,
            format!(
                "{} Hz -> {} Hz, {} samples",
                signal.sample_rate_hz,
                config.target_rate_hz,
                resampled.len()
            ),
        );
        if resampled.is_empty() {
            return Err(PipelineError::InsufficientData {
                stage: "resampling",
                len: 0,
                min: 1,
            });
        }

        let filtered = condition(
            &resampled,
            config.filter_low_hz,
            config.filter_high_hz,
            config.target_rate_hz,
        );
        progress.report("Filtering", 0.5, "detrended and band-limited");
        let heart_rate_bpm = estimate_heart_rate(&filtered, config.target_rate_hz);

        let (window, stride) =
            window_geometry(self.duration_s, self.overlap, config.target_rate_hz);
        let segments = split_windows(&filtered, window, stride);
        debug!(
            "{} windows of {window} samples, stride {stride}, over {} samples",
            segments.len(),
            filtered.len()
        );
        if segments.is_empty() {
            return Err(PipelineError::Segmentation {
                needed: window,
                len: filtered.len(),
            });
        }
        progress.report(
            "Segmenting",
            0.6,
            format!("{} segments of {window} samples", segments.len()),
        );

        Ok(PolicyOutput {
            segments: normalize_all(segments, progress, normalize_segment),
            heart_rate_bpm,
        })
    }
}

// ---------------------------------------------------------------------------
// FixedBlock: raw blocks normalized with one shared range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FixedBlock {
    pub block_len: usize,
    /// Range to normalize with; computed from the channel when `None`.
    pub range: Option<ValueRange>,
}

impl SegmentationPolicy for FixedBlock {
    fn name(&self) -> &'static str {
        "fixed_block"
    }

    fn run(
        &self,
        config: &PipelineConfig,
        signal: &Signal,
        channel: Vec<f32>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<PolicyOutput, PipelineError> {
        if channel.len() < config.min_valid_samples {
            return Err(PipelineError::InsufficientData {
                stage: "extraction",
                len: channel.len(),
                min: config.min_valid_samples,
            });
        }

        let range = match self.range.or_else(|| ValueRange::of(&channel)) {
            Some(range) => range,
            None => {
                return Err(PipelineError::InsufficientData {
                    stage: "range computation",
                    len: 0,
                    min: 1,
                })
            }
        };
        progress.report(
            "Ranging",
            0.3,
            format!("normalization range {} .. {}", range.min, range.max),
        );

        let segments = split_blocks(&channel, self.block_len);
        if segments.is_empty() {
            return Err(PipelineError::Segmentation {
                needed: self.block_len,
                len: channel.len(),
            });
        }
        progress.report(
            "Segmenting",
            0.6,
            format!("{} blocks of {} samples", segments.len(), self.block_len),
        );

        // Blocks stay unfiltered; the beat search runs on a conditioned copy.
        let finite: Vec<f32> = channel.iter().copied().filter(|v| v.is_finite()).collect();
        let conditioned = condition(
            &finite,
            config.filter_low_hz,
            config.filter_high_hz,
            signal.sample_rate_hz,
        );
        let heart_rate_bpm = estimate_heart_rate(&conditioned, signal.sample_rate_hz);

        Ok(PolicyOutput {
            segments: normalize_all(segments, progress, |values| {
                normalize_with_range(values, range)
            }),
            heart_rate_bpm,
        })
    }
}
