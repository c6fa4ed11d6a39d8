use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_TARGET_RATE_HZ: f32 = 50.0;
pub const DEFAULT_FILTER_LOW_HZ: f32 = 0.5;
pub const DEFAULT_FILTER_HIGH_HZ: f32 = 8.0;
pub const DEFAULT_MIN_VALID_SAMPLES: usize = 1000;
pub const DEFAULT_SEGMENT_DURATION_S: f32 = 10.0;
pub const DEFAULT_OVERLAP: f32 = 0.5;
pub const DEFAULT_BLOCK_LEN: usize = 1024;

// ---------------------------------------------------------------------------
// Heuristic thresholds
// ---------------------------------------------------------------------------

/// Every magic number used by structure inference and validity bounds.
///
/// None of these come from file metadata; they are tuned to the recordings the
/// device produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// `|v|` above this counts as a large (raw sensor) magnitude.
    pub large_magnitude: f32,
    /// `|v|` below this counts as a small (normalized) magnitude.
    pub small_magnitude: f32,
    /// Flat length must exceed this (and be a multiple of 4) for 4 channels.
    pub four_channel_min_len: usize,
    /// Flat length must exceed this (and be even) for 2 channels.
    pub two_channel_min_len: usize,
    /// Flat length above this suggests a 100 Hz recording.
    pub rate_100hz_min_len: usize,
    /// Flat length above this suggests a 50 Hz recording.
    pub rate_50hz_min_len: usize,
    /// Sample rate assumed for everything shorter.
    pub fallback_rate_hz: f32,
    /// Validity bounds never extend past `±hard_bound`.
    pub hard_bound: f32,
    /// Extremes beyond `±scaled_bound` get a multiplicative margin.
    pub scaled_bound: f32,
    pub scale_factor: f32,
    /// Additive margin as a fraction of the value range.
    pub range_margin: f32,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            large_magnitude: 10_000.0,
            small_magnitude: 1.0,
            four_channel_min_len: 4000,
            two_channel_min_len: 2000,
            rate_100hz_min_len: 100_000,
            rate_50hz_min_len: 50_000,
            fallback_rate_hz: 25.0,
            hard_bound: 1_000_000.0,
            scaled_bound: 100_000.0,
            scale_factor: 1.2,
            range_margin: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Segmentation mode
// ---------------------------------------------------------------------------

/// Which segmentation / normalization policy a pipeline runs.
///
/// The two are alternatives, not layers: the downstream estimator has been fed
/// both shapes, so the caller picks one explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Overlapping windows over the filtered, resampled signal, each
    /// normalized on its own.
    Windowed { duration_s: f32, overlap: f32 },
    /// Contiguous blocks of the raw extracted channel, normalized with one
    /// range for the whole recording.
    FixedBlock { block_len: usize },
}

impl Default for SegmentationMode {
    fn default() -> Self {
        SegmentationMode::Windowed {
            duration_s: DEFAULT_SEGMENT_DURATION_S,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl SegmentationMode {
    pub fn fixed_block() -> Self {
        SegmentationMode::FixedBlock {
            block_len: DEFAULT_BLOCK_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Read-only configuration shared by every invocation of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_rate_hz: f32,
    pub filter_low_hz: f32,
    pub filter_high_hz: f32,
    /// Fewer samples than this after validation (or extraction, for fixed
    /// blocks) aborts the invocation.
    pub min_valid_samples: usize,
    pub segmentation: SegmentationMode,
    pub heuristics: Heuristics,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_rate_hz: DEFAULT_TARGET_RATE_HZ,
            filter_low_hz: DEFAULT_FILTER_LOW_HZ,
            filter_high_hz: DEFAULT_FILTER_HIGH_HZ,
            min_valid_samples: DEFAULT_MIN_VALID_SAMPLES,
            segmentation: SegmentationMode::default(),
            heuristics: Heuristics::default(),
        }
    }
}

impl PipelineConfig {
    /// Check that the numbers describe a runnable pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("target_rate_hz", self.target_rate_hz as f64)?;
        positive("filter_low_hz", self.filter_low_hz as f64)?;
        positive("filter_high_hz", self.filter_high_hz as f64)?;
        if self.filter_low_hz >= self.filter_high_hz {
            return Err(ConfigError::FilterBand {
                low: self.filter_low_hz,
                high: self.filter_high_hz,
            });
        }
        match &self.segmentation {
            SegmentationMode::Windowed {
                duration_s,
                overlap,
            } => {
                positive("duration_s", *duration_s as f64)?;
                if !(0.0..1.0).contains(overlap) {
                    return Err(ConfigError::Overlap(*overlap));
                }
            }
            SegmentationMode::FixedBlock { block_len } => {
                positive("block_len", *block_len as f64)?;
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a configuration file.  Dispatch by extension.
///
/// Supported formats:
/// * `.toml` – preferred for hand-written files
/// * `.json` – same schema, handy for generated configs
///
/// Missing keys fall back to [`PipelineConfig::default`].
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    let config: PipelineConfig = match ext.as_str() {
        "toml" => toml::from_str(&text).context("parsing TOML config")?,
        "json" => serde_json::from_str(&text).context("parsing JSON config")?,
        other => bail!("Unsupported config extension: .{other}"),
    };

    config
        .validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.target_rate_hz, 50.0);
        assert_eq!(config.min_valid_samples, 1000);
    }

    #[test]
    fn toml_selects_fixed_block_policy() {
        let config: PipelineConfig = toml::from_str(
            r#"
            min_valid_samples = 2048

            [segmentation]
            policy = "fixed_block"
            block_len = 512
            "#,
        )
        .unwrap();
        assert_eq!(config.min_valid_samples, 2048);
        assert_eq!(config.segmentation, SegmentationMode::FixedBlock { block_len: 512 });
        assert_eq!(config.heuristics, Heuristics::default());
    }

    #[test]
    fn json_overrides_heuristics() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "heuristics": { "large_magnitude": 5000.0 },
                 "segmentation": { "policy": "windowed", "duration_s": 8.0, "overlap": 0.25 } }"#,
        )
        .unwrap();
        assert_eq!(config.heuristics.large_magnitude, 5000.0);
        assert_eq!(config.heuristics.small_magnitude, 1.0);
        assert_eq!(
            config.segmentation,
            SegmentationMode::Windowed {
                duration_s: 8.0,
                overlap: 0.25
            }
        );
    }

    #[test]
    fn rejects_bad_overlap_and_band() {
        let mut config = PipelineConfig {
            segmentation: SegmentationMode::Windowed {
                duration_s: 10.0,
                overlap: 1.0,
            },
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Overlap(1.0)));

        config.segmentation = SegmentationMode::default();
        config.filter_low_hz = 9.0;
        assert!(matches!(config.validate(), Err(ConfigError::FilterBand { .. })));
    }

    #[test]
    fn load_config_reads_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "target_rate_hz = 100.0\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.target_rate_hz, 100.0);

        let bad = dir.path().join("pipeline.yaml");
        std::fs::write(&bad, "").unwrap();
        assert!(load_config(&bad).is_err());
    }
}
