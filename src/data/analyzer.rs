use std::fmt;

use log::debug;

use crate::config::Heuristics;

use super::model::{DataRegime, ValueRange};

// ---------------------------------------------------------------------------
// Structure inference
// ---------------------------------------------------------------------------

/// Number of interleaved channels suggested by the flat length alone.
pub fn infer_channels(len: usize, h: &Heuristics) -> usize {
    if len % 4 == 0 && len > h.four_channel_min_len {
        4
    } else if len % 2 == 0 && len > h.two_channel_min_len {
        2
    } else {
        1
    }
}

/// Coarse sampling rate guess.  The file carries no timing metadata, so this
/// buckets on length only.
pub fn estimate_sample_rate(len: usize, h: &Heuristics) -> f32 {
    if len > h.rate_100hz_min_len {
        100.0
    } else if len > h.rate_50hz_min_len {
        50.0
    } else {
        h.fallback_rate_hz
    }
}

/// Presence flags the regime decision is made from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MagnitudeFlags {
    pub negative: bool,
    pub large: bool,
    pub small: bool,
}

impl MagnitudeFlags {
    /// Scan the finite values of `values`.
    pub fn scan<T: Into<f64> + Copy>(values: &[T], h: &Heuristics) -> Self {
        let large = h.large_magnitude as f64;
        let small = h.small_magnitude as f64;
        values
            .iter()
            .map(|&v| Into::<f64>::into(v))
            .filter(|v| v.is_finite())
            .fold(MagnitudeFlags::default(), |flags, v| MagnitudeFlags {
                negative: flags.negative || v < 0.0,
                large: flags.large || v.abs() > large,
                small: flags.small || v.abs() < small,
            })
    }

    pub fn regime(self) -> DataRegime {
        match self {
            MagnitudeFlags {
                negative: true,
                large: true,
                ..
            } => DataRegime::RawPpg,
            MagnitudeFlags {
                small: true,
                large: false,
                ..
            } => DataRegime::Normalized,
            MagnitudeFlags {
                large: true,
                negative: false,
                ..
            } => DataRegime::Adc,
            _ => DataRegime::Unknown,
        }
    }
}

/// Classify a recording from its values.
pub fn classify_regime<T: Into<f64> + Copy>(values: &[T], h: &Heuristics) -> DataRegime {
    MagnitudeFlags::scan(values, h).regime()
}

// ---------------------------------------------------------------------------
// StructureReport – everything inferred about one recording
// ---------------------------------------------------------------------------

/// Summary of a decoded recording.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureReport {
    pub total_samples: usize,
    /// `[frames, channels]` for interleaved data, `[samples]` otherwise.
    pub shape: Vec<usize>,
    pub channels: usize,
    /// Finite min/max; `None` when nothing finite was decoded.
    pub range: Option<ValueRange>,
    pub mean: Option<f64>,
    /// First few values, as decoded.
    pub preview: Vec<f64>,
    pub regime: DataRegime,
    pub sample_rate_hz: f32,
    pub duration_s: f32,
}

const PREVIEW_LEN: usize = 10;

impl StructureReport {
    /// Human-readable extraction plan.
    pub fn recommended_extraction(&self) -> String {
        match self.channels {
            1 => "single channel (use as-is)".to_string(),
            c => format!("{c}-channel interleaved (every {c}th value starting at index 1)"),
        }
    }
}

impl fmt::Display for StructureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples:     {}", self.total_samples)?;
        writeln!(f, "shape:       {:?}", self.shape)?;
        writeln!(f, "regime:      {}", self.regime)?;
        match self.range {
            Some(r) => writeln!(f, "range:       {} .. {}", r.min, r.max)?,
            None => writeln!(f, "range:       <no finite values>")?,
        }
        if let Some(mean) = self.mean {
            writeln!(f, "mean:        {mean:.4}")?;
        }
        writeln!(f, "rate:        {} Hz (estimated)", self.sample_rate_hz)?;
        writeln!(f, "duration:    {:.1} s", self.duration_s)?;
        writeln!(f, "extraction:  {}", self.recommended_extraction())?;
        let preview: Vec<String> = self.preview.iter().map(|v| format!("{v:.2}")).collect();
        write!(f, "preview:     [{}]", preview.join(", "))
    }
}

/// Infer channel layout, regime and sampling rate of a decoded recording.
///
/// Never fails: an empty input reports one channel and
/// [`DataRegime::Unknown`].
pub fn analyze(values: &[f64], h: &Heuristics) -> StructureReport {
    let total_samples = values.len();
    let channels = infer_channels(total_samples, h);
    let sample_rate_hz = estimate_sample_rate(total_samples, h);
    let regime = classify_regime(values, h);

    let finite: Vec<f32> = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f32)
        .collect();
    let range = ValueRange::of(&finite);
    let mean = (!finite.is_empty()).then(|| {
        values.iter().filter(|v| v.is_finite()).sum::<f64>() / finite.len() as f64
    });

    let shape = if channels > 1 {
        vec![total_samples / channels, channels]
    } else {
        vec![total_samples]
    };
    let duration_s = total_samples as f32 / (sample_rate_hz * channels as f32);

    let report = StructureReport {
        total_samples,
        shape,
        channels,
        range,
        mean,
        preview: values.iter().take(PREVIEW_LEN).copied().collect(),
        regime,
        sample_rate_hz,
        duration_s,
    };

    debug!(
        "structure: {} samples, {} channel(s), {} Hz, {:.1} s, regime {}",
        report.total_samples,
        report.channels,
        report.sample_rate_hz,
        report.duration_s,
        report.regime
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h() -> Heuristics {
        Heuristics::default()
    }

    #[test]
    fn channel_count_needs_divisibility_and_length() {
        assert_eq!(infer_channels(6000, &h()), 4);
        assert_eq!(infer_channels(4000, &h()), 2);
        assert_eq!(infer_channels(4002, &h()), 2);
        assert_eq!(infer_channels(2000, &h()), 1);
        assert_eq!(infer_channels(2001, &h()), 1);
        assert_eq!(infer_channels(0, &h()), 1);
    }

    #[test]
    fn sample_rate_buckets() {
        assert_eq!(estimate_sample_rate(100_001, &h()), 100.0);
        assert_eq!(estimate_sample_rate(100_000, &h()), 50.0);
        assert_eq!(estimate_sample_rate(50_001, &h()), 50.0);
        assert_eq!(estimate_sample_rate(6000, &h()), 25.0);
    }

    #[test]
    fn regime_classification() {
        assert_eq!(classify_regime(&[-200_000.0f64, -199_000.0], &h()), DataRegime::RawPpg);
        assert_eq!(classify_regime(&[0.0f64, 0.4, 0.9], &h()), DataRegime::Normalized);
        assert_eq!(classify_regime(&[12_000.0f64, 40_000.0], &h()), DataRegime::Adc);
        assert_eq!(classify_regime(&[5.0f64, -3.0], &h()), DataRegime::Unknown);
        assert_eq!(classify_regime::<f64>(&[], &h()), DataRegime::Unknown);
    }

    #[test]
    fn non_finite_values_do_not_vote() {
        assert_eq!(
            classify_regime(&[f64::NEG_INFINITY, 0.5], &h()),
            DataRegime::Normalized
        );
    }

    #[test]
    fn empty_input_reports_unknown_single_channel() {
        let report = analyze(&[], &h());
        assert_eq!(report.channels, 1);
        assert_eq!(report.regime, DataRegime::Unknown);
        assert_eq!(report.range, None);
        assert_eq!(report.mean, None);
    }

    #[test]
    fn report_for_interleaved_recording() {
        let values: Vec<f64> = (0..6000).map(|i| -200_000.0 + (i % 7) as f64).collect();
        let report = analyze(&values, &h());
        assert_eq!(report.shape, vec![1500, 4]);
        assert_eq!(report.sample_rate_hz, 25.0);
        assert_eq!(report.duration_s, 60.0);
        assert_eq!(report.preview.len(), 10);
        assert!(report.recommended_extraction().starts_with("4-channel"));
        assert!(report.to_string().contains("raw PPG"));
    }
}
