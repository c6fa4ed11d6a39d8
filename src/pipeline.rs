//! Pipeline orchestration: decode → analyze → extract → policy stages →
//! encode → persist.
//!
//! A [`Pipeline`] only holds read-only configuration, so one instance can
//! serve concurrent invocations from several threads. Each invocation owns its
//! buffers; nothing is cached between calls.

use std::path::Path;

use log::{debug, error, info, warn};

use crate::config::{PipelineConfig, SegmentationMode};
use crate::data::analyzer::{analyze, StructureReport};
use crate::data::channel::extract_primary;
use crate::data::model::{ProcessingProgress, ProcessingResult, Segment, Signal, ValueRange};
use crate::data::npy;
use crate::error::{ConfigError, PipelineError};
use crate::progress::ProgressReporter;
use crate::segment::{policy_for, FixedBlock, SegmentationPolicy};
use crate::store::{segment_id, EncodedSegment, SegmentSink};

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one recording through the pipeline.
    ///
    /// Never fails past this boundary: every error becomes a result with
    /// `success == false`, and nothing is handed to `sink` in that case.
    pub fn process(
        &self,
        bytes: &[u8],
        base_name: &str,
        sink: &mut dyn SegmentSink,
        on_progress: impl FnMut(ProcessingProgress),
    ) -> ProcessingResult {
        self.process_with_range(bytes, base_name, sink, None, on_progress)
    }

    /// Like [`Pipeline::process`], with an externally computed normalization
    /// range for the fixed-block policy (see [`Pipeline::shared_range`]).
    /// The windowed policy ignores it.
    pub fn process_with_range(
        &self,
        bytes: &[u8],
        base_name: &str,
        sink: &mut dyn SegmentSink,
        range: Option<ValueRange>,
        mut on_progress: impl FnMut(ProcessingProgress),
    ) -> ProcessingResult {
        let mut progress = ProgressReporter::new(&mut on_progress);

        match self.run(bytes, base_name, sink, range, &mut progress) {
            Ok((ids, heart_rate_bpm)) => {
                match heart_rate_bpm {
                    Some(bpm) => info!(
                        "{base_name}: {} segments persisted, {bpm:.0} bpm",
                        ids.len()
                    ),
                    None => info!("{base_name}: {} segments persisted", ids.len()),
                }
                ProcessingResult::succeeded(ids, heart_rate_bpm)
            }
            Err(e) => {
                error!("{base_name}: {e}");
                ProcessingResult::failed(&e)
            }
        }
    }

    /// Read `path` and process it under its file stem.
    pub fn process_file(
        &self,
        path: &Path,
        sink: &mut dyn SegmentSink,
        on_progress: impl FnMut(ProcessingProgress),
    ) -> ProcessingResult {
        self.process_file_with_range(path, sink, None, on_progress)
    }

    pub fn process_file_with_range(
        &self,
        path: &Path,
        sink: &mut dyn SegmentSink,
        range: Option<ValueRange>,
        on_progress: impl FnMut(ProcessingProgress),
    ) -> ProcessingResult {
        let base_name = base_name_of(path);
        match std::fs::read(path) {
            Ok(bytes) => {
                self.process_with_range(&bytes, &base_name, sink, range, on_progress)
            }
            Err(e) => {
                let err = PipelineError::Format(format!("cannot read {}: {e}", path.display()));
                error!("{base_name}: {err}");
                ProcessingResult::failed(&err)
            }
        }
    }

    /// Decode and describe a buffer without processing it.
    pub fn inspect(&self, bytes: &[u8]) -> StructureReport {
        analyze(&npy::decode(bytes), &self.config.heuristics)
    }

    /// One normalization range spanning the primary channel of every input.
    ///
    /// Inputs that decode to nothing are skipped; `None` if no input has a
    /// finite sample.
    pub fn shared_range<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a [u8]>,
    ) -> Option<ValueRange> {
        inputs
            .into_iter()
            .filter_map(|bytes| {
                let signal = self.decode_signal(bytes)?;
                ValueRange::of(&extract_primary(&signal.samples, signal.channels))
            })
            .reduce(ValueRange::union)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn decode_signal(&self, bytes: &[u8]) -> Option<Signal> {
        let values = npy::decode(bytes);
        if values.is_empty() {
            return None;
        }
        let report = analyze(&values, &self.config.heuristics);
        Some(signal_from(&values, &report))
    }

    fn policy(&self, range: Option<ValueRange>) -> Box<dyn SegmentationPolicy> {
        match (&self.config.segmentation, range) {
            (SegmentationMode::FixedBlock { block_len }, Some(range)) => Box::new(FixedBlock {
                block_len: *block_len,
                range: Some(range),
            }),
            (SegmentationMode::Windowed { .. }, Some(_)) => {
                warn!("windowed segmentation normalizes per segment, ignoring shared range");
                policy_for(&self.config.segmentation)
            }
            (mode, None) => policy_for(mode),
        }
    }

    fn run(
        &self,
        bytes: &[u8],
        base_name: &str,
        sink: &mut dyn SegmentSink,
        range: Option<ValueRange>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(Vec<String>, Option<f32>), PipelineError> {
        debug!("{base_name}: processing {} bytes", bytes.len());

        let decoded = npy::decode_detailed(bytes);
        if decoded.values.is_empty() {
            return Err(PipelineError::Format(format!(
                "no decodable payload in {} bytes",
                bytes.len()
            )));
        }
        progress.report(
            "Decoding",
            0.05,
            format!("decoded {} values", decoded.values.len()),
        );

        let report = analyze(&decoded.values, &self.config.heuristics);
        progress.report(
            "Analyzing",
            0.1,
            format!("{}, {}", report.regime, report.recommended_extraction()),
        );
        let signal = signal_from(&decoded.values, &report);

        let channel = extract_primary(&signal.samples, signal.channels);
        progress.report(
            "Extracting",
            0.2,
            format!("{} -> {} samples", signal.samples.len(), channel.len()),
        );
        if channel.is_empty() {
            return Err(PipelineError::InsufficientData {
                stage: "extraction",
                len: 0,
                min: self.config.min_valid_samples,
            });
        }

        let policy = self.policy(range);
        debug!("{base_name}: {} segmentation", policy.name());
        let output = policy.run(&self.config, &signal, channel, progress)?;

        let encoded = encode_segments(base_name, output.segments);
        progress.report(
            "Encoding",
            0.85,
            format!("encoded {} segments", encoded.len()),
        );

        sink.persist(&encoded)
            .map_err(|e| PipelineError::Persistence(format!("{e:#}")))?;
        progress.report("Complete", 1.0, format!("{} segments saved", encoded.len()));

        Ok((encoded.into_iter().map(|e| e.id).collect(), output.heart_rate_bpm))
    }
}

fn signal_from(values: &[f64], report: &StructureReport) -> Signal {
    Signal {
        samples: values.iter().map(|&v| v as f32).collect(),
        sample_rate_hz: report.sample_rate_hz,
        channels: report.channels,
        regime: report.regime,
    }
}

fn encode_segments(base_name: &str, segments: Vec<Segment>) -> Vec<EncodedSegment> {
    segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| EncodedSegment {
            id: segment_id(base_name, index),
            source: base_name.to_string(),
            index,
            bytes: npy::encode(&segment.values),
            segment,
        })
        .collect()
}

/// File stem used as the base of segment ids.
pub fn base_name_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::store::MemorySink;

    struct FailingSink;

    impl SegmentSink for FailingSink {
        fn persist(&mut self, _segments: &[EncodedSegment]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn normalized_recording(len: usize) -> Vec<u8> {
        let values: Vec<f32> = (0..len).map(|i| 0.5 + 0.4 * (i as f32 * 0.2).sin()).collect();
        npy::encode(&values)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PipelineConfig {
            target_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn empty_payload_is_a_format_failure() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sink = MemorySink::new();
        let result = pipeline.process(&npy::encode(&[]), "empty", &mut sink, |_| {});
        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Format));
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_failure_becomes_persistence_failure() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let result = pipeline.process(&normalized_recording(1999), "rec", &mut FailingSink, |_| {});
        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Persistence));
        assert!(result.message.contains("disk full"));
        assert!(result.output_ids.is_empty());
    }

    #[test]
    fn ids_are_ordered_by_segment() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sink = MemorySink::new();
        // 1999 single-channel samples at 25 Hz -> 3998 at 50 Hz -> 14 windows
        let result = pipeline.process(&normalized_recording(1999), "rec", &mut sink, |_| {});
        assert!(result.success, "{}", result.message);
        assert_eq!(result.segment_count, 14);
        assert_eq!(result.output_ids[0], "rec_seg0.npy");
        assert_eq!(result.output_ids[13], "rec_seg13.npy");
        assert_eq!(sink.len(), 14);
    }

    #[test]
    fn shared_range_spans_all_inputs() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let a = npy::encode(&[1.0, 5.0, 3.0]);
        let b = npy::encode(&[-2.0, 4.0, 0.0]);
        let range = pipeline.shared_range([a.as_slice(), b.as_slice(), &[][..]]);
        assert_eq!(range, Some(ValueRange { min: -2.0, max: 5.0 }));
    }

    #[test]
    fn base_name_is_file_stem() {
        assert_eq!(base_name_of(Path::new("/data/rec_01.npy")), "rec_01");
    }
}
