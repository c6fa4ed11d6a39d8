use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::model::ProcessingResult;
use crate::error::FailureKind;

/// One processed input in a batch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub input: String,
    pub success: bool,
    pub failure: Option<FailureKind>,
    pub segments: usize,
    pub heart_rate_bpm: Option<f32>,
    pub message: String,
}

/// Outcome of a batch run, one row per input in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    rows: Vec<ReportRow>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, input: impl Into<String>, result: &ProcessingResult) {
        self.rows.push(ReportRow {
            input: input.into(),
            success: result.success,
            failure: result.failure,
            segments: result.segment_count,
            heart_rate_bpm: result.heart_rate_bpm,
            message: result.message.clone(),
        });
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    pub fn total_segments(&self) -> usize {
        self.rows.iter().map(|r| r.segments).sum()
    }

    /// CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row).context("writing report row")?;
        }
        wtr.flush().context("flushing report")?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.rows).context("writing JSON report")
    }

    /// Write to `path`, as JSON when the extension is `.json`, CSV otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.write_json(file),
            _ => self.write_csv(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn sample_report() -> BatchReport {
        let mut report = BatchReport::new();
        report.record(
            "a.npy",
            &ProcessingResult::succeeded(
                vec!["a_seg0.npy".into(), "a_seg1.npy".into()],
                Some(72.0),
            ),
        );
        report.record(
            "b.npy",
            &ProcessingResult::failed(&PipelineError::InsufficientData {
                stage: "validation",
                len: 500,
                min: 1000,
            }),
        );
        report
    }

    #[test]
    fn counts() {
        let report = sample_report();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total_segments(), 2);
    }

    #[test]
    fn csv_has_header_and_failure_kind() {
        let mut buf = Vec::new();
        sample_report().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("input,success,failure,segments,heart_rate_bpm,message")
        );
        assert!(lines.next().unwrap().starts_with("a.npy,true,,2,72.0,"));
        assert!(lines.next().unwrap().starts_with("b.npy,false,insufficient_data,0,,"));
    }

    #[test]
    fn json_lists_rows() {
        let mut buf = Vec::new();
        sample_report().write_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[1]["failure"], "insufficient_data");
        assert_eq!(value[0]["segments"], 2);
        assert_eq!(value[0]["heart_rate_bpm"], 72.0);
        assert!(value[1]["heart_rate_bpm"].is_null());
    }
}
