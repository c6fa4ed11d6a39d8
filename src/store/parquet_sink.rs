use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float32Builder, Float64Array, Int64Array, LargeListArray,
    ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::{EncodedSegment, SegmentSink};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// One segment as stored in a Parquet export.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSegment {
    pub source: String,
    pub segment_index: i64,
    pub start: i64,
    pub values: Vec<f32>,
}

/// Export schema:
/// - `source`: Utf8 – recording name
/// - `segment_index`: Int64
/// - `start`: Int64 – first sample index in the processed signal
/// - `values`: List<Float32> – normalized samples
fn export_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source", DataType::Utf8, false),
        Field::new("segment_index", DataType::Int64, false),
        Field::new("start", DataType::Int64, false),
        Field::new(
            "values",
            DataType::List(Arc::new(Field::new("item", DataType::Float32, true))),
            false,
        ),
    ]))
}

// ---------------------------------------------------------------------------
// ParquetSink – all segments of a batch in one file
// ---------------------------------------------------------------------------

/// Collects segments from any number of invocations and writes them as one
/// Parquet file on [`ParquetSink::finish`].
#[derive(Debug)]
pub struct ParquetSink {
    path: PathBuf,
    rows: Vec<StoredSegment>,
}

impl ParquetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }

    /// Segments buffered so far.
    pub fn pending(&self) -> usize {
        self.rows.len()
    }

    /// Write the buffered rows.  Returns how many were written.
    pub fn finish(self) -> Result<usize> {
        let schema = export_schema();

        let mut values_builder = ListBuilder::new(Float32Builder::new());
        for row in &self.rows {
            values_builder.values().append_slice(&row.values);
            values_builder.append(true);
        }

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(
                    self.rows.iter().map(|r| r.source.as_str()).collect::<Vec<_>>(),
                )),
                Arc::new(Int64Array::from(
                    self.rows.iter().map(|r| r.segment_index).collect::<Vec<_>>(),
                )),
                Arc::new(Int64Array::from(
                    self.rows.iter().map(|r| r.start).collect::<Vec<_>>(),
                )),
                Arc::new(values_builder.finish()),
            ],
        )
        .context("building segment record batch")?;

        let file = std::fs::File::create(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        let mut writer =
            ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
        writer.write(&batch).context("writing segment batch")?;
        writer.close().context("closing parquet writer")?;

        info!("wrote {} segments to {}", self.rows.len(), self.path.display());
        Ok(self.rows.len())
    }
}

impl SegmentSink for ParquetSink {
    fn persist(&mut self, segments: &[EncodedSegment]) -> Result<()> {
        self.rows.extend(segments.iter().map(|encoded| StoredSegment {
            source: encoded.source.clone(),
            segment_index: encoded.index as i64,
            start: encoded.segment.start as i64,
            values: encoded.segment.values.clone(),
        }));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reading an export back
// ---------------------------------------------------------------------------

/// Load every segment row from a Parquet export.
pub fn load_segments(path: &Path) -> Result<Vec<StoredSegment>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let sources = column(&batch, "source")?
            .as_any()
            .downcast_ref::<StringArray>()
            .context("expected Utf8 'source' column")?;
        let indices = column(&batch, "segment_index")?
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64 'segment_index' column")?;
        let starts = column(&batch, "start")?
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64 'start' column")?;
        let values = column(&batch, "values")?;

        for row in 0..batch.num_rows() {
            rows.push(StoredSegment {
                source: sources.value(row).to_string(),
                segment_index: indices.value(row),
                start: starts.value(row),
                values: extract_f32_list(values, row)
                    .with_context(|| format!("Row {row}: failed to read 'values'"))?,
            });
        }
    }
    Ok(rows)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))
}

/// Extract a `Vec<f32>` from a List or LargeList column at the given row.
fn extract_f32_list(col: &ArrayRef, row: usize) -> Result<Vec<f32>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Exports from other tools may widen to Float64
    if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    } else if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN) as f32).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float32 or Float64",
            values_array.data_type()
        )
    }
}
