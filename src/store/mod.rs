//! Where encoded segments end up.
//!
//! Sinks receive every segment of one invocation at once and either keep all
//! of them or none.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::data::model::Segment;

pub mod parquet_sink;

pub use self::parquet_sink::{load_segments, ParquetSink, StoredSegment};

/// File extension of persisted segments.
pub const SEGMENT_EXTENSION: &str = "npy";

/// Identifier of segment `index` cut from recording `base_name`.
pub fn segment_id(base_name: &str, index: usize) -> String {
    format!("{base_name}_seg{index}.{SEGMENT_EXTENSION}")
}

/// One normalized segment ready to be stored.
#[derive(Debug, Clone)]
pub struct EncodedSegment {
    pub id: String,
    /// Recording the segment came from.
    pub source: String,
    pub index: usize,
    pub segment: Segment,
    /// Array-file bytes of `segment.values`.
    pub bytes: Vec<u8>,
}

/// Destination for the segments of one invocation.
pub trait SegmentSink {
    /// Store every segment or none of them.
    fn persist(&mut self, segments: &[EncodedSegment]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// DirectorySink – one array file per segment
// ---------------------------------------------------------------------------

/// Writes each segment as `<dir>/<id>`.
///
/// Concurrent invocations that share a base name race on file names; callers
/// serialize by base name if that matters.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn remove_written(&self, written: &[PathBuf]) {
        for path in written {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("could not roll back {}: {e}", path.display());
            }
        }
    }
}

impl SegmentSink for DirectorySink {
    fn persist(&mut self, segments: &[EncodedSegment]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating output directory {}", self.dir.display()))?;

        let mut written = Vec::with_capacity(segments.len());
        for encoded in segments {
            let path = self.dir.join(&encoded.id);
            if let Err(e) = std::fs::write(&path, &encoded.bytes) {
                self.remove_written(&written);
                return Err(e).with_context(|| format!("writing {}", path.display()));
            }
            debug!("saved {} ({} samples)", path.display(), encoded.segment.len());
            written.push(path);
        }
        Ok(())
    }
}

/// Names of the segment files in `dir`, sorted.  A missing directory has none.
pub fn list_segments(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry.context("reading directory entry")?.path();
        let is_segment = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXTENSION);
        if is_segment {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Delete one segment file.  Returns `false` if it did not exist.
pub fn remove_segment(dir: &Path, name: &str) -> Result<bool> {
    let path = dir.join(name);
    if !path.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// MemorySink – keeps encoded bytes in memory
// ---------------------------------------------------------------------------

/// In-memory sink, keyed by segment id.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub buffers: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl SegmentSink for MemorySink {
    fn persist(&mut self, segments: &[EncodedSegment]) -> Result<()> {
        for encoded in segments {
            self.buffers.insert(encoded.id.clone(), encoded.bytes.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::npy;

    fn encoded(base: &str, index: usize, values: Vec<f32>) -> EncodedSegment {
        EncodedSegment {
            id: segment_id(base, index),
            source: base.to_string(),
            index,
            bytes: npy::encode(&values),
            segment: Segment { start: 0, values },
        }
    }

    #[test]
    fn ids_follow_base_and_index() {
        assert_eq!(segment_id("rec_01", 3), "rec_01_seg3.npy");
    }

    #[test]
    fn directory_sink_writes_lists_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("normalized_data");
        let mut sink = DirectorySink::new(&out);
        sink.persist(&[encoded("rec", 0, vec![0.0, 1.0]), encoded("rec", 1, vec![0.5])])
            .unwrap();

        assert_eq!(list_segments(&out).unwrap(), vec!["rec_seg0.npy", "rec_seg1.npy"]);
        let bytes = std::fs::read(out.join("rec_seg1.npy")).unwrap();
        assert_eq!(npy::decode(&bytes), vec![0.5]);

        assert!(remove_segment(&out, "rec_seg0.npy").unwrap());
        assert!(!remove_segment(&out, "rec_seg0.npy").unwrap());
        assert_eq!(list_segments(&out).unwrap(), vec!["rec_seg1.npy"]);
    }

    #[test]
    fn directory_sink_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the second file should go makes that write fail.
        std::fs::create_dir(dir.path().join("rec_seg1.npy")).unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let result = sink.persist(&[encoded("rec", 0, vec![0.1]), encoded("rec", 1, vec![0.2])]);

        assert!(result.is_err());
        assert!(!dir.path().join("rec_seg0.npy").exists());
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_segments(&dir.path().join("absent")).unwrap().is_empty());
    }
}
