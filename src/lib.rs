//! PPG recording segmentation.
//!
//! Decodes raw device array files, infers their channel layout and value
//! regime, and cuts the primary optical channel into normalized segments
//! ready for a downstream estimator.

pub mod config;
pub mod data;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod segment;
pub mod store;
pub mod synth;

pub use config::{load_config, Heuristics, PipelineConfig, SegmentationMode};
pub use data::model::{
    DataRegime, ProcessingProgress, ProcessingResult, Segment, Signal, ValueRange,
};
pub use error::{ConfigError, FailureKind, PipelineError};
pub use pipeline::Pipeline;
pub use store::{DirectorySink, MemorySink, ParquetSink, SegmentSink};
