//! PPG segmenter command line.
//!
//! ```bash
//! # Windowed segmentation of one or more recordings into ./segments
//! ppg-segmenter process rec_01.npy rec_02.npy --out segments
//!
//! # Fixed 1024-sample blocks, one normalization range for the whole batch
//! ppg-segmenter process data/*.npy --policy blocks --shared-range --parquet batch.parquet
//!
//! # Describe a file without processing it
//! ppg-segmenter inspect rec_01.npy
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use ppg_segmenter::data::npy;
use ppg_segmenter::report::BatchReport;
use ppg_segmenter::store::{list_segments, remove_segment};
use ppg_segmenter::{
    load_config, DirectorySink, ParquetSink, Pipeline, PipelineConfig, SegmentSink,
    SegmentationMode,
};

#[derive(Parser, Debug)]
#[command(name = "ppg-segmenter")]
#[command(author, version, long_about = None)]
#[command(about = "Segment raw PPG recordings for heart-rate estimation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process recordings into normalized segments
    Process {
        /// Input array files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Pipeline configuration (.toml or .json)
        #[arg(short, long, env = "PPG_SEGMENTER_CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured segmentation policy
        #[arg(short, long, value_enum)]
        policy: Option<PolicyArg>,

        /// Directory for per-segment array files
        #[arg(short, long, default_value = "segments")]
        out: PathBuf,

        /// Write all segments to one Parquet file instead of a directory
        #[arg(long)]
        parquet: Option<PathBuf>,

        /// Batch summary (.csv or .json)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Normalize fixed blocks with one range computed across all inputs
        #[arg(long)]
        shared_range: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe the structure of an array file
    Inspect {
        file: PathBuf,
    },

    /// List segment files in a directory
    List {
        dir: PathBuf,
    },

    /// Remove one segment file
    Remove {
        dir: PathBuf,
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Resample, filter and cut overlapping windows
    Windowed,
    /// Raw fixed-size blocks
    Blocks,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Process {
            inputs,
            config,
            policy,
            out,
            parquet,
            report,
            shared_range,
            json,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => PipelineConfig::default(),
            };
            // A policy flag keeps configured parameters when it names the same policy.
            match (policy, &config.segmentation) {
                (Some(PolicyArg::Windowed), SegmentationMode::FixedBlock { .. }) => {
                    config.segmentation = SegmentationMode::default();
                }
                (Some(PolicyArg::Blocks), SegmentationMode::Windowed { .. }) => {
                    config.segmentation = SegmentationMode::fixed_block();
                }
                _ => {}
            }
            let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
            let batch = run_process(&pipeline, &inputs, &out, parquet.as_deref(), shared_range)?;

            if json {
                println!("{}", serde_json::to_string_pretty(batch.rows())?);
            } else {
                for row in batch.rows() {
                    match row.failure {
                        None => match row.heart_rate_bpm {
                            Some(bpm) => println!(
                                "{}: {} segments, {bpm:.0} bpm",
                                row.input, row.segments
                            ),
                            None => println!("{}: {} segments", row.input, row.segments),
                        },
                        Some(kind) => println!("{}: failed ({kind}) {}", row.input, row.message),
                    }
                }
            }
            if let Some(path) = report {
                batch.save(&path)?;
                info!("report written to {}", path.display());
            }

            info!(
                "{} of {} inputs processed, {} segments",
                batch.succeeded(),
                batch.rows().len(),
                batch.total_segments()
            );
            Ok(if batch.failed() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Inspect { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let decoded = npy::decode_detailed(&bytes);
            println!("file:        {}", file.display());
            println!("magic:       {}", decoded.header.has_magic);
            println!("payload at:  byte {}", decoded.header.payload_offset);
            match decoded.strategy {
                Some(strategy) => println!(
                    "decoded as:  {strategy:?} ({} bytes/element{})",
                    strategy.width(),
                    if decoded.big_endian { ", big-endian" } else { "" }
                ),
                None => println!("decoded as:  <empty payload>"),
            }
            let pipeline = Pipeline::new(PipelineConfig::default())?;
            println!("{}", pipeline.inspect(&bytes));
            Ok(ExitCode::SUCCESS)
        }
        Commands::List { dir } => {
            for name in list_segments(&dir)? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remove { dir, name } => {
            if remove_segment(&dir, &name)? {
                info!("removed {name}");
                Ok(ExitCode::SUCCESS)
            } else {
                warn!("{name} not found in {}", dir.display());
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn run_process(
    pipeline: &Pipeline,
    inputs: &[PathBuf],
    out: &Path,
    parquet: Option<&Path>,
    shared_range: bool,
) -> Result<BatchReport> {
    let range = if shared_range {
        let buffers: Vec<Vec<u8>> = inputs
            .iter()
            .filter_map(|path| match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("skipping {} for range computation: {e}", path.display());
                    None
                }
            })
            .collect();
        let range = pipeline.shared_range(buffers.iter().map(Vec::as_slice));
        match range {
            Some(r) => info!("shared normalization range {} .. {}", r.min, r.max),
            None => warn!("no finite samples across inputs, using per-recording ranges"),
        }
        range
    } else {
        None
    };

    let mut report = BatchReport::new();
    let mut process_all = |sink: &mut dyn SegmentSink| {
        for path in inputs {
            info!("processing {}", path.display());
            let result = pipeline.process_file_with_range(path, sink, range, |_| {});
            report.record(path.display().to_string(), &result);
        }
    };

    match parquet {
        Some(path) => {
            let mut sink = ParquetSink::new(path);
            process_all(&mut sink);
            sink.finish()?;
        }
        None => process_all(&mut DirectorySink::new(out)),
    }
    Ok(report)
}
