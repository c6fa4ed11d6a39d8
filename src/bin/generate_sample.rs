use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ppg_segmenter::synth::SyntheticRecording;

/// Write a synthetic interleaved PPG recording as a float64 array file.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", version, about, long_about = None)]
struct Args {
    /// Output path
    #[arg(default_value = "sample_ppg.npy")]
    output: PathBuf,

    /// Recording length in seconds
    #[arg(long, default_value_t = 60.0)]
    duration: f64,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = 25.0)]
    rate: f64,

    /// Interleaved channels
    #[arg(long, default_value_t = 4)]
    channels: usize,

    #[arg(long, default_value_t = 72.0)]
    heart_rate: f64,

    /// DC offset of the optical counts
    #[arg(long, default_value_t = -200_000.0, allow_negative_numbers = true)]
    baseline: f64,

    /// Gaussian noise standard deviation
    #[arg(long, default_value_t = 50.0)]
    noise: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let recording = SyntheticRecording {
        duration_s: args.duration,
        rate_hz: args.rate,
        channels: args.channels,
        baseline: args.baseline,
        heart_rate_bpm: args.heart_rate,
        noise: args.noise,
        seed: args.seed,
        ..Default::default()
    };

    let bytes = recording.to_npy();
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        "Wrote {} frames x {} channels ({} bytes) to {}",
        recording.frames(),
        recording.channels,
        bytes.len(),
        args.output.display()
    );
    Ok(())
}
