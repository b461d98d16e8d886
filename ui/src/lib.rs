//! This crate collects elements that are shared between the subcommands of
//! the "simulate" CLI program.

use clap::Args;
use equation::Precision;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::{path::PathBuf, time::Duration};

/// CLI arguments controlling how curves are sampled and saved
#[derive(Args, Clone, Debug, PartialEq)]
pub struct SamplingArgs {
    /// Number of evenly spaced samples to be taken
    #[arg(short = 'n', long, env = "SIMULATE_SAMPLES", default_value_t = 101)]
    pub samples: usize,

    /// Path to the results output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
//
impl SamplingArgs {
    /// Sampled times across `[start, end]`, including both ends
    pub fn times(&self, start: Precision, end: Precision) -> Vec<Precision> {
        equation::evenly_spaced(start..=end, self.samples.max(2)).collect()
    }

    /// Output path, falling back to `<default_stem>.csv`
    pub fn output_path(&self, default_stem: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{default_stem}.csv")))
    }
}

/// Send log records to stderr, filtered by the `RUST_LOG` environment variable
pub fn init_logging() {
    env_logger::init();
    log::debug!("Logging initialized");
}

/// Set up a progress bar for `len` steps of a certain kind of work
pub fn init_progress_reporting(message: &'static str, len: usize) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} {pos}/{len} {wide_bar} {elapsed}/~{duration}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let progress = ProgressBar::new(len as u64)
        .with_message(message)
        .with_style(style)
        .with_finish(ProgressFinish::AndClear);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
