//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Settings file, `merra2-power.toml` in the working directory by default
    #[arg(long, global = true, env = "MERRA2_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the power and energy-demand models over input files
    Process {
        /// Input keys relative to the input folder, e.g. `Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.parquet`
        #[arg(required = true)]
        keys: Vec<String>,
        /// Write one row per location instead of one per record
        #[arg(long)]
        compressed: bool,
        /// Add the per-location sums to the summary store instead of writing output files
        #[arg(long)]
        save_db: bool,
        /// Files processed at once, overrides the settings
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Split the input files into batches and write a manifest
    Plan {
        /// Files per batch
        #[arg(long)]
        per_batch: usize,
        /// Only these country folders
        #[arg(long)]
        country: Vec<String>,
        /// Leave out these country folders
        #[arg(long)]
        exclude: Vec<String>,
        /// Leave out files that already have an output file
        #[arg(long)]
        skip_output: bool,
        /// Leave out files recorded as completed in the summary store
        #[arg(long)]
        skip_completed: bool,
        /// Keep at most this many batches
        #[arg(long)]
        max_batches: Option<usize>,
    },
    /// Sum the outputs of one country and derive its carbon footprint
    Reduce {
        country: String,
        /// Read the full outputs instead of the compressed ones
        #[arg(long)]
        full: bool,
    },
    /// Export the summary store with its carbon footprint
    Combine {},
    /// Count output files per country
    Status {
        /// Files expected per country
        #[arg(long, default_value_t = 365)]
        target: usize,
    },
    /// Print the shape of an input file
    Inspect { key: String },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_process_with_global_flags() {
        let cli = Cli::try_parse_from([
            "merra2-power",
            "process",
            "Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.parquet",
            "--compressed",
            "--jobs",
            "8",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Process {
                keys,
                compressed,
                save_db,
                jobs,
            } => {
                assert_eq!(keys.len(), 1);
                assert!(compressed);
                assert!(!save_db);
                assert_eq!(jobs, Some(8));
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn should_collect_repeated_countries() {
        let cli = Cli::try_parse_from([
            "merra2-power",
            "plan",
            "--per-batch",
            "10",
            "--country",
            "Germany",
            "--country",
            "United States",
        ])
        .unwrap();

        match cli.command {
            Commands::Plan {
                per_batch, country, ..
            } => {
                assert_eq!(per_batch, 10);
                assert_eq!(country, vec!["Germany", "United States"]);
            }
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn should_track_progress() {
        let bar = create_progress_bar(10, "Processing files".to_string());
        bar.inc(4);

        assert_eq!(bar.length(), Some(10));
        assert_eq!(bar.position(), 4);
    }
}
