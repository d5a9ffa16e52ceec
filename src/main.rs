mod cli;
mod config;
mod error;
mod footprint;
mod grid;
mod model;
mod parquet;
mod reading;
mod store;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{
    command::{self, Context, PlanOptions},
    Cli, Commands,
};
use config::Settings;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::load(cli.config.as_deref())?;
    let context = Context::from_settings(settings)?;

    match &cli.command {
        Commands::Process {
            keys,
            compressed,
            save_db,
            jobs,
        } => match command::process(&context, keys, *compressed, *save_db, *jobs).await {
            Ok(summary) => {
                println!(
                    "Processed {} files, {} failed, {} locations left out",
                    summary.processed, summary.failed, summary.failed_locations
                );
                for key in &summary.written {
                    println!("File saved to `{}`", key);
                }
            }
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Plan {
            per_batch,
            country,
            exclude,
            skip_output,
            skip_completed,
            max_batches,
        } => {
            let options = PlanOptions {
                per_batch: *per_batch,
                countries: country.clone(),
                exclude: exclude.clone(),
                skip_output: *skip_output,
                skip_completed: *skip_completed,
                max_batches: *max_batches,
            };
            match command::plan(&context, &options).await {
                Ok(key) => println!("Manifest saved to `{}`", key),
                Err(e) => eprintln!("Error: {:#}", e),
            }
        }
        Commands::Reduce { country, full } => match command::reduce(&context, country, *full).await {
            Ok(key) => println!("File saved to `{}`", key),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Combine {} => match command::combine(&context).await {
            Ok(key) => println!("File saved to `{}`", key),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Status { target } => match command::status(&context, *target).await {
            Ok(report) => {
                for c in &report.countries {
                    println!("{}: {}", c.country, c.files);
                }
                let remaining = report.remaining();
                println!(
                    "{} of {} countries at target {}, {} remaining",
                    report.complete(),
                    report.countries.len(),
                    report.target,
                    remaining.len()
                );
                for c in remaining {
                    println!("  {} ({})", c.country, c.files);
                }
            }
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Inspect { key } => match command::inspect(&context, key).await {
            Ok(shape) => println!("{}", shape),
            Err(e) => eprintln!("Error: {:#}", e),
        },
    }

    Ok(())
}
