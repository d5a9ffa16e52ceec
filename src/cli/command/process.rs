use std::sync::Arc;

use anyhow::{Context as _, Result};
use bytes::Bytes;
use futures::{stream, StreamExt};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::{
    cli::create_progress_bar,
    grid::{merge_totals, Aggregator, IndexScheme, LocationTotals},
    parquet::{read_grid, save_output},
    reading::derive_fields,
};

use super::{build_aggregator, output_key, Context};

/// What a `process` run did.
#[derive(Debug, Default)]
pub struct ProcessSummary {
    pub processed: usize,
    pub failed: usize,
    /// Locations dropped because a model failed on them, over all files.
    pub failed_locations: usize,
    pub written: Vec<String>,
}

/// Runs the models over `keys`, up to `jobs` files at a time.
///
/// A file that cannot be fetched, read or aggregated is logged and skipped.
/// Without `save_db` every file gets an output file. With it, the
/// per-location sums of all files are added to the summary store in one go
/// and the files are recorded as completed.
pub async fn process(
    context: &Context,
    keys: &[String],
    compressed: bool,
    save_db: bool,
    jobs: Option<usize>,
) -> Result<ProcessSummary> {
    let aggregator = Arc::new(build_aggregator(&context.settings)?);
    let scheme = if compressed {
        IndexScheme::Summary
    } else {
        IndexScheme::Full
    };
    let jobs = jobs.unwrap_or(context.settings.jobs).max(1);
    info!(
        files = keys.len(),
        jobs,
        ?scheme,
        save_db,
        models = ?aggregator.model_names(),
        "processing files"
    );

    let bar = create_progress_bar(keys.len() as u64, "Processing files".to_string());
    let mut results = stream::iter(keys)
        .map(|key| {
            let aggregator = Arc::clone(&aggregator);
            async move {
                let result = process_file(context, aggregator, key, scheme, save_db).await;
                (key, result)
            }
        })
        .buffer_unordered(jobs);

    let mut summary = ProcessSummary::default();
    let mut partials = Vec::new();
    let mut completed = Vec::new();
    while let Some((key, result)) = results.next().await {
        bar.inc(1);
        match result {
            Ok(outcome) => {
                summary.processed += 1;
                summary.failed_locations += outcome.failed_locations;
                if let Some(written) = outcome.written {
                    summary.written.push(written);
                }
                partials.push(outcome.totals);
                completed.push(key.clone());
            }
            Err(e) => {
                summary.failed += 1;
                error!(key = %key, "Error processing file: {:#}", e);
            }
        }
    }
    bar.finish_with_message("Files processed");

    if save_db && !completed.is_empty() {
        let totals = merge_totals(&partials);
        context
            .summary
            .upsert(&totals)
            .await
            .context("Failed to update summary store")?;
        completed.sort();
        context
            .summary
            .mark_completed(&completed)
            .await
            .context("Failed to record completed files")?;
        info!(locations = totals.len(), files = completed.len(), "saved to summary store");
    }

    Ok(summary)
}

struct FileOutcome {
    totals: LocationTotals,
    failed_locations: usize,
    written: Option<String>,
}

async fn process_file(
    context: &Context,
    aggregator: Arc<Aggregator>,
    key: &str,
    scheme: IndexScheme,
    save_db: bool,
) -> Result<FileOutcome> {
    let bytes = context
        .input
        .fetch(&context.input_key(key))
        .await
        .with_context(|| format!("Failed to fetch `{}`", key))?;

    let (report, output_file) = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut grid = read_grid(bytes)?;
        derive_fields(&mut grid)?;
        let report = aggregator.run(&grid, scheme)?;

        let output_file = if save_db {
            None
        } else {
            let file = NamedTempFile::new()?;
            save_output(&report.output, file.path())?;
            Some(file)
        };

        Ok((report, output_file))
    })
    .await??;

    debug!(
        key,
        records = report.records,
        locations = report.locations,
        rows = report.output.len(),
        "aggregated file"
    );
    if !report.failures.is_empty() {
        warn!(
            key,
            failed = report.failures.len(),
            locations = report.locations,
            "some locations were left out"
        );
    }

    let written = match output_file {
        Some(file) => {
            let folder = match scheme {
                IndexScheme::Full => &context.settings.folders.output,
                IndexScheme::Summary => &context.settings.folders.output_compressed,
            };
            let target = output_key(folder, key);
            let bytes = tokio::fs::read(file.path()).await?;
            context
                .output
                .store(&target, Bytes::from(bytes))
                .await
                .with_context(|| format!("Failed to store `{}`", target))?;
            Some(target)
        }
        None => None,
    };

    Ok(FileOutcome {
        totals: report.totals(),
        failed_locations: report.failures.len(),
        written,
    })
}

// -- Tests -------------------------------------------------------------------
