use anyhow::{anyhow, Context as _, Result};
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{
    cli::create_progress_bar,
    footprint::footprint,
    grid::LocationTotals,
    parquet::{read_totals, save_reduced_csv},
};

use super::{join_key, Context};

/// Sums every output file of `country` per location and stores the
/// footprint table as `<aggregated>/<country>.csv`. Returns its key.
///
/// A location missing from some files counts as zero in those files.
pub async fn reduce(context: &Context, country: &str, full: bool) -> Result<String> {
    let folders = &context.settings.folders;
    let folder = if full {
        &folders.output
    } else {
        &folders.output_compressed
    };
    let prefix = join_key(folder, &format!("{}/", country));

    let keys = context.output.list(&prefix).await?;
    if keys.is_empty() {
        return Err(anyhow!("No output files under `{}`", prefix));
    }

    let bar = create_progress_bar(keys.len() as u64, format!("Reducing {}", country));
    let mut totals = LocationTotals::new();
    for key in &keys {
        let bytes = context.output.fetch(key).await?;
        match read_totals(bytes) {
            Ok(file_totals) => totals.merge(&file_totals),
            Err(e) => warn!(key = %key, "skipping unreadable output: {}", e),
        }
        bar.inc(1);
    }
    bar.finish_with_message(format!("Reduced {} files", keys.len()));

    let rows = footprint(&totals, &context.settings.footprint);
    let file = NamedTempFile::new()?;
    save_reduced_csv(&rows, file.path())?;

    let target = join_key(&folders.aggregated, &format!("{}.csv", country));
    let bytes = tokio::fs::read(file.path()).await?;
    context
        .output
        .store(&target, Bytes::from(bytes))
        .await
        .with_context(|| format!("Failed to store `{}`", target))?;
    info!(country, files = keys.len(), locations = rows.len(), "reduced country");

    Ok(target)
}

// -- Tests -------------------------------------------------------------------
