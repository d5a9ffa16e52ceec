use anyhow::{anyhow, Context as _, Result};
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{cli::create_spinner, footprint::footprint, parquet::save_reduced_csv};

use super::{join_key, Context};

/// Exports every location of the summary store with its footprint as
/// `<aggregated>/all_data.csv`. Returns its key.
pub async fn combine(context: &Context) -> Result<String> {
    let bar = create_spinner("Reading summary store...".to_string());
    let totals = context
        .summary
        .load_all()
        .await
        .context("Failed to read summary store")?;
    bar.finish_with_message(format!("{} locations", totals.len()));

    if totals.is_empty() {
        return Err(anyhow!("Summary store is empty"));
    }

    let rows = footprint(&totals, &context.settings.footprint);
    let file = NamedTempFile::new()?;
    save_reduced_csv(&rows, file.path())?;

    let target = join_key(&context.settings.folders.aggregated, "all_data.csv");
    let bytes = tokio::fs::read(file.path()).await?;
    context.output.store(&target, Bytes::from(bytes)).await?;
    info!(locations = rows.len(), "combined summary store");

    Ok(target)
}

// -- Tests -------------------------------------------------------------------
