use std::collections::BTreeSet;

use anyhow::{anyhow, Context as _, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::{cli::create_spinner, reading::country_of};

use super::{join_key, make_dated_file_name, output_key, Context};

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub per_batch: usize,
    pub countries: Vec<String>,
    pub exclude: Vec<String>,
    pub skip_output: bool,
    pub skip_completed: bool,
    pub max_batches: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    files: usize,
    batches: Vec<Batch<'a>>,
}

#[derive(Debug, Serialize)]
struct Batch<'a> {
    files: &'a [String],
}

/// Lists the input files still to do, splits them into batches and stores a
/// JSON manifest. Returns the manifest key.
pub async fn plan(context: &Context, options: &PlanOptions) -> Result<String> {
    if options.per_batch == 0 {
        return Err(anyhow!("Batch size must be at least 1"));
    }
    let folders = &context.settings.folders;

    let bar = create_spinner("Listing input files...".to_string());
    let prefix = join_key(&folders.input, "");
    let mut keys: Vec<String> = context
        .input
        .list(&prefix)
        .await
        .context("Failed to list input files")?
        .into_iter()
        .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
        .collect();
    bar.finish_with_message(format!("{} input files", keys.len()));

    keys = filter_countries(keys, &options.countries, &options.exclude);

    if options.skip_output {
        let mut existing = BTreeSet::new();
        for folder in [&folders.output, &folders.output_compressed] {
            existing.extend(context.output.list(&join_key(folder, "")).await?);
        }
        keys.retain(|key| {
            !existing.contains(&output_key(&folders.output, key))
                && !existing.contains(&output_key(&folders.output_compressed, key))
        });
    }

    if options.skip_completed {
        let completed = context.summary.completed().await?;
        keys.retain(|key| !completed.contains(key));
    }

    keys.sort();
    let mut batches = split_batches(&keys, options.per_batch);
    if let Some(max) = options.max_batches {
        batches.truncate(max);
    }
    info!(files = keys.len(), batches = batches.len(), "planned batches");

    let manifest = Manifest {
        files: batches.iter().map(|b| b.len()).sum(),
        batches: batches.into_iter().map(|files| Batch { files }).collect(),
    };
    let key = join_key("plans", &make_dated_file_name("merra2-plan", "json"));
    context
        .output
        .store(&key, Bytes::from(serde_json::to_vec_pretty(&manifest)?))
        .await?;

    Ok(key)
}

/// Keeps keys whose country folder is in `countries` (all when empty) and
/// not in `exclude`.
pub fn filter_countries(keys: Vec<String>, countries: &[String], exclude: &[String]) -> Vec<String> {
    keys.into_iter()
        .filter(|key| {
            let country = country_of(key).unwrap_or_default();
            (countries.is_empty() || countries.iter().any(|c| c == country))
                && !exclude.iter().any(|c| c == country)
        })
        .collect()
}

/// Splits `keys` into `len / per_batch` batches (at least one) of near equal
/// size. The first `len % n` batches take one extra key.
pub fn split_batches(keys: &[String], per_batch: usize) -> Vec<&[String]> {
    if keys.is_empty() || per_batch == 0 {
        return Vec::new();
    }

    let count = (keys.len() / per_batch).max(1);
    let base = keys.len() / count;
    let extra = keys.len() % count;

    let mut batches = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        batches.push(&keys[start..start + size]);
        start += size;
    }

    batches
}

// -- Tests -------------------------------------------------------------------
