use std::collections::BTreeMap;

use anyhow::{Context as _, Result};

use crate::reading::country_of;

use super::{join_key, Context};

/// Output files counted for one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryStatus {
    pub country: String,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub target: usize,
    pub countries: Vec<CountryStatus>,
}

impl StatusReport {
    pub fn complete(&self) -> usize {
        self.countries.iter().filter(|c| c.files >= self.target).count()
    }

    /// Countries with fewer files than the target.
    pub fn remaining(&self) -> Vec<&CountryStatus> {
        self.countries
            .iter()
            .filter(|c| c.files < self.target)
            .collect()
    }
}

/// Counts the compressed output files of every country.
pub async fn status(context: &Context, target: usize) -> Result<StatusReport> {
    let prefix = join_key(&context.settings.folders.output_compressed, "");
    let keys = context
        .output
        .list(&prefix)
        .await
        .context("Failed to list output files")?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in &keys {
        if let Some(country) = key.strip_prefix(&prefix).and_then(country_of) {
            *counts.entry(country.to_string()).or_default() += 1;
        }
    }

    Ok(StatusReport {
        target,
        countries: counts
            .into_iter()
            .map(|(country, files)| CountryStatus { country, files })
            .collect(),
    })
}

// -- Tests -------------------------------------------------------------------
