pub mod combine;
pub mod inspect;
pub mod plan;
pub mod process;
pub mod reduce;
pub mod status;

use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use chrono::{Datelike, Local};
use tracing::{info, warn};

use crate::{
    config::Settings,
    grid::Aggregator,
    model::{SedModel, TurbineModel, TurbineSpec},
    store::{HttpStore, JsonSummaryStore, LocalStore, ObjectStore, SummaryStore},
};

pub use combine::combine;
pub use inspect::inspect;
pub use plan::{plan, PlanOptions};
pub use process::process;
pub use reduce::reduce;
pub use status::status;

/// Settings and store handles shared by every command.
pub struct Context {
    pub settings: Settings,
    /// Input grids. The local store unless an HTTP base is configured.
    pub input: Arc<dyn ObjectStore>,
    /// Outputs, reduced tables and manifests.
    pub output: Arc<dyn ObjectStore>,
    pub summary: Arc<dyn SummaryStore>,
}

impl Context {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let local = Arc::new(LocalStore::new(&settings.store.root));
        let input: Arc<dyn ObjectStore> = match &settings.store.http_base {
            Some(base) => {
                info!(base = %base, "reading input over http");
                Arc::new(HttpStore::new(base)?)
            }
            None => local.clone(),
        };
        let summary = Arc::new(JsonSummaryStore::new(settings.summary_path()));

        Ok(Context {
            settings,
            input,
            output: local,
            summary,
        })
    }

    pub fn input_key(&self, key: &str) -> String {
        join_key(&self.settings.folders.input, key)
    }
}

/// Loads the turbine and, when configured, the SED regression.
pub fn build_aggregator(settings: &Settings) -> Result<Aggregator> {
    let spec = match &settings.model.turbine {
        Some(path) => TurbineSpec::load(path)
            .with_context(|| format!("Failed to load turbine `{}`", path.display()))?,
        None => TurbineSpec::enercon_e82(),
    };
    info!(turbine = %spec.name, hub_height = spec.hub_height, "loaded turbine");

    let turbine = TurbineModel::new(spec, settings.model.roughness)?;
    let mut aggregator = Aggregator::new(settings.duplicates).with_model(Arc::new(turbine));

    match &settings.model.sed {
        Some(path) => {
            let sed = SedModel::load(path)
                .with_context(|| format!("Failed to load SED model `{}`", path.display()))?;
            info!(degree = sed.degree(), "loaded SED model");
            aggregator = aggregator.with_model(Arc::new(sed));
        }
        None => warn!("no SED model configured, energy demand is not computed"),
    }

    Ok(aggregator)
}

/// `folder/key` with exactly one separator.
pub fn join_key(folder: &str, key: &str) -> String {
    format!(
        "{}/{}",
        folder.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// The key of the output written for an input key: same folders, `.parquet`
/// extension.
pub fn output_key(folder: &str, key: &str) -> String {
    let stem = match Path::new(key).extension() {
        Some(ext) => &key[..key.len() - ext.len() - 1],
        None => key,
    };

    join_key(folder, &format!("{}.parquet", stem))
}

/// A file name carrying today's date.
pub fn make_dated_file_name(prefix: &str, extension: &str) -> String {
    let today = Local::now();

    format!(
        "{}-{}-{:02}-{:02}.{}",
        prefix,
        today.year(),
        today.month(),
        today.day(),
        extension
    )
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_join_keys() {
        assert_eq!(join_key("output/", "/Germany/a.parquet"), "output/Germany/a.parquet");
        assert_eq!(join_key("World_2019", "Spain/b.nc4"), "World_2019/Spain/b.nc4");
    }

    #[test]
    fn should_swap_extension_for_output_key() {
        assert_eq!(
            output_key("output_compressed", "Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.nc4"),
            "output_compressed/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.parquet"
        );
        assert_eq!(output_key("output", "Spain/grid"), "output/Spain/grid.parquet");
    }

    #[test]
    fn should_date_file_name() {
        let name = make_dated_file_name("merra2-plan", "json");

        assert!(name.starts_with("merra2-plan-20"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "merra2-plan-YYYY-MM-DD.json".len());
    }

    #[test]
    fn should_build_default_aggregator_without_sed() {
        let aggregator = build_aggregator(&Settings::default()).unwrap();

        assert_eq!(aggregator.model_names(), vec!["power_output"]);
    }
}
