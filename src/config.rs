//! Settings from a TOML file with `MERRA2_*` environment overrides.
//!
//! ```toml
//! duplicates = "reject"
//! jobs = 4
//!
//! [store]
//! root = "/data/merra2"
//!
//! [folders]
//! input = "World_2019"
//!
//! [model]
//! turbine = "turbines/e82.toml"
//! sed = "models/sed.json"
//! roughness = { constant = 0.15 }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::ConfigError, footprint::FootprintSettings, grid::DuplicatePolicy, model::Roughness,
};

/// Looked up in the working directory when no file is given.
pub const DEFAULT_CONFIG_FILE: &str = "merra2-power.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub folders: FolderSettings,
    /// JSON summary document. Defaults to `summary.json` under the store root.
    pub summary_path: Option<PathBuf>,
    pub model: ModelSettings,
    pub duplicates: DuplicatePolicy,
    pub footprint: FootprintSettings,
    /// Files processed at once.
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub root: PathBuf,
    /// Fetch input files from this URL instead of the store root.
    pub http_base: Option<String>,
}

/// Key prefixes inside the object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderSettings {
    pub input: String,
    pub output: String,
    pub output_compressed: String,
    pub aggregated: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Turbine TOML file. The built-in E-82/2300 is used when unset.
    pub turbine: Option<PathBuf>,
    /// Fitted SED regression. No `sed` column is produced when unset.
    pub sed: Option<PathBuf>,
    pub roughness: Roughness,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store: StoreSettings::default(),
            folders: FolderSettings::default(),
            summary_path: None,
            model: ModelSettings::default(),
            duplicates: DuplicatePolicy::default(),
            footprint: FootprintSettings::default(),
            jobs: 4,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("merra2");

        StoreSettings {
            root,
            http_base: None,
        }
    }
}

impl Default for FolderSettings {
    fn default() -> Self {
        FolderSettings {
            input: "World_2019".to_string(),
            output: "output".to_string(),
            output_compressed: "output_compressed".to_string(),
            aggregated: "output_aggregated".to_string(),
        }
    }
}

impl Settings {
    /// Reads `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, then applies the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = match path {
            Some(path) => Some(path),
            None if default_path.exists() => Some(default_path),
            None => None,
        };

        let mut settings = match path {
            Some(path) => {
                info!(path = %path.display(), "loading settings");
                Self::from_toml_str(&fs::read_to_string(path)?)?
            }
            None => {
                debug!("no settings file, using defaults");
                Settings::default()
            }
        };
        settings.apply_env_from(|key| std::env::var(key).ok())?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Overrides settings from `MERRA2_*` variables found by `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("MERRA2_STORE_ROOT") {
            self.store.root = PathBuf::from(root);
        }
        if let Some(base) = lookup("MERRA2_HTTP_BASE") {
            self.store.http_base = Some(base).filter(|b| !b.is_empty());
        }
        if let Some(path) = lookup("MERRA2_SUMMARY_PATH") {
            self.summary_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("MERRA2_TURBINE") {
            self.model.turbine = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("MERRA2_SED_MODEL") {
            self.model.sed = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("MERRA2_ROUGHNESS") {
            self.model.roughness = value.parse().map_err(|_| ConfigError::Env {
                key: "MERRA2_ROUGHNESS".to_string(),
                value,
            })?;
        }
        if let Some(value) = lookup("MERRA2_DUPLICATES") {
            self.duplicates = value.parse().map_err(|_| ConfigError::Env {
                key: "MERRA2_DUPLICATES".to_string(),
                value,
            })?;
        }
        if let Some(value) = lookup("MERRA2_JOBS") {
            self.jobs = value.parse().map_err(|_| ConfigError::Env {
                key: "MERRA2_JOBS".to_string(),
                value,
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
        }
        if let Roughness::Constant(z0) = self.model.roughness {
            if !(z0 > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "roughness length must be positive, got {}",
                    z0
                )));
            }
        }
        let footprint = &self.footprint;
        for (name, value) in [
            ("epsilon", footprint.epsilon),
            ("emissions_kg", footprint.emissions_kg),
            ("lifetime_years", footprint.lifetime_years),
            ("hours_per_year", footprint.hours_per_year),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "footprint {} must be positive, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.summary_path
            .clone()
            .unwrap_or_else(|| self.store.root.join("summary.json"))
    }
}

// -- Tests -------------------------------------------------------------------
