//! Mapper settings.
//!
//! [`MapperSettings::load`] reads the optional `[tidemark]` section of
//! `config/config.toml`, overridden by `TIDEMARK__*` environment variables
//! (e.g. `TIDEMARK__NULL_HANDLING=omit`).

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const SECTION: &str = "tidemark";

/// How the write path treats a null non-key property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullHandling {
    /// Record an explicit null entry in the value map
    #[default]
    Explicit,
    /// Leave the column out of the value map
    Omit,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapperSettings {
    #[serde(default)]
    pub null_handling: NullHandling,
    #[serde(default = "default_create_missing_tables")]
    pub create_missing_tables: bool,
    /// Row cap applied to `select_many` calls that pass no limit
    #[serde(default)]
    pub default_select_limit: Option<usize>,
}

fn default_create_missing_tables() -> bool {
    true
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            null_handling: NullHandling::default(),
            create_missing_tables: default_create_missing_tables(),
            default_select_limit: None,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("TIDEMARK")
        .separator("__")
        .keep_prefix(true)
        .try_parsing(true)
}

impl MapperSettings {
    /// Load from `config/config.toml`, falling back to env vars.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings cannot be deserialized.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from the TOML file at `path` (optional), then env vars.
    ///
    /// A file that exists but cannot be read or parsed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings cannot be deserialized.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if path.exists() {
                    log::warn!(
                        "failed to load {}, falling back to env: {err}",
                        path.display()
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        match settings.get::<MapperSettings>(SECTION) {
            Ok(loaded) => Ok(loaded),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Mapper settings could not be loaded from file or environment: {e}"
            ))),
        }
    }
}
