//! Configuration Loader
//!
//! Layers an optional configuration file and `NSCHECK_*` environment variables
//! into a validated [`CheckConfig`]. Nested keys use `__` in the environment,
//! e.g. `NSCHECK_THRESHOLDS__TOTAL__WARNING=10g`.

use ::config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::CheckConfig;
use crate::constants::env;

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CheckConfig,
    config_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from the process environment and an optional file
    pub fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(config_file, None)
    }

    /// Load with an explicit environment map instead of the process environment.
    /// This is useful for testing without modifying global environment variables
    pub fn load_with_env(
        config_file: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            debug!(config_file = %path.display(), "Adding configuration file source");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env::CONFIG_PREFIX)
                .prefix_separator("_")
                .separator(env::CONFIG_SEPARATOR)
                .try_parsing(true)
                .source(environment),
        );

        let source_name = config_file
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config: CheckConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize::<CheckConfig>())
            .map_err(|e| ConfigurationError::source_error(source_name, e))?;

        debug!(
            threads = config.threads,
            verbose = config.verbose,
            breakdown = config.breakdown,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            config_file: config_file.map(Path::to_path_buf),
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CheckConfig {
        &mut self.config
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Validate and hand over the configuration
    pub fn into_validated(self) -> ConfigResult<CheckConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
