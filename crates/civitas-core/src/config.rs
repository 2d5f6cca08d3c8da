//! Configuration loading and typed config structures for Civitas.
//!
//! The canonical configuration lives in `civitas-config.yaml` at the project
//! root; the `CIVITAS_CONFIG` environment variable points the loader
//! elsewhere. Every field has a default, so an empty or missing file yields
//! a runnable simulation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use civitas_society::CivilizationRules;
use civitas_types::Resource;

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "civitas-config.yaml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "CIVITAS_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `civitas-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Initial population and mortality.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Civilization tunables.
    #[serde(default)]
    pub rules: CivilizationRules,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. An empty document yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Resolve the configuration path: `CIVITAS_CONFIG` if set, else
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Same as [`SimulationConfig::from_file`] for an existing file.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Check values that parse but cannot drive a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(field) = self.rules.invalid_probabilities().first() {
            return Err(ConfigError::invalid(field, "probability must be within [0, 1]"));
        }

        let population = &self.population;
        if population.tribe_size == 0 {
            return Err(ConfigError::invalid(
                "population.tribe_size",
                "tribes need at least one member",
            ));
        }
        if !(0.0..=1.0).contains(&population.death_chance) {
            return Err(ConfigError::invalid(
                "population.death_chance",
                "probability must be within [0, 1]",
            ));
        }
        if !population.starting_energy.is_finite() || population.starting_energy < 0.0 {
            return Err(ConfigError::invalid(
                "population.starting_energy",
                "must be a non-negative number",
            ));
        }
        if population.grid_size == 0 || i32::try_from(population.grid_size).is_err() {
            return Err(ConfigError::invalid(
                "population.grid_size",
                "must be positive and fit in a grid coordinate",
            ));
        }
        if let Some((resource, amount)) = population
            .starting_resources
            .iter()
            .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
        {
            return Err(ConfigError::invalid(
                "population.starting_resources",
                format!("{resource} amount {amount} must be a non-negative number"),
            ));
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for the single simulation RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of ticks to run before stopping.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Real-time pause between ticks in milliseconds; 0 runs flat out.
    #[serde(default)]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            max_ticks: default_max_ticks(),
            tick_interval_ms: 0,
        }
    }
}

/// Initial population parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Entities spawned at tick 0.
    #[serde(default = "default_initial_count")]
    pub initial_count: u32,

    /// Consecutive entities grouped into each initial tribe.
    #[serde(default = "default_tribe_size")]
    pub tribe_size: u32,

    /// Energy every entity starts with.
    #[serde(default = "default_starting_energy")]
    pub starting_energy: f64,

    /// Per-tick chance that a living entity dies.
    #[serde(default = "default_death_chance")]
    pub death_chance: f64,

    /// Side of the square grid entities are scattered over.
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,

    /// Resources granted to every initial tribe.
    #[serde(default = "default_starting_resources")]
    pub starting_resources: BTreeMap<Resource, f64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_count: default_initial_count(),
            tribe_size: default_tribe_size(),
            starting_energy: default_starting_energy(),
            death_chance: default_death_chance(),
            grid_size: default_grid_size(),
            starting_resources: default_starting_resources(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Civitas")
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_ticks() -> u64 {
    1000
}

const fn default_initial_count() -> u32 {
    40
}

const fn default_tribe_size() -> u32 {
    8
}

const fn default_starting_energy() -> f64 {
    100.0
}

const fn default_death_chance() -> f64 {
    0.001
}

const fn default_grid_size() -> u32 {
    64
}

fn default_starting_resources() -> BTreeMap<Resource, f64> {
    BTreeMap::from([
        (Resource::Food, 60.0),
        (Resource::Wood, 80.0),
        (Resource::Stone, 40.0),
    ])
}

fn default_log_level() -> String {
    String::from("info")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
