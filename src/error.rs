//! Error types shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error with field path and constraint description.
///
/// Raised when a configuration value is rejected at construction time.
/// Values are never silently clamped into range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.min_soc"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Prefixes the field path with a parent section name.
    #[must_use]
    pub fn within(mut self, section: &str) -> Self {
        self.field = format!("{section}.{}", self.field);
        self
    }
}

/// All validation failures collected from one configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} invalid configuration value(s){}", .0.len(), list_fields(.0))]
pub struct ConfigErrors(pub Vec<ConfigError>);

fn list_fields(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("\n  {}: {}", e.field, e.message))
        .collect()
}

/// A profile (load curve, irradiance shape, meter series) that cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("{profile}: expected {expected} values, got {len}")]
    Length {
        profile: String,
        len: usize,
        expected: usize,
    },

    #[error("{profile}: value at index {index} is not finite")]
    NonFinite { profile: String, index: usize },

    #[error("{profile}: value at index {index} is negative ({value})")]
    Negative {
        profile: String,
        index: usize,
        value: f64,
    },

    #[error("{profile}: line {line}: \"{value}\" is not a number")]
    Parse {
        profile: String,
        line: u64,
        value: String,
    },

    #[error("{profile}: weight {value} must be finite and >= 0")]
    Weight { profile: String, value: f64 },

    #[error("{profile}: meter weights sum to {total}, expected > 0")]
    WeightTotal { profile: String, total: f64 },
}

/// A simulation run that had to be rejected.
///
/// The invariant variants indicate an engine defect. Debug builds panic on them
/// before they are ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(
        "hour {hour}: state of charge {soc_kwh:.6} kWh left [{min_kwh:.6}, {max_kwh:.6}] kWh"
    )]
    SocOutOfBounds {
        hour: usize,
        soc_kwh: f64,
        min_kwh: f64,
        max_kwh: f64,
    },

    #[error("hour {hour}: energy balance off by {residual_kw:e} kW")]
    EnergyImbalance { hour: usize, residual_kw: f64 },
}

/// Top-level error for scenario construction and runs.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invalid(#[from] ConfigErrors),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("cannot read \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
