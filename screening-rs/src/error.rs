use std::path::PathBuf;

use thiserror::Error;

use crate::distributions::Role;

/// Scenario validation or loading failure. Raised before any sampling
/// happens; a run that starts always runs to completion.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{which} screening sensitivity must lie in (0, 1], got {value}")]
    Sensitivity { which: &'static str, value: f64 },

    #[error("invalid time scale {0:?}; supported scales are \"hours\" and \"days\"")]
    TimeScale(String),

    #[error("invalid {role} distribution: {reason}")]
    Distribution { role: Role, reason: String },

    #[error("asymptomatic probability must lie in (0, 1), got {0}")]
    AsympProb(f64),

    #[error("cohort must contain at least one traveller")]
    EmptyCohort,

    #[error("failed to read scenario file {path}: {source}")]
    ScenarioIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    ScenarioToml(#[from] toml::de::Error),

    #[error("failed to parse scenario: {0}")]
    ScenarioJson(#[from] serde_json::Error),
}
