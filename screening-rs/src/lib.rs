//! Stochastic simulation of disease importation risk under border
//! screening: a seeded Monte Carlo pass over infected travellers moving
//! through exit, entry, and optional post-arrival checkpoints with
//! imperfect detection.

pub mod distributions;
pub mod error;
pub mod flight;
pub mod incubation;
pub mod runner;
pub mod screening;
pub mod traveller;

pub use distributions::{DistSpec, Role, Sampler};
pub use error::ConfigError;
pub use incubation::TimeScale;
pub use runner::Environment;
pub use screening::{
    IsolationPolicy, PopulationSampling, ScreeningCounts, ScreeningModel, ScreeningOutcome,
    ScreeningScenario,
};
