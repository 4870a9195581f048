use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distributions::{DistSpec, Role, Sampler};
use crate::error::ConfigError;

/// Unit the incubation distribution is parameterized on. The model works in
/// hours throughout; a `Days` scale multiplies each draw by 24.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    #[default]
    Hours,
    Days,
}

impl TimeScale {
    fn to_hours(self, value: f64) -> f64 {
        match self {
            TimeScale::Hours => value,
            TimeScale::Days => value * 24.0,
        }
    }
}

impl FromStr for TimeScale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "hours" => Ok(TimeScale::Hours),
            "days" => Ok(TimeScale::Days),
            _ => Err(ConfigError::TimeScale(s.to_string())),
        }
    }
}

/// Time from infection to symptom onset, or to detectability for
/// asymptomatic travellers. Asymptomatic status never changes the
/// distribution, only how checkpoints treat the traveller.
pub struct IncubationPeriod {
    sampler: Sampler,
    time_scale: TimeScale,
}

impl IncubationPeriod {
    pub fn new(spec: DistSpec, time_scale: TimeScale) -> Result<Self, ConfigError> {
        Ok(Self {
            sampler: spec.build(Role::Incubation)?,
            time_scale,
        })
    }

    /// Draw one onset time, in hours.
    pub fn sample_onset<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.time_scale.to_hours(self.sampler.draw(rng))
    }
}
