use std::fmt;

use rand::Rng;
use rand::distr::{Distribution, Uniform};
use rand_distr::{Exp, LogNormal, Normal, Weibull};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sampling role a distribution is configured for. Each role has its own
/// default shape when the scenario leaves it unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Exposure,
    Incubation,
    Flight,
}

impl Role {
    pub fn default_spec(self) -> DistSpec {
        match self {
            Role::Exposure | Role::Incubation => DistSpec::Normal {
                mean: 96.0,
                sd: 10.0,
            },
            Role::Flight => DistSpec::Normal {
                mean: 11.0,
                sd: 1.0,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Exposure => "exposure",
            Role::Incubation => "incubation",
            Role::Flight => "flight",
        };
        f.write_str(name)
    }
}

/// Tagged distribution configuration: one strongly-typed parameter record
/// per kind. `Fixed` always returns its value and exists so scenarios can
/// pin a quantity to a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistSpec {
    Normal { mean: f64, sd: f64 },
    Uniform { low: f64, high: f64 },
    Weibull { shape: f64, scale: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Exponential { rate: f64 },
    Fixed { value: f64 },
}

impl DistSpec {
    /// Validate the parameters and compile an infallible sampler.
    pub fn build(self, role: Role) -> Result<Sampler, ConfigError> {
        let err = |reason: String| ConfigError::Distribution { role, reason };
        let sampler = match self {
            DistSpec::Normal { mean, sd } => {
                Sampler::Normal(Normal::new(mean, sd).map_err(|e| err(e.to_string()))?)
            }
            DistSpec::Uniform { low, high } => {
                Sampler::Uniform(Uniform::new(low, high).map_err(|e| err(e.to_string()))?)
            }
            // rand_distr's Weibull takes (scale, shape); the configuration
            // surface is shape/scale.
            DistSpec::Weibull { shape, scale } => {
                Sampler::Weibull(Weibull::new(scale, shape).map_err(|e| err(e.to_string()))?)
            }
            DistSpec::LogNormal { mu, sigma } => {
                Sampler::LogNormal(LogNormal::new(mu, sigma).map_err(|e| err(e.to_string()))?)
            }
            DistSpec::Exponential { rate } => {
                Sampler::Exponential(Exp::new(rate).map_err(|e| err(e.to_string()))?)
            }
            DistSpec::Fixed { value } => Sampler::Fixed(value),
        };
        Ok(sampler)
    }
}

/// Compiled form of a [`DistSpec`]; one scalar per draw.
#[derive(Debug, Clone)]
pub enum Sampler {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Weibull(Weibull<f64>),
    LogNormal(LogNormal<f64>),
    Exponential(Exp<f64>),
    Fixed(f64),
}

impl Sampler {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Normal(d) => d.sample(rng),
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Weibull(d) => d.sample(rng),
            Sampler::LogNormal(d) => d.sample(rng),
            Sampler::Exponential(d) => d.sample(rng),
            Sampler::Fixed(value) => *value,
        }
    }
}
