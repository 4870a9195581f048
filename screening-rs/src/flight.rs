use rand::Rng;

use crate::distributions::{DistSpec, Role, Sampler};
use crate::error::ConfigError;

/// Flight duration from origin to destination, in hours.
pub struct FlightTime {
    sampler: Sampler,
}

impl FlightTime {
    pub fn new(spec: DistSpec) -> Result<Self, ConfigError> {
        Ok(Self {
            sampler: spec.build(Role::Flight)?,
        })
    }

    pub fn sample_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.sampler.draw(rng)
    }
}
