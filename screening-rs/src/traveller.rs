use rand::Rng;

use crate::distributions::Sampler;

/// Screening checkpoint a traveller can be detected at. `Retest` carries the
/// index into the scenario's ordered re-test offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Departure,
    Arrival,
    Retest(usize),
    Release,
}

/// Detection state. `Detected` is terminal: a detected traveller is never
/// evaluated at a later checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravellerState {
    AtLarge,
    Detected(Checkpoint),
}

/// One infected (or sampled) person attempting the journey. Created once per
/// loop iteration and discarded at its end.
pub struct Traveller<'a> {
    exposure: &'a Sampler,
    symptomatic: bool,
    state: TravellerState,
}

impl<'a> Traveller<'a> {
    /// An unset probability means every traveller is symptomatic; otherwise
    /// the traveller is asymptomatic with probability `asymp_prob`.
    pub fn new<R: Rng + ?Sized>(
        exposure: &'a Sampler,
        asymp_prob: Option<f64>,
        rng: &mut R,
    ) -> Self {
        let symptomatic = match asymp_prob {
            Some(p) => rng.random::<f64>() >= p,
            None => true,
        };
        Self {
            exposure,
            symptomatic,
            state: TravellerState::AtLarge,
        }
    }

    /// Hours from infection to boarding the flight.
    pub fn sample_departure_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.exposure.draw(rng)
    }

    pub fn symptomatic(&self) -> bool {
        self.symptomatic
    }

    pub fn state(&self) -> TravellerState {
        self.state
    }

    pub fn is_at_large(&self) -> bool {
        matches!(self.state, TravellerState::AtLarge)
    }

    /// Transition to `Detected` at the given checkpoint. A traveller already
    /// detected keeps their original checkpoint.
    pub fn record(&mut self, checkpoint: Checkpoint) {
        if let TravellerState::AtLarge = self.state {
            self.state = TravellerState::Detected(checkpoint);
        }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::distributions::{DistSpec, Role};

    fn exposure() -> Sampler {
        DistSpec::Fixed { value: 48.0 }.build(Role::Exposure).unwrap()
    }

    #[test]
    fn test_symptomatic_by_default() {
        let sampler = exposure();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(Traveller::new(&sampler, None, &mut rng).symptomatic());
        }
    }

    #[test]
    fn test_asymptomatic_frequency() {
        let sampler = exposure();
        let mut rng = StdRng::seed_from_u64(4);
        let n = 10_000;
        let asymptomatic = (0..n)
            .filter(|_| !Traveller::new(&sampler, Some(0.3), &mut rng).symptomatic())
            .count();
        let fraction = asymptomatic as f64 / n as f64;
        assert!(f64::abs(fraction - 0.3) < 0.02);
    }

    #[test]
    fn test_detection_is_terminal() {
        let sampler = exposure();
        let mut rng = StdRng::seed_from_u64(5);
        let mut person = Traveller::new(&sampler, None, &mut rng);
        assert!(person.is_at_large());

        person.record(Checkpoint::Arrival);
        assert_eq!(person.state(), TravellerState::Detected(Checkpoint::Arrival));

        // Later checkpoints must not overwrite the first detection.
        person.record(Checkpoint::Release);
        assert_eq!(person.state(), TravellerState::Detected(Checkpoint::Arrival));
    }
}
