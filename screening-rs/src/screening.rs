use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::distributions::{DistSpec, Role};
use crate::error::ConfigError;
use crate::flight::FlightTime;
use crate::incubation::{IncubationPeriod, TimeScale};
use crate::traveller::{Checkpoint, Traveller, TravellerState};

/// Post-arrival self-isolation: an ordered set of re-test offsets and a
/// final release check, all in hours after arrival. Active only when the
/// last re-test falls on or before the release time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsolationPolicy {
    #[serde(deserialize_with = "scalar_or_seq")]
    pub retests: Vec<f64>,
    pub release_after: f64,
}

/// Draw travellers out of a mixed population with the given prevalence
/// instead of treating the whole cohort as infected.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PopulationSampling {
    pub prevalence: f64,
    pub total_population: u64,
}

/// Full configuration surface for one screening run. Unset distributions
/// fall back to their role defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreeningScenario {
    pub num_people: u64,
    pub exposure: Option<DistSpec>,
    pub incubation: Option<DistSpec>,
    pub flight: Option<DistSpec>,
    pub time_scale: TimeScale,
    pub exit_sensitivity: f64,
    pub entry_sensitivity: f64,
    pub isolation: Option<IsolationPolicy>,
    pub asymp_prob: Option<f64>,
    pub sampling: Option<PopulationSampling>,
    pub seed: u64,
}

impl Default for ScreeningScenario {
    fn default() -> Self {
        Self {
            num_people: 10,
            exposure: None,
            incubation: None,
            flight: None,
            time_scale: TimeScale::Hours,
            exit_sensitivity: 1.0,
            entry_sensitivity: 1.0,
            isolation: None,
            asymp_prob: None,
            sampling: None,
            seed: 0,
        }
    }
}

impl ScreeningScenario {
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ScenarioIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (which, value) in [
            ("exit", self.exit_sensitivity),
            ("entry", self.entry_sensitivity),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Sensitivity { which, value });
            }
        }
        if let Some(p) = self.asymp_prob
            && !(p > 0.0 && p < 1.0)
        {
            return Err(ConfigError::AsympProb(p));
        }
        if self.num_people == 0 {
            return Err(ConfigError::EmptyCohort);
        }
        Ok(())
    }
}

// Accepts either a bare re-test offset or a list of them.
fn scalar_or_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Retests {
        One(f64),
        Many(Vec<f64>),
    }
    Ok(match Retests::deserialize(deserializer)? {
        Retests::One(offset) => vec![offset],
        Retests::Many(offsets) => offsets,
    })
}

/// Per-checkpoint tallies for one run. Each traveller is counted exactly
/// once across all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreeningCounts {
    pub uninfected: u64,
    pub detected_departure: u64,
    pub detected_arrival: u64,
    pub detected_retest: Vec<u64>,
    pub detected_release: u64,
    pub undetected: u64,
}

impl ScreeningCounts {
    fn with_retests(retests: usize) -> Self {
        Self {
            detected_retest: vec![0; retests],
            ..Self::default()
        }
    }

    fn record(&mut self, checkpoint: Checkpoint) {
        match checkpoint {
            Checkpoint::Departure => self.detected_departure += 1,
            Checkpoint::Arrival => self.detected_arrival += 1,
            Checkpoint::Retest(i) => self.detected_retest[i] += 1,
            Checkpoint::Release => self.detected_release += 1,
        }
    }

    /// Detections at the destination border or later.
    pub fn detected_past_departure(&self) -> u64 {
        self.detected_arrival + self.detected_retest.iter().sum::<u64>() + self.detected_release
    }

    /// Every simulated person, detected or not.
    pub fn total(&self) -> u64 {
        self.uninfected + self.detected_departure + self.detected_past_departure() + self.undetected
    }
}

/// Counts plus the detection ratio; the full-output form of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningOutcome {
    pub counts: ScreeningCounts,
    /// Post-departure detections over travellers who reached the destination
    /// border. NaN when every traveller was caught at departure.
    pub detected_ratio: f64,
}

// Isolation stage after gating: offsets sorted ascending, last offset known
// to precede the release time.
struct IsolationSchedule {
    retests: Vec<f64>,
    last_offset: f64,
    release_after: f64,
}

fn gate_isolation(scenario: &ScreeningScenario) -> Option<IsolationSchedule> {
    let policy = scenario.isolation.as_ref()?;
    let mut retests = policy.retests.clone();
    retests.sort_by(f64::total_cmp);
    match retests.last().copied() {
        None => {
            warn!("self-isolation configured without re-test offsets; reverting to the base model");
            None
        }
        Some(last_offset) if last_offset > policy.release_after => {
            warn!(
                last_offset,
                release_after = policy.release_after,
                "last re-test falls after release; reverting to the base model"
            );
            None
        }
        Some(last_offset) => Some(IsolationSchedule {
            retests,
            last_offset,
            release_after: policy.release_after,
        }),
    }
}

fn gate_sampling(scenario: &ScreeningScenario) -> Option<PopulationSampling> {
    let sampling = scenario.sampling?;
    if scenario.num_people <= sampling.total_population
        && (0.0..=1.0).contains(&sampling.prevalence)
    {
        Some(sampling)
    } else {
        warn!(
            num_people = scenario.num_people,
            total_population = sampling.total_population,
            prevalence = sampling.prevalence,
            "invalid mixed-population parameters; treating the whole cohort as infected"
        );
        None
    }
}

/// Imperfect checkpoint test: deterministic at sensitivity exactly 1.
fn is_detected<R: Rng + ?Sized>(sensitivity: f64, rng: &mut R) -> bool {
    sensitivity == 1.0 || rng.random::<f64>() < sensitivity
}

pub struct ScreeningModel {}

impl ScreeningModel {
    /// Run one seeded screening pass and aggregate per-checkpoint counts.
    ///
    /// Every traveller draws an exposure-to-departure interval, an onset
    /// time, and a flight duration, then walks the checkpoint chain:
    /// departure, arrival, optional re-tests and release. Detection is
    /// terminal; the first checkpoint to catch a traveller claims them.
    pub fn run(scenario: &ScreeningScenario) -> Result<ScreeningOutcome, ConfigError> {
        scenario.validate()?;

        let exposure = scenario
            .exposure
            .unwrap_or_else(|| Role::Exposure.default_spec())
            .build(Role::Exposure)?;
        let incubation = IncubationPeriod::new(
            scenario
                .incubation
                .unwrap_or_else(|| Role::Incubation.default_spec()),
            scenario.time_scale,
        )?;
        let flight = FlightTime::new(
            scenario
                .flight
                .unwrap_or_else(|| Role::Flight.default_spec()),
        )?;

        let isolation = gate_isolation(scenario);
        let sampling = gate_sampling(scenario);

        let retest_slots = isolation.as_ref().map_or(0, |s| s.retests.len());
        let mut counts = ScreeningCounts::with_retests(retest_slots);
        let mut rng = StdRng::seed_from_u64(scenario.seed);

        for _ in 0..scenario.num_people {
            // An uninfected draw from the mixed population never becomes a
            // case; record and move on.
            if let Some(sampling) = sampling
                && rng.random::<f64>() >= sampling.prevalence
            {
                counts.uninfected += 1;
                continue;
            }

            let mut person = Traveller::new(&exposure, scenario.asymp_prob, &mut rng);
            let depart_time = person.sample_departure_time(&mut rng);
            let onset_time = incubation.sample_onset(&mut rng);
            let flight_time = flight.sample_duration(&mut rng);
            let arrival_time = depart_time + flight_time;

            // Exit screening at the origin border.
            if onset_time <= depart_time && is_detected(scenario.exit_sensitivity, &mut rng) {
                person.record(Checkpoint::Departure);
            }

            // Entry screening on landing.
            if person.is_at_large()
                && onset_time <= arrival_time
                && is_detected(scenario.entry_sensitivity, &mut rng)
            {
                person.record(Checkpoint::Arrival);
            }

            // Self-isolation: re-test at each offset in order; the release
            // check applies only to symptomatic travellers who were not yet
            // testable at the last re-test.
            if let Some(schedule) = &isolation
                && person.is_at_large()
            {
                for (i, offset) in schedule.retests.iter().enumerate() {
                    if onset_time <= arrival_time + *offset
                        && is_detected(scenario.entry_sensitivity, &mut rng)
                    {
                        person.record(Checkpoint::Retest(i));
                        break;
                    }
                }
                if person.is_at_large()
                    && person.symptomatic()
                    && onset_time > arrival_time + schedule.last_offset
                    && onset_time <= arrival_time + schedule.release_after
                    && is_detected(scenario.entry_sensitivity, &mut rng)
                {
                    person.record(Checkpoint::Release);
                }
            }

            match person.state() {
                TravellerState::Detected(checkpoint) => counts.record(checkpoint),
                TravellerState::AtLarge => counts.undetected += 1,
            }
        }

        // Travellers who made it onto a flight. When exit screening caught
        // everyone the ratio is NaN by policy; counts stay exact.
        let travelled = scenario.num_people - counts.detected_departure;
        let detected_ratio = if travelled == 0 {
            f64::NAN
        } else {
            counts.detected_past_departure() as f64 / travelled as f64
        };

        debug!(
            num_people = scenario.num_people,
            seed = scenario.seed,
            detected_ratio,
            "screening pass complete"
        );

        Ok(ScreeningOutcome {
            counts,
            detected_ratio,
        })
    }
}
