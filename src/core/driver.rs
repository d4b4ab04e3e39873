/// The Monte Carlo driver — many independent trials over one calibrated
/// scenario, sequentially or fanned out across a thread pool.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::core::calibrate::{calibrate, CalibrationError};
use crate::core::classify::EndingRule;
use crate::core::executor::{SimConfig, TrialError, TrialExecutor};
use crate::schema::scenario::{Scenario, ScenarioError};
use crate::schema::trial::TrialResult;

// Prime stride between per-trial RNG streams.
const TRIAL_SEED_STRIDE: u64 = 7919;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no scenario provided")]
    MissingScenario,
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("calibration error: {0}")]
    Calibration(#[from] CalibrationError),
}

/// A trial that aborted, with its index in the batch.
#[derive(Debug)]
pub struct TrialFailure {
    pub trial: usize,
    pub error: TrialError,
}

/// Results of a batch of trials. Failed trials are recorded separately and
/// never abort the batch.
#[derive(Debug, Default)]
pub struct Batch {
    pub results: Vec<TrialResult>,
    pub failures: Vec<TrialFailure>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Pre-offset stress samples, in trial order.
    pub fn stresses(&self) -> impl Iterator<Item = f64> + '_ {
        self.results.iter().map(|r| r.stress)
    }

    /// Post-offset scores, in trial order.
    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.results.iter().map(|r| r.score)
    }

    /// Mean of the pre-offset stress samples (0 for an empty batch).
    pub fn mean(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.stresses().sum::<f64>() / self.results.len() as f64
    }

    /// Population standard deviation of the pre-offset stress samples.
    pub fn std_dev(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .stresses()
            .map(|s| (s - mean) * (s - mean))
            .sum::<f64>()
            / self.results.len() as f64;
        variance.sqrt()
    }

    /// Fraction of pre-offset stress samples inside `[lo, hi]`.
    pub fn fraction_within(&self, lo: f64, hi: f64) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let hits = self.stresses().filter(|s| (lo..=hi).contains(s)).count();
        hits as f64 / self.results.len() as f64
    }

    fn record(&mut self, trial: usize, outcome: Result<TrialResult, TrialError>) {
        match outcome {
            Ok(result) => self.results.push(result),
            Err(error) => {
                debug!(trial, %error, "trial aborted");
                self.failures.push(TrialFailure { trial, error });
            }
        }
    }
}

/// A calibrated scenario plus everything needed to run trials against it.
/// Built via `Simulation::builder()`.
pub struct Simulation {
    scenario: Scenario,
    config: SimConfig,
    seed: u64,
    trace: bool,
}

/// Builder for constructing a `Simulation`.
pub struct SimulationBuilder {
    scenario: Option<Scenario>,
    target_std: f64,
    config: SimConfig,
    seed: u64,
    trace: bool,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder {
            scenario: None,
            target_std: 25.0,
            config: SimConfig::default(),
            seed: 0,
            trace: false,
        }
    }

    /// Wrap an already calibrated scenario without validation. The builder
    /// is the checked path; this exists for callers that assemble or
    /// calibrate scenarios themselves.
    pub fn new(scenario: Scenario, config: SimConfig, seed: u64) -> Self {
        Self {
            scenario,
            config,
            seed,
            trace: false,
        }
    }

    /// The calibrated scenario trials run against.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run `rounds` independent trials sequentially.
    pub fn run(&self, rounds: usize) -> Batch {
        let mut batch = Batch::default();
        for trial in 0..rounds {
            batch.record(trial, self.run_trial_seeded(trial));
        }
        debug!(
            rounds,
            failures = batch.failures.len(),
            "batch complete"
        );
        batch
    }

    /// Run `rounds` independent trials across the rayon thread pool.
    ///
    /// Each trial derives its own RNG stream from the batch seed, so the
    /// batch is identical to a sequential `run` with the same seed.
    pub fn run_parallel(&self, rounds: usize) -> Batch {
        let outcomes: Vec<(usize, Result<TrialResult, TrialError>)> = (0..rounds)
            .into_par_iter()
            .map(|trial| (trial, self.run_trial_seeded(trial)))
            .collect();

        let mut batch = Batch::default();
        for (trial, outcome) in outcomes {
            batch.record(trial, outcome);
        }
        debug!(
            rounds,
            failures = batch.failures.len(),
            "parallel batch complete"
        );
        batch
    }

    fn run_trial_seeded(&self, trial: usize) -> Result<TrialResult, TrialError> {
        let mut rng = StdRng::seed_from_u64(
            self.seed
                .wrapping_add((trial as u64).wrapping_mul(TRIAL_SEED_STRIDE)),
        );
        TrialExecutor::new(&self.scenario, &self.config).run_trial(&mut rng, self.trace)
    }
}

impl SimulationBuilder {
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Target standard deviation of aggregate stress across trials.
    pub fn target_std(mut self, std: f64) -> Self {
        self.target_std = std;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Collect a decision trace on every trial.
    pub fn trace(mut self, on: bool) -> Self {
        self.trace = on;
        self
    }

    /// Replace the whole execution config at once.
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn time_budget(mut self, hours: f64) -> Self {
        self.config.time_budget = hours;
        self
    }

    pub fn mean_offset(mut self, offset: f64) -> Self {
        self.config.mean_offset = offset;
        self
    }

    pub fn ending(mut self, rule: EndingRule) -> Self {
        self.config.ending = rule;
        self
    }

    pub fn relieve(mut self, prob: f64, ratio: f64) -> Self {
        self.config.relieve_prob = prob;
        self.config.relieve_ratio = ratio;
        self
    }

    pub fn party_factor(mut self, factor: f64) -> Self {
        self.config.party_factor = factor;
        self
    }

    /// Validate and calibrate the scenario, producing a runnable simulation.
    pub fn build(self) -> Result<Simulation, SimulationError> {
        let scenario = self.scenario.ok_or(SimulationError::MissingScenario)?;
        scenario.validate()?;
        let calibrated = calibrate(&scenario, self.target_std)?;
        Ok(Simulation {
            scenario: calibrated,
            config: self.config,
            seed: self.seed,
            trace: self.trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::trial::{Ending, TrialResult};

    fn batch_of(stresses: &[f64]) -> Batch {
        Batch {
            results: stresses
                .iter()
                .map(|&stress| TrialResult {
                    stress,
                    score: 100.0 + stress,
                    ending: Ending::Favorable,
                    trace: Vec::new(),
                })
                .collect(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn builder_requires_a_scenario() {
        assert!(matches!(
            Simulation::builder().build(),
            Err(SimulationError::MissingScenario)
        ));
    }

    #[test]
    fn empty_batch_statistics() {
        let batch = Batch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.mean(), 0.0);
        assert_eq!(batch.std_dev(), 0.0);
        assert_eq!(batch.fraction_within(-1.0, 1.0), 0.0);
    }

    #[test]
    fn batch_mean_and_std() {
        let batch = batch_of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((batch.mean() - 5.0).abs() < 1e-12);
        // population standard deviation of the classic example set
        assert!((batch.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fraction_within_is_inclusive() {
        let batch = batch_of(&[-25.0, -10.0, 0.0, 25.0, 30.0]);
        assert!((batch.fraction_within(-25.0, 25.0) - 0.8).abs() < 1e-12);
    }
}
