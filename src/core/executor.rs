/// Trial execution — the per-day state machine over scenes and tasks.
///
/// One trial walks the scenario's scenes in order, draws each task's
/// appearance and outcome, and accumulates stress and time spend in a
/// `ScenarioState` that is constructed fresh per trial and discarded at its
/// end. Scene-kind behavior is dispatched on the `SceneKind` variant with a
/// uniform "mutate state, return the scene's stress delta" contract.

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::calibrate::index_linear;
use crate::core::classify::EndingRule;
use crate::core::sample::{weighted_index, SampleError};
use crate::schema::scenario::{MessagePool, Outcome, Scenario, Scene, SceneKind, Task};
use crate::schema::trial::TrialResult;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("task '{task}': {source}")]
    OutcomeDraw { task: String, source: SampleError },
    #[error("overtime scene '{scene}' has no reply task")]
    MissingReplyTask { scene: String },
    #[error("message pool in scene '{scene}' was not calibrated")]
    UncalibratedPool { scene: String },
}

/// Numeric parameters of trial execution. Scenario-independent.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Hours available for the whole day.
    pub time_budget: f64,
    /// Additive offset turning zero-mean stress into the reported score.
    pub mean_offset: f64,
    /// Chance that a reply relieves any one active message.
    pub relieve_prob: f64,
    /// Fraction of a message's stress removed by relief.
    pub relieve_ratio: f64,
    /// Multiplier on message stress once the party was attended.
    pub party_factor: f64,
    pub ending: EndingRule,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_budget: 10.0,
            mean_offset: 100.0,
            relieve_prob: 0.7,
            relieve_ratio: 0.2,
            party_factor: 1.2,
            ending: EndingRule::default(),
        }
    }
}

/// Mutable per-trial state threaded through scene execution.
///
/// Never shared across trials; the party flag and the activation set live
/// here precisely so that no global is written between trials.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub time_left: f64,
    pub stress: f64,
    pub party_attended: bool,
    /// Names of pool messages active in this trial.
    pub active_tasks: FxHashSet<String>,
}

impl ScenarioState {
    pub fn new(time_budget: f64) -> Self {
        Self {
            time_left: time_budget,
            stress: 0.0,
            party_attended: false,
            active_tasks: FxHashSet::default(),
        }
    }
}

/// Decision trace for one trial. Lines are only materialized when the
/// trace is enabled, so the hot path stays allocation-free.
#[derive(Debug, Default)]
pub struct Trace {
    enabled: bool,
    lines: Vec<String>,
}

impl Trace {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            lines: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn push<F: FnOnce() -> String>(&mut self, line: F) {
        if self.enabled {
            self.lines.push(line());
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Executes single trials against one calibrated scenario.
pub struct TrialExecutor<'a> {
    scenario: &'a Scenario,
    config: &'a SimConfig,
}

impl<'a> TrialExecutor<'a> {
    pub fn new(scenario: &'a Scenario, config: &'a SimConfig) -> Self {
        Self { scenario, config }
    }

    /// Run one complete day.
    pub fn run_trial(
        &self,
        rng: &mut StdRng,
        with_trace: bool,
    ) -> Result<TrialResult, TrialError> {
        let mut state = ScenarioState::new(self.config.time_budget);
        let mut trace = if with_trace {
            Trace::enabled()
        } else {
            Trace::disabled()
        };

        for scene in &self.scenario.scenes {
            trace.push(|| format!("=== {} ===", scene.name));
            let delta = self.run_scene(scene, &mut state, rng, &mut trace)?;
            state.stress += delta;
            trace.push(|| format!("scene '{}' done (stress {:+.2})", scene.name, delta));
        }

        let score = self.config.mean_offset + state.stress;
        let ending = self
            .config
            .ending
            .classify(state.stress, self.config.mean_offset);
        trace.push(|| format!("day over: stress {:.2}, score {:.2}", state.stress, score));

        Ok(TrialResult {
            stress: state.stress,
            score,
            ending,
            trace: trace.into_lines(),
        })
    }

    /// Execute one scene, mutating `state` (time, flags, activation set)
    /// and returning the scene's stress delta. The caller folds the delta
    /// into `state.stress`.
    pub fn run_scene(
        &self,
        scene: &Scene,
        state: &mut ScenarioState,
        rng: &mut StdRng,
        trace: &mut Trace,
    ) -> Result<f64, TrialError> {
        match &scene.kind {
            SceneKind::Normal => self.run_task_list(scene, None, state, rng, trace),
            SceneKind::Party { accept_label } => {
                self.run_task_list(scene, Some(accept_label.as_str()), state, rng, trace)
            }
            SceneKind::Overtime {
                reply_label,
                messages,
            } => self.run_overtime(scene, reply_label, messages, state, rng, trace),
        }
    }

    fn run_task_list(
        &self,
        scene: &Scene,
        accept_label: Option<&str>,
        state: &mut ScenarioState,
        rng: &mut StdRng,
        trace: &mut Trace,
    ) -> Result<f64, TrialError> {
        let mut delta = 0.0;
        for task in &scene.tasks {
            if state.time_left <= 0.0 {
                trace.push(|| "no time left, remaining tasks skipped".to_string());
                break;
            }
            let Some(outcome) = self.run_task(task, state, rng, trace)? else {
                continue;
            };
            delta += outcome.stress;
            if accept_label == Some(outcome.label.as_str()) {
                state.party_attended = true;
                trace.push(|| "accepted the invitation".to_string());
            }
        }
        Ok(delta)
    }

    /// Draw a task's appearance gate and, if it appears, one outcome.
    /// Time spend is applied here; stress accumulation is the caller's.
    fn run_task<'s>(
        &self,
        task: &'s Task,
        state: &mut ScenarioState,
        rng: &mut StdRng,
        trace: &mut Trace,
    ) -> Result<Option<&'s Outcome>, TrialError> {
        if rng.gen::<f64>() >= task.appear_prob {
            trace.push(|| format!("task '{}' did not appear", task.name));
            return Ok(None);
        }

        let weights: Vec<f64> = task.outcomes.iter().map(|o| o.prob).collect();
        let idx = weighted_index(&weights, rng).map_err(|source| TrialError::OutcomeDraw {
            task: task.name.clone(),
            source,
        })?;
        let outcome = &task.outcomes[idx];

        state.time_left -= outcome.time_cost;
        trace.push(|| {
            format!(
                "task '{}' -> {} (stress {:+.2}, {:.2}h)",
                task.name, outcome.label, outcome.stress, outcome.time_cost
            )
        });
        Ok(Some(outcome))
    }

    fn run_overtime(
        &self,
        scene: &Scene,
        reply_label: &str,
        pool: &MessagePool,
        state: &mut ScenarioState,
        rng: &mut StdRng,
        trace: &mut Trace,
    ) -> Result<f64, TrialError> {
        if state.time_left <= 0.0 {
            trace.push(|| "no time left, remaining tasks skipped".to_string());
            return Ok(0.0);
        }

        let reply_task = scene
            .tasks
            .first()
            .ok_or_else(|| TrialError::MissingReplyTask {
                scene: scene.name.clone(),
            })?;
        if pool.variances.len() < pool.size {
            return Err(TrialError::UncalibratedPool {
                scene: scene.name.clone(),
            });
        }

        let mut delta = 0.0;
        let mut replied = false;
        if let Some(outcome) = self.run_task(reply_task, state, rng, trace)? {
            delta += outcome.stress;
            replied = outcome.label == reply_label;
        }
        if state.time_left <= 0.0 {
            trace.push(|| "no time left, remaining tasks skipped".to_string());
            return Ok(delta);
        }

        let active = rng.gen_range(pool.min_active..=pool.max_active);
        trace.push(|| format!("{} of {} messages arrive", active, pool.size));
        for index in 1..=active {
            state.active_tasks.insert(format!("{} {}", pool.label, index));
        }

        for index in 1..=pool.size {
            let name = format!("{} {}", pool.label, index);
            if !state.active_tasks.contains(&name) {
                trace.push(|| format!("{} stayed silent", name));
                continue;
            }

            let base = pool.base + (index as f64 - 1.0) * pool.step;
            let mut stress = index_linear(pool.variances[index - 1], base);
            if state.party_attended {
                stress *= self.config.party_factor;
            }
            if replied && rng.gen::<f64>() < self.config.relieve_prob {
                stress -= stress * self.config.relieve_ratio;
                trace.push(|| format!("{} relieved", name));
            }
            trace.push(|| format!("{} (stress {:+.2})", name, stress));
            delta += stress;
        }

        Ok(delta)
    }
}
