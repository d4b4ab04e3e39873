/// Scenario definitions — declarative scenes, tasks, and outcomes.
///
/// A `Scenario` is the immutable description of one simulated day. It is
/// authored directly or loaded from RON, validated once, and then calibrated
/// before any trial runs against it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Tolerance for the outcome-probability sum invariant.
pub const PROB_EPS: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("scenario '{scenario}' has no scenes")]
    NoScenes { scenario: String },
    #[error("task '{task}' has no outcomes")]
    NoOutcomes { task: String },
    #[error("task '{task}' outcome probabilities sum to {sum}, expected 1")]
    ProbabilitySum { task: String, sum: f64 },
    #[error("task '{task}' outcome '{outcome}' has probability {prob} outside [0, 1]")]
    ProbabilityRange {
        task: String,
        outcome: String,
        prob: f64,
    },
    #[error("task '{task}' outcome '{outcome}' has negative time cost {time_cost}")]
    NegativeTimeCost {
        task: String,
        outcome: String,
        time_cost: f64,
    },
    #[error("task '{task}' has appearance probability {prob} outside [0, 1]")]
    AppearanceRange { task: String, prob: f64 },
    #[error("overtime scene '{scene}' has no reply task")]
    NoReplyTask { scene: String },
    #[error(
        "message pool in scene '{scene}' has active range {min}..={max} for a pool of {size}"
    )]
    ActiveRange {
        scene: String,
        min: usize,
        max: usize,
        size: usize,
    },
}

/// One weighted result of a decision task.
///
/// `stress` is the signed magnitude added to the trial aggregate when this
/// outcome is drawn. For `Preset` tasks it is authored; for calibrated
/// tasks it is filled in by the calibrator and any authored value is
/// overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub label: String,
    pub prob: f64,
    #[serde(default)]
    pub time_cost: f64,
    #[serde(default)]
    pub stress: f64,
}

/// How a task's stress magnitudes are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMode {
    /// Magnitudes are authored in the scenario definition and left alone.
    Preset,
    /// Magnitudes are computed from the task's allocated variance share.
    /// Requires exactly two outcomes.
    BinarySplit,
}

impl Default for CalibrationMode {
    fn default() -> Self {
        CalibrationMode::Preset
    }
}

/// A decision point: probability-weighted outcomes behind an optional
/// appearance gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Importance weight used when allocating the variance budget.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Probability that the task appears in a given trial.
    #[serde(default = "default_appear_prob")]
    pub appear_prob: f64,
    #[serde(default)]
    pub calibration: CalibrationMode,
    pub outcomes: Vec<Outcome>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_appear_prob() -> f64 {
    1.0
}

/// A homogeneous pool of message tasks with linearly increasing base
/// severity: message `i` (1-based) has base `base + (i - 1) * step`.
///
/// Only a random subset of the pool is active in any one trial; the
/// active-count draw is uniform over `min_active..=max_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePool {
    /// Display label prefix; message `i` is traced as "<label> <i>".
    pub label: String,
    /// Fixed pool size. Activation never exceeds it.
    pub size: usize,
    pub base: f64,
    pub step: f64,
    /// Importance weight of each message in the pool.
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub min_active: usize,
    pub max_active: usize,
    /// Per-message variance allocation, filled in by calibration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variances: Vec<f64>,
}

/// Scene-kind tag. Behavior differences are dispatched on this variant
/// rather than through subclassing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneKind {
    Normal,
    /// Choosing the outcome with `accept_label` sets the party-attended
    /// flag for the rest of the trial.
    Party { accept_label: String },
    /// A reply decision (the scene's first task) followed by the message
    /// pool. Choosing `reply_label` arms per-message stress relief.
    Overtime {
        reply_label: String,
        messages: MessagePool,
    },
}

/// An ordered group of tasks forming one narrative segment of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default = "default_scene_kind")]
    pub kind: SceneKind,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

fn default_scene_kind() -> SceneKind {
    SceneKind::Normal
}

/// The full declarative description of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub scenes: Vec<Scene>,
}

impl Scenario {
    /// Load a scenario from a RON file and validate it.
    pub fn load_from_ron(path: &Path) -> Result<Scenario, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a scenario from a RON string and validate it.
    pub fn parse_ron(input: &str) -> Result<Scenario, ScenarioError> {
        let scenario: Scenario = ron::from_str(input)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the structural invariants of the definition.
    ///
    /// Calibration-specific requirements (binary outcome counts, weight
    /// signs) are checked again by the calibrator; this pass covers what
    /// must hold for any execution at all.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.scenes.is_empty() {
            return Err(ScenarioError::NoScenes {
                scenario: self.name.clone(),
            });
        }

        for scene in &self.scenes {
            for task in &scene.tasks {
                validate_task(task)?;
            }

            if let SceneKind::Overtime { messages, .. } = &scene.kind {
                if scene.tasks.is_empty() {
                    return Err(ScenarioError::NoReplyTask {
                        scene: scene.name.clone(),
                    });
                }
                if messages.min_active > messages.max_active
                    || messages.max_active > messages.size
                {
                    return Err(ScenarioError::ActiveRange {
                        scene: scene.name.clone(),
                        min: messages.min_active,
                        max: messages.max_active,
                        size: messages.size,
                    });
                }
            }
        }

        Ok(())
    }
}

fn validate_task(task: &Task) -> Result<(), ScenarioError> {
    if task.outcomes.is_empty() {
        return Err(ScenarioError::NoOutcomes {
            task: task.name.clone(),
        });
    }
    if !(0.0..=1.0).contains(&task.appear_prob) {
        return Err(ScenarioError::AppearanceRange {
            task: task.name.clone(),
            prob: task.appear_prob,
        });
    }

    let mut sum = 0.0;
    for outcome in &task.outcomes {
        if !(0.0..=1.0).contains(&outcome.prob) {
            return Err(ScenarioError::ProbabilityRange {
                task: task.name.clone(),
                outcome: outcome.label.clone(),
                prob: outcome.prob,
            });
        }
        if outcome.time_cost < 0.0 {
            return Err(ScenarioError::NegativeTimeCost {
                task: task.name.clone(),
                outcome: outcome.label.clone(),
                time_cost: outcome.time_cost,
            });
        }
        sum += outcome.prob;
    }

    if (sum - 1.0).abs() > PROB_EPS {
        return Err(ScenarioError::ProbabilitySum {
            task: task.name.clone(),
            sum,
        });
    }

    Ok(())
}
