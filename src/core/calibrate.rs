/// Stress calibration — allocating a variance budget across tasks and
/// turning each task's share into signed outcome magnitudes.
///
/// Calibration never mutates its input: it returns a calibrated copy of the
/// scenario, so trials can share the original definition read-only and any
/// per-trial recomputation stays trial-local.

use thiserror::Error;

use crate::schema::scenario::{CalibrationMode, Scenario, SceneKind, Task, PROB_EPS};

/// Below this, a probability is treated as a hard 0 or 1.
pub const DEGENERATE_EPS: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("task '{task}' requests binary calibration with {count} outcomes, expected 2")]
    OutcomeCount { task: String, count: usize },
    #[error("task '{task}' outcome probabilities sum to {sum}, expected 1")]
    ProbabilitySum { task: String, sum: f64 },
    #[error("task '{task}' has negative importance weight {weight}")]
    NegativeWeight { task: String, weight: f64 },
}

/// Split an allocated per-occurrence variance into two signed magnitudes.
///
/// For success probability `p`, returns `(a, b)` with
/// `p*a + (1-p)*b == 0` and `p*a^2 + (1-p)*b^2 == variance`. A `p` at the
/// 0/1 boundary is degenerate and yields `(0.0, 0.0)` rather than an error.
pub fn binary_split(p: f64, variance: f64) -> (f64, f64) {
    if p < DEGENERATE_EPS || p > 1.0 - DEGENERATE_EPS {
        return (0.0, 0.0);
    }
    let a = (variance * (1.0 - p) / p).sqrt();
    let b = -(variance * p / (1.0 - p)).sqrt();
    (a, b)
}

/// Magnitude for one member of an index-linear pool.
///
/// The magnitude carries the full `sqrt(variance)` scale; `base` only
/// contributes its sign. A zero base yields a zero magnitude.
pub fn index_linear(variance: f64, base: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    let k = variance.sqrt() / base.abs();
    k * base
}

/// Calibrate every task that requests it against `target_std`.
///
/// Each participating task gets the per-occurrence variance
/// `(weight / total_weight) * target_std^2 / appear_prob`, so that summed
/// over appearance probabilities the full set reproduces the target
/// variance. `Preset` tasks keep their authored magnitudes and take no
/// share of the budget. Message pools store their per-message allocation
/// for the executor to reapply per trial.
///
/// Calibration is idempotent: it reads only declared probabilities and
/// weights, so calibrating an already calibrated copy changes nothing.
pub fn calibrate(scenario: &Scenario, target_std: f64) -> Result<Scenario, CalibrationError> {
    let mut calibrated = scenario.clone();

    let mut total_weight = 0.0;
    for scene in &calibrated.scenes {
        for task in &scene.tasks {
            if task.weight < 0.0 {
                return Err(CalibrationError::NegativeWeight {
                    task: task.name.clone(),
                    weight: task.weight,
                });
            }
            if task.calibration == CalibrationMode::BinarySplit {
                check_binary(task)?;
                total_weight += task.weight;
            }
        }
        if let SceneKind::Overtime { messages, .. } = &scene.kind {
            if messages.weight < 0.0 {
                return Err(CalibrationError::NegativeWeight {
                    task: messages.label.clone(),
                    weight: messages.weight,
                });
            }
            total_weight += messages.weight * messages.size as f64;
        }
    }

    if total_weight <= 0.0 {
        // Nothing requested calibration.
        return Ok(calibrated);
    }

    let budget = target_std * target_std;
    for scene in &mut calibrated.scenes {
        for task in &mut scene.tasks {
            if task.calibration != CalibrationMode::BinarySplit {
                continue;
            }
            if task.appear_prob < DEGENERATE_EPS {
                // Never appears; carries no share of the budget.
                for outcome in &mut task.outcomes {
                    outcome.stress = 0.0;
                }
                continue;
            }
            let variance = (task.weight / total_weight) * budget / task.appear_prob;
            let (a, b) = binary_split(task.outcomes[0].prob, variance);
            task.outcomes[0].stress = a;
            task.outcomes[1].stress = b;
        }

        if let SceneKind::Overtime { messages, .. } = &mut scene.kind {
            let share = (messages.weight / total_weight) * budget;
            messages.variances = vec![share; messages.size];
        }
    }

    Ok(calibrated)
}

fn check_binary(task: &Task) -> Result<(), CalibrationError> {
    if task.outcomes.len() != 2 {
        return Err(CalibrationError::OutcomeCount {
            task: task.name.clone(),
            count: task.outcomes.len(),
        });
    }
    let sum: f64 = task.outcomes.iter().map(|o| o.prob).sum();
    if (sum - 1.0).abs() > PROB_EPS {
        return Err(CalibrationError::ProbabilitySum {
            task: task.name.clone(),
            sum,
        });
    }
    Ok(())
}
