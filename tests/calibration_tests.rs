/// Calibration integration tests — moment identities and the variance
/// budget over full scenario definitions.

use stress_engine::core::calibrate::{binary_split, calibrate, CalibrationError};
use stress_engine::scenario_templates::workday;
use stress_engine::schema::scenario::{
    CalibrationMode, Outcome, Scenario, Scene, SceneKind, Task,
};

fn binary_task(name: &str, p: f64, weight: f64, appear_prob: f64) -> Task {
    Task {
        name: name.to_string(),
        weight,
        appear_prob,
        calibration: CalibrationMode::BinarySplit,
        outcomes: vec![
            Outcome {
                label: "success".to_string(),
                prob: p,
                time_cost: 0.5,
                stress: 0.0,
            },
            Outcome {
                label: "failure".to_string(),
                prob: 1.0 - p,
                time_cost: 0.5,
                stress: 0.0,
            },
        ],
    }
}

/// Second moment of a calibrated binary task: p*a^2 + (1-p)*b^2.
fn recovered_variance(task: &Task) -> f64 {
    let a = &task.outcomes[0];
    let b = &task.outcomes[1];
    a.prob * a.stress * a.stress + b.prob * b.stress * b.stress
}

#[test]
fn calibrated_tasks_satisfy_the_moment_identities() {
    let scenario = Scenario {
        name: "pair".to_string(),
        scenes: vec![Scene {
            name: "only".to_string(),
            kind: SceneKind::Normal,
            tasks: vec![
                binary_task("likely", 0.8, 1.0, 1.0),
                binary_task("coin", 0.5, 1.0, 1.0),
            ],
        }],
    };
    let calibrated = calibrate(&scenario, 25.0).unwrap();

    for task in &calibrated.scenes[0].tasks {
        let a = &task.outcomes[0];
        let b = &task.outcomes[1];
        let mean = a.prob * a.stress + b.prob * b.stress;
        assert!(mean.abs() < 1e-9, "task '{}' mean {}", task.name, mean);
        // equal weights, full appearance: each task owns half the budget
        assert!(
            (recovered_variance(task) - 312.5).abs() < 1e-9,
            "task '{}' variance {}",
            task.name,
            recovered_variance(task)
        );
    }
}

#[test]
fn variance_budget_sums_to_target_over_the_workday() {
    let calibrated = calibrate(&workday(), 25.0).unwrap();

    let mut total = 0.0;
    for scene in &calibrated.scenes {
        for task in &scene.tasks {
            if task.calibration == CalibrationMode::BinarySplit {
                total += task.appear_prob * recovered_variance(task);
            }
        }
        if let SceneKind::Overtime { messages, .. } = &scene.kind {
            total += messages.variances.iter().sum::<f64>();
        }
    }

    assert!((total - 625.0).abs() < 1e-6, "budget came to {}", total);
}

#[test]
fn degenerate_probability_zeroes_magnitudes_without_error() {
    for &p in &[0.0, 1.0] {
        let scenario = Scenario {
            name: "degenerate".to_string(),
            scenes: vec![Scene {
                name: "only".to_string(),
                kind: SceneKind::Normal,
                tasks: vec![binary_task("forced", p, 1.0, 1.0)],
            }],
        };
        let calibrated = calibrate(&scenario, 25.0).unwrap();
        let task = &calibrated.scenes[0].tasks[0];
        assert_eq!(task.outcomes[0].stress, 0.0);
        assert_eq!(task.outcomes[1].stress, 0.0);
    }

    // The primitive agrees.
    assert_eq!(binary_split(0.0, 625.0), (0.0, 0.0));
    assert_eq!(binary_split(1.0, 625.0), (0.0, 0.0));
}

#[test]
fn rare_tasks_get_inflated_per_occurrence_variance() {
    let scenario = Scenario {
        name: "rare".to_string(),
        scenes: vec![Scene {
            name: "only".to_string(),
            kind: SceneKind::Normal,
            tasks: vec![
                binary_task("common", 0.5, 1.0, 1.0),
                binary_task("rare", 0.5, 1.0, 0.5),
            ],
        }],
    };
    let calibrated = calibrate(&scenario, 25.0).unwrap();
    let common = recovered_variance(&calibrated.scenes[0].tasks[0]);
    let rare = recovered_variance(&calibrated.scenes[0].tasks[1]);

    // Same weight, half the appearances: per-occurrence variance doubles,
    // and the appearance-weighted contributions still match.
    assert!((rare - 2.0 * common).abs() < 1e-9);
    assert!((1.0 * common + 0.5 * rare - 625.0).abs() < 1e-9);
}

#[test]
fn binary_calibration_rejects_wrong_outcome_count() {
    let mut task = binary_task("three-way", 0.5, 1.0, 1.0);
    task.outcomes.push(Outcome {
        label: "third".to_string(),
        prob: 0.0,
        time_cost: 0.0,
        stress: 0.0,
    });
    let scenario = Scenario {
        name: "bad".to_string(),
        scenes: vec![Scene {
            name: "only".to_string(),
            kind: SceneKind::Normal,
            tasks: vec![task],
        }],
    };
    assert!(matches!(
        calibrate(&scenario, 25.0),
        Err(CalibrationError::OutcomeCount { .. })
    ));
}

#[test]
fn preset_scenarios_pass_through_untouched() {
    let mut task = binary_task("authored", 0.5, 1.0, 1.0);
    task.calibration = CalibrationMode::Preset;
    task.outcomes[0].stress = 8.0;
    task.outcomes[1].stress = 15.0;
    let scenario = Scenario {
        name: "authored day".to_string(),
        scenes: vec![Scene {
            name: "only".to_string(),
            kind: SceneKind::Normal,
            tasks: vec![task],
        }],
    };
    let calibrated = calibrate(&scenario, 25.0).unwrap();
    assert_eq!(calibrated, scenario);
}
