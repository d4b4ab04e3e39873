/// The standard workday: five scenes from the morning commute to
/// after-hours messages, all stress magnitudes left to calibration.

use crate::schema::scenario::{
    CalibrationMode, MessagePool, Outcome, Scenario, Scene, SceneKind, Task,
};

fn binary_task(
    name: &str,
    weight: f64,
    appear_prob: f64,
    first: (&str, f64, f64),
    second: (&str, f64, f64),
) -> Task {
    Task {
        name: name.to_string(),
        weight,
        appear_prob,
        calibration: CalibrationMode::BinarySplit,
        outcomes: vec![
            Outcome {
                label: first.0.to_string(),
                prob: first.1,
                time_cost: first.2,
                stress: 0.0,
            },
            Outcome {
                label: second.0.to_string(),
                prob: second.1,
                time_cost: second.2,
                stress: 0.0,
            },
        ],
    }
}

/// One simulated working day.
///
/// The dinner invitation is weighted heaviest (it gates the party factor
/// later on), the reply decision next; two of the four deep-work tasks
/// only appear half the time.
pub fn workday() -> Scenario {
    let morning = Scene {
        name: "Leaving for work".to_string(),
        kind: SceneKind::Normal,
        tasks: vec![binary_task(
            "breakfast",
            1.0,
            1.0,
            ("eat", 0.8, 0.5),
            ("skip it", 0.2, 0.25),
        )],
    };

    let tirade = Scene {
        name: "The boss's tirade".to_string(),
        kind: SceneKind::Normal,
        tasks: vec![binary_task(
            "unprovoked scolding",
            1.0,
            1.0,
            ("swallow it", 0.5, 0.5),
            ("push back", 0.5, 0.5),
        )],
    };

    let deep_work = Scene {
        name: "Deep work".to_string(),
        kind: SceneKind::Normal,
        tasks: vec![
            binary_task(
                "crunch task 1",
                1.0,
                1.0,
                ("task done", 0.5, 1.0),
                ("task failed", 0.5, 1.0),
            ),
            binary_task(
                "crunch task 2",
                1.0,
                1.0,
                ("task done", 0.5, 1.0),
                ("task failed", 0.5, 1.0),
            ),
            binary_task(
                "crunch task 3",
                1.0,
                0.5,
                ("task done", 0.5, 1.0),
                ("task failed", 0.5, 1.0),
            ),
            binary_task(
                "crunch task 4",
                1.0,
                0.5,
                ("task done", 0.5, 1.0),
                ("task failed", 0.5, 1.0),
            ),
        ],
    };

    let dinner = Scene {
        name: "Dinner invitation".to_string(),
        kind: SceneKind::Party {
            accept_label: "accept gladly".to_string(),
        },
        tasks: vec![binary_task(
            "a friend calls",
            3.0,
            1.0,
            ("accept gladly", 0.5, 1.0),
            ("beg off", 0.5, 1.0),
        )],
    };

    let overtime = Scene {
        name: "After-hours messages".to_string(),
        kind: SceneKind::Overtime {
            reply_label: "reply".to_string(),
            messages: MessagePool {
                label: "boss message".to_string(),
                size: 4,
                base: 5.0,
                step: 3.0,
                weight: 1.0,
                min_active: 2,
                max_active: 4,
                variances: Vec::new(),
            },
        },
        tasks: vec![binary_task(
            "reply to the boss?",
            2.0,
            1.0,
            ("reply", 0.5, 0.5),
            ("ignore it", 0.5, 0.5),
        )],
    };

    Scenario {
        name: "workday".to_string(),
        scenes: vec![morning, tirade, deep_work, dinner, overtime],
    }
}
