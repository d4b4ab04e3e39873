use serde::{Deserialize, Serialize};

/// Terminal classification of one simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ending {
    Favorable,
    Unfavorable,
}

impl Ending {
    /// Returns the tag string for this ending (e.g., "ending:favorable").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Favorable => "ending:favorable",
            Self::Unfavorable => "ending:unfavorable",
        }
    }
}

/// The outcome of one complete trial.
///
/// `stress` is the variance-bearing aggregate before the additive mean
/// offset; `score` includes the offset. `trace` is empty unless the trial
/// was run with tracing on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub stress: f64,
    pub score: f64,
    pub ending: Ending,
    pub trace: Vec<String>,
}
