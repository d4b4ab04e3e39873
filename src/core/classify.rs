/// Ending classification — a threshold comparison over terminal stress.

use serde::{Deserialize, Serialize};

use crate::schema::trial::Ending;

/// Rule assigning an ending category to a terminal stress value.
///
/// `include_offset` selects whether the additive mean offset participates
/// in the comparison; source material disagrees on this (and on the
/// threshold itself), so both are configuration rather than constants.
/// Values strictly above the threshold classify as `Unfavorable`; values
/// at or below it as `Favorable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndingRule {
    pub threshold: f64,
    pub include_offset: bool,
}

impl Default for EndingRule {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            include_offset: false,
        }
    }
}

impl EndingRule {
    pub fn classify(&self, stress: f64, offset: f64) -> Ending {
        let value = if self.include_offset {
            stress + offset
        } else {
            stress
        };
        if value > self.threshold {
            Ending::Unfavorable
        } else {
            Ending::Favorable
        }
    }
}
