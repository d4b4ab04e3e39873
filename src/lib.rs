//! Stress Engine — Monte Carlo simulation of narrative day cycles.
//!
//! Models one simulated day as an ordered sequence of scenes, each holding
//! decision tasks with probabilistic outcomes that contribute signed stress.
//! Per-outcome magnitudes are calibrated so that, across many randomized
//! trials, the distribution of total stress hits a prescribed mean and
//! standard deviation; the resulting samples classify narrative endings.

pub mod core;
pub mod scenario_templates;
pub mod schema;
