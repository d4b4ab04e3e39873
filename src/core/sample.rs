/// Weighted random choice — the single primitive behind every outcome draw.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("empty choice set")]
    Empty,
    #[error("invalid weights (negative, non-finite, or all zero)")]
    InvalidWeights,
}

/// Pick an index into `weights` with probability proportional to its weight.
///
/// Weights must be non-negative, finite, and not all zero; anything else is
/// an error, never a silent fallback. Zero-weight entries are never
/// selected. The cumulative table is built in input order, so entries keep
/// their declared precedence.
pub fn weighted_index(weights: &[f64], rng: &mut StdRng) -> Result<usize, SampleError> {
    if weights.is_empty() {
        return Err(SampleError::Empty);
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SampleError::InvalidWeights);
    }
    let dist = WeightedIndex::new(weights).map_err(|_| SampleError::InvalidWeights)?;
    Ok(dist.sample(rng))
}
