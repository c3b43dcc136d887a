//! Drops counter resets and statistical outliers from per-period deltas.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzers::utility::{abs_zscore, mean, stddev};
use crate::config::ZeroVariancePolicy;
use crate::turnstile::types::{PeriodDelta, TurnstileId};

/// Keeps strictly positive deltas. Zero and negative values (counter resets
/// and rollbacks) are discarded, not corrected.
pub fn retain_positive(deltas: Vec<PeriodDelta>) -> Vec<PeriodDelta> {
    deltas.into_iter().filter(|d| d.delta > 0.0).collect()
}

/// Which of `values` survive a z-score filter computed over `values` itself.
/// A value passes only when its absolute z-score is strictly below
/// `threshold`.
pub fn zscore_mask(values: &[f64], threshold: f64, policy: ZeroVariancePolicy) -> Vec<bool> {
    let m = mean(values);
    let sd = stddev(values, m);

    values
        .iter()
        .map(|&v| match abs_zscore(v, m, sd) {
            Some(z) => z < threshold,
            None => policy == ZeroVariancePolicy::Keep,
        })
        .collect()
}

/// Applies [`zscore_mask`] to each turnstile's deltas independently.
pub fn retain_within_zscore(
    deltas: Vec<PeriodDelta>,
    threshold: f64,
    policy: ZeroVariancePolicy,
) -> Vec<PeriodDelta> {
    let mut by_turnstile: HashMap<&Arc<TurnstileId>, Vec<f64>> = HashMap::new();
    for d in &deltas {
        by_turnstile.entry(&d.id).or_default().push(d.delta);
    }

    let mut masks: HashMap<Arc<TurnstileId>, std::vec::IntoIter<bool>> = by_turnstile
        .into_iter()
        .map(|(id, values)| {
            (
                Arc::clone(id),
                zscore_mask(&values, threshold, policy).into_iter(),
            )
        })
        .collect();

    deltas
        .into_iter()
        .filter(|d| {
            masks
                .get_mut(&d.id)
                .and_then(Iterator::next)
                .unwrap_or(false)
        })
        .collect()
}

/// Sign filter followed by the per-turnstile z-score filter.
pub fn filter_outliers(
    deltas: Vec<PeriodDelta>,
    threshold: f64,
    policy: ZeroVariancePolicy,
) -> Vec<PeriodDelta> {
    retain_within_zscore(retain_positive(deltas), threshold, policy)
}
