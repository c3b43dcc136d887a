//! Trailing rolling mean and lagged percent change over a day series.
//!
//! Both operate on `Option<f64>` cells; `None` marks an undefined value and
//! propagates the way a missing number would.

/// Trailing mean over `window` cells. A result is defined only when every
/// cell of its window is defined, so the first `window - 1` are `None`.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

/// Fractional change of each cell against the cell `lag` positions earlier.
/// Undefined when either side is missing or the earlier value is zero.
pub fn pct_change(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i < lag {
                return None;
            }
            match (values[i - lag], values[i]) {
                (Some(base), Some(current)) if base != 0.0 => Some(current / base - 1.0),
                _ => None,
            }
        })
        .collect()
}

/// Carries the last defined value forward over gaps. Leading gaps stay empty.
pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for cell in values.iter_mut() {
        match *cell {
            Some(v) => last = Some(v),
            None => *cell = last,
        }
    }
}

/// Rolling mean followed by lagged percent change of the smoothed series.
/// With `pad_gaps`, undefined smoothed cells take the last defined value
/// before the change is computed.
pub fn rolling_yoy(
    values: &[Option<f64>],
    window: usize,
    lag: usize,
    pad_gaps: bool,
) -> Vec<Option<f64>> {
    let mut smoothed = rolling_mean(values, window);
    if pad_gaps {
        forward_fill(&mut smoothed);
    }
    pct_change(&smoothed, lag)
}
