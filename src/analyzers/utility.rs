/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation (ddof = 0) given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Absolute z-score of `value`, or `None` when the sample has no spread.
pub fn abs_zscore(value: f64, mean: f64, stddev: f64) -> Option<f64> {
    if stddev == 0.0 {
        return None;
    }
    Some(((value - mean) / stddev).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert_eq!(stddev(&values, m), 2.0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
    }

    #[test]
    fn test_abs_zscore_zero_spread() {
        assert_eq!(abs_zscore(3.0, 3.0, 0.0), None);
        assert_eq!(abs_zscore(1.0, 4.0, 1.5), Some(2.0));
    }
}
