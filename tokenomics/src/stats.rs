// Copyright (c) 2024 Botho Foundation

//! Summary statistics over simulation samples.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Index of percentile `p` in a sorted sample of length `n`.
///
/// `round(p × (n - 1))`, clamped into `[0, n - 1]`. Returns 0 for an empty
/// sample.
pub fn percentile_index(p: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    ((p * (n - 1) as f64).round() as usize).min(n - 1)
}

/// Summary statistics for a distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub median: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
}

impl DistributionStats {
    /// Compute statistics from a sample. Non-finite values are ignored.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        let percentile = |p: f64| sorted[percentile_index(p, n)];

        Self {
            count: n,
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            percentile_5: percentile(0.05),
            percentile_25: percentile(0.25),
            median: percentile(0.50),
            percentile_75: percentile(0.75),
            percentile_95: percentile(0.95),
        }
    }
}

/// Gini coefficient of a wealth distribution, in [0, 1].
pub fn calculate_gini(wealths: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = wealths
        .iter()
        .copied()
        .filter(|w| w.is_finite())
        .map(|w| w.max(0.0))
        .collect();
    let n = sorted.len();
    if n < 2 {
        return 0.0;
    }

    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    // G = (2 × Σ(i × x_i) - (n + 1) × Σx_i) / (n × Σx_i)
    let sum_indexed: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| (i as f64 + 1.0) * x)
        .sum();

    let numerator = 2.0 * sum_indexed - (n as f64 + 1.0) * total;
    (numerator / (n as f64 * total)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_index() {
        assert_eq!(percentile_index(0.05, 100), 5);
        assert_eq!(percentile_index(0.50, 100), 50);
        assert_eq!(percentile_index(0.95, 100), 94);
        assert_eq!(percentile_index(0.95, 1), 0);
        assert_eq!(percentile_index(1.5, 10), 9);
        assert_eq!(percentile_index(0.5, 0), 0);
    }

    #[test]
    fn test_stats_basic() {
        let samples: Vec<f64> = (1..=101).map(|x| x as f64).collect();
        let stats = DistributionStats::from_samples(&samples);
        assert_eq!(stats.count, 101);
        assert_eq!(stats.mean, 51.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 101.0);
        assert_eq!(stats.median, 51.0);
        assert_eq!(stats.percentile_5, 6.0);
        assert_eq!(stats.percentile_95, 96.0);
    }

    #[test]
    fn test_stats_empty_and_nan() {
        assert_eq!(DistributionStats::from_samples(&[]), DistributionStats::default());
        let stats = DistributionStats::from_samples(&[f64::NAN, 2.0, 4.0]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.std_dev, 1.0);
    }

    #[test]
    fn test_gini_perfect_equality() {
        assert_eq!(calculate_gini(&[100.0, 100.0, 100.0, 100.0]), 0.0);
    }

    #[test]
    fn test_gini_high_inequality() {
        let gini = calculate_gini(&[0.0, 0.0, 0.0, 0.0, 1_000.0]);
        assert!(gini > 0.75, "{gini}");
    }

    #[test]
    fn test_gini_degenerate() {
        assert_eq!(calculate_gini(&[]), 0.0);
        assert_eq!(calculate_gini(&[5.0]), 0.0);
        assert_eq!(calculate_gini(&[0.0, 0.0]), 0.0);
    }
}
