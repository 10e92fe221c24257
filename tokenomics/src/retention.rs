// Copyright (c) 2024 Botho Foundation

//! Retention curves: fraction of an acquisition cohort still active N months
//! after it was acquired.
//!
//! A curve is a sparse table of control points. Between points the curve is
//! interpolated along an exponential decay:
//!
//! ```text
//! k = ln(r2 / r1) / (m2 - m1)
//! r(t) = r1 * exp(k * (t - m1))        for m1 < t < m2
//! ```
//!
//! Before the first point the curve runs linearly from (0, 1.0). Past the
//! last point it keeps decaying at 2% per month, floored at 1%.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// Multiplicative decay applied per month past the last control point.
pub const TAIL_DECAY_PER_MONTH: f64 = 0.98;

/// Retention never decays below this past the last control point.
pub const TAIL_RETENTION_FLOOR: f64 = 0.01;

/// Immutable retention curve defined by sparse control points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetentionCurve {
    name: String,
    description: String,
    /// Months since acquisition -> retained fraction.
    monthly_rates: BTreeMap<u32, f64>,
}

impl RetentionCurve {
    /// Build a curve from control points.
    ///
    /// Requires at least one point, months >= 1 and rates in [0, 1].
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        points: &[(u32, f64)],
    ) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| ProjectionError::InvalidRetentionCurve {
            name: name.clone(),
            reason,
        };

        if points.is_empty() {
            return Err(invalid("no control points".to_string()));
        }

        let mut monthly_rates = BTreeMap::new();
        for &(month, rate) in points {
            if month == 0 {
                return Err(invalid("month 0 is implicitly 1.0".to_string()));
            }
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return Err(invalid(format!("rate {rate} at month {month} outside [0, 1]")));
            }
            monthly_rates.insert(month, rate);
        }

        Ok(Self {
            name,
            description: description.into(),
            monthly_rates,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Control points in month order.
    pub fn control_points(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.monthly_rates.iter().map(|(&m, &r)| (m, r))
    }

    /// Retained fraction `month` months after acquisition.
    ///
    /// Always in [0, 1]; 1.0 for `month <= 0`.
    pub fn retention_at(&self, month: i64) -> f64 {
        if month <= 0 {
            return 1.0;
        }
        let target = u32::try_from(month).unwrap_or(u32::MAX);

        if let Some(&rate) = self.monthly_rates.get(&target) {
            return rate.clamp(0.0, 1.0);
        }

        let below = self.monthly_rates.range(..target).next_back();
        let above = self.monthly_rates.range(target..).next();

        let rate = match (below, above) {
            (Some((&m1, &r1)), Some((&m2, &r2))) => interpolate(m1, r1, m2, r2, target),
            (None, Some((&m1, &r1))) => {
                // Linear from (0, 1.0) to the first control point
                1.0 + (r1 - 1.0) * target as f64 / m1 as f64
            }
            (Some((&last_month, &last_rate)), None) => {
                let elapsed = (target - last_month).min(i32::MAX as u32) as i32;
                let decayed = last_rate * TAIL_DECAY_PER_MONTH.powi(elapsed);
                decayed.max(TAIL_RETENTION_FLOOR.min(last_rate))
            }
            // Construction guarantees at least one control point.
            (None, None) => 1.0,
        };

        rate.clamp(0.0, 1.0)
    }

    /// Probability that a user active at `age - 1` months churns before `age`.
    pub fn monthly_churn_hazard(&self, age: i64) -> f64 {
        if age <= 0 {
            return 0.0;
        }
        let previous = self.retention_at(age - 1);
        if previous <= 0.0 {
            return 0.0;
        }
        (1.0 - self.retention_at(age) / previous).clamp(0.0, 1.0)
    }
}

fn interpolate(m1: u32, r1: f64, m2: u32, r2: f64, target: u32) -> f64 {
    let span = (m2 - m1) as f64;
    let offset = (target - m1) as f64;

    if r1 <= 0.0 || r2 <= 0.0 {
        return r1 + (r2 - r1) * offset / span;
    }

    let decay_rate = (r2 / r1).ln() / span;
    r1 * (decay_rate * offset).exp()
}

/// Built-in retention profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPreset {
    SocialApp,
    CryptoApp,
    Gaming,
    Utility,
    #[default]
    PlatformHybrid,
}

/// Consumer social: strong first month, long flat tail.
pub const SOCIAL_APP_RATES: &[(u32, f64)] =
    &[(1, 0.40), (3, 0.25), (6, 0.18), (12, 0.12), (24, 0.08)];

/// Crypto apps: speculative signups, steep early drop.
pub const CRYPTO_APP_RATES: &[(u32, f64)] =
    &[(1, 0.22), (3, 0.10), (6, 0.06), (12, 0.03), (24, 0.02)];

/// Mobile games.
pub const GAMING_RATES: &[(u32, f64)] =
    &[(1, 0.30), (3, 0.15), (6, 0.09), (12, 0.05), (24, 0.03)];

/// Utilities and productivity tools: shallow decay.
pub const UTILITY_RATES: &[(u32, f64)] =
    &[(1, 0.60), (3, 0.45), (6, 0.38), (12, 0.30), (24, 0.25)];

/// Creator platform with token rewards: social retention lifted by rewards.
pub const PLATFORM_HYBRID_RATES: &[(u32, f64)] =
    &[(1, 0.45), (3, 0.32), (6, 0.25), (12, 0.18), (24, 0.14), (36, 0.12)];

impl RetentionPreset {
    pub const ALL: [RetentionPreset; 5] = [
        RetentionPreset::SocialApp,
        RetentionPreset::CryptoApp,
        RetentionPreset::Gaming,
        RetentionPreset::Utility,
        RetentionPreset::PlatformHybrid,
    ];

    pub fn rates(self) -> &'static [(u32, f64)] {
        match self {
            RetentionPreset::SocialApp => SOCIAL_APP_RATES,
            RetentionPreset::CryptoApp => CRYPTO_APP_RATES,
            RetentionPreset::Gaming => GAMING_RATES,
            RetentionPreset::Utility => UTILITY_RATES,
            RetentionPreset::PlatformHybrid => PLATFORM_HYBRID_RATES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RetentionPreset::SocialApp => "social_app",
            RetentionPreset::CryptoApp => "crypto_app",
            RetentionPreset::Gaming => "gaming",
            RetentionPreset::Utility => "utility",
            RetentionPreset::PlatformHybrid => "platform_hybrid",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RetentionPreset::SocialApp => "Consumer social app",
            RetentionPreset::CryptoApp => "Crypto wallet / exchange app",
            RetentionPreset::Gaming => "Mobile game",
            RetentionPreset::Utility => "Utility / productivity tool",
            RetentionPreset::PlatformHybrid => "Creator platform with token rewards",
        }
    }

    /// Build the preset's curve.
    pub fn curve(self) -> RetentionCurve {
        RetentionCurve {
            name: self.name().to_string(),
            description: self.description().to_string(),
            monthly_rates: self.rates().iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_zero_is_full_retention() {
        for preset in RetentionPreset::ALL {
            let curve = preset.curve();
            assert_eq!(curve.retention_at(0), 1.0);
            assert_eq!(curve.retention_at(-3), 1.0);
        }
    }

    #[test]
    fn test_exact_control_point() {
        let curve = RetentionPreset::CryptoApp.curve();
        assert_eq!(curve.retention_at(1), 0.22);
        assert_eq!(curve.retention_at(12), 0.03);
    }

    #[test]
    fn test_exponential_interpolation() {
        let curve = RetentionCurve::new("test", "", &[(1, 0.22), (12, 0.03)]).unwrap();
        let expected = 0.22 * (0.03f64 / 0.22).powf(5.0 / 11.0);
        let actual = curve.retention_at(6);
        assert!((actual - expected).abs() < 1e-12, "{actual} vs {expected}");
        assert!((actual - 0.0889).abs() < 1e-3);
    }

    #[test]
    fn test_linear_fallback_for_zero_rate() {
        let curve = RetentionCurve::new("zero", "", &[(2, 0.4), (4, 0.0)]).unwrap();
        assert!((curve.retention_at(3) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_linear_before_first_point() {
        let curve = RetentionCurve::new("late", "", &[(4, 0.2)]).unwrap();
        // 1.0 -> 0.2 over 4 months: 0.8 at month 1, 0.4 at month 3
        assert!((curve.retention_at(1) - 0.8).abs() < 1e-12);
        assert!((curve.retention_at(3) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_tail_decay_and_floor() {
        let curve = RetentionCurve::new("tail", "", &[(1, 0.5)]).unwrap();
        assert!((curve.retention_at(2) - 0.49).abs() < 1e-12);
        assert_eq!(curve.retention_at(10_000), TAIL_RETENTION_FLOOR);

        // Floor never lifts the curve above its last point
        let tiny = RetentionCurve::new("tiny", "", &[(1, 0.005)]).unwrap();
        assert!(tiny.retention_at(500) <= 0.005);
    }

    #[test]
    fn test_presets_are_non_increasing() {
        for preset in RetentionPreset::ALL {
            let curve = preset.curve();
            let mut previous = 1.0;
            for month in 0..=72 {
                let rate = curve.retention_at(month);
                assert!(
                    rate <= previous + 1e-12,
                    "{} increases at month {month}: {previous} -> {rate}",
                    preset.name()
                );
                previous = rate;
            }
        }
    }

    #[test]
    fn test_invalid_curves_rejected() {
        assert!(RetentionCurve::new("empty", "", &[]).is_err());
        assert!(RetentionCurve::new("zero", "", &[(0, 0.5)]).is_err());
        assert!(RetentionCurve::new("big", "", &[(1, 1.5)]).is_err());
        assert!(RetentionCurve::new("nan", "", &[(1, f64::NAN)]).is_err());
    }

    #[test]
    fn test_churn_hazard() {
        let curve = RetentionCurve::new("half", "", &[(1, 0.5), (2, 0.25)]).unwrap();
        assert_eq!(curve.monthly_churn_hazard(0), 0.0);
        assert!((curve.monthly_churn_hazard(1) - 0.5).abs() < 1e-12);
        assert!((curve.monthly_churn_hazard(2) - 0.5).abs() < 1e-12);
    }
}
