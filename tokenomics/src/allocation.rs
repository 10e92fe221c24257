// Copyright (c) 2024 Botho Foundation

//! Dynamic reward allocation.
//!
//! The share of the monthly rewards emission handed to users grows with the
//! user base, on a logarithmic scale between two milestones:
//!
//! ```text
//! growth_factor    = ln(users / initial) / ln(target / initial)   (clamped to [0, 1])
//! base_allocation  = min_allocation + (max_allocation - min_allocation) × growth_factor
//! per_user_usd     = allocation × emission_base × (1 - fee) × price / users
//! ```
//!
//! Early growth moves the allocation quickly, later growth slowly.
//!
//! ## Per-user bounds
//!
//! If the per-user reward at the base allocation exceeds `max_per_user_usd`,
//! the allocation that hits the ceiling exactly is solved for:
//!
//! ```text
//! required = (ceiling / price × users) / (1 - fee) / emission_base
//! ```
//!
//! and the allocation becomes `max(min(required, base), min_allocation)`.
//! The floor is handled symmetrically, never raising the allocation above
//! `max_allocation`. Per-user values are always reported for the final
//! allocation.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Milestones and bounds for the dynamic allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// User count at which the allocation sits at `min_allocation`.
    pub initial_users: u64,

    /// User count at which the allocation reaches `max_allocation`.
    pub target_users: u64,

    /// Lowest share of the rewards emission distributed (0.0 to 1.0).
    pub min_allocation: f64,

    /// Highest share of the rewards emission distributed (0.0 to 1.0).
    pub max_allocation: f64,

    /// Per-user monthly reward floor in USD.
    pub min_per_user_usd: f64,

    /// Per-user monthly reward ceiling in USD.
    pub max_per_user_usd: f64,

    /// Fraction of distributed rewards lost to distribution fees.
    pub distribution_fee: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            initial_users: 1_000,
            target_users: 1_000_000,
            min_allocation: 0.05,
            max_allocation: 0.90,
            min_per_user_usd: 0.10,
            max_per_user_usd: 5.00,
            distribution_fee: 0.0,
        }
    }
}

impl AllocationConfig {
    /// Set the user milestones.
    pub fn with_milestones(mut self, initial_users: u64, target_users: u64) -> Self {
        self.initial_users = initial_users;
        self.target_users = target_users;
        self
    }

    /// Set the allocation bounds.
    pub fn with_allocation_bounds(mut self, min_allocation: f64, max_allocation: f64) -> Self {
        self.min_allocation = min_allocation;
        self.max_allocation = max_allocation;
        self
    }

    /// Set the per-user USD floor and ceiling.
    pub fn with_per_user_bounds(mut self, min_usd: f64, max_usd: f64) -> Self {
        self.min_per_user_usd = min_usd;
        self.max_per_user_usd = max_usd;
        self
    }

    /// Allocation bounds, clamped to [0, 1] and ordered.
    fn allocation_bounds(&self) -> (f64, f64) {
        let lo = sanitize_fraction(self.min_allocation);
        let hi = sanitize_fraction(self.max_allocation);
        if lo > hi {
            warn!(
                min_allocation = self.min_allocation,
                max_allocation = self.max_allocation,
                "allocation bounds inverted, swapping"
            );
            (hi, lo)
        } else {
            (lo, hi)
        }
    }
}

/// Outcome of one dynamic allocation computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicAllocationResult {
    /// Share of the rewards emission distributed, in `[min, max]`.
    pub allocation_percent: f64,

    /// Logarithmic progress between the user milestones, in [0, 1].
    pub growth_factor: f64,

    /// Tokens each user receives this month (after distribution fee).
    pub per_user_monthly_tokens: f64,

    /// USD value of `per_user_monthly_tokens`.
    pub per_user_monthly_usd: f64,

    /// Tokens distributed this month (`allocation_percent × emission_base`).
    pub monthly_reward_tokens: f64,

    /// The per-user ceiling lowered the allocation.
    pub allocation_capped: bool,

    /// The per-user floor raised the allocation.
    pub floor_applied: bool,
}

/// Logarithmic growth factor between the milestones.
pub fn growth_factor(current_users: u64, initial_users: u64, target_users: u64) -> f64 {
    if current_users <= initial_users {
        return 0.0;
    }
    if current_users >= target_users {
        return 1.0;
    }

    // current > initial here, so initial may still be 0
    let initial = initial_users.max(1) as f64;
    let span = (target_users as f64 / initial).ln();
    if span <= 0.0 || !span.is_finite() {
        return 1.0;
    }

    ((current_users as f64 / initial).ln() / span).clamp(0.0, 1.0)
}

/// Compute this month's reward allocation.
pub fn calculate_dynamic_allocation(
    current_users: u64,
    token_price: f64,
    monthly_emission_base: f64,
    config: &AllocationConfig,
) -> DynamicAllocationResult {
    let (min_allocation, max_allocation) = config.allocation_bounds();
    let growth = growth_factor(current_users, config.initial_users, config.target_users);
    let base_allocation = if growth >= 1.0 {
        max_allocation
    } else {
        min_allocation + (max_allocation - min_allocation) * growth
    };

    let emission_base = if monthly_emission_base.is_finite() && monthly_emission_base > 0.0 {
        monthly_emission_base
    } else {
        0.0
    };
    let net_share = 1.0 - sanitize_fraction(config.distribution_fee);

    let mut result = DynamicAllocationResult {
        allocation_percent: base_allocation,
        growth_factor: growth,
        ..Default::default()
    };

    let price_valid = token_price.is_finite() && token_price > 0.0;
    if !price_valid {
        warn!(token_price, "non-positive token price, skipping per-user bounds");
    }

    if !price_valid || current_users == 0 || emission_base == 0.0 || net_share <= 0.0 {
        result.monthly_reward_tokens = base_allocation * emission_base;
        return result;
    }

    let users = current_users as f64;
    let per_user_usd_at = |allocation: f64| allocation * emission_base * net_share * token_price / users;
    let allocation_for = |per_user_usd: f64| (per_user_usd / token_price * users) / net_share / emission_base;

    let base_per_user_usd = per_user_usd_at(base_allocation);
    let mut allocation = base_allocation;

    if config.max_per_user_usd > 0.0 && base_per_user_usd > config.max_per_user_usd {
        let required = allocation_for(config.max_per_user_usd);
        allocation = required.min(base_allocation).max(min_allocation);
        result.allocation_capped = true;
    } else if config.min_per_user_usd > 0.0 && base_per_user_usd < config.min_per_user_usd {
        let required = allocation_for(config.min_per_user_usd);
        allocation = required.max(base_allocation).min(max_allocation);
        result.floor_applied = true;
    }

    // Report per-user values for the final allocation only
    result.allocation_percent = allocation;
    result.monthly_reward_tokens = allocation * emission_base;
    result.per_user_monthly_tokens = result.monthly_reward_tokens * net_share / users;
    result.per_user_monthly_usd = per_user_usd_at(allocation);
    result
}

fn sanitize_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_config() -> AllocationConfig {
        AllocationConfig::default().with_per_user_bounds(0.0, 1_000.0)
    }

    #[test]
    fn test_growth_factor_bounds() {
        assert_eq!(growth_factor(500, 1_000, 1_000_000), 0.0);
        assert_eq!(growth_factor(1_000, 1_000, 1_000_000), 0.0);
        assert_eq!(growth_factor(1_000_000, 1_000, 1_000_000), 1.0);
        assert_eq!(growth_factor(5_000_000, 1_000, 1_000_000), 1.0);
    }

    #[test]
    fn test_growth_factor_is_logarithmic() {
        // 31,623 is the geometric midpoint of 1,000 and 1,000,000
        let g = growth_factor(31_623, 1_000, 1_000_000);
        assert!((g - 0.5).abs() < 1e-4, "{g}");
    }

    #[test]
    fn test_allocation_at_target() {
        let config = wide_config();
        let result = calculate_dynamic_allocation(1_000_000, 0.01, 1_000_000.0, &config);
        assert_eq!(result.growth_factor, 1.0);
        assert_eq!(result.allocation_percent, 0.90);
        assert!(!result.allocation_capped);
        assert!(!result.floor_applied);
    }

    #[test]
    fn test_allocation_at_launch() {
        let config = wide_config();
        let result = calculate_dynamic_allocation(1_000, 0.01, 1_000_000.0, &config);
        assert_eq!(result.allocation_percent, 0.05);
        assert!((result.monthly_reward_tokens - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_never_drops_below_min_allocation() {
        // 10,000 users sharing a third of 10M tokens at $1 is $333 each
        let config = AllocationConfig::default().with_per_user_bounds(0.0, 5.0);
        let result = calculate_dynamic_allocation(10_000, 1.0, 10_000_000.0, &config);
        assert!(result.allocation_capped);
        // required = 5 × 10,000 / 10M = 0.005, lifted to min_allocation
        assert_eq!(result.allocation_percent, 0.05);
        assert!((result.per_user_monthly_usd - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_hits_exact_value() {
        let config = AllocationConfig::default()
            .with_allocation_bounds(0.0, 0.9)
            .with_per_user_bounds(0.0, 5.0);
        let result = calculate_dynamic_allocation(100_000, 1.0, 10_000_000.0, &config);
        assert!(result.allocation_capped);
        assert!((result.per_user_monthly_usd - 5.0).abs() < 1e-9);
        assert!((result.allocation_percent - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_floor_raises_allocation() {
        let config = AllocationConfig::default().with_per_user_bounds(0.10, 5.0);

        // Floor reachable: required = 0.1 / 0.01 × 80,000 / 1M = 0.8
        let result = calculate_dynamic_allocation(80_000, 0.01, 1_000_000.0, &config);
        assert!(result.floor_applied);
        assert!((result.allocation_percent - 0.8).abs() < 1e-12);
        assert!((result.per_user_monthly_usd - 0.10).abs() < 1e-9);

        // Floor unreachable: allocation stops at max_allocation
        let result = calculate_dynamic_allocation(500_000, 0.01, 1_000_000.0, &config);
        assert!(result.floor_applied);
        assert_eq!(result.allocation_percent, 0.90);
        assert!(result.per_user_monthly_usd < 0.10);
    }

    #[test]
    fn test_degenerate_inputs_do_not_produce_nan() {
        let config = AllocationConfig::default();
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = calculate_dynamic_allocation(10_000, price, 1_000_000.0, &config);
            assert!(result.allocation_percent.is_finite());
            assert_eq!(result.per_user_monthly_usd, 0.0);
        }
        let result = calculate_dynamic_allocation(0, 1.0, 0.0, &config);
        assert_eq!(result.monthly_reward_tokens, 0.0);
        assert_eq!(result.allocation_percent, 0.05);
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let config = wide_config().with_allocation_bounds(0.9, 0.1);
        let result = calculate_dynamic_allocation(1_000, 1.0, 1_000.0, &config);
        assert!((result.allocation_percent - 0.1).abs() < 1e-12);
    }
}
