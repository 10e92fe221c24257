// Copyright (c) 2024 Botho Foundation

//! Safety caps on recapture flows.
//!
//! Recapture removes tokens from circulation or redirects them each month:
//! burns, staking locks, treasury diversions and revenue-funded buybacks.
//! Every flow is capped so that no combination of inputs can produce a
//! negative flow or one larger than the economy can supply.
//!
//! ## Bounds
//!
//! | Flow                              | Bound                                             |
//! |-----------------------------------|---------------------------------------------------|
//! | Burn, Staking, Treasury, Other    | min(share × emission, supply_share × circulating) |
//! | Buyback                           | buyback_revenue_share × revenue / price           |
//!
//! Buybacks are funded by protocol revenue, not by token inflow, so their
//! bound is the revenue converted to tokens at the current price.
//!
//! ## Combining flows
//!
//! Each source is capped on its own first and only then summed. The sum is
//! checked against a final backstop (`combined_emission_share × emission`);
//! when it is exceeded every component is scaled by the same factor, which
//! keeps their proportions intact.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kind of recapture flow being capped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapType {
    Burn,
    Staking,
    Treasury,
    Other,
    Buyback,
}

/// Cap parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyCapConfig {
    /// Max burn as a share of monthly emission.
    pub burn_emission_share: f64,

    /// Max staking lock as a share of monthly emission.
    pub staking_emission_share: f64,

    /// Max treasury diversion as a share of monthly emission.
    pub treasury_emission_share: f64,

    /// Max for any other token flow as a share of monthly emission.
    pub other_emission_share: f64,

    /// Max for any token flow as a share of circulating supply, per month.
    pub supply_share: f64,

    /// Share of monthly revenue that may fund buybacks.
    pub buyback_revenue_share: f64,

    /// Backstop on the combined recapture as a share of monthly emission.
    pub combined_emission_share: f64,
}

impl Default for SafetyCapConfig {
    fn default() -> Self {
        Self {
            burn_emission_share: 0.40,
            staking_emission_share: 0.40,
            treasury_emission_share: 0.40,
            other_emission_share: 0.40,
            supply_share: 0.05,
            buyback_revenue_share: 1.0,
            combined_emission_share: 0.80,
        }
    }
}

impl SafetyCapConfig {
    fn emission_share(&self, cap_type: CapType) -> f64 {
        let share = match cap_type {
            CapType::Burn => self.burn_emission_share,
            CapType::Staking => self.staking_emission_share,
            CapType::Treasury => self.treasury_emission_share,
            CapType::Other | CapType::Buyback => self.other_emission_share,
        };
        non_negative(share)
    }
}

/// Economic state the caps are evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapContext {
    /// Tokens emitted this month.
    pub monthly_emission: f64,
    /// Revenue this month in USD.
    pub revenue_usd: f64,
    /// Token price in USD.
    pub token_price: f64,
    /// Tokens in circulation.
    pub circulating_supply: f64,
}

/// Upper bound for a flow of the given type.
pub fn cap_bound(cap_type: CapType, ctx: &CapContext, config: &SafetyCapConfig) -> f64 {
    match cap_type {
        CapType::Buyback => {
            if !(ctx.token_price.is_finite() && ctx.token_price > 0.0) {
                warn!(token_price = ctx.token_price, "non-positive token price, buyback capped at 0");
                return 0.0;
            }
            let budget = non_negative(config.buyback_revenue_share) * non_negative(ctx.revenue_usd);
            budget / ctx.token_price
        }
        _ => {
            let emission_bound = config.emission_share(cap_type) * non_negative(ctx.monthly_emission);
            let supply = non_negative(ctx.circulating_supply);
            if supply == 0.0 {
                warn!(?cap_type, "zero circulating supply, token flow capped at 0");
            }
            let supply_bound = non_negative(config.supply_share) * supply;
            emission_bound.min(supply_bound)
        }
    }
}

/// Cap a single requested flow. Always in `[0, cap_bound(..)]`.
pub fn apply_safety_caps(
    requested_amount: f64,
    cap_type: CapType,
    ctx: &CapContext,
    config: &SafetyCapConfig,
) -> f64 {
    non_negative(requested_amount).min(cap_bound(cap_type, ctx, config))
}

/// Token amounts per recapture flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecaptureFlows {
    pub burn: f64,
    pub buyback: f64,
    pub treasury: f64,
    pub staking: f64,
    pub other: f64,
}

impl RecaptureFlows {
    pub fn total(&self) -> f64 {
        self.burn + self.buyback + self.treasury + self.staking + self.other
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            burn: self.burn * factor,
            buyback: self.buyback * factor,
            treasury: self.treasury * factor,
            staking: self.staking * factor,
            other: self.other * factor,
        }
    }
}

/// Result of capping and combining recapture flows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecaptureOutcome {
    /// Flows after individual caps and the combined backstop.
    pub flows: RecaptureFlows,
    /// Sum of the raw requests, before any cap.
    pub requested_total: f64,
    /// The combined backstop scaled the flows down.
    pub backstop_applied: bool,
}

impl RecaptureOutcome {
    pub fn total(&self) -> f64 {
        self.flows.total()
    }
}

/// Cap every flow on its own, then apply the combined backstop.
pub fn combine_recapture(
    requested: &RecaptureFlows,
    ctx: &CapContext,
    config: &SafetyCapConfig,
) -> RecaptureOutcome {
    let capped = RecaptureFlows {
        burn: apply_safety_caps(requested.burn, CapType::Burn, ctx, config),
        buyback: apply_safety_caps(requested.buyback, CapType::Buyback, ctx, config),
        treasury: apply_safety_caps(requested.treasury, CapType::Treasury, ctx, config),
        staking: apply_safety_caps(requested.staking, CapType::Staking, ctx, config),
        other: apply_safety_caps(requested.other, CapType::Other, ctx, config),
    };

    let requested_total = [
        requested.burn,
        requested.buyback,
        requested.treasury,
        requested.staking,
        requested.other,
    ]
    .iter()
    .map(|&v| non_negative(v))
    .sum();

    let backstop = non_negative(config.combined_emission_share) * non_negative(ctx.monthly_emission);
    let total = capped.total();

    if total > backstop {
        let factor = if total > 0.0 { backstop / total } else { 0.0 };
        return RecaptureOutcome {
            flows: capped.scaled(factor),
            requested_total,
            backstop_applied: true,
        };
    }

    RecaptureOutcome {
        flows: capped,
        requested_total,
        backstop_applied: false,
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CapContext {
        CapContext {
            monthly_emission: 1_000.0,
            revenue_usd: 500.0,
            token_price: 1.0,
            circulating_supply: 1_000_000.0,
        }
    }

    #[test]
    fn test_emission_bound() {
        let config = SafetyCapConfig::default();
        assert_eq!(apply_safety_caps(1_000.0, CapType::Burn, &ctx(), &config), 400.0);
        assert_eq!(apply_safety_caps(100.0, CapType::Burn, &ctx(), &config), 100.0);
    }

    #[test]
    fn test_supply_bound_is_independent() {
        let config = SafetyCapConfig::default();
        let tight = CapContext {
            circulating_supply: 2_000.0,
            ..ctx()
        };
        // 5% of 2,000 supply is tighter than 40% of 1,000 emission
        assert_eq!(apply_safety_caps(1_000.0, CapType::Staking, &tight, &config), 100.0);
    }

    #[test]
    fn test_buyback_bounded_by_revenue() {
        let config = SafetyCapConfig::default();
        let ctx = CapContext {
            monthly_emission: 0.0,
            revenue_usd: 500.0,
            token_price: 2.0,
            circulating_supply: 0.0,
        };
        // No emission and no supply, but revenue still funds 250 tokens
        assert_eq!(apply_safety_caps(1_000.0, CapType::Buyback, &ctx, &config), 250.0);
        assert_eq!(apply_safety_caps(1_000.0, CapType::Burn, &ctx, &config), 0.0);
    }

    #[test]
    fn test_negative_and_nan_requests() {
        let config = SafetyCapConfig::default();
        assert_eq!(apply_safety_caps(-5.0, CapType::Burn, &ctx(), &config), 0.0);
        assert_eq!(apply_safety_caps(f64::NAN, CapType::Treasury, &ctx(), &config), 0.0);
        let bad_price = CapContext {
            token_price: -1.0,
            ..ctx()
        };
        assert_eq!(apply_safety_caps(10.0, CapType::Buyback, &bad_price, &config), 0.0);
    }

    #[test]
    fn test_combined_backstop_preserves_proportions() {
        let config = SafetyCapConfig::default();
        let requested = RecaptureFlows {
            burn: 1_000.0,
            staking: 1_000.0,
            treasury: 1_000.0,
            other: 1_000.0,
            buyback: 0.0,
        };
        let outcome = combine_recapture(&requested, &ctx(), &config);
        assert!(outcome.backstop_applied);
        assert!((outcome.total() - 800.0).abs() < 1e-9);
        for flow in [
            outcome.flows.burn,
            outcome.flows.staking,
            outcome.flows.treasury,
            outcome.flows.other,
        ] {
            assert!((flow - 200.0).abs() < 1e-9, "{flow}");
        }
        assert_eq!(outcome.requested_total, 4_000.0);
    }

    #[test]
    fn test_under_backstop_untouched() {
        let config = SafetyCapConfig::default();
        let requested = RecaptureFlows {
            burn: 100.0,
            buyback: 50.0,
            ..Default::default()
        };
        let outcome = combine_recapture(&requested, &ctx(), &config);
        assert!(!outcome.backstop_applied);
        assert_eq!(outcome.flows, requested);
    }

    #[test]
    fn test_doubling_request_never_more_than_doubles() {
        let config = SafetyCapConfig::default();
        for cap_type in [CapType::Burn, CapType::Staking, CapType::Buyback] {
            let mut amount = 1.0;
            while amount < 10_000.0 {
                let single = apply_safety_caps(amount, cap_type, &ctx(), &config);
                let double = apply_safety_caps(amount * 2.0, cap_type, &ctx(), &config);
                assert!(double <= 2.0 * single + 1e-9);
                assert!(double >= single);
                amount *= 1.7;
            }
        }
    }
}
