// Copyright (c) 2024 Botho Foundation

//! Single-month economic snapshot.
//!
//! The progression engine and the Monte Carlo driver both evaluate one month
//! of platform economics through [`SnapshotSimulator`]. [`BaselineSnapshot`]
//! is the reference implementation, built from small pure stages:
//!
//! ```text
//! ModuleResults ──► Emission ──► Recapture ──► Totals
//! (revenue, cost)   (allocation)  (capped flows) (profit, margin, rates)
//! ```
//!
//! Each stage only reads the outputs of the stages before it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocation::{calculate_dynamic_allocation, DynamicAllocationResult};
use crate::caps::{combine_recapture, CapContext, RecaptureFlows, RecaptureOutcome};
use crate::params::{EffectiveValues, ParameterSet};

/// Economics of one simulated month.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub month: u32,
    pub active_users: u64,
    pub token_price: f64,

    /// Total revenue, USD.
    pub revenue: f64,
    /// Total costs including buyback spend, USD.
    pub costs: f64,
    pub profit: f64,
    /// `profit / revenue`, 0 without revenue.
    pub margin: f64,

    /// Reward tokens distributed this month.
    pub monthly_emission: f64,
    /// Tokens removed or redirected after caps.
    pub total_recaptured: f64,
    /// `total_recaptured / monthly_emission`, 0 without emission.
    pub recapture_rate: f64,
    /// Revenue from fees on transaction volume, USD.
    pub platform_fee_revenue: f64,

    pub allocation: DynamicAllocationResult,
    pub recapture: RecaptureFlows,

    pub revenue_breakdown: BTreeMap<String, f64>,
    pub cost_breakdown: BTreeMap<String, f64>,
}

/// Evaluates one month of platform economics.
pub trait SnapshotSimulator: Sync {
    fn simulate_month(
        &self,
        params: &ParameterSet,
        active_users: u64,
        token_price: f64,
        month: u32,
    ) -> SnapshotResult;
}

/// Revenue and operating costs before any token flows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModuleResults {
    pub platform_fee_revenue: f64,
    pub service_revenue: f64,
    pub variable_costs: f64,
    pub fixed_costs: f64,
}

impl ModuleResults {
    pub fn compute(params: &ParameterSet, values: &EffectiveValues, active_users: u64) -> Self {
        let users = active_users as f64;
        let volume = non_negative(values.volume_per_user_usd) * users;
        Self {
            platform_fee_revenue: volume * non_negative(values.platform_fee_rate).min(1.0),
            service_revenue: non_negative(values.arpu_usd) * users,
            variable_costs: non_negative(values.cost_per_user_usd) * users,
            fixed_costs: non_negative(params.fixed_monthly_costs_usd),
        }
    }

    pub fn revenue(&self) -> f64 {
        self.platform_fee_revenue + self.service_revenue
    }
}

/// Reward emission for the month.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Emission {
    /// Rewards pool unlock this month, before allocation.
    pub emission_base: f64,
    /// Circulating supply from the vesting schedule.
    pub circulating_supply: f64,
    pub allocation: DynamicAllocationResult,
}

impl Emission {
    pub fn compute(params: &ParameterSet, active_users: u64, token_price: f64, month: u32) -> Self {
        let vesting = params.vesting_schedule();
        let emission_base = vesting.rewards_emission_at(month) as f64;
        Self {
            emission_base,
            circulating_supply: vesting.circulating_supply_at(month) as f64,
            allocation: calculate_dynamic_allocation(
                active_users,
                token_price,
                emission_base,
                &params.allocation,
            ),
        }
    }

    /// Tokens actually distributed.
    pub fn distributed(&self) -> f64 {
        self.allocation.monthly_reward_tokens
    }
}

/// Requested recapture flows, capped and combined.
pub fn recapture_stage(
    params: &ParameterSet,
    values: &EffectiveValues,
    modules: &ModuleResults,
    emission: &Emission,
    token_price: f64,
) -> RecaptureOutcome {
    let distributed = emission.distributed();
    let revenue = modules.revenue();

    let to_tokens = |usd: f64| {
        if token_price.is_finite() && token_price > 0.0 {
            usd / token_price
        } else {
            0.0
        }
    };

    let requested = RecaptureFlows {
        burn: to_tokens(non_negative(params.burn_rate) * modules.platform_fee_revenue),
        buyback: to_tokens(non_negative(params.buyback_rate) * revenue),
        treasury: non_negative(params.treasury_emission_share) * distributed,
        staking: non_negative(values.staking_participation) * distributed,
        other: 0.0,
    };

    let ctx = CapContext {
        monthly_emission: distributed,
        revenue_usd: revenue,
        token_price,
        circulating_supply: emission.circulating_supply,
    };

    combine_recapture(&requested, &ctx, &params.caps)
}

/// Reference snapshot simulator.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaselineSnapshot;

impl SnapshotSimulator for BaselineSnapshot {
    fn simulate_month(
        &self,
        params: &ParameterSet,
        active_users: u64,
        token_price: f64,
        month: u32,
    ) -> SnapshotResult {
        let values = params.resolve();
        let modules = ModuleResults::compute(params, &values, active_users);
        let emission = Emission::compute(params, active_users, token_price, month);
        let recapture = recapture_stage(params, &values, &modules, &emission, token_price);

        let buyback_spend = if token_price.is_finite() && token_price > 0.0 {
            recapture.flows.buyback * token_price
        } else {
            0.0
        };

        let revenue = modules.revenue();
        let costs = modules.variable_costs + modules.fixed_costs + buyback_spend;
        let profit = revenue - costs;
        let monthly_emission = emission.distributed();
        let total_recaptured = recapture.total();

        let revenue_breakdown = BTreeMap::from([
            ("platform_fees".to_string(), modules.platform_fee_revenue),
            ("services".to_string(), modules.service_revenue),
        ]);
        let cost_breakdown = BTreeMap::from([
            ("infrastructure".to_string(), modules.variable_costs),
            ("fixed".to_string(), modules.fixed_costs),
            ("buyback".to_string(), buyback_spend),
        ]);

        SnapshotResult {
            month,
            active_users,
            token_price,
            revenue,
            costs,
            profit,
            margin: ratio(profit, revenue),
            monthly_emission,
            total_recaptured,
            recapture_rate: ratio(total_recaptured, monthly_emission),
            platform_fee_revenue: modules.platform_fee_revenue,
            allocation: emission.allocation,
            recapture: recapture.flows,
            revenue_breakdown,
            cost_breakdown,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && numerator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}
