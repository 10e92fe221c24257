// Copyright (c) 2024 Botho Foundation

//! Month-by-month projection.
//!
//! Each month advances the state once:
//!
//! 1. Seasonality and (for projections over a year) market-cycle multipliers.
//! 2. Saturation-adjusted CAC from the users acquired so far.
//! 3. Acquisition: the creator quota is funded first, the rest of the
//!    marketing budget buys consumers. The month's users join as a cohort.
//! 4. Active users come from the cohort tracker, scaled by the cycle's
//!    retention multiplier.
//! 5. The snapshot simulator evaluates the month at the cycle-adjusted price.
//! 6. Results fold into cumulative state and a [`MonthlyMetrics`] record is
//!    appended. Earlier records are never touched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cohort::CohortTracker;
use crate::error::{ProjectionError, Result};
use crate::market::{cagr, effective_cac, market_cycle_multipliers, seasonality_multiplier, MarketCycle};
use crate::params::ParameterSet;
use crate::snapshot::{SnapshotResult, SnapshotSimulator};
use crate::vesting::VestingSchedule;

/// Longest supported projection, in months.
pub const MAX_MONTHS: u32 = 600;

/// Churn rate floor used when computing LTV.
pub const MIN_LTV_CHURN: f64 = 0.01;

/// Most creators or consumers acquired in a single month.
pub const MAX_MONTHLY_ACQUISITION: u64 = 1_000_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Months to simulate, 1 to [`MAX_MONTHS`].
    pub months: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self { months: 60 }
    }
}

impl ProgressionConfig {
    pub fn new(months: u32) -> Self {
        Self { months }
    }

    fn validate(&self) -> Result<()> {
        if self.months == 0 || self.months > MAX_MONTHS {
            return Err(ProjectionError::InvalidHorizon(self.months));
        }
        Ok(())
    }
}

/// One simulated month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    pub month: u32,

    // Acquisition and retention
    pub new_creators: u64,
    pub new_consumers: u64,
    pub new_users: u64,
    pub churned_users: u64,
    pub active_users: u64,
    pub total_acquired: u64,

    // Financials, USD. Costs include marketing.
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
    pub margin: f64,
    pub marketing_spend: f64,

    // Token flows
    pub monthly_emission: f64,
    pub total_recaptured: f64,
    /// Emission minus recapture.
    pub net_token_flow: f64,
    pub token_price: f64,
    pub allocation_percent: f64,

    // Unit economics
    pub arpu: f64,
    pub cac: f64,
    pub churn_rate: f64,
    pub ltv: f64,

    // Exogenous multipliers
    pub seasonality: f64,
    pub market_cycle: MarketCycle,

    // Running totals
    pub circulating_supply: f64,
    pub treasury_balance: f64,
    pub cumulative_profit: f64,
}

/// Aggregates over a whole projection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSummary {
    pub months: u32,
    pub total_revenue: f64,
    pub total_costs: f64,
    pub total_profit: f64,
    pub final_active_users: u64,
    pub peak_active_users: u64,
    pub total_acquired: u64,
    /// First month with a positive monthly profit.
    pub months_to_profitability: Option<u32>,
    /// First month in which cumulative profit turned positive.
    pub break_even_month: Option<u32>,
    pub cumulative_emission: f64,
    pub cumulative_recaptured: f64,
    pub final_circulating_supply: f64,
    pub final_treasury_balance: f64,
    pub user_cagr: f64,
    pub revenue_cagr: f64,
    /// Mean LTV:CAC over months with acquisition spend.
    pub average_ltv_to_cac: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressionResult {
    pub months: Vec<MonthlyMetrics>,
    pub summary: ProgressionSummary,
}

/// Users bought with one month's marketing budget.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Acquisition {
    creators: u64,
    consumers: u64,
    spend: f64,
}

impl Acquisition {
    fn users(&self) -> u64 {
        self.creators.saturating_add(self.consumers)
    }
}

/// Running state carried between months.
struct ProgressionState {
    tracker: CohortTracker,
    previous_active: u64,
    cumulative_profit: f64,
    first_profitable_month: Option<u32>,
    break_even_month: Option<u32>,
    cumulative_emission: f64,
    cumulative_recaptured: f64,
    cumulative_burn: f64,
    treasury_balance: f64,
}

/// Drives a projection over a parameter set.
pub struct MonthlyProgression<'a> {
    params: &'a ParameterSet,
    simulator: &'a dyn SnapshotSimulator,
}

impl<'a> MonthlyProgression<'a> {
    pub fn new(params: &'a ParameterSet, simulator: &'a dyn SnapshotSimulator) -> Self {
        Self { params, simulator }
    }

    pub fn run(&self, config: &ProgressionConfig) -> Result<ProgressionResult> {
        config.validate()?;
        let params = self.params;
        let vesting = params.vesting_schedule();
        let use_cycles = config.months > 12 && params.simulate_market_cycles;

        let mut state = ProgressionState {
            tracker: CohortTracker::new(Arc::new(params.retention_curve())),
            previous_active: params.launch_users,
            cumulative_profit: 0.0,
            first_profitable_month: None,
            break_even_month: None,
            cumulative_emission: 0.0,
            cumulative_recaptured: 0.0,
            cumulative_burn: 0.0,
            treasury_balance: 0.0,
        };
        if params.launch_users > 0 {
            state.tracker.add_cohort(0, params.launch_users)?;
        }

        let mut months = Vec::with_capacity(config.months as usize);
        for month in 1..=config.months {
            let metrics = self.step(month, use_cycles, &vesting, &mut state)?;
            debug!(
                month,
                active_users = metrics.active_users,
                revenue = metrics.revenue,
                profit = metrics.profit,
                "simulated month"
            );
            months.push(metrics);
        }

        let summary = summarize(&months, &state);
        info!(
            months = summary.months,
            final_active_users = summary.final_active_users,
            total_profit = summary.total_profit,
            months_to_profitability = ?summary.months_to_profitability,
            "projection complete"
        );

        Ok(ProgressionResult { months, summary })
    }

    fn step(
        &self,
        month: u32,
        use_cycles: bool,
        vesting: &VestingSchedule,
        state: &mut ProgressionState,
    ) -> Result<MonthlyMetrics> {
        let params = self.params;

        let seasonality = seasonality_multiplier(month);
        let cycle = if use_cycles {
            market_cycle_multipliers(month)
        } else {
            MarketCycle::NEUTRAL
        };

        let acquired_so_far = state.tracker.total_acquired();
        let acquisition = self.acquire(acquired_so_far, seasonality, cycle.growth);
        let new_users = acquisition.users();
        state.tracker.add_cohort(month, new_users)?;

        let total_acquired = state.tracker.total_acquired();
        let tracked_active = state.tracker.active_users_at_month(month);
        let active_users =
            ((tracked_active as f64 * non_negative(cycle.retention)).round() as u64).min(total_acquired);

        let pool = state.previous_active.saturating_add(new_users);
        let churned_users = pool.saturating_sub(active_users);
        let churn_rate = ratio(churned_users as f64, pool as f64);

        let token_price = params.token_price * cycle.price;
        let snapshot = self
            .simulator
            .simulate_month(params, active_users, token_price, month);

        let revenue = snapshot.revenue;
        let costs = snapshot.costs + acquisition.spend;
        let profit = revenue - costs;

        self.fold(month, profit, &snapshot, state);

        let circulating_supply =
            (vesting.circulating_supply_at(month) as f64 - state.cumulative_burn).max(0.0);

        let arpu = ratio(revenue, active_users as f64);
        let cac = ratio(acquisition.spend, new_users as f64);
        let ltv = arpu / churn_rate.max(MIN_LTV_CHURN);

        state.previous_active = active_users;

        Ok(MonthlyMetrics {
            month,
            new_creators: acquisition.creators,
            new_consumers: acquisition.consumers,
            new_users,
            churned_users,
            active_users,
            total_acquired,
            revenue,
            costs,
            profit,
            margin: ratio(profit, revenue),
            marketing_spend: acquisition.spend,
            monthly_emission: snapshot.monthly_emission,
            total_recaptured: snapshot.total_recaptured,
            net_token_flow: snapshot.monthly_emission - snapshot.total_recaptured,
            token_price,
            allocation_percent: snapshot.allocation.allocation_percent,
            arpu,
            cac,
            churn_rate,
            ltv,
            seasonality,
            market_cycle: cycle,
            circulating_supply,
            treasury_balance: state.treasury_balance,
            cumulative_profit: state.cumulative_profit,
        })
    }

    /// Spend the marketing budget: creators first, then consumers.
    fn acquire(&self, acquired_so_far: u64, seasonality: f64, cycle_growth: f64) -> Acquisition {
        let params = self.params;
        let budget = non_negative(params.marketing_budget_usd);

        let creator_cac = effective_cac(
            params.creator_cac_usd,
            acquired_so_far,
            params.target_market_size,
            params.cac_saturation_factor,
        );
        let consumer_cac = effective_cac(
            params.consumer_cac_usd,
            acquired_so_far,
            params.target_market_size,
            params.cac_saturation_factor,
        );

        let creators = if creator_cac > 0.0 {
            ((budget / creator_cac).floor() as u64).min(params.creator_quota)
        } else {
            params.creator_quota
        };
        let creators = clamp_acquisition(creators, "creators");
        let creator_spend = creators as f64 * creator_cac;
        let remaining = (budget - creator_spend).max(0.0);

        if consumer_cac <= 0.0 {
            warn!(consumer_cac, "non-positive consumer CAC, no consumers acquired");
            return Acquisition {
                creators,
                consumers: 0,
                spend: creator_spend,
            };
        }

        let multiplier = non_negative(seasonality) * non_negative(cycle_growth);
        let affordable = (remaining / consumer_cac * multiplier).floor() as u64;
        let consumers = clamp_acquisition(affordable, "consumers");

        let consumer_spend = if consumers < affordable && multiplier > 0.0 {
            (consumers as f64 * consumer_cac / multiplier).min(remaining)
        } else {
            remaining
        };

        Acquisition {
            creators,
            consumers,
            spend: creator_spend + consumer_spend,
        }
    }

    fn fold(&self, month: u32, profit: f64, snapshot: &SnapshotResult, state: &mut ProgressionState) {
        state.cumulative_profit += profit;
        if profit > 0.0 && state.first_profitable_month.is_none() {
            state.first_profitable_month = Some(month);
        }
        if state.cumulative_profit > 0.0 && state.break_even_month.is_none() {
            state.break_even_month = Some(month);
        }

        state.cumulative_emission += snapshot.monthly_emission;
        state.cumulative_recaptured += snapshot.total_recaptured;
        state.cumulative_burn += snapshot.recapture.burn;
        state.treasury_balance += non_negative(self.params.treasury_revenue_share) * snapshot.revenue;
    }
}

/// Run a projection.
pub fn run_progression(
    params: &ParameterSet,
    simulator: &dyn SnapshotSimulator,
    config: &ProgressionConfig,
) -> Result<ProgressionResult> {
    MonthlyProgression::new(params, simulator).run(config)
}

fn summarize(months: &[MonthlyMetrics], state: &ProgressionState) -> ProgressionSummary {
    let (first, last) = match (months.first(), months.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return ProgressionSummary::default(),
    };

    let years = (months.len() - 1) as f64 / 12.0;

    let ltv_to_cac: Vec<f64> = months
        .iter()
        .filter(|m| m.cac > 0.0)
        .map(|m| m.ltv / m.cac)
        .collect();
    let average_ltv_to_cac = if ltv_to_cac.is_empty() {
        0.0
    } else {
        ltv_to_cac.iter().sum::<f64>() / ltv_to_cac.len() as f64
    };

    ProgressionSummary {
        months: months.len() as u32,
        total_revenue: months.iter().map(|m| m.revenue).sum(),
        total_costs: months.iter().map(|m| m.costs).sum(),
        total_profit: state.cumulative_profit,
        final_active_users: last.active_users,
        peak_active_users: months.iter().map(|m| m.active_users).max().unwrap_or(0),
        total_acquired: last.total_acquired,
        months_to_profitability: state.first_profitable_month,
        break_even_month: state.break_even_month,
        cumulative_emission: state.cumulative_emission,
        cumulative_recaptured: state.cumulative_recaptured,
        final_circulating_supply: last.circulating_supply,
        final_treasury_balance: state.treasury_balance,
        user_cagr: cagr(first.active_users as f64, last.active_users as f64, years),
        revenue_cagr: cagr(first.revenue, last.revenue, years),
        average_ltv_to_cac,
    }
}

fn clamp_acquisition(count: u64, segment: &'static str) -> u64 {
    if count > MAX_MONTHLY_ACQUISITION {
        warn!(count, segment, "monthly acquisition above ceiling, clamping");
        MAX_MONTHLY_ACQUISITION
    } else {
        count
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
