// Copyright (c) 2024 Botho Foundation

//! Agent simulation execution engine.
//!
//! Each month:
//!
//! 1. Agents churn with the retention curve's hazard for their age.
//! 2. New agents join, split between creators, speculators and consumers.
//! 3. The dynamic allocation of the month's rewards emission is split
//!    across active agents.
//! 4. Every agent takes one action. Transactions pay the platform fee.
//! 5. `burn_rate` of the fee tokens is burned through the safety caps and
//!    creators share what is left of their portion.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::agent::{Action, Agent, AgentId, AgentKind};
use super::agents::{ConsumerAgent, CreatorAgent, SpeculatorAgent};
use super::metrics::{AgentMonthSummary, MetricsSummary, SimulationMetrics};
use super::state::SimulationState;
use crate::allocation::calculate_dynamic_allocation;
use crate::caps::{apply_safety_caps, CapContext, CapType};
use crate::error::{ProjectionError, Result};
use crate::market::market_cycle_multipliers;
use crate::params::ParameterSet;
use crate::progression::MAX_MONTHS;
use crate::stats::DistributionStats;

/// Share of post-burn fee tokens paid out to creators.
pub const CREATOR_FEE_SHARE: f64 = 0.5;

/// Configuration for an agent simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSimulationConfig {
    /// Months to simulate.
    pub months: u32,

    /// Agents present at launch (month 0).
    pub launch_agents: usize,

    /// Agents joining each month.
    pub monthly_joins: usize,

    /// Probability a new agent is a creator.
    pub creator_fraction: f64,

    /// Probability a new agent is a speculator.
    pub speculator_fraction: f64,

    pub seed: u64,
}

impl Default for AgentSimulationConfig {
    fn default() -> Self {
        Self {
            months: 36,
            launch_agents: 200,
            monthly_joins: 50,
            creator_fraction: 0.10,
            speculator_fraction: 0.15,
            seed: 42,
        }
    }
}

impl AgentSimulationConfig {
    fn validate(&self) -> Result<()> {
        if self.months == 0 || self.months > MAX_MONTHS {
            return Err(ProjectionError::InvalidHorizon(self.months));
        }
        Ok(())
    }
}

/// Result of one agent simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSimulationResult {
    pub months: Vec<AgentMonthSummary>,
    pub summary: MetricsSummary,
}

/// Distributions over seeded replicates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentBatchResult {
    pub runs: usize,
    pub final_active_agents: DistributionStats,
    pub total_fees_usd: DistributionStats,
    pub final_gini: DistributionStats,
}

/// Run one agent simulation.
pub fn run_agent_simulation(
    params: &ParameterSet,
    config: &AgentSimulationConfig,
) -> Result<AgentSimulationResult> {
    config.validate()?;
    let result = simulate(params, config, 0);
    info!(
        months = config.months,
        final_active_agents = result.summary.final_active_agents,
        total_fees_usd = result.summary.total_fees_usd,
        final_gini = result.summary.final_gini,
        "agent simulation complete"
    );
    Ok(result)
}

/// Run `runs` replicates in parallel, replicate `r` on ChaCha stream `r`.
///
/// Replicate 0 matches [`run_agent_simulation`] with the same config.
pub fn run_agent_batch(
    params: &ParameterSet,
    config: &AgentSimulationConfig,
    runs: usize,
    progress: &(dyn Fn(f64) + Sync),
    cancel: &AtomicBool,
) -> Result<AgentBatchResult> {
    config.validate()?;
    if runs == 0 {
        return Err(ProjectionError::NoIterations);
    }

    let completed = AtomicUsize::new(0);
    let report_every = runs.div_ceil(100);

    let summaries: Option<Vec<MetricsSummary>> = (0..runs)
        .into_par_iter()
        .map(|run| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let result = simulate(params, config, run as u64);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % report_every == 0 || done == runs {
                progress(done as f64 / runs as f64);
            }
            Some(result.summary)
        })
        .collect();

    let summaries = summaries.ok_or_else(|| ProjectionError::Cancelled {
        completed: completed.load(Ordering::Relaxed),
        total: runs,
    })?;

    let stats = |metric: fn(&MetricsSummary) -> f64| {
        let values: Vec<f64> = summaries.iter().map(metric).collect();
        DistributionStats::from_samples(&values)
    };

    Ok(AgentBatchResult {
        runs,
        final_active_agents: stats(|s| s.final_active_agents as f64),
        total_fees_usd: stats(|s| s.total_fees_usd),
        final_gini: stats(|s| s.final_gini),
    })
}

fn simulate(params: &ParameterSet, config: &AgentSimulationConfig, stream: u64) -> AgentSimulationResult {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    rng.set_stream(stream);

    let curve = params.retention_curve();
    let vesting = params.vesting_schedule();
    let values = params.resolve();
    let use_cycles = config.months > 12 && params.simulate_market_cycles;

    let mut state = SimulationState::new(params.token_price, &values);
    let mut metrics = SimulationMetrics::new();
    let mut agents: Vec<Box<dyn Agent>> = Vec::new();
    let mut next_id = 0u64;

    spawn_agents(&mut agents, &mut next_id, config.launch_agents, 0, config, &mut rng);

    for month in 1..=config.months {
        // Churn by age
        let before = agents.len();
        agents.retain(|agent| {
            let hazard = curve.monthly_churn_hazard(agent.age_at(month) as i64);
            rng.gen::<f64>() >= hazard
        });
        let churned = before - agents.len();

        let joined = spawn_agents(&mut agents, &mut next_id, config.monthly_joins, month, config, &mut rng);

        let price_multiplier = if use_cycles {
            market_cycle_multipliers(month).price
        } else {
            1.0
        };
        state.advance(month, params.token_price, price_multiplier, agents.len());
        let token_price = state.token_price;

        // Rewards
        let allocation = calculate_dynamic_allocation(
            agents.len() as u64,
            token_price,
            vesting.rewards_emission_at(month) as f64,
            &params.allocation,
        );
        let reward = allocation.per_user_monthly_tokens;
        for agent in agents.iter_mut() {
            agent.on_reward(reward);
        }
        let rewards_distributed = reward * agents.len() as f64;

        // Actions
        let mut fees_usd = 0.0;
        let mut tokens_staked = 0.0;
        let mut tokens_sold = 0.0;
        for agent in agents.iter_mut() {
            match agent.decide_action(&state, &mut rng) {
                Action::Transact { volume_usd } => {
                    let fee = volume_usd.max(0.0) * state.platform_fee_rate;
                    fees_usd += fee;
                    metrics.record_agent_fees(agent.kind(), fee);
                }
                Action::Stake { tokens } => tokens_staked += agent.holdings_mut().stake(tokens),
                Action::Sell { tokens } => tokens_sold += agent.holdings_mut().sell(tokens),
                Action::Hold => {}
            }
        }

        // Fee tokens: burn, then creator payout
        let fee_tokens = if token_price > 0.0 { fees_usd / token_price } else { 0.0 };
        let ctx = CapContext {
            monthly_emission: allocation.monthly_reward_tokens,
            revenue_usd: fees_usd,
            token_price,
            circulating_supply: vesting.circulating_supply_at(month) as f64,
        };
        let burned_tokens = apply_safety_caps(params.burn_rate * fee_tokens, CapType::Burn, &ctx, &params.caps);
        let creator_payout = CREATOR_FEE_SHARE * (fee_tokens - burned_tokens).max(0.0);

        let creators = agents.iter().filter(|a| a.kind() == AgentKind::Creator).count();
        if creators > 0 {
            let share = creator_payout / creators as f64;
            for agent in agents.iter_mut().filter(|a| a.kind() == AgentKind::Creator) {
                agent.on_fee_share(share);
            }
        }

        debug!(month, active_agents = agents.len(), fees_usd, burned_tokens, "agent month");

        metrics.record_month(AgentMonthSummary {
            month,
            active_agents: agents.len(),
            joined,
            churned,
            token_price,
            allocation_percent: allocation.allocation_percent,
            rewards_distributed,
            fees_usd,
            fee_tokens,
            burned_tokens,
            creator_payout: if creators > 0 { creator_payout } else { 0.0 },
            tokens_staked,
            tokens_sold,
        });
    }

    let summary = metrics.summary(&agents);
    AgentSimulationResult {
        months: metrics.months().to_vec(),
        summary,
    }
}

/// Add `count` agents joining in `month`. Returns the number added.
fn spawn_agents(
    agents: &mut Vec<Box<dyn Agent>>,
    next_id: &mut u64,
    count: usize,
    month: u32,
    config: &AgentSimulationConfig,
    rng: &mut ChaCha8Rng,
) -> usize {
    let creator_cut = config.creator_fraction.clamp(0.0, 1.0);
    let speculator_cut = (creator_cut + config.speculator_fraction.clamp(0.0, 1.0)).min(1.0);

    for _ in 0..count {
        let id = AgentId::new(*next_id);
        *next_id += 1;

        let roll: f64 = rng.gen();
        let agent: Box<dyn Agent> = if roll < creator_cut {
            Box::new(CreatorAgent::new(id, month))
        } else if roll < speculator_cut {
            Box::new(SpeculatorAgent::new(id, month))
        } else {
            Box::new(ConsumerAgent::new(id, month))
        };
        agents.push(agent);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> AgentSimulationConfig {
        AgentSimulationConfig {
            months: 24,
            launch_agents: 100,
            monthly_joins: 30,
            seed: 9,
            ..Default::default()
        }
    }

    #[test]
    fn test_population_accounting() {
        let params = ParameterSet::default();
        let result = run_agent_simulation(&params, &small_config()).unwrap();
        assert_eq!(result.months.len(), 24);

        let mut population = 100usize;
        for m in &result.months {
            population = population + m.joined - m.churned;
            assert_eq!(m.active_agents, population, "month {}", m.month);
        }
        assert_eq!(result.summary.final_active_agents, population);
        assert_eq!(result.summary.total_joined, 24 * 30);
        let by_kind: usize = result.summary.agents_by_kind.values().sum();
        assert_eq!(by_kind, population);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let params = ParameterSet::default();
        let a = run_agent_simulation(&params, &small_config()).unwrap();
        let b = run_agent_simulation(&params, &small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_burn_never_exceeds_caps() {
        let params = ParameterSet::default();
        let result = run_agent_simulation(&params, &small_config()).unwrap();
        for m in &result.months {
            assert!(m.burned_tokens >= 0.0);
            assert!(m.burned_tokens <= params.burn_rate * m.fee_tokens + 1e-9);
            assert!(m.creator_payout <= m.fee_tokens);
        }
        assert!(result.summary.final_gini >= 0.0 && result.summary.final_gini <= 1.0);
    }

    #[test]
    fn test_no_creators_no_payout() {
        let params = ParameterSet::default();
        let config = AgentSimulationConfig {
            creator_fraction: 0.0,
            ..small_config()
        };
        let result = run_agent_simulation(&params, &config).unwrap();
        assert!(result.months.iter().all(|m| m.creator_payout == 0.0));
        assert!(!result.summary.fees_by_kind.contains_key(&AgentKind::Creator));
    }

    #[test]
    fn test_invalid_horizon() {
        let params = ParameterSet::default();
        let config = AgentSimulationConfig {
            months: 0,
            ..Default::default()
        };
        assert!(matches!(
            run_agent_simulation(&params, &config),
            Err(ProjectionError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_batch_first_replicate_matches_single_run() {
        let params = ParameterSet::default();
        let config = small_config();
        let single = run_agent_simulation(&params, &config).unwrap();
        let batch = run_agent_batch(&params, &config, 1, &|_: f64| {}, &AtomicBool::new(false)).unwrap();
        assert_eq!(batch.runs, 1);
        assert_eq!(batch.final_active_agents.mean, single.summary.final_active_agents as f64);
        assert_eq!(batch.total_fees_usd.mean, single.summary.total_fees_usd);
    }

    #[test]
    fn test_batch_rejects_zero_runs_and_cancels() {
        let params = ParameterSet::default();
        let config = small_config();
        assert!(matches!(
            run_agent_batch(&params, &config, 0, &|_: f64| {}, &AtomicBool::new(false)),
            Err(ProjectionError::NoIterations)
        ));
        assert!(matches!(
            run_agent_batch(&params, &config, 4, &|_: f64| {}, &AtomicBool::new(true)),
            Err(ProjectionError::Cancelled { completed: 0, total: 4 })
        ));
    }

    #[test]
    fn test_batch_progress_at_most_once_per_percent() {
        let params = ParameterSet::default();
        let config = AgentSimulationConfig {
            months: 1,
            launch_agents: 5,
            monthly_joins: 1,
            ..Default::default()
        };
        let calls = AtomicUsize::new(0);
        let report = |_: f64| {
            calls.fetch_add(1, Ordering::Relaxed);
        };

        run_agent_batch(&params, &config, 150, &report, &AtomicBool::new(false)).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 75);
    }
}
