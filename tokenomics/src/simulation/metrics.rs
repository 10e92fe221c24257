// Copyright (c) 2024 Botho Foundation

//! Metrics collection for agent simulations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentKind};
use crate::stats::calculate_gini;

/// Token and fee flows for one simulated month.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMonthSummary {
    pub month: u32,
    pub active_agents: usize,
    pub joined: usize,
    pub churned: usize,
    pub token_price: f64,
    pub allocation_percent: f64,
    /// Reward tokens credited to agents.
    pub rewards_distributed: f64,
    pub fees_usd: f64,
    /// Fee revenue converted to tokens.
    pub fee_tokens: f64,
    /// Fee tokens burned after safety caps.
    pub burned_tokens: f64,
    /// Fee tokens paid out to creators.
    pub creator_payout: f64,
    pub tokens_staked: f64,
    pub tokens_sold: f64,
}

/// Accumulates per-month summaries and per-kind totals.
#[derive(Clone, Debug, Default)]
pub struct SimulationMetrics {
    months: Vec<AgentMonthSummary>,
    fees_by_kind: BTreeMap<AgentKind, f64>,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_month(&mut self, summary: AgentMonthSummary) {
        self.months.push(summary);
    }

    pub fn record_agent_fees(&mut self, kind: AgentKind, fees_usd: f64) {
        *self.fees_by_kind.entry(kind).or_insert(0.0) += fees_usd;
    }

    pub fn months(&self) -> &[AgentMonthSummary] {
        &self.months
    }

    /// Summarize the run against the surviving population.
    pub fn summary(&self, agents: &[Box<dyn Agent>]) -> MetricsSummary {
        let wealths: Vec<f64> = agents.iter().map(|a| a.wealth()).collect();

        let mut agents_by_kind = BTreeMap::new();
        for agent in agents {
            *agents_by_kind.entry(agent.kind()).or_insert(0usize) += 1;
        }

        MetricsSummary {
            final_active_agents: agents.len(),
            total_joined: self.months.iter().map(|m| m.joined).sum(),
            total_churned: self.months.iter().map(|m| m.churned).sum(),
            total_fees_usd: self.months.iter().map(|m| m.fees_usd).sum(),
            total_burned: self.months.iter().map(|m| m.burned_tokens).sum(),
            total_rewards: self.months.iter().map(|m| m.rewards_distributed).sum(),
            total_staked: agents.iter().map(|a| a.staked()).sum(),
            final_gini: calculate_gini(&wealths),
            fees_by_kind: self.fees_by_kind.clone(),
            agents_by_kind,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub final_active_agents: usize,
    /// Agents that joined after launch.
    pub total_joined: usize,
    pub total_churned: usize,
    pub total_fees_usd: f64,
    pub total_burned: f64,
    pub total_rewards: f64,
    /// Tokens staked by surviving agents.
    pub total_staked: f64,
    /// Wealth Gini of surviving agents.
    pub final_gini: f64,
    pub fees_by_kind: BTreeMap<AgentKind, f64>,
    pub agents_by_kind: BTreeMap<AgentKind, usize>,
}
