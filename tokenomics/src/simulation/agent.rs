// Copyright (c) 2024 Botho Foundation

//! Core agent trait and action types.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::state::SimulationState;

/// Unique identifier for an agent in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

impl AgentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Population segment an agent belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Creator,
    Consumer,
    Speculator,
}

impl AgentKind {
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Creator => "creator",
            AgentKind::Consumer => "consumer",
            AgentKind::Speculator => "speculator",
        }
    }
}

/// What an agent does in a month.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// Transact on the platform, paying the platform fee on the volume.
    Transact { volume_usd: f64 },

    /// Lock liquid tokens in staking.
    Stake { tokens: f64 },

    /// Sell liquid tokens on the market.
    Sell { tokens: f64 },

    /// Do nothing this month.
    Hold,
}

/// Liquid and staked token balances.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Holdings {
    pub balance: f64,
    pub staked: f64,
}

impl Holdings {
    /// Move up to `tokens` from the liquid balance into staking.
    /// Returns the amount moved.
    pub fn stake(&mut self, tokens: f64) -> f64 {
        let amount = clamp_amount(tokens, self.balance);
        self.balance -= amount;
        self.staked += amount;
        amount
    }

    /// Remove up to `tokens` from the liquid balance. Returns the amount sold.
    pub fn sell(&mut self, tokens: f64) -> f64 {
        let amount = clamp_amount(tokens, self.balance);
        self.balance -= amount;
        amount
    }

    pub fn wealth(&self) -> f64 {
        self.balance + self.staked
    }
}

fn clamp_amount(requested: f64, available: f64) -> f64 {
    if requested.is_finite() && requested > 0.0 {
        requested.min(available.max(0.0))
    } else {
        0.0
    }
}

/// Agent behavior trait.
///
/// Agents decide one action per month from the shared simulation state. The
/// runner applies the action to the agent's holdings.
pub trait Agent: std::fmt::Debug + Send {
    fn id(&self) -> AgentId;

    fn kind(&self) -> AgentKind;

    /// Month the agent joined the platform.
    fn joined_month(&self) -> u32;

    fn holdings(&self) -> &Holdings;

    fn holdings_mut(&mut self) -> &mut Holdings;

    /// Decide what to do this month.
    fn decide_action(&mut self, state: &SimulationState, rng: &mut dyn RngCore) -> Action;

    /// Called when the agent receives reward tokens.
    fn on_reward(&mut self, tokens: f64) {
        if tokens.is_finite() && tokens > 0.0 {
            self.holdings_mut().balance += tokens;
        }
    }

    /// Called with this agent's share of collected platform fees. Only
    /// creators earn fees.
    fn on_fee_share(&mut self, _tokens: f64) {}

    fn balance(&self) -> f64 {
        self.holdings().balance
    }

    fn staked(&self) -> f64 {
        self.holdings().staked
    }

    fn wealth(&self) -> f64 {
        self.holdings().wealth()
    }

    /// Months since joining at `month`.
    fn age_at(&self, month: u32) -> u32 {
        month.saturating_sub(self.joined_month())
    }
}
