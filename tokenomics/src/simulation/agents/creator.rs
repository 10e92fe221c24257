// Copyright (c) 2024 Botho Foundation

//! Creator agent: high-volume seller who also earns a share of platform fees.

use rand::{Rng, RngCore};

use crate::simulation::{
    agent::{Action, Agent, AgentId, AgentKind, Holdings},
    state::SimulationState,
};

/// Creators transact at this multiple of the typical user volume.
pub const CREATOR_VOLUME_MULTIPLIER: f64 = 3.0;

#[derive(Debug)]
pub struct CreatorAgent {
    id: AgentId,
    joined_month: u32,
    holdings: Holdings,
    /// Fee-share tokens received so far.
    fee_income: f64,
}

impl CreatorAgent {
    pub fn new(id: AgentId, joined_month: u32) -> Self {
        Self {
            id,
            joined_month,
            holdings: Holdings::default(),
            fee_income: 0.0,
        }
    }

    pub fn fee_income(&self) -> f64 {
        self.fee_income
    }
}

impl Agent for CreatorAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Creator
    }

    fn joined_month(&self) -> u32 {
        self.joined_month
    }

    fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    fn holdings_mut(&mut self) -> &mut Holdings {
        &mut self.holdings
    }

    fn on_fee_share(&mut self, tokens: f64) {
        if tokens.is_finite() && tokens > 0.0 {
            self.fee_income += tokens;
            self.holdings.balance += tokens;
        }
    }

    fn decide_action(&mut self, state: &SimulationState, rng: &mut dyn RngCore) -> Action {
        // Creators stake half their liquid tokens, otherwise keep selling
        if self.holdings.balance > 0.0 && rng.gen::<f64>() < state.staking_participation {
            return Action::Stake {
                tokens: self.holdings.balance * 0.5,
            };
        }
        Action::Transact {
            volume_usd: state.volume_per_user_usd * CREATOR_VOLUME_MULTIPLIER * rng.gen_range(0.5..1.5),
        }
    }
}
