// Copyright (c) 2024 Botho Foundation

//! Consumer agent: spends on the platform and accumulates rewards.

use rand::{Rng, RngCore};

use crate::simulation::{
    agent::{Action, Agent, AgentId, AgentKind, Holdings},
    state::SimulationState,
};

#[derive(Debug)]
pub struct ConsumerAgent {
    id: AgentId,
    joined_month: u32,
    holdings: Holdings,
}

impl ConsumerAgent {
    pub fn new(id: AgentId, joined_month: u32) -> Self {
        Self {
            id,
            joined_month,
            holdings: Holdings::default(),
        }
    }
}

impl Agent for ConsumerAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Consumer
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

    fn decide_action(&mut self, state: &SimulationState, rng: &mut dyn RngCore) -> Action {
        if self.holdings.balance > 0.0 && rng.gen::<f64>() < state.staking_participation {
            return Action::Stake {
                tokens: self.holdings.balance,
            };
        }
        Action::Transact {
            volume_usd: state.volume_per_user_usd * rng.gen_range(0.5..1.5),
        }
    }
}
