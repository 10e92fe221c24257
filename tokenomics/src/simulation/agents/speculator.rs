// Copyright (c) 2024 Botho Foundation

//! Speculator agent: farms rewards, sells into rising prices and stakes
//! through falling ones.

use rand::{Rng, RngCore};

use crate::simulation::{
    agent::{Action, Agent, AgentId, AgentKind, Holdings},
    state::SimulationState,
};

/// Share of the typical user volume a speculator transacts when idle.
pub const SPECULATOR_VOLUME_SHARE: f64 = 0.25;

#[derive(Debug)]
pub struct SpeculatorAgent {
    id: AgentId,
    joined_month: u32,
    holdings: Holdings,
}

impl SpeculatorAgent {
    pub fn new(id: AgentId, joined_month: u32) -> Self {
        Self {
            id,
            joined_month,
            holdings: Holdings::default(),
        }
    }
}

impl Agent for SpeculatorAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Speculator
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
        if self.holdings.balance <= 0.0 {
            return Action::Transact {
                volume_usd: state.volume_per_user_usd * SPECULATOR_VOLUME_SHARE * rng.gen_range(0.5..1.5),
            };
        }
        if state.price_rising() {
            Action::Sell {
                tokens: self.holdings.balance,
            }
        } else if state.price_falling() {
            Action::Stake {
                tokens: self.holdings.balance,
            }
        } else {
            // Flat market: wait for a move
            Action::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sells_when_price_rising() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let values = ParameterSet::default().resolve();
        let mut state = SimulationState::new(0.05, &values);
        let mut agent = SpeculatorAgent::new(AgentId(1), 0);
        agent.on_reward(100.0);

        state.advance(1, 0.05, 1.2, 1);
        assert_eq!(agent.decide_action(&state, &mut rng), Action::Sell { tokens: 100.0 });

        state.advance(2, 0.05, 1.1, 1);
        assert_eq!(agent.decide_action(&state, &mut rng), Action::Stake { tokens: 100.0 });
    }

    #[test]
    fn test_holds_in_flat_market() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let values = ParameterSet::default().resolve();
        let mut state = SimulationState::new(0.05, &values);
        let mut agent = SpeculatorAgent::new(AgentId(2), 0);

        state.advance(1, 0.05, 1.0, 1);
        // Nothing to sell yet, so it trades
        assert!(matches!(
            agent.decide_action(&state, &mut rng),
            Action::Transact { .. }
        ));

        agent.on_reward(50.0);
        state.advance(2, 0.05, 1.0, 1);
        assert_eq!(agent.decide_action(&state, &mut rng), Action::Hold);
    }
}
