// Copyright (c) 2024 Botho Foundation

//! Simulation state shared with agents.

use crate::params::EffectiveValues;

/// Market and platform conditions visible to every agent in a month.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    /// Current month (0 before the first step).
    pub month: u32,

    /// Token price this month, USD.
    pub token_price: f64,

    /// Market-cycle price multiplier this month.
    pub price_multiplier: f64,

    /// Market-cycle price multiplier last month.
    pub previous_price_multiplier: f64,

    /// Fee charged on transaction volume.
    pub platform_fee_rate: f64,

    /// Typical monthly transaction volume per user, USD.
    pub volume_per_user_usd: f64,

    /// Probability an agent stakes its rewards in a month.
    pub staking_participation: f64,

    /// Agents active this month.
    pub active_agents: usize,
}

impl SimulationState {
    pub fn new(base_price: f64, values: &EffectiveValues) -> Self {
        Self {
            month: 0,
            token_price: base_price,
            price_multiplier: 1.0,
            previous_price_multiplier: 1.0,
            platform_fee_rate: values.platform_fee_rate.clamp(0.0, 1.0),
            volume_per_user_usd: values.volume_per_user_usd.max(0.0),
            staking_participation: values.staking_participation.clamp(0.0, 1.0),
            active_agents: 0,
        }
    }

    /// Move to `month` with the given price multiplier.
    pub fn advance(&mut self, month: u32, base_price: f64, price_multiplier: f64, active_agents: usize) {
        self.month = month;
        self.previous_price_multiplier = self.price_multiplier;
        self.price_multiplier = price_multiplier;
        self.token_price = base_price * price_multiplier;
        self.active_agents = active_agents;
    }

    /// The market cycle pushed the price up since last month.
    pub fn price_rising(&self) -> bool {
        self.price_multiplier > self.previous_price_multiplier
    }

    pub fn price_falling(&self) -> bool {
        self.price_multiplier < self.previous_price_multiplier
    }
}
