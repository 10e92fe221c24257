// Copyright (c) 2024 Botho Foundation

//! Projection parameters.
//!
//! A [`ParameterSet`] is a plain value: every entry point takes it by
//! reference and never mutates it. Monte Carlo runs derive perturbed copies.
//!
//! Per-user economics (fee rate, ARPU, cost, staking participation, volume)
//! depend on how mature the platform is. Each can be set explicitly in
//! [`ParameterOverrides`]; otherwise the [`MaturityTier`] default applies,
//! and if the tier has none, a fixed fallback. [`ParameterSet::resolve`]
//! applies that precedence.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationConfig;
use crate::caps::SafetyCapConfig;
use crate::error::Result;
use crate::retention::{RetentionCurve, RetentionPreset};
use crate::vesting::VestingSchedule;

/// Platform maturity, selecting default per-user economics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityTier {
    #[default]
    Launch,
    Growth,
    Mature,
}

/// Tier-specific defaults. `None` defers to the fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TierDefaults {
    pub platform_fee_rate: Option<f64>,
    pub arpu_usd: Option<f64>,
    pub cost_per_user_usd: Option<f64>,
    pub staking_participation: Option<f64>,
    pub volume_per_user_usd: Option<f64>,
}

impl MaturityTier {
    pub fn defaults(self) -> TierDefaults {
        match self {
            MaturityTier::Launch => TierDefaults {
                platform_fee_rate: Some(0.05),
                arpu_usd: Some(0.50),
                cost_per_user_usd: None,
                staking_participation: Some(0.10),
                volume_per_user_usd: Some(20.0),
            },
            MaturityTier::Growth => TierDefaults {
                platform_fee_rate: Some(0.04),
                arpu_usd: Some(1.20),
                cost_per_user_usd: Some(0.25),
                staking_participation: Some(0.20),
                volume_per_user_usd: None,
            },
            MaturityTier::Mature => TierDefaults {
                platform_fee_rate: Some(0.03),
                arpu_usd: Some(2.50),
                cost_per_user_usd: Some(0.20),
                staking_participation: Some(0.35),
                volume_per_user_usd: Some(60.0),
            },
        }
    }
}

/// Used when neither an override nor the tier provides a value.
pub const FALLBACK_VALUES: EffectiveValues = EffectiveValues {
    platform_fee_rate: 0.03,
    arpu_usd: 1.0,
    cost_per_user_usd: 0.30,
    staking_participation: 0.15,
    volume_per_user_usd: 40.0,
};

/// Explicitly set per-user economics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    /// Fee taken on transaction volume (0.0 to 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_fee_rate: Option<f64>,

    /// Non-fee revenue per active user per month, USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arpu_usd: Option<f64>,

    /// Variable cost per active user per month, USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_user_usd: Option<f64>,

    /// Fraction of distributed rewards that gets staked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_participation: Option<f64>,

    /// Transaction volume per active user per month, USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_per_user_usd: Option<f64>,
}

/// Per-user economics after override resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectiveValues {
    pub platform_fee_rate: f64,
    pub arpu_usd: f64,
    pub cost_per_user_usd: f64,
    pub staking_participation: f64,
    pub volume_per_user_usd: f64,
}

/// Complete input to a projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Token price at launch, USD.
    pub token_price: f64,

    /// Total token supply across all vesting categories.
    pub total_supply: u64,

    /// Monthly marketing spend, USD.
    pub marketing_budget_usd: f64,

    /// Cost to acquire one consumer, before saturation.
    pub consumer_cac_usd: f64,

    /// Cost to acquire one creator, before saturation.
    pub creator_cac_usd: f64,

    /// Creators targeted per month, funded before consumers.
    pub creator_quota: u64,

    /// Addressable users, for CAC saturation.
    pub target_market_size: u64,

    /// Strength of the CAC saturation effect.
    pub cac_saturation_factor: f64,

    /// Users present at launch (month 0 cohort).
    pub launch_users: u64,

    pub retention: RetentionPreset,

    pub maturity: MaturityTier,

    /// Share of platform fee revenue used to burn tokens.
    pub burn_rate: f64,

    /// Share of total revenue spent on buybacks.
    pub buyback_rate: f64,

    /// Share of revenue sent to the treasury.
    pub treasury_revenue_share: f64,

    /// Share of monthly emission diverted to the treasury.
    pub treasury_emission_share: f64,

    /// Fixed operating costs per month, USD.
    pub fixed_monthly_costs_usd: f64,

    /// Apply the multi-year market cycle to projections longer than a year.
    pub simulate_market_cycles: bool,

    pub overrides: ParameterOverrides,

    pub allocation: AllocationConfig,

    pub caps: SafetyCapConfig,

    /// Explicit vesting table. Defaults to the standard table over
    /// `total_supply`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vesting: Option<VestingSchedule>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            token_price: 0.05,
            total_supply: 1_000_000_000,
            marketing_budget_usd: 50_000.0,
            consumer_cac_usd: 2.50,
            creator_cac_usd: 50.0,
            creator_quota: 100,
            target_market_size: 5_000_000,
            cac_saturation_factor: 0.5,
            launch_users: 1_000,
            retention: RetentionPreset::default(),
            maturity: MaturityTier::default(),
            burn_rate: 0.30,
            buyback_rate: 0.10,
            treasury_revenue_share: 0.10,
            treasury_emission_share: 0.05,
            fixed_monthly_costs_usd: 20_000.0,
            simulate_market_cycles: true,
            overrides: ParameterOverrides::default(),
            allocation: AllocationConfig::default(),
            caps: SafetyCapConfig::default(),
            vesting: None,
        }
    }
}

impl ParameterSet {
    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_maturity(mut self, maturity: MaturityTier) -> Self {
        self.maturity = maturity;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPreset) -> Self {
        self.retention = retention;
        self
    }

    /// Resolve per-user economics: override, then tier default, then fallback.
    pub fn resolve(&self) -> EffectiveValues {
        let tier = self.maturity.defaults();
        let o = &self.overrides;
        EffectiveValues {
            platform_fee_rate: o
                .platform_fee_rate
                .or(tier.platform_fee_rate)
                .unwrap_or(FALLBACK_VALUES.platform_fee_rate),
            arpu_usd: o.arpu_usd.or(tier.arpu_usd).unwrap_or(FALLBACK_VALUES.arpu_usd),
            cost_per_user_usd: o
                .cost_per_user_usd
                .or(tier.cost_per_user_usd)
                .unwrap_or(FALLBACK_VALUES.cost_per_user_usd),
            staking_participation: o
                .staking_participation
                .or(tier.staking_participation)
                .unwrap_or(FALLBACK_VALUES.staking_participation),
            volume_per_user_usd: o
                .volume_per_user_usd
                .or(tier.volume_per_user_usd)
                .unwrap_or(FALLBACK_VALUES.volume_per_user_usd),
        }
    }

    /// The vesting table in effect.
    pub fn vesting_schedule(&self) -> Cow<'_, VestingSchedule> {
        match &self.vesting {
            Some(schedule) => Cow::Borrowed(schedule),
            None => Cow::Owned(VestingSchedule::standard(self.total_supply)),
        }
    }

    pub fn retention_curve(&self) -> RetentionCurve {
        self.retention.curve()
    }
}
