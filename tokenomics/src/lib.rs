// Copyright (c) 2024 Botho Foundation

//! Economic projection engine for a token-rewarded creator platform.
//!
//! Given acquisition, pricing and emission parameters, the engine projects
//! active users, revenue and token supply month by month, and quantifies
//! uncertainty by perturbing the parameters.
//!
//! ## Components
//!
//! | Module          | Role                                                        |
//! |-----------------|-------------------------------------------------------------|
//! | `retention`     | Retention curves and presets                                |
//! | `cohort`        | Per-acquisition-month survivorship                          |
//! | `allocation`    | Reward share of emission, scaled by user growth             |
//! | `caps`          | Bounds on burn, buyback, staking and treasury flows         |
//! | `vesting`       | Ten-bucket unlock schedule and circulating supply           |
//! | `market`        | Seasonality, market cycle, CAC saturation, CAGR             |
//! | `snapshot`      | One month of platform economics                             |
//! | `progression`   | Month-by-month projection                                   |
//! | `monte_carlo`   | Parameter perturbation and percentile scenarios             |
//! | `simulation`    | Agent-based population model                                |
//!
//! ## Example
//!
//! ```
//! use bth_tokenomics::{run_progression, BaselineSnapshot, ParameterSet, ProgressionConfig};
//!
//! let params = ParameterSet::default();
//! let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(24)).unwrap();
//! assert_eq!(result.months.len(), 24);
//! ```

pub mod allocation;
pub mod caps;
pub mod cohort;
pub mod market;
pub mod monte_carlo;
pub mod params;
pub mod progression;
pub mod retention;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod vesting;

mod error;

pub use allocation::{calculate_dynamic_allocation, growth_factor, AllocationConfig, DynamicAllocationResult};
pub use caps::{
    apply_safety_caps, cap_bound, combine_recapture, CapContext, CapType, RecaptureFlows,
    RecaptureOutcome, SafetyCapConfig,
};
pub use cohort::{Cohort, CohortTracker, RetentionStats};
pub use error::{ProjectionError, Result};
pub use market::{cagr, effective_cac, market_cycle_multipliers, seasonality_multiplier, MarketCycle};
pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_with, ClipBand, MonteCarloConfig, MonteCarloOutcome,
    MonteCarloResult, MonteCarloStatistics, PercentileScenarios, PerturbationConfig, RankingMetric,
};
pub use params::{EffectiveValues, MaturityTier, ParameterOverrides, ParameterSet, TierDefaults};
pub use progression::{
    run_progression, MonthlyMetrics, MonthlyProgression, ProgressionConfig, ProgressionResult,
    ProgressionSummary, MAX_MONTHLY_ACQUISITION, MAX_MONTHS,
};
pub use retention::{RetentionCurve, RetentionPreset};
pub use snapshot::{BaselineSnapshot, SnapshotResult, SnapshotSimulator};
pub use stats::{calculate_gini, percentile_index, DistributionStats};
pub use vesting::{CategoryAllocation, UnlockSchedule, VestingCategory, VestingSchedule};
