// Copyright (c) 2024 Botho Foundation

//! Errors returned by the projection engine.
//!
//! Numeric edge cases (zero users, zero emission, non-positive prices) are
//! not errors: they degrade to a defined fallback and log a warning. The
//! variants here cover structural misuse and configuration problems only.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid retention curve '{name}': {reason}")]
    InvalidRetentionCurve { name: String, reason: String },

    #[error("Cohort for month {month} added after month {last_month}")]
    CohortOutOfOrder { month: u32, last_month: u32 },

    #[error("Invalid horizon: {0} months (expected 1..={max})", max = crate::progression::MAX_MONTHS)]
    InvalidHorizon(u32),

    #[error("Monte Carlo run requires at least one iteration")]
    NoIterations,

    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),

    #[error("Simulation cancelled after {completed} of {total} iterations")]
    Cancelled { completed: usize, total: usize },

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<rand_distr::NormalError> for ProjectionError {
    fn from(err: rand_distr::NormalError) -> Self {
        Self::Distribution(err.to_string())
    }
}
