// Copyright (c) 2024 Botho Foundation

//! Exogenous market effects on the monthly projection.
//!
//! - **Seasonality**: a 12-month repeating acquisition multiplier.
//! - **Market cycle**: a 5-year bull/bear cycle scaling growth, retention
//!   and price. Anchors sit at each year start and are linearly
//!   interpolated, with the cycle's end anchor equal to its start, so the
//!   multipliers have no jump at year boundaries or at the wrap.
//! - **CAC saturation**: acquisition cost rises quadratically with market
//!   penetration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Acquisition multiplier by calendar month, January first.
pub const SEASONALITY: [f64; 12] = [
    0.90, // Jan: post-holiday slump
    0.95, // Feb
    1.00, // Mar
    1.00, // Apr
    0.95, // May
    0.90, // Jun
    0.80, // Jul: summer low
    0.85, // Aug
    1.05, // Sep
    1.10, // Oct
    1.15, // Nov
    1.25, // Dec: holiday peak
];

/// Months in one full market cycle.
pub const CYCLE_MONTHS: u32 = 60;

/// Growth, retention and price multipliers from the market cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketCycle {
    pub growth: f64,
    pub retention: f64,
    pub price: f64,
}

impl MarketCycle {
    /// No market effect.
    pub const NEUTRAL: MarketCycle = MarketCycle {
        growth: 1.0,
        retention: 1.0,
        price: 1.0,
    };

    fn lerp(a: MarketCycle, b: MarketCycle, t: f64) -> MarketCycle {
        MarketCycle {
            growth: a.growth + (b.growth - a.growth) * t,
            retention: a.retention + (b.retention - a.retention) * t,
            price: a.price + (b.price - a.price) * t,
        }
    }
}

impl Default for MarketCycle {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Cycle anchors at the start of each year; the last closes the loop.
const CYCLE_ANCHORS: [MarketCycle; 6] = [
    // Year 1: neutral launch
    MarketCycle { growth: 1.00, retention: 1.00, price: 1.00 },
    // Year 2: bull market
    MarketCycle { growth: 1.30, retention: 1.05, price: 1.60 },
    // Year 3: bear market
    MarketCycle { growth: 0.70, retention: 0.92, price: 0.55 },
    // Year 4: recovery
    MarketCycle { growth: 0.85, retention: 0.97, price: 0.80 },
    // Year 5: expansion
    MarketCycle { growth: 1.10, retention: 1.02, price: 1.20 },
    MarketCycle { growth: 1.00, retention: 1.00, price: 1.00 },
];

/// Seasonal acquisition multiplier for a 1-based simulation month.
///
/// Month 0 is treated as the December before month 1.
pub fn seasonality_multiplier(month: u32) -> f64 {
    SEASONALITY[((month + 11) % 12) as usize]
}

/// Market-cycle multipliers for a 1-based simulation month.
pub fn market_cycle_multipliers(month: u32) -> MarketCycle {
    let position = month.saturating_sub(1) % CYCLE_MONTHS;
    let year = (position / 12) as usize;
    let t = (position % 12) as f64 / 12.0;
    MarketCycle::lerp(CYCLE_ANCHORS[year], CYCLE_ANCHORS[year + 1], t)
}

/// Customer acquisition cost after market saturation.
///
/// ```text
/// penetration   = clamp(total_acquired / target_market_size, 0, 1)
/// effective_cac = base_cac × (1 + saturation_factor × 3 × penetration²)
/// ```
pub fn effective_cac(
    base_cac: f64,
    total_acquired: u64,
    target_market_size: u64,
    saturation_factor: f64,
) -> f64 {
    let base = if base_cac.is_finite() { base_cac.max(0.0) } else { 0.0 };
    let saturation = if saturation_factor.is_finite() {
        saturation_factor.max(0.0)
    } else {
        0.0
    };

    let penetration = if target_market_size == 0 {
        warn!("target market size is zero, ignoring saturation");
        0.0
    } else {
        (total_acquired as f64 / target_market_size as f64).clamp(0.0, 1.0)
    };

    base * (1.0 + saturation * 3.0 * penetration * penetration)
}

/// Compound annual growth rate.
///
/// Returns 0 for periods shorter than a year and for non-positive or
/// non-finite inputs.
pub fn cagr(start_value: f64, end_value: f64, years: f64) -> f64 {
    if !(years.is_finite() && start_value.is_finite() && end_value.is_finite()) {
        return 0.0;
    }
    if years < 1.0 || start_value <= 0.0 || end_value < 0.0 {
        return 0.0;
    }
    (end_value / start_value).powf(1.0 / years) - 1.0
}
