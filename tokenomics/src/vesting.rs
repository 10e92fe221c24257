// Copyright (c) 2024 Botho Foundation

//! Token allocation buckets and their unlock schedules.
//!
//! The total supply is split across ten categories. Each unlocks on its own
//! schedule and circulating supply at month M is the sum of every
//! category's cumulative unlocks through M (month 0 is the TGE).
//!
//! ## Schedules
//!
//! - **Linear**: `tge_bps` of the allocation unlocks at TGE. The remainder
//!   unlocks in equal monthly slices for months `cliff+1 ..= cliff+vesting`;
//!   the final slice absorbs integer truncation so the window sums exactly
//!   to `total - tge`.
//! - **FixedEmission**: the rewards pool. Equal monthly slices for months
//!   `1 ..= duration`, no cliff and no TGE unlock.
//! - **Governance**: the treasury. Released only by governance decisions,
//!   which are outside the schedule, so it contributes nothing here.

use serde::{Deserialize, Serialize};

/// Basis points in 100%.
pub const BPS_SCALE: u64 = 10_000;

/// Allocation bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VestingCategory {
    Seed,
    Private,
    Public,
    Team,
    Advisors,
    Treasury,
    Rewards,
    Liquidity,
    Foundation,
    Marketing,
}

impl VestingCategory {
    pub const ALL: [VestingCategory; 10] = [
        VestingCategory::Seed,
        VestingCategory::Private,
        VestingCategory::Public,
        VestingCategory::Team,
        VestingCategory::Advisors,
        VestingCategory::Treasury,
        VestingCategory::Rewards,
        VestingCategory::Liquidity,
        VestingCategory::Foundation,
        VestingCategory::Marketing,
    ];
}

/// How a category unlocks over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockSchedule {
    Linear {
        tge_bps: u32,
        cliff_months: u32,
        vesting_months: u32,
    },
    FixedEmission {
        duration_months: u32,
    },
    Governance,
}

/// A category's share of the supply and its schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub category: VestingCategory,
    pub total_allocation: u64,
    pub schedule: UnlockSchedule,
}

impl CategoryAllocation {
    /// Tokens released at TGE (month 0).
    pub fn tge_unlock(&self) -> u64 {
        match self.schedule {
            UnlockSchedule::Linear { tge_bps, .. } => {
                let bps = (tge_bps as u64).min(BPS_SCALE);
                (self.total_allocation as u128 * bps as u128 / BPS_SCALE as u128) as u64
            }
            _ => 0,
        }
    }

    /// Tokens released in `month` (month 0 returns the TGE unlock).
    pub fn monthly_unlock(&self, month: u32) -> u64 {
        if month == 0 {
            return self.tge_unlock();
        }

        match self.schedule {
            UnlockSchedule::Linear {
                cliff_months,
                vesting_months,
                ..
            } => {
                let vesting_total = self.total_allocation - self.tge_unlock();
                equal_slices(vesting_total, month, cliff_months, vesting_months.max(1))
            }
            UnlockSchedule::FixedEmission { duration_months } => {
                equal_slices(self.total_allocation, month, 0, duration_months.max(1))
            }
            UnlockSchedule::Governance => 0,
        }
    }

    /// Tokens released from TGE through `month` inclusive.
    pub fn cumulative_unlocked(&self, month: u32) -> u64 {
        match self.schedule {
            UnlockSchedule::Linear {
                cliff_months,
                vesting_months,
                ..
            } => {
                let tge = self.tge_unlock();
                let vested = self.total_allocation - tge;
                tge + cumulative_slices(vested, month, cliff_months, vesting_months.max(1))
            }
            UnlockSchedule::FixedEmission { duration_months } => {
                cumulative_slices(self.total_allocation, month, 0, duration_months.max(1))
            }
            UnlockSchedule::Governance => 0,
        }
    }
}

/// Slice of `amount` released in `month` when vesting over months
/// `start+1 ..= start+duration`. The last month takes the remainder.
fn equal_slices(amount: u64, month: u32, start: u32, duration: u32) -> u64 {
    let end = start.saturating_add(duration);
    if month <= start || month > end {
        return 0;
    }
    let slice = amount / duration as u64;
    if month == end {
        amount - slice * (duration as u64 - 1)
    } else {
        slice
    }
}

fn cumulative_slices(amount: u64, month: u32, start: u32, duration: u32) -> u64 {
    if month <= start {
        return 0;
    }
    if month >= start.saturating_add(duration) {
        return amount;
    }
    let slice = amount / duration as u64;
    slice * (month - start) as u64
}

/// The full allocation table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub categories: Vec<CategoryAllocation>,
}

/// (category, share of supply in bps, schedule) for the standard table.
const STANDARD_TABLE: [(VestingCategory, u64, UnlockSchedule); 10] = [
    (
        VestingCategory::Seed,
        500,
        UnlockSchedule::Linear { tge_bps: 0, cliff_months: 12, vesting_months: 24 },
    ),
    (
        VestingCategory::Private,
        700,
        UnlockSchedule::Linear { tge_bps: 500, cliff_months: 6, vesting_months: 18 },
    ),
    (
        VestingCategory::Public,
        300,
        UnlockSchedule::Linear { tge_bps: 2_500, cliff_months: 0, vesting_months: 6 },
    ),
    (
        VestingCategory::Team,
        1_500,
        UnlockSchedule::Linear { tge_bps: 0, cliff_months: 12, vesting_months: 36 },
    ),
    (
        VestingCategory::Advisors,
        300,
        UnlockSchedule::Linear { tge_bps: 0, cliff_months: 6, vesting_months: 24 },
    ),
    (VestingCategory::Treasury, 1_500, UnlockSchedule::Governance),
    (
        VestingCategory::Rewards,
        3_000,
        UnlockSchedule::FixedEmission { duration_months: 60 },
    ),
    (
        VestingCategory::Liquidity,
        700,
        UnlockSchedule::Linear { tge_bps: 5_000, cliff_months: 0, vesting_months: 12 },
    ),
    (
        VestingCategory::Foundation,
        1_000,
        UnlockSchedule::Linear { tge_bps: 0, cliff_months: 6, vesting_months: 48 },
    ),
    (
        VestingCategory::Marketing,
        500,
        UnlockSchedule::Linear { tge_bps: 1_000, cliff_months: 0, vesting_months: 24 },
    ),
];

impl VestingSchedule {
    /// Standard ten-bucket table over `total_supply`.
    ///
    /// Rounding dust from the bps split is added to the treasury so the
    /// categories always sum to the supply.
    pub fn standard(total_supply: u64) -> Self {
        let mut categories: Vec<CategoryAllocation> = STANDARD_TABLE
            .iter()
            .map(|&(category, bps, schedule)| CategoryAllocation {
                category,
                total_allocation: (total_supply as u128 * bps as u128 / BPS_SCALE as u128) as u64,
                schedule,
            })
            .collect();

        let allocated: u64 = categories.iter().map(|c| c.total_allocation).sum();
        if let Some(treasury) = categories
            .iter_mut()
            .find(|c| c.category == VestingCategory::Treasury)
        {
            treasury.total_allocation += total_supply - allocated;
        }

        Self { categories }
    }

    pub fn category(&self, category: VestingCategory) -> Option<&CategoryAllocation> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn total_supply(&self) -> u64 {
        self.categories.iter().map(|c| c.total_allocation).sum()
    }

    /// Tokens unlocked across all categories in `month`.
    pub fn unlocked_in_month(&self, month: u32) -> u64 {
        self.categories.iter().map(|c| c.monthly_unlock(month)).sum()
    }

    /// Circulating supply at the end of `month` from scheduled unlocks.
    pub fn circulating_supply_at(&self, month: u32) -> u64 {
        self.categories
            .iter()
            .map(|c| c.cumulative_unlocked(month))
            .sum()
    }

    /// Rewards pool emission in `month`, the base for dynamic allocation.
    pub fn rewards_emission_at(&self, month: u32) -> u64 {
        self.categories
            .iter()
            .filter(|c| c.category == VestingCategory::Rewards)
            .map(|c| c.monthly_unlock(month))
            .sum()
    }
}

impl Default for VestingSchedule {
    fn default() -> Self {
        Self::standard(1_000_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(total: u64, tge_bps: u32, cliff: u32, vesting: u32) -> CategoryAllocation {
        CategoryAllocation {
            category: VestingCategory::Team,
            total_allocation: total,
            schedule: UnlockSchedule::Linear {
                tge_bps,
                cliff_months: cliff,
                vesting_months: vesting,
            },
        }
    }

    #[test]
    fn test_cliff_then_linear() {
        let team = linear(36_000, 0, 12, 36);
        assert_eq!(team.tge_unlock(), 0);
        for month in 1..=12 {
            assert_eq!(team.monthly_unlock(month), 0);
        }
        assert_eq!(team.monthly_unlock(13), 1_000);
        assert_eq!(team.monthly_unlock(48), 1_000);
        assert_eq!(team.monthly_unlock(49), 0);
        assert_eq!(team.cumulative_unlocked(48), 36_000);
    }

    #[test]
    fn test_window_sums_exactly_with_remainder() {
        let private = linear(1_000_003, 500, 6, 18);
        let tge = private.tge_unlock();
        assert_eq!(tge, 50_000);

        let window: u64 = (7..=24).map(|m| private.monthly_unlock(m)).sum();
        assert_eq!(window, 1_000_003 - tge);
        assert_eq!(private.cumulative_unlocked(24), 1_000_003);
        assert_eq!(private.cumulative_unlocked(100), 1_000_003);
    }

    #[test]
    fn test_cumulative_matches_monthly_sum() {
        let schedule = VestingSchedule::standard(1_000_000_000);
        let mut running = 0u64;
        for month in 0..=72 {
            running += schedule.unlocked_in_month(month);
            assert_eq!(running, schedule.circulating_supply_at(month), "month {month}");
        }
    }

    #[test]
    fn test_standard_sums_to_supply() {
        let schedule = VestingSchedule::standard(999_999_999);
        assert_eq!(schedule.total_supply(), 999_999_999);
        assert_eq!(schedule.categories.len(), 10);
    }

    #[test]
    fn test_treasury_never_unlocks() {
        let schedule = VestingSchedule::standard(1_000_000_000);
        let treasury = schedule.category(VestingCategory::Treasury).unwrap();
        assert_eq!(treasury.cumulative_unlocked(120), 0);
        // Everything except the treasury is circulating once all schedules end
        assert_eq!(
            schedule.circulating_supply_at(120),
            schedule.total_supply() - treasury.total_allocation
        );
    }

    #[test]
    fn test_rewards_emission() {
        let schedule = VestingSchedule::standard(1_000_000_000);
        assert_eq!(schedule.rewards_emission_at(0), 0);
        assert_eq!(schedule.rewards_emission_at(1), 5_000_000);
        assert_eq!(schedule.rewards_emission_at(60), 5_000_000);
        assert_eq!(schedule.rewards_emission_at(61), 0);
    }

    #[test]
    fn test_tge_circulating_supply() {
        // public 25% of 30M, private 5% of 70M, liquidity 50% of 70M, marketing 10% of 50M
        let schedule = VestingSchedule::standard(1_000_000_000);
        assert_eq!(
            schedule.circulating_supply_at(0),
            7_500_000 + 3_500_000 + 35_000_000 + 5_000_000
        );
    }
}
