// Copyright (c) 2024 Botho Foundation

//! Cohort-based active user tracking.
//!
//! Every month's acquisitions form a cohort. The active user count for a
//! month is the sum of every earlier cohort's survivors under the shared
//! retention curve, so a user acquired in month 3 is evaluated at age 0 in
//! month 3, age 1 in month 4, and so on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::retention::RetentionCurve;

/// Users acquired in a single month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub acquisition_month: u32,
    pub initial_users: u64,
}

impl Cohort {
    pub fn new(acquisition_month: u32, initial_users: u64) -> Self {
        Self {
            acquisition_month,
            initial_users,
        }
    }

    /// Members of this cohort still active at `current_month`.
    pub fn active_at(&self, current_month: u32, curve: &RetentionCurve) -> u64 {
        if current_month < self.acquisition_month {
            return 0;
        }
        if current_month == self.acquisition_month {
            return self.initial_users;
        }

        let age = (current_month - self.acquisition_month) as i64;
        let survivors = (self.initial_users as f64 * curve.retention_at(age)).round();
        (survivors as u64).min(self.initial_users)
    }
}

/// Retention summary for a month.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionStats {
    /// Users acquired on or before the month.
    pub total_acquired: u64,
    /// Users still active in the month.
    pub total_active: u64,
    /// `total_active / total_acquired`, 0 when nothing was acquired.
    pub overall_retention_rate: f64,
    /// `1 - overall_retention_rate`, 0 when nothing was acquired.
    pub churn_rate: f64,
}

/// Ordered list of cohorts sharing one retention curve.
#[derive(Clone, Debug)]
pub struct CohortTracker {
    curve: Arc<RetentionCurve>,
    cohorts: Vec<Cohort>,
}

impl CohortTracker {
    pub fn new(curve: Arc<RetentionCurve>) -> Self {
        Self {
            curve,
            cohorts: Vec::new(),
        }
    }

    pub fn curve(&self) -> &RetentionCurve {
        &self.curve
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Append the cohort acquired in `month`.
    ///
    /// Cohorts must arrive in non-decreasing month order. A month earlier
    /// than the last one added is rejected and the tracker is left unchanged.
    pub fn add_cohort(&mut self, month: u32, users_acquired: u64) -> Result<()> {
        if let Some(last) = self.cohorts.last() {
            if month < last.acquisition_month {
                return Err(ProjectionError::CohortOutOfOrder {
                    month,
                    last_month: last.acquisition_month,
                });
            }
        }
        self.cohorts.push(Cohort::new(month, users_acquired));
        Ok(())
    }

    /// Every user ever acquired, across all cohorts.
    pub fn total_acquired(&self) -> u64 {
        self.cohorts
            .iter()
            .fold(0, |total: u64, c| total.saturating_add(c.initial_users))
    }

    /// Users acquired on or before `month`.
    pub fn acquired_through(&self, month: u32) -> u64 {
        self.cohorts
            .iter()
            .take_while(|c| c.acquisition_month <= month)
            .fold(0, |total: u64, c| total.saturating_add(c.initial_users))
    }

    /// Active users in `month`, summed over every cohort.
    pub fn active_users_at_month(&self, month: u32) -> u64 {
        self.cohorts
            .iter()
            .fold(0, |total: u64, c| total.saturating_add(c.active_at(month, &self.curve)))
    }

    /// Acquisition month -> users from that month still active in `month`.
    pub fn cohort_breakdown(&self, month: u32) -> BTreeMap<u32, u64> {
        let mut breakdown = BTreeMap::new();
        for cohort in self.cohorts.iter().take_while(|c| c.acquisition_month <= month) {
            let active = breakdown.entry(cohort.acquisition_month).or_insert(0u64);
            *active = active.saturating_add(cohort.active_at(month, &self.curve));
        }
        breakdown
    }

    pub fn retention_stats(&self, month: u32) -> RetentionStats {
        let total_acquired = self.acquired_through(month);
        let total_active = self.active_users_at_month(month);

        if total_acquired == 0 {
            return RetentionStats {
                total_acquired,
                total_active,
                overall_retention_rate: 0.0,
                churn_rate: 0.0,
            };
        }

        let overall_retention_rate = total_active as f64 / total_acquired as f64;
        RetentionStats {
            total_acquired,
            total_active,
            overall_retention_rate,
            churn_rate: 1.0 - overall_retention_rate,
        }
    }
}
