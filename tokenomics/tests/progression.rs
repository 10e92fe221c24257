// Copyright (c) 2024 Botho Foundation

//! End-to-end projections over full parameter sets.

use bth_tokenomics::{
    run_progression, BaselineSnapshot, MarketCycle, MaturityTier, ParameterSet, ProgressionConfig,
    ProjectionError, RetentionPreset, SnapshotResult, SnapshotSimulator, VestingSchedule,
    MAX_MONTHS,
};

#[test]
fn test_five_year_projection_is_consistent() {
    let params = ParameterSet::default();
    let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(60)).unwrap();

    assert_eq!(result.months.len(), 60);
    assert_eq!(result.summary.months, 60);

    let supply = VestingSchedule::default().total_supply() as f64;
    let mut previous_acquired = 0;
    let mut cumulative_profit = 0.0;

    for (i, m) in result.months.iter().enumerate() {
        assert_eq!(m.month, i as u32 + 1);
        assert!(m.active_users <= m.total_acquired, "month {}", m.month);
        assert!(m.total_acquired >= previous_acquired);
        assert_eq!(m.new_users, m.new_creators + m.new_consumers);
        assert!((m.profit - (m.revenue - m.costs)).abs() < 1e-6);
        assert!(m.total_recaptured <= 0.8 * m.monthly_emission + 1e-6);
        assert!(m.circulating_supply <= supply);
        assert!(m.churn_rate >= 0.0 && m.churn_rate <= 1.0);
        assert!(m.ltv.is_finite());

        previous_acquired = m.total_acquired;
        cumulative_profit += m.profit;
        assert!((m.cumulative_profit - cumulative_profit).abs() < 1e-3);
    }

    let summary = &result.summary;
    let last = result.months.last().unwrap();
    assert_eq!(summary.final_active_users, last.active_users);
    assert!(summary.peak_active_users >= summary.final_active_users);
    assert_eq!(summary.total_acquired, last.total_acquired);
    assert!((summary.total_profit - cumulative_profit).abs() < 1e-3);
    assert!((summary.total_revenue - summary.total_costs - summary.total_profit).abs() < 1e-3);
}

#[test]
fn test_short_horizon_has_neutral_market_cycle() {
    let params = ParameterSet::default();
    let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(12)).unwrap();

    for m in &result.months {
        assert_eq!(m.market_cycle, MarketCycle::NEUTRAL);
        assert!((m.token_price - params.token_price).abs() < 1e-12);
    }
    // Periods under a year report no growth rate
    assert_eq!(result.summary.user_cagr, 0.0);
    assert_eq!(result.summary.revenue_cagr, 0.0);
}

#[test]
fn test_market_cycles_can_be_disabled() {
    let params = ParameterSet {
        simulate_market_cycles: false,
        ..Default::default()
    };
    let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(36)).unwrap();
    assert!(result.months.iter().all(|m| m.market_cycle == MarketCycle::NEUTRAL));
}

#[test]
fn test_horizon_bounds() {
    let params = ParameterSet::default();

    let err = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(0)).unwrap_err();
    assert!(matches!(err, ProjectionError::InvalidHorizon(0)));

    let err = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(MAX_MONTHS + 1))
        .unwrap_err();
    assert!(matches!(err, ProjectionError::InvalidHorizon(_)));

    let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(1)).unwrap();
    assert_eq!(result.months.len(), 1);
}

#[test]
fn test_better_retention_keeps_more_users() {
    let base = ParameterSet {
        simulate_market_cycles: false,
        ..Default::default()
    };
    let config = ProgressionConfig::new(24);

    let crypto = run_progression(
        &base.clone().with_retention(RetentionPreset::CryptoApp),
        &BaselineSnapshot,
        &config,
    )
    .unwrap();
    let utility = run_progression(
        &base.with_retention(RetentionPreset::Utility),
        &BaselineSnapshot,
        &config,
    )
    .unwrap();

    // Same budget, same acquisition; only survivorship differs
    assert_eq!(crypto.summary.total_acquired, utility.summary.total_acquired);
    assert!(utility.summary.final_active_users > crypto.summary.final_active_users);
}

#[test]
fn test_params_from_toml() {
    let toml = r#"
        token_price = 0.10
        marketing_budget_usd = 80000.0
        maturity = "mature"
        retention = "utility"

        [overrides]
        arpu_usd = 4.0

        [allocation]
        target_users = 2000000
    "#;
    let params = ParameterSet::from_toml_str(toml).unwrap();
    assert_eq!(params.token_price, 0.10);
    assert_eq!(params.maturity, MaturityTier::Mature);
    assert_eq!(params.retention, RetentionPreset::Utility);
    assert_eq!(params.resolve().arpu_usd, 4.0);
    assert_eq!(params.allocation.target_users, 2_000_000);
    // Unset fields keep their defaults
    assert_eq!(params.creator_quota, ParameterSet::default().creator_quota);

    let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(18)).unwrap();
    assert_eq!(result.months.len(), 18);
}

#[test]
fn test_bad_toml_is_config_error() {
    let err = ParameterSet::from_toml_str("token_price = \"cheap\"").unwrap_err();
    assert!(matches!(err, ProjectionError::Config(_)));
}

/// Earns nothing and costs nothing, leaving marketing as the only expense.
struct IdleSnapshot;

impl SnapshotSimulator for IdleSnapshot {
    fn simulate_month(
        &self,
        _params: &ParameterSet,
        active_users: u64,
        token_price: f64,
        month: u32,
    ) -> SnapshotResult {
        SnapshotResult {
            month,
            active_users,
            token_price,
            ..Default::default()
        }
    }
}

#[test]
fn test_custom_snapshot_simulator() {
    let params = ParameterSet::default();
    let result = run_progression(&params, &IdleSnapshot, &ProgressionConfig::new(24)).unwrap();

    for m in &result.months {
        assert_eq!(m.revenue, 0.0);
        assert!((m.costs - m.marketing_spend).abs() < 1e-9);
    }
    assert!(result.summary.total_profit < 0.0);
    assert_eq!(result.summary.months_to_profitability, None);
    assert_eq!(result.summary.break_even_month, None);
}
