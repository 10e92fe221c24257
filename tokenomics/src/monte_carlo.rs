// Copyright (c) 2024 Botho Foundation

//! Monte Carlo uncertainty analysis for a single month.
//!
//! Each iteration derives a copy of the base parameters with a fixed set of
//! scalars perturbed, then runs the snapshot simulator once:
//!
//! - token price: log-normal multiplier
//! - fee rate, ARPU, cost per user, burn and buyback rates, staking
//!   participation and active users: normal multipliers around 1.0
//!
//! Every multiplier is clipped to a band around the base value (0.5× to
//! 2.0× by default, 0.75× to 1.25× for staking participation) before use.
//!
//! Iteration `i` draws from its own ChaCha stream (`seed`, stream `i`), so
//! results do not depend on how iterations are scheduled across threads.
//! Percentile scenarios are picked after all iterations finish by sorting
//! on the ranking metric and taking index `round(p × (n - 1))`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProjectionError, Result};
use crate::params::{EffectiveValues, ParameterSet};
use crate::snapshot::{SnapshotResult, SnapshotSimulator};
use crate::stats::{percentile_index, DistributionStats};

/// Upper bound on the retained distribution sample.
pub const MAX_SAMPLE_SIZE: usize = 100;

/// Stream reserved for drawing the distribution sample.
const SAMPLE_STREAM: u64 = u64::MAX;

/// Metric used to rank iterations for percentile selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Revenue,
    Profit,
    RecaptureRate,
    ActiveUsers,
}

impl RankingMetric {
    pub fn value(self, result: &SnapshotResult) -> f64 {
        match self {
            RankingMetric::Revenue => result.revenue,
            RankingMetric::Profit => result.profit,
            RankingMetric::RecaptureRate => result.recapture_rate,
            RankingMetric::ActiveUsers => result.active_users as f64,
        }
    }
}

/// Relative band a perturbation multiplier is clipped to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipBand {
    pub min: f64,
    pub max: f64,
}

impl ClipBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clip a multiplier into the band. Non-finite draws become 1.0.
    pub fn apply(&self, multiplier: f64) -> f64 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if !multiplier.is_finite() {
            return 1.0_f64.clamp(lo, hi);
        }
        multiplier.clamp(lo, hi)
    }
}

/// Spread of each perturbed parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Sigma of the log-normal token price multiplier.
    pub token_price_sigma: f64,
    /// Relative standard deviation for fee, ARPU, cost, burn and buyback.
    pub rate_sigma: f64,
    /// Relative standard deviation for staking participation.
    pub staking_sigma: f64,
    /// Relative standard deviation for the active user count.
    pub active_users_sigma: f64,

    pub default_band: ClipBand,
    pub staking_band: ClipBand,
    pub token_price_band: ClipBand,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            token_price_sigma: 0.30,
            rate_sigma: 0.15,
            staking_sigma: 0.10,
            active_users_sigma: 0.20,
            default_band: ClipBand::new(0.5, 2.0),
            staking_band: ClipBand::new(0.75, 1.25),
            token_price_band: ClipBand::new(0.5, 2.0),
        }
    }
}

/// Configuration for a Monte Carlo run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub seed: u64,
    /// Simulation month evaluated by every iteration.
    pub month: u32,
    /// Base active user count, perturbed per iteration.
    pub active_users: u64,
    pub ranking: RankingMetric,
    /// Outcomes kept for distribution display, at most [`MAX_SAMPLE_SIZE`].
    pub sample_size: usize,
    pub perturbation: PerturbationConfig,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000,
            seed: 42,
            month: 12,
            active_users: 10_000,
            ranking: RankingMetric::default(),
            sample_size: MAX_SAMPLE_SIZE,
            perturbation: PerturbationConfig::default(),
        }
    }
}

/// One iteration: the derived parameters and what they produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloOutcome {
    pub iteration: usize,
    pub params: ParameterSet,
    pub active_users: u64,
    pub result: SnapshotResult,
}

/// Full outcomes at the 5th, 50th and 95th percentile of the ranking metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentileScenarios {
    pub p5: MonteCarloOutcome,
    pub p50: MonteCarloOutcome,
    pub p95: MonteCarloOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloStatistics {
    pub revenue: DistributionStats,
    pub profit: DistributionStats,
    pub recapture_rate: DistributionStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub iterations: usize,
    pub seed: u64,
    pub ranking: RankingMetric,
    pub percentiles: PercentileScenarios,
    pub statistics: MonteCarloStatistics,
    /// Seeded random subset of outcomes, in iteration order.
    pub sample: Vec<MonteCarloOutcome>,
}

/// Validated distributions for deriving perturbed parameter sets.
struct Perturber {
    price: LogNormal<f64>,
    rate: Normal<f64>,
    staking: Normal<f64>,
    users: Normal<f64>,
    default_band: ClipBand,
    staking_band: ClipBand,
    price_band: ClipBand,
}

impl Perturber {
    fn new(config: &PerturbationConfig) -> Result<Self> {
        Ok(Self {
            price: LogNormal::new(0.0, config.token_price_sigma)?,
            rate: Normal::new(1.0, config.rate_sigma)?,
            staking: Normal::new(1.0, config.staking_sigma)?,
            users: Normal::new(1.0, config.active_users_sigma)?,
            default_band: config.default_band,
            staking_band: config.staking_band,
            price_band: config.token_price_band,
        })
    }

    fn rate<R: Rng>(&self, rng: &mut R) -> f64 {
        self.default_band.apply(self.rate.sample(rng))
    }

    /// Derive a perturbed copy of `base`. Draw order is fixed.
    fn perturb<R: Rng>(
        &self,
        base: &ParameterSet,
        values: &EffectiveValues,
        active_users: u64,
        rng: &mut R,
    ) -> (ParameterSet, u64) {
        let mut params = base.clone();

        params.token_price = base.token_price * self.price_band.apply(self.price.sample(rng));
        params.overrides.platform_fee_rate = Some((values.platform_fee_rate * self.rate(rng)).min(1.0));
        params.overrides.arpu_usd = Some(values.arpu_usd * self.rate(rng));
        params.overrides.cost_per_user_usd = Some(values.cost_per_user_usd * self.rate(rng));
        params.burn_rate = (base.burn_rate * self.rate(rng)).min(1.0);
        params.buyback_rate = (base.buyback_rate * self.rate(rng)).min(1.0);

        let staking = self.staking_band.apply(self.staking.sample(rng));
        params.overrides.staking_participation = Some((values.staking_participation * staking).min(1.0));

        let users_multiplier = self.default_band.apply(self.users.sample(rng));
        let users = (active_users as f64 * users_multiplier).round() as u64;

        (params, users)
    }
}

/// Run a Monte Carlo analysis.
pub fn run_monte_carlo(
    params: &ParameterSet,
    simulator: &dyn SnapshotSimulator,
    config: &MonteCarloConfig,
) -> Result<MonteCarloResult> {
    run_monte_carlo_with(params, simulator, config, &|_: f64| {}, &AtomicBool::new(false))
}

/// Run a Monte Carlo analysis with progress reporting and cancellation.
///
/// `progress` receives the completed fraction at most once per 1% of
/// iterations. Setting `cancel` stops new iterations from starting and the
/// run returns [`ProjectionError::Cancelled`].
pub fn run_monte_carlo_with(
    params: &ParameterSet,
    simulator: &dyn SnapshotSimulator,
    config: &MonteCarloConfig,
    progress: &(dyn Fn(f64) + Sync),
    cancel: &AtomicBool,
) -> Result<MonteCarloResult> {
    let total = config.iterations;
    if total == 0 {
        return Err(ProjectionError::NoIterations);
    }

    let perturber = Perturber::new(&config.perturbation)?;
    let base_values = params.resolve();
    let completed = AtomicUsize::new(0);
    let report_every = total.div_ceil(100);

    let outcomes: Option<Vec<MonteCarloOutcome>> = (0..total)
        .into_par_iter()
        .map(|iteration| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }

            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            rng.set_stream(iteration as u64);

            let (derived, active_users) =
                perturber.perturb(params, &base_values, config.active_users, &mut rng);
            let result =
                simulator.simulate_month(&derived, active_users, derived.token_price, config.month);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % report_every == 0 || done == total {
                progress(done as f64 / total as f64);
            }

            Some(MonteCarloOutcome {
                iteration,
                params: derived,
                active_users,
                result,
            })
        })
        .collect();

    let outcomes = match outcomes {
        Some(outcomes) => outcomes,
        None => {
            return Err(ProjectionError::Cancelled {
                completed: completed.load(Ordering::Relaxed),
                total,
            })
        }
    };
    debug!(iterations = outcomes.len(), "monte carlo iterations complete");

    let percentiles = select_percentiles(&outcomes, config.ranking);
    let statistics = MonteCarloStatistics {
        revenue: stats_of(&outcomes, |r| r.revenue),
        profit: stats_of(&outcomes, |r| r.profit),
        recapture_rate: stats_of(&outcomes, |r| r.recapture_rate),
    };
    let sample = draw_sample(&outcomes, config.seed, config.sample_size);

    info!(
        iterations = total,
        seed = config.seed,
        mean_revenue = statistics.revenue.mean,
        "monte carlo complete"
    );

    Ok(MonteCarloResult {
        iterations: total,
        seed: config.seed,
        ranking: config.ranking,
        percentiles,
        statistics,
        sample,
    })
}

/// Pick P5/P50/P95 from a non-empty set of outcomes.
fn select_percentiles(outcomes: &[MonteCarloOutcome], ranking: RankingMetric) -> PercentileScenarios {
    let mut ranked: Vec<&MonteCarloOutcome> = outcomes.iter().collect();
    // Stable, so ties keep iteration order
    ranked.sort_by(|a, b| ranking.value(&a.result).total_cmp(&ranking.value(&b.result)));

    let n = ranked.len();
    let pick = |p: f64| ranked[percentile_index(p, n)].clone();

    PercentileScenarios {
        p5: pick(0.05),
        p50: pick(0.50),
        p95: pick(0.95),
    }
}

fn stats_of(outcomes: &[MonteCarloOutcome], metric: impl Fn(&SnapshotResult) -> f64) -> DistributionStats {
    let values: Vec<f64> = outcomes.iter().map(|o| metric(&o.result)).collect();
    DistributionStats::from_samples(&values)
}

fn draw_sample(outcomes: &[MonteCarloOutcome], seed: u64, sample_size: usize) -> Vec<MonteCarloOutcome> {
    let amount = sample_size.min(MAX_SAMPLE_SIZE).min(outcomes.len());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(SAMPLE_STREAM);

    let mut picked = index::sample(&mut rng, outcomes.len(), amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| outcomes[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BaselineSnapshot;

    fn config(iterations: usize, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            iterations,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_is_identical() {
        let params = ParameterSet::default();
        let a = run_monte_carlo(&params, &BaselineSnapshot, &config(100, 7)).unwrap();
        let b = run_monte_carlo(&params, &BaselineSnapshot, &config(100, 7)).unwrap();
        assert_eq!(a, b);

        let c = run_monte_carlo(&params, &BaselineSnapshot, &config(100, 8)).unwrap();
        assert_ne!(a.statistics, c.statistics);
    }

    #[test]
    fn test_percentiles_are_ordered() {
        let params = ParameterSet::default();
        let result = run_monte_carlo(&params, &BaselineSnapshot, &config(200, 1)).unwrap();
        let p = &result.percentiles;
        assert!(p.p5.result.revenue <= p.p50.result.revenue);
        assert!(p.p50.result.revenue <= p.p95.result.revenue);
        assert!(result.statistics.revenue.min <= p.p5.result.revenue);
    }

    #[test]
    fn test_single_iteration() {
        let params = ParameterSet::default();
        let result = run_monte_carlo(&params, &BaselineSnapshot, &config(1, 3)).unwrap();
        assert_eq!(result.percentiles.p5, result.percentiles.p95);
        assert_eq!(result.sample.len(), 1);
    }

    #[test]
    fn test_sample_is_bounded_and_ordered() {
        let params = ParameterSet::default();
        let result = run_monte_carlo(&params, &BaselineSnapshot, &config(300, 5)).unwrap();
        assert_eq!(result.sample.len(), MAX_SAMPLE_SIZE);
        assert!(result.sample.windows(2).all(|w| w[0].iteration < w[1].iteration));

        let small = run_monte_carlo(&params, &BaselineSnapshot, &config(40, 5)).unwrap();
        assert_eq!(small.sample.len(), 40);
    }

    #[test]
    fn test_perturbations_stay_in_band() {
        let params = ParameterSet::default();
        let values = params.resolve();
        let result = run_monte_carlo(&params, &BaselineSnapshot, &config(300, 11)).unwrap();
        for outcome in &result.sample {
            let ratio = outcome.params.token_price / params.token_price;
            assert!((0.5 - 1e-12..=2.0 + 1e-12).contains(&ratio));

            let staking = outcome.params.overrides.staking_participation.unwrap();
            let ratio = staking / values.staking_participation;
            assert!((0.75 - 1e-12..=1.25 + 1e-12).contains(&ratio));

            assert!(outcome.active_users >= 5_000 && outcome.active_users <= 20_000);
        }
        // Base parameters are never modified
        assert_eq!(params, ParameterSet::default());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let params = ParameterSet::default();
        let err = run_monte_carlo(&params, &BaselineSnapshot, &config(0, 1)).unwrap_err();
        assert!(matches!(err, ProjectionError::NoIterations));
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        let params = ParameterSet::default();
        let mut cfg = config(10, 1);
        cfg.perturbation.rate_sigma = -1.0;
        let err = run_monte_carlo(&params, &BaselineSnapshot, &cfg).unwrap_err();
        assert!(matches!(err, ProjectionError::Distribution(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let params = ParameterSet::default();
        let cancel = AtomicBool::new(true);
        let err = run_monte_carlo_with(&params, &BaselineSnapshot, &config(50, 1), &|_: f64| {}, &cancel)
            .unwrap_err();
        assert!(matches!(err, ProjectionError::Cancelled { completed: 0, total: 50 }));
    }

    #[test]
    fn test_progress_reaches_one() {
        use std::sync::Mutex;

        let params = ParameterSet::default();
        let seen = Mutex::new(Vec::new());
        let record = |fraction: f64| seen.lock().unwrap().push(fraction);
        run_monte_carlo_with(
            &params,
            &BaselineSnapshot,
            &config(500, 2),
            &record,
            &AtomicBool::new(false),
        )
        .unwrap();

        let seen = seen.into_inner().unwrap();
        assert!(seen.len() <= 100);
        assert!(seen.iter().any(|&f| f == 1.0));
    }
}
