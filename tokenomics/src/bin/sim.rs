// Copyright (c) 2024 Botho Foundation

//! Token platform projection CLI.
//!
//! Run projections, Monte Carlo analyses and agent simulations over a
//! parameter file.

#[cfg(feature = "cli")]
mod cli {
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;

    use anyhow::{Context, Result};
    use bth_tokenomics::{
        calculate_dynamic_allocation,
        simulation::{run_agent_batch, run_agent_simulation, AgentSimulationConfig},
        run_monte_carlo_with, run_progression, BaselineSnapshot, MonteCarloConfig, MonteCarloResult,
        ParameterSet, ProgressionConfig, ProgressionResult, RankingMetric, RetentionPreset,
    };
    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};
    use serde::Serialize;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(name = "tokenomics-sim")]
    #[command(about = "Project token platform economics")]
    pub struct Cli {
        /// Parameter file (TOML). Defaults are used for missing fields.
        #[arg(short, long, global = true)]
        pub params: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long, global = true)]
        pub json: bool,

        /// Enable debug logging
        #[arg(short, long, global = true)]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Month-by-month projection
        Project {
            /// Number of months to simulate
            #[arg(short, long, default_value = "60")]
            months: u32,

            /// Retention preset (overrides the parameter file)
            #[arg(short, long, value_parser = parse_preset)]
            retention: Option<RetentionPreset>,
        },

        /// Monte Carlo uncertainty analysis for one month
        MonteCarlo {
            /// Number of iterations
            #[arg(short = 'n', long, default_value = "1000")]
            iterations: usize,

            /// Random seed
            #[arg(short, long, default_value = "42")]
            seed: u64,

            /// Simulation month to evaluate
            #[arg(short, long, default_value = "12")]
            month: u32,

            /// Base active user count
            #[arg(short, long, default_value = "10000")]
            users: u64,

            /// Ranking metric: revenue, profit, recapture_rate or active_users
            #[arg(long, default_value = "revenue", value_parser = parse_ranking)]
            ranking: RankingMetric,
        },

        /// Agent-based population simulation
        Agents {
            /// Number of months to simulate
            #[arg(short, long, default_value = "36")]
            months: u32,

            /// Agents present at launch
            #[arg(long, default_value = "200")]
            launch_agents: usize,

            /// Agents joining each month
            #[arg(long, default_value = "50")]
            monthly_joins: usize,

            /// Random seed
            #[arg(short, long, default_value = "42")]
            seed: u64,

            /// Seeded replicates to run (more than one reports distributions)
            #[arg(short, long, default_value = "1")]
            runs: usize,
        },

        /// Print retention curves
        Retention {
            /// Single preset to print (default: all)
            #[arg(short, long, value_parser = parse_preset)]
            preset: Option<RetentionPreset>,

            /// Months to print
            #[arg(short, long, default_value = "36")]
            months: u32,
        },

        /// Print the dynamic allocation across user counts
        Allocation {
            /// Token price in USD (default: from parameters)
            #[arg(long)]
            price: Option<f64>,

            /// Monthly emission base in tokens (default: month-1 rewards unlock)
            #[arg(long)]
            emission: Option<f64>,

            /// Number of sample points
            #[arg(short = 'n', long, default_value = "13")]
            samples: u32,
        },
    }

    fn parse_preset(s: &str) -> std::result::Result<RetentionPreset, String> {
        RetentionPreset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = RetentionPreset::ALL.iter().map(|p| p.name()).collect();
                format!("unknown preset '{s}', expected one of: {}", names.join(", "))
            })
    }

    fn parse_ranking(s: &str) -> std::result::Result<RankingMetric, String> {
        match s {
            "revenue" => Ok(RankingMetric::Revenue),
            "profit" => Ok(RankingMetric::Profit),
            "recapture_rate" => Ok(RankingMetric::RecaptureRate),
            "active_users" => Ok(RankingMetric::ActiveUsers),
            _ => Err(format!("unknown ranking metric '{s}'")),
        }
    }

    pub fn init_logging(verbose: bool) {
        let default_level = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    fn load_params(path: Option<&PathBuf>) -> Result<ParameterSet> {
        match path {
            Some(path) => ParameterSet::load(path)
                .with_context(|| format!("Failed to load parameters from {}", path.display())),
            None => Ok(ParameterSet::default()),
        }
    }

    fn print_json<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
        println!("{json}");
        Ok(())
    }

    fn progress_bar(len: u64, json: bool) -> Result<ProgressBar> {
        if json {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
                .context("Invalid progress template")?,
        );
        Ok(bar)
    }

    pub fn run(cli: Cli) -> Result<()> {
        let params = load_params(cli.params.as_ref())?;

        match cli.command {
            Command::Project { months, retention } => {
                let params = match retention {
                    Some(preset) => params.with_retention(preset),
                    None => params,
                };
                let result = run_progression(&params, &BaselineSnapshot, &ProgressionConfig::new(months))?;
                if cli.json {
                    print_json(&result)
                } else {
                    print_projection(&result);
                    Ok(())
                }
            }

            Command::MonteCarlo {
                iterations,
                seed,
                month,
                users,
                ranking,
            } => {
                let config = MonteCarloConfig {
                    iterations,
                    seed,
                    month,
                    active_users: users,
                    ranking,
                    ..Default::default()
                };

                let bar = progress_bar(iterations as u64, cli.json)?;
                let report = |fraction: f64| bar.set_position((fraction * iterations as f64).round() as u64);
                let result = run_monte_carlo_with(
                    &params,
                    &BaselineSnapshot,
                    &config,
                    &report,
                    &AtomicBool::new(false),
                )?;
                bar.finish_and_clear();

                if cli.json {
                    print_json(&result)
                } else {
                    print_monte_carlo(&result);
                    Ok(())
                }
            }

            Command::Agents {
                months,
                launch_agents,
                monthly_joins,
                seed,
                runs,
            } => {
                let config = AgentSimulationConfig {
                    months,
                    launch_agents,
                    monthly_joins,
                    seed,
                    ..Default::default()
                };

                if runs > 1 {
                    let bar = progress_bar(runs as u64, cli.json)?;
                    let report = |fraction: f64| bar.set_position((fraction * runs as f64).round() as u64);
                    let batch = run_agent_batch(&params, &config, runs, &report, &AtomicBool::new(false))?;
                    bar.finish_and_clear();

                    if cli.json {
                        return print_json(&batch);
                    }
                    println!("Agent simulation: {runs} replicates over {months} months");
                    println!("{:<22} {:>12} {:>12} {:>12}", "", "mean", "p5", "p95");
                    for (label, stats) in [
                        ("final active agents", &batch.final_active_agents),
                        ("total fees (USD)", &batch.total_fees_usd),
                        ("final wealth gini", &batch.final_gini),
                    ] {
                        println!(
                            "{:<22} {:>12.2} {:>12.2} {:>12.2}",
                            label, stats.mean, stats.percentile_5, stats.percentile_95
                        );
                    }
                    return Ok(());
                }

                let result = run_agent_simulation(&params, &config)?;
                if cli.json {
                    return print_json(&result);
                }

                println!("{:>5} {:>8} {:>7} {:>7} {:>12} {:>12} {:>12}",
                    "month", "active", "joined", "churned", "fees USD", "burned", "sold");
                for m in &result.months {
                    println!("{:>5} {:>8} {:>7} {:>7} {:>12.2} {:>12.1} {:>12.1}",
                        m.month, m.active_agents, m.joined, m.churned, m.fees_usd,
                        m.burned_tokens, m.tokens_sold);
                }
                let s = &result.summary;
                println!();
                println!("Final agents: {}  Total fees: ${:.2}  Wealth Gini: {:.3}",
                    s.final_active_agents, s.total_fees_usd, s.final_gini);
                for (kind, fees) in &s.fees_by_kind {
                    println!("  {:<11} fees ${:.2}", kind.name(), fees);
                }
                Ok(())
            }

            Command::Retention { preset, months } => {
                let presets: Vec<RetentionPreset> = match preset {
                    Some(p) => vec![p],
                    None => RetentionPreset::ALL.to_vec(),
                };
                let curves: Vec<_> = presets.iter().map(|p| p.curve()).collect();

                if cli.json {
                    return print_json(&curves);
                }

                print!("{:>5}", "month");
                for p in &presets {
                    print!(" {:>16}", p.name());
                }
                println!();
                for month in 0..=months {
                    print!("{:>5}", month);
                    for curve in &curves {
                        print!(" {:>15.1}%", curve.retention_at(month as i64) * 100.0);
                    }
                    println!();
                }
                Ok(())
            }

            Command::Allocation {
                price,
                emission,
                samples,
            } => {
                let price = price.unwrap_or(params.token_price);
                let emission =
                    emission.unwrap_or_else(|| params.vesting_schedule().rewards_emission_at(1) as f64);
                let config = &params.allocation;

                // Log-spaced user counts from initial to 10x target
                let low = (config.initial_users.max(1) as f64).ln();
                let high = (config.target_users.max(1) as f64 * 10.0).ln();
                let steps = samples.max(2);
                let rows: Vec<_> = (0..steps)
                    .map(|i| {
                        let users = (low + (high - low) * i as f64 / (steps - 1) as f64).exp().round() as u64;
                        (users, calculate_dynamic_allocation(users, price, emission, config))
                    })
                    .collect();

                if cli.json {
                    return print_json(&rows);
                }

                println!("{:>12} {:>8} {:>10} {:>14} {:>10} {:>7}",
                    "users", "growth", "alloc", "per-user tok", "per-user $", "bound");
                for (users, r) in &rows {
                    let bound = if r.allocation_capped {
                        "cap"
                    } else if r.floor_applied {
                        "floor"
                    } else {
                        ""
                    };
                    println!("{:>12} {:>8.3} {:>9.1}% {:>14.2} {:>10.3} {:>7}",
                        users, r.growth_factor, r.allocation_percent * 100.0,
                        r.per_user_monthly_tokens, r.per_user_monthly_usd, bound);
                }
                Ok(())
            }
        }
    }

    fn print_projection(result: &ProgressionResult) {
        println!("{:>5} {:>9} {:>9} {:>12} {:>12} {:>12} {:>8} {:>14}",
            "month", "new", "active", "revenue", "costs", "profit", "alloc", "circulating");
        for m in &result.months {
            println!("{:>5} {:>9} {:>9} {:>12.0} {:>12.0} {:>12.0} {:>7.1}% {:>14.0}",
                m.month, m.new_users, m.active_users, m.revenue, m.costs, m.profit,
                m.allocation_percent * 100.0, m.circulating_supply);
        }

        let s = &result.summary;
        println!();
        println!("Total revenue:        ${:.0}", s.total_revenue);
        println!("Total profit:         ${:.0}", s.total_profit);
        println!("Final / peak users:   {} / {}", s.final_active_users, s.peak_active_users);
        println!("Total acquired:       {}", s.total_acquired);
        match s.months_to_profitability {
            Some(month) => println!("First profitable:     month {month}"),
            None => println!("First profitable:     not within horizon"),
        }
        match s.break_even_month {
            Some(month) => println!("Break-even:           month {month}"),
            None => println!("Break-even:           not within horizon"),
        }
        println!("User CAGR:            {:.1}%", s.user_cagr * 100.0);
        println!("Revenue CAGR:         {:.1}%", s.revenue_cagr * 100.0);
        println!("Average LTV:CAC:      {:.2}", s.average_ltv_to_cac);
        println!("Emitted / recaptured: {:.0} / {:.0}", s.cumulative_emission, s.cumulative_recaptured);
        println!("Treasury:             ${:.0}", s.final_treasury_balance);
    }

    fn print_monte_carlo(result: &MonteCarloResult) {
        println!("Monte Carlo: {} iterations, seed {}, ranked by {:?}",
            result.iterations, result.seed, result.ranking);
        println!();
        println!("{:<10} {:>12} {:>12} {:>10} {:>10} {:>10}",
            "scenario", "revenue", "profit", "users", "price", "recapture");
        for (label, outcome) in [
            ("P5", &result.percentiles.p5),
            ("P50", &result.percentiles.p50),
            ("P95", &result.percentiles.p95),
        ] {
            let r = &outcome.result;
            println!("{:<10} {:>12.0} {:>12.0} {:>10} {:>10.4} {:>9.1}%",
                label, r.revenue, r.profit, outcome.active_users, r.token_price,
                r.recapture_rate * 100.0);
        }

        println!();
        println!("{:<16} {:>12} {:>12}", "", "mean", "std dev");
        for (label, stats) in [
            ("revenue", &result.statistics.revenue),
            ("profit", &result.statistics.profit),
            ("recapture rate", &result.statistics.recapture_rate),
        ] {
            println!("{:<16} {:>12.2} {:>12.2}", label, stats.mean, stats.std_dev);
        }
        println!();
        println!("Sampled {} outcomes for distribution display", result.sample.len());
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbose);
    cli::run(cli)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with:");
    eprintln!("  cargo build -p bth-tokenomics --features cli --bin tokenomics-sim");
}
