// Copyright (c) 2024 Botho Foundation

//! Agent-based alternative to the cohort projection.
//!
//! A population of creators, consumers and speculators joins, churns by the
//! same retention curve, earns the same dynamic reward allocation and pays
//! the same platform fees as in the cohort model. Where the cohort model
//! tracks aggregate counts, this tracks individual holdings, so it can report
//! wealth concentration and who pays the fees.

mod agent;
pub mod agents;
mod metrics;
mod runner;
mod state;

pub use agent::{Action, Agent, AgentId, AgentKind, Holdings};
pub use agents::{ConsumerAgent, CreatorAgent, SpeculatorAgent};
pub use metrics::{AgentMonthSummary, MetricsSummary, SimulationMetrics};
pub use runner::{
    run_agent_batch, run_agent_simulation, AgentBatchResult, AgentSimulationConfig,
    AgentSimulationResult, CREATOR_FEE_SHARE,
};
pub use state::SimulationState;
