// Copyright (c) 2024 Botho Foundation

//! Agent implementations for the population simulation.

mod consumer;
mod creator;
mod speculator;

pub use consumer::ConsumerAgent;
pub use creator::CreatorAgent;
pub use speculator::SpeculatorAgent;
