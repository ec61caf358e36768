// 8.0: simulation engine. steps one account through historical bars: funding settlement,
// position refresh, liquidation checks, entries, snapshots.
// deterministic and synchronous; data arrives through iterators, nothing here does I/O.

mod config;
mod core;
mod funding;
mod liquidations;
mod positions;
mod results;
mod runner;
mod step;

pub use config::SimulatorConfig;
pub use core::Simulator;
pub use results::{EngineError, StepReport};
