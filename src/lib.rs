// perp-sim: perpetual futures account simulator.
// steps one cross-margin account through historical bars and records a snapshot per bar.
// all money math is exact decimal; the engine itself does no I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Symbol, Side, Price, Quote, Leverage, Timestamp, Timeframe
//   2.x  trade.rs: fills and taker fees
//   3.x  margin.rs: IM/MM, effective leverage, liquidation price, pnl
//   4.x  position.rs: position struct and derived metrics
//   5.x  funding.rs: funding cost settlement
//   6.x  signal.rs: entry signal sources
//   6.1  opening.rs: margin-checked position entry
//   6.2  liquidation.rs: liquidation at market price
//   7.x  data.rs: bars, funding rates, data sources, resampling
//   7.3  feed.rs: funding/bar timestamp alignment
//   8.x  engine/: simulator: step, run, events
//   10.x account.rs: account + snapshots
//   11.x events.rs: state transition events for audit
//   12.x market.rs: per-symbol market parameters
//   13.x simulation.rs: run result and JSON output

// core simulation modules
pub mod account;
pub mod engine;
pub mod events;
pub mod funding;
pub mod liquidation;
pub mod margin;
pub mod market;
pub mod opening;
pub mod position;
pub mod trade;
pub mod types;

// data and integration modules
pub mod data;
pub mod feed;
pub mod signal;
pub mod simulation;

// re exports for convenience
pub use account::*;
pub use engine::*;
pub use events::*;
pub use funding::*;
pub use liquidation::*;
pub use margin::*;
pub use market::*;
pub use opening::*;
pub use position::*;
pub use trade::*;
pub use types::*;
pub use data::{DataError, FundingRate, HistoricalDataSource, JsonLinesDataSource, MemoryDataSource, Ohlcv};
pub use feed::FundingFeed;
pub use signal::{NoSignal, ScriptedSignals, Signal, SignalSource};
pub use simulation::{Simulation, SimulationError, SimulationSpec};
