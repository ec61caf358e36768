//! Simulator configuration options.

use crate::market::MarketRegistry;

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Market parameters looked up by position symbol.
    pub markets: MarketRegistry,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl SimulatorConfig {
    pub fn new(markets: MarketRegistry) -> Self {
        Self {
            markets,
            ..Self::default()
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            markets: MarketRegistry::binance_futures(),
            max_events: 100_000,
        }
    }
}
