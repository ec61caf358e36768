//! Market parameters.
//!
//! Per-symbol exchange parameters the margin math depends on: the fixed
//! leverage used for initial margin, the maintenance margin rate, the taker
//! fee and the funding interval. Held in a registry handed to the
//! calculator.

use crate::types::{Leverage, Symbol, Timeframe};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static parameters for one perpetual market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub symbol: Symbol,
    /// Leverage used for initial margin (notional / leverage)
    pub max_leverage: Leverage,
    /// Fraction of notional required to keep a position open
    pub maintenance_margin_rate: Decimal,
    /// Fee charged on taker fills, as a fraction of notional
    pub taker_fee_rate: Decimal,
    /// How often the exchange settles funding
    pub funding_interval: Timeframe,
}

impl MarketParams {
    /// Binance USDT-margined BTC perpetual, first leverage bracket
    pub fn binance_btc_usdt() -> Self {
        Self {
            symbol: Symbol::btc_usdt(),
            max_leverage: Leverage::new_unchecked(dec!(125)),
            maintenance_margin_rate: dec!(0.004),
            taker_fee_rate: dec!(0.0005),
            funding_interval: Timeframe::EightHours,
        }
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.max_leverage.value() < Decimal::ONE {
            return Err(MarketError::InvalidParams {
                symbol: self.symbol.clone(),
                reason: format!("leverage {} below 1x", self.max_leverage.value()),
            });
        }
        if self.maintenance_margin_rate < Decimal::ZERO || self.maintenance_margin_rate >= Decimal::ONE {
            return Err(MarketError::InvalidParams {
                symbol: self.symbol.clone(),
                reason: format!("maintenance margin rate {} outside [0, 1)", self.maintenance_margin_rate),
            });
        }
        if self.taker_fee_rate < Decimal::ZERO {
            return Err(MarketError::InvalidParams {
                symbol: self.symbol.clone(),
                reason: format!("negative taker fee {}", self.taker_fee_rate),
            });
        }
        Ok(())
    }
}

/// Symbol -> parameters lookup passed into the margin calculator.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: HashMap<Symbol, MarketParams>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markets the simulator ships with
    pub fn binance_futures() -> Self {
        let mut registry = Self::new();
        registry.insert(MarketParams::binance_btc_usdt());
        registry
    }

    /// Load a registry from a JSON list of market parameters
    pub fn from_json(json: &str) -> Result<Self, MarketError> {
        let markets: Vec<MarketParams> =
            serde_json::from_str(json).map_err(|e| MarketError::Parse(e.to_string()))?;

        let mut registry = Self::new();
        for params in markets {
            params.validate()?;
            registry.insert(params);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, params: MarketParams) {
        self.markets.insert(params.symbol.clone(), params);
    }

    pub fn get(&self, symbol: &Symbol) -> Result<&MarketParams, MarketError> {
        self.markets
            .get(symbol)
            .ok_or_else(|| MarketError::UnknownMarket(symbol.clone()))
    }

    pub fn leverage(&self, symbol: &Symbol) -> Result<Leverage, MarketError> {
        self.get(symbol).map(|m| m.max_leverage)
    }

    pub fn maintenance_margin_rate(&self, symbol: &Symbol) -> Result<Decimal, MarketError> {
        self.get(symbol).map(|m| m.maintenance_margin_rate)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.markets.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("Unknown market: {0}")]
    UnknownMarket(Symbol),

    #[error("Invalid parameters for {symbol}: {reason}")]
    InvalidParams { symbol: Symbol, reason: String },

    #[error("Failed to parse market parameters: {0}")]
    Parse(String),
}
