// 4.0: open position tracking. one position per opening trade, no averaging in.
// the derived fields are only as fresh as the last margin refresh; see margin.rs.

use crate::trade::Trade;
use crate::types::{Price, Quote, Side, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub open_ts: Timestamp,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Price,
    // cost basis. equal to entry_price while averaging in is unsupported
    pub avg_price: Price,
    pub trade: Trade,

    // derived, recomputed every step
    pub unrealized_pnl: Option<Quote>,
    pub funding_rate_costs: Vec<Quote>,
    pub initial_margin: Option<Quote>,
    pub maintenance_margin: Option<Quote>,
    pub effective_leverage: Option<Decimal>,
    // can be zero or negative for a well collateralized long, so not a Price
    pub liquidation_price: Option<Decimal>,
}

impl Position {
    pub fn from_trade(trade: Trade) -> Self {
        Self {
            open_ts: trade.ts,
            symbol: trade.symbol.clone(),
            side: trade.side.position_side(),
            quantity: trade.quantity,
            entry_price: trade.price,
            avg_price: trade.price,
            trade,
            unrealized_pnl: None,
            funding_rate_costs: Vec::new(),
            initial_margin: None,
            maintenance_margin: None,
            effective_leverage: None,
            liquidation_price: None,
        }
    }

    // 4.1: quantity * cost basis. every margin figure starts here. None on overflow
    pub fn notional_value(&self) -> Option<Quote> {
        self.quantity.checked_mul(self.avg_price.value()).map(Quote::new)
    }

    pub fn add_funding_rate_cost(&mut self, cost: Quote) {
        self.funding_rate_costs.push(cost);
    }

    pub fn total_funding_cost(&self) -> Quote {
        self.funding_rate_costs.iter().sum()
    }
}
