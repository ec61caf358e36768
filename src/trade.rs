// 2.0: a fill. immutable once recorded; a position keeps the trade that opened it for audit.

use crate::types::{Price, Quote, Symbol, Timestamp, TradeSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ts: Timestamp,
    pub symbol: Symbol,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Price,
    pub fee: Quote,
}

impl Trade {
    pub fn new(
        ts: Timestamp,
        symbol: Symbol,
        side: TradeSide,
        quantity: Decimal,
        price: Price,
        fee: Quote,
    ) -> Self {
        Self {
            ts,
            symbol,
            side,
            quantity,
            price,
            fee,
        }
    }

    pub fn notional_value(&self) -> Quote {
        Quote::new(self.quantity * self.price.value())
    }
}

// 2.1: taker fee is charged on the fill notional
pub fn taker_fee(quantity: Decimal, price: Price, fee_rate: Decimal) -> Quote {
    Quote::new(quantity * price.value() * fee_rate)
}
