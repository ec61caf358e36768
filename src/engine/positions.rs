//! Position metric refresh and entries.

use super::core::Simulator;
use super::results::EngineError;
use crate::account::Account;
use crate::events::{EventPayload, OpenRejectedEvent, PositionOpenedEvent};
use crate::margin::MarginCalculator;
use crate::opening::{build_entry_trade, open_position};
use crate::trade::Trade;
use crate::types::{Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use tracing::warn;

impl Simulator {
    /// Recompute every position's metrics at `market_price` against the
    /// account's current balance.
    pub fn refresh_positions(&self, account: &mut Account, market_price: Price) -> Result<(), EngineError> {
        let calc = MarginCalculator::new(&self.config.markets);
        let balance = account.balance;

        for position in account.positions.iter_mut() {
            calc.refresh(position, balance, market_price)?;
        }
        Ok(())
    }

    /// Buy `quantity` at `price` as a taker.
    pub fn enter_long(
        &mut self,
        account: &mut Account,
        symbol: &Symbol,
        ts: Timestamp,
        quantity: Decimal,
        price: Price,
    ) -> Result<Option<usize>, EngineError> {
        let params = self.config.markets.get(symbol)?;
        let trade = build_entry_trade(symbol.clone(), ts, quantity, price, params);
        self.open_position(account, trade)
    }

    /// Open a position from a trade.
    ///
    /// Returns `Ok(None)` when the account cannot cover margin and fee. The
    /// rejection is logged and recorded; the account is unchanged.
    pub fn open_position(&mut self, account: &mut Account, trade: Trade) -> Result<Option<usize>, EngineError> {
        let symbol = trade.symbol.clone();
        let quantity = trade.quantity;
        let price = trade.price;

        match open_position(account, trade, &self.config.markets) {
            Ok(index) => {
                let pos = &account.positions[index];
                let payload = EventPayload::PositionOpened(PositionOpenedEvent {
                    symbol: pos.symbol.clone(),
                    side: pos.side,
                    quantity: pos.quantity,
                    entry_price: pos.entry_price,
                    fee: pos.trade.fee,
                    initial_margin: pos.initial_margin,
                    liquidation_price: pos.liquidation_price,
                });
                self.emit_event(payload);
                Ok(Some(index))
            }
            Err(e) if e.is_insufficient_balance() => {
                warn!(%symbol, %quantity, %price, error = %e, "entry rejected");
                self.emit_event(EventPayload::OpenRejected(OpenRejectedEvent {
                    symbol,
                    quantity,
                    price,
                    reason: e.to_string(),
                }));
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
