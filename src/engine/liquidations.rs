//! Liquidation detection and execution.

use super::core::Simulator;
use super::results::EngineError;
use crate::account::Account;
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::liquidation::{liquidate_positions, Liquidation};
use crate::types::Price;

impl Simulator {
    /// Close every position whose liquidation price the market has reached.
    pub fn check_liquidations(
        &mut self,
        account: &mut Account,
        market_price: Price,
    ) -> Result<Vec<Liquidation>, EngineError> {
        let liquidations = liquidate_positions(account, market_price)?;

        for liq in &liquidations {
            self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
                symbol: liq.position.symbol.clone(),
                quantity: liq.position.quantity,
                market_price: liq.market_price,
                liquidation_price: liq.liquidation_price,
                realized_pnl: liq.realized_pnl,
                new_balance: liq.balance_after,
            }));
        }

        Ok(liquidations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatorConfig;
    use crate::position::Position;
    use crate::trade::Trade;
    use crate::types::{Quote, Symbol, Timestamp, TradeSide};
    use rust_decimal_macros::dec;

    fn account(balance: Quote) -> Account {
        let mut pos = Position::from_trade(Trade::new(
            Timestamp::from_millis(0),
            Symbol::btc_usdt(),
            TradeSide::Buy,
            dec!(0.01),
            Price::new_unchecked(dec!(50000)),
            Quote::new(dec!(0.25)),
        ));
        pos.maintenance_margin = Some(Quote::new(dec!(2)));
        Account::with_positions(balance, vec![pos])
    }

    #[test]
    fn liquidation_emits_event() {
        let mut sim = Simulator::new(SimulatorConfig::default());
        let mut account = account(Quote::new(dec!(4)));

        let closed = sim
            .check_liquidations(&mut account, Price::new_unchecked(dec!(49800)))
            .unwrap();

        assert_eq!(closed.len(), 1);
        assert_eq!(account.balance.value(), dec!(2));
        match &sim.events()[0].payload {
            EventPayload::PositionLiquidated(e) => {
                assert_eq!(e.liquidation_price, dec!(49800));
                assert_eq!(e.realized_pnl.value(), dec!(-2));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn healthy_account_emits_nothing() {
        let mut sim = Simulator::new(SimulatorConfig::default());
        let mut account = account(Quote::new(dec!(100)));

        let closed = sim
            .check_liquidations(&mut account, Price::new_unchecked(dec!(49800)))
            .unwrap();

        assert!(closed.is_empty());
        assert!(sim.events().is_empty());
    }
}
