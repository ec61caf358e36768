//! Liquidation of under-margined positions.
//!
//! A position is liquidated when the market price is at or below its
//! liquidation price. The liquidation price is recomputed against the
//! account's balance at the moment each position is evaluated, so closing
//! one position changes the threshold seen by the positions after it.
//! Positions close in full at the market price. There is no penalty and no
//! insurance fund: the realized loss lands on the balance as is.

use crate::account::Account;
use crate::margin::{liquidation_price, unrealized_pnl, MarginError};
use crate::position::Position;
use crate::types::{Price, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Record of one forced close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liquidation {
    pub position: Position,
    pub market_price: Price,
    pub liquidation_price: Decimal,
    pub realized_pnl: Quote,
    pub balance_after: Quote,
}

pub fn is_liquidatable(market_price: Price, liquidation_price: Decimal) -> bool {
    market_price.value() <= liquidation_price
}

/// Walk the positions in account order and close every one whose
/// liquidation price has been reached.
pub fn liquidate_positions(
    account: &mut Account,
    market_price: Price,
) -> Result<Vec<Liquidation>, MarginError> {
    let mut liquidations = Vec::new();
    let mut index = 0;

    while index < account.positions.len() {
        let balance = account.balance;
        let position = &mut account.positions[index];

        let liq_price = liquidation_price(position, balance)?;
        position.liquidation_price = Some(liq_price);

        if !is_liquidatable(market_price, liq_price) {
            index += 1;
            continue;
        }

        let pnl = unrealized_pnl(position, market_price)?;
        position.unrealized_pnl = Some(pnl);

        // no increment: the next position shifts into this slot
        let closed = account.positions.remove(index);
        account.update_balance(pnl);

        info!(
            symbol = %closed.symbol,
            quantity = %closed.quantity,
            market_price = %market_price,
            liquidation_price = %liq_price,
            realized_pnl = %pnl,
            funding_paid = %closed.total_funding_cost(),
            balance = %account.balance,
            "position liquidated"
        );

        liquidations.push(Liquidation {
            position: closed,
            market_price,
            liquidation_price: liq_price,
            realized_pnl: pnl,
            balance_after: account.balance,
        });
    }

    Ok(liquidations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::Trade;
    use crate::types::{Side, Symbol, Timestamp, TradeSide};
    use rust_decimal_macros::dec;

    // 0.01 BTC @ 50000 with metrics as they stand on a 100 balance
    fn attached_position() -> Position {
        let mut pos = Position::from_trade(Trade::new(
            Timestamp::from_millis(0),
            Symbol::btc_usdt(),
            TradeSide::Buy,
            dec!(0.01),
            Price::new_unchecked(dec!(50000)),
            Quote::new(dec!(0.25)),
        ));
        pos.initial_margin = Some(Quote::new(dec!(4)));
        pos.maintenance_margin = Some(Quote::new(dec!(2)));
        pos.effective_leverage = Some(dec!(5));
        pos.liquidation_price = Some(dec!(40200));
        pos
    }

    fn price(value: Decimal) -> Price {
        Price::new_unchecked(value)
    }

    #[test]
    fn liquidate_at_liquidation_price() {
        let mut account = Account::with_positions(Quote::new(dec!(100)), vec![attached_position()]);

        let closed = liquidate_positions(&mut account, price(dec!(40200))).unwrap();

        // pnl = (40200 - 50000) * 0.01 = -98
        assert_eq!(account.balance.value(), dec!(2));
        assert!(!account.has_positions());
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].realized_pnl.value(), dec!(-98));
        assert_eq!(closed[0].balance_after.value(), dec!(2));
        assert_eq!(closed[0].position.unrealized_pnl, Some(Quote::new(dec!(-98))));
    }

    #[test]
    fn above_liquidation_price_is_untouched() {
        let mut account = Account::with_positions(Quote::new(dec!(100)), vec![attached_position()]);
        let before = account.clone();

        let closed = liquidate_positions(&mut account, price(dec!(100000))).unwrap();

        assert!(closed.is_empty());
        assert_eq!(account, before);
    }

    #[test]
    fn no_positions_is_noop() {
        let mut account = Account::new(Quote::new(dec!(100)));
        let closed = liquidate_positions(&mut account, price(dec!(1))).unwrap();

        assert!(closed.is_empty());
        assert_eq!(account.balance.value(), dec!(100));
    }

    #[test]
    fn adjacent_positions_are_both_evaluated() {
        let mut account = Account::with_positions(
            Quote::new(dec!(100)),
            vec![attached_position(), attached_position()],
        );

        // first: 50000 - (100 - 2) / 0.01 = 40200, closes at -200 -> balance -100
        // second: 50000 - (-100 - 2) / 0.01 = 60200, also closes at -200 -> balance -300
        let closed = liquidate_positions(&mut account, price(dec!(30000))).unwrap();

        assert_eq!(closed.len(), 2);
        assert!(!account.has_positions());
        assert_eq!(closed[1].liquidation_price, dec!(60200));
        assert_eq!(account.balance.value(), dec!(-300));
    }

    #[test]
    fn earlier_close_lowers_balance_for_later_positions() {
        // price between the two thresholds: only the cascade catches the second
        let mut small = attached_position();
        small.quantity = dec!(0.001);
        small.maintenance_margin = Some(Quote::new(dec!(0.2)));
        let mut account = Account::with_positions(
            Quote::new(dec!(100)),
            vec![attached_position(), small],
        );

        // first: 40200, closes at 40000 for -100 -> balance 0
        // second: 50000 - (0 - 0.2) / 0.001 = 50200 -> closes
        let closed = liquidate_positions(&mut account, price(dec!(40000))).unwrap();

        assert_eq!(closed.len(), 2);
        assert_eq!(closed[1].liquidation_price, dec!(50200));
    }

    #[test]
    fn liquidation_price_is_refreshed_on_survivors() {
        let mut pos = attached_position();
        pos.liquidation_price = None;
        let mut account = Account::with_positions(Quote::new(dec!(100)), vec![pos]);

        liquidate_positions(&mut account, price(dec!(50000))).unwrap();
        assert_eq!(account.positions[0].liquidation_price, Some(dec!(40200)));
    }

    #[test]
    fn short_position_is_refused() {
        let mut pos = attached_position();
        pos.side = Side::Short;
        let mut account = Account::with_positions(Quote::new(dec!(100)), vec![pos]);

        assert_eq!(
            liquidate_positions(&mut account, price(dec!(50000))),
            Err(MarginError::UnsupportedSide(Side::Short))
        );
    }

    #[test]
    fn missing_maintenance_margin_is_an_error() {
        let mut pos = attached_position();
        pos.maintenance_margin = None;
        let mut account = Account::with_positions(Quote::new(dec!(100)), vec![pos]);

        assert!(matches!(
            liquidate_positions(&mut account, price(dec!(50000))),
            Err(MarginError::MissingPrerequisite(_))
        ));
    }
}
