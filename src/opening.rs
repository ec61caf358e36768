//! Opening positions against an account.
//!
//! Only buys open positions. The margin check runs before anything is
//! written, so a rejected open leaves the account exactly as it was. On
//! success the fee is debited first and every derived metric is computed
//! against the post-fee balance.

use crate::account::{Account, AccountError};
use crate::margin::{MarginCalculator, MarginError};
use crate::market::{MarketParams, MarketRegistry};
use crate::position::Position;
use crate::trade::{taker_fee, Trade};
use crate::types::{Leverage, Price, Quote, Symbol, Timestamp, TradeSide};
use rust_decimal::Decimal;
use tracing::debug;

/// Prices a taker buy at `price` with the market's fee rate.
pub fn build_entry_trade(
    symbol: Symbol,
    ts: Timestamp,
    quantity: Decimal,
    price: Price,
    params: &MarketParams,
) -> Trade {
    let fee = taker_fee(quantity, price, params.taker_fee_rate);
    Trade::new(ts, symbol, TradeSide::Buy, quantity, price, fee)
}

/// Account holding one long already sized at `leverage` times its balance.
///
/// The position is attached as is: no margin check, no fee debit and no
/// metrics. The first step fills the metrics in.
pub fn starting_account(
    balance: Quote,
    leverage: Leverage,
    entry_price: Price,
    ts: Timestamp,
    params: &MarketParams,
) -> Account {
    let notional = balance.value() * leverage.value();
    let quantity = notional / entry_price.value();
    let fee = Quote::new(notional * params.taker_fee_rate);
    let trade = Trade::new(ts, params.symbol.clone(), TradeSide::Buy, quantity, entry_price, fee);

    Account::with_positions(balance, vec![Position::from_trade(trade)])
}

/// Open a position from `trade`, returning its index in the account.
pub fn open_position(
    account: &mut Account,
    trade: Trade,
    markets: &MarketRegistry,
) -> Result<usize, OpenError> {
    if trade.side != TradeSide::Buy {
        return Err(OpenError::Unsupported(trade.side));
    }

    let calc = MarginCalculator::new(markets);
    let fee = trade.fee;
    let mut position = Position::from_trade(trade);

    calc.update_initial_margin(&mut position)?;
    let required = position
        .initial_margin
        .ok_or(MarginError::MissingPrerequisite("initial margin"))?
        .add(fee);

    if account.balance < required {
        return Err(AccountError::InsufficientBalance {
            required,
            available: account.balance,
        }
        .into());
    }

    account.update_balance(fee.negate());

    position.unrealized_pnl = Some(Quote::zero());
    calc.update_maintenance_margin(&mut position)?;
    calc.update_effective_leverage(&mut position, account.balance)?;
    calc.update_liquidation_price(&mut position, account.balance)?;

    debug!(
        symbol = %position.symbol,
        quantity = %position.quantity,
        entry_price = %position.entry_price,
        fee = %fee,
        balance = %account.balance,
        "position opened"
    );

    Ok(account.add_position(position))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpenError {
    #[error("Opening a {0} position is not supported")]
    Unsupported(TradeSide),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Margin error: {0}")]
    Margin(#[from] MarginError),
}

impl OpenError {
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, OpenError::Account(AccountError::InsufficientBalance { .. }))
    }
}
