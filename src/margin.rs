//! Margin calculation for a single position.
//!
//! Initial margin (IM) is notional divided by the market's leverage.
//! Maintenance margin (MM) is notional times the market's maintenance rate.
//! The liquidation price is the price at which the account's balance, less
//! the maintenance margin, has been fully eaten by the position's loss.
//!
//! Only the long-side formulas are defined. Short positions are refused
//! with [`MarginError::UnsupportedSide`] rather than priced with a guess.

use crate::market::MarketRegistry;
use crate::position::Position;
use crate::types::{Leverage, Price, Quote, Side, Symbol};
use rust_decimal::Decimal;
use tracing::debug;

pub fn notional_value(position: &Position) -> Result<Quote, MarginError> {
    position.notional_value().ok_or(MarginError::Overflow("notional"))
}

pub fn initial_margin(position: &Position, leverage: Leverage) -> Result<Quote, MarginError> {
    notional_value(position)?
        .value()
        .checked_mul(leverage.initial_margin_fraction())
        .map(Quote::new)
        .ok_or(MarginError::Overflow("initial margin"))
}

pub fn maintenance_margin(position: &Position, maintenance_margin_rate: Decimal) -> Result<Quote, MarginError> {
    notional_value(position)?
        .value()
        .checked_mul(maintenance_margin_rate)
        .map(Quote::new)
        .ok_or(MarginError::Overflow("maintenance margin"))
}

/// Notional over account balance. A zero balance has no defined leverage.
pub fn effective_leverage(position: &Position, balance: Quote) -> Result<Decimal, MarginError> {
    if balance.is_zero() {
        return Err(MarginError::DivisionByZero("effective leverage with zero balance"));
    }
    notional_value(position)?
        .value()
        .checked_div(balance.value())
        .ok_or(MarginError::Overflow("effective leverage"))
}

/// `avg_price - (balance - maintenance_margin) / quantity`
///
/// Needs the maintenance margin to be set first. The result may be zero or
/// negative when the balance covers far more than the position's notional.
pub fn liquidation_price(position: &Position, balance: Quote) -> Result<Decimal, MarginError> {
    if position.side == Side::Short {
        return Err(MarginError::UnsupportedSide(Side::Short));
    }
    let mm = position
        .maintenance_margin
        .ok_or(MarginError::MissingPrerequisite("maintenance margin"))?;
    if position.quantity.is_zero() {
        return Err(MarginError::DivisionByZero("liquidation price with zero quantity"));
    }

    let cushion = balance
        .value()
        .checked_sub(mm.value())
        .ok_or(MarginError::Overflow("liquidation price"))?;
    cushion
        .checked_div(position.quantity)
        .and_then(|per_unit| position.avg_price.value().checked_sub(per_unit))
        .ok_or(MarginError::Overflow("liquidation price"))
}

pub fn unrealized_pnl(position: &Position, market_price: Price) -> Result<Quote, MarginError> {
    if position.side == Side::Short {
        return Err(MarginError::UnsupportedSide(Side::Short));
    }
    market_price
        .value()
        .checked_sub(position.entry_price.value())
        .and_then(|move_| move_.checked_mul(position.quantity))
        .map(Quote::new)
        .ok_or(MarginError::Overflow("unrealized pnl"))
}

/// Writes the derived margin fields of a position, looking market
/// parameters up by the position's symbol.
#[derive(Debug, Clone, Copy)]
pub struct MarginCalculator<'a> {
    markets: &'a MarketRegistry,
}

impl<'a> MarginCalculator<'a> {
    pub fn new(markets: &'a MarketRegistry) -> Self {
        Self { markets }
    }

    pub fn update_unrealized_pnl(&self, position: &mut Position, market_price: Price) -> Result<(), MarginError> {
        position.unrealized_pnl = Some(unrealized_pnl(position, market_price)?);
        Ok(())
    }

    pub fn update_initial_margin(&self, position: &mut Position) -> Result<(), MarginError> {
        let leverage = self
            .markets
            .leverage(&position.symbol)
            .map_err(|_| MarginError::UnknownMarket(position.symbol.clone()))?;
        position.initial_margin = Some(initial_margin(position, leverage)?);
        Ok(())
    }

    pub fn update_maintenance_margin(&self, position: &mut Position) -> Result<(), MarginError> {
        let rate = self
            .markets
            .maintenance_margin_rate(&position.symbol)
            .map_err(|_| MarginError::UnknownMarket(position.symbol.clone()))?;
        position.maintenance_margin = Some(maintenance_margin(position, rate)?);
        Ok(())
    }

    pub fn update_effective_leverage(&self, position: &mut Position, balance: Quote) -> Result<(), MarginError> {
        position.effective_leverage = Some(effective_leverage(position, balance)?);
        Ok(())
    }

    pub fn update_liquidation_price(&self, position: &mut Position, balance: Quote) -> Result<(), MarginError> {
        position.liquidation_price = Some(liquidation_price(position, balance)?);
        Ok(())
    }

    // 4.1: fixed order. liquidation price reads the maintenance margin written just before it
    pub fn refresh(&self, position: &mut Position, balance: Quote, market_price: Price) -> Result<(), MarginError> {
        self.update_unrealized_pnl(position, market_price)?;
        self.update_initial_margin(position)?;
        self.update_maintenance_margin(position)?;
        self.update_effective_leverage(position, balance)?;
        self.update_liquidation_price(position, balance)?;

        debug!(
            symbol = %position.symbol,
            price = %market_price,
            pnl = ?position.unrealized_pnl.map(|q| q.value()),
            liquidation_price = ?position.liquidation_price,
            "position refreshed"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarginError {
    #[error("Unknown market: {0}")]
    UnknownMarket(Symbol),

    #[error("Missing prerequisite: {0} must be computed first")]
    MissingPrerequisite(&'static str),

    #[error("Division by zero: {0}")]
    DivisionByZero(&'static str),

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Unsupported position side: {0}")]
    UnsupportedSide(Side),
}
