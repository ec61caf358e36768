//! One bar of simulation.

use super::core::Simulator;
use super::results::{EngineError, StepReport};
use crate::account::Account;
use crate::data::{FundingRate, Ohlcv};
use crate::signal::Signal;
use crate::types::Timeframe;
use tracing::debug;

impl Simulator {
    /// Step the account through one bar.
    ///
    /// Order is fixed: settle `funding` (the caller only passes a record
    /// stamped with this bar's open time), refresh every position at the
    /// close with the post-funding balance, liquidate at the close, then ask
    /// the signal source for an entry. An entry is a taker buy at the close,
    /// stamped with the bar's close time.
    pub fn simulate_step(
        &mut self,
        account: &mut Account,
        bar: &Ohlcv,
        funding: Option<&FundingRate>,
        timeframe: Timeframe,
    ) -> Result<StepReport, EngineError> {
        self.current_time = bar.ts;
        let market_price = bar.close;

        let funding = match funding {
            Some(record) => self.settle_funding(account, record)?,
            None => None,
        };

        self.refresh_positions(account, market_price)?;

        let liquidations = self.check_liquidations(account, market_price)?;

        let opened = match self.signal.evaluate(bar, account) {
            Signal::Flat => None,
            Signal::Long { quantity } => {
                let close_ts = bar.ts.plus(timeframe);
                self.enter_long(account, &bar.symbol, close_ts, quantity, market_price)?
            }
        };

        debug!(
            ts = %bar.ts,
            close = %market_price,
            balance = %account.balance,
            positions = account.positions.len(),
            liquidated = liquidations.len(),
            "step done"
        );

        Ok(StepReport {
            bar_ts: bar.ts,
            funding,
            liquidations,
            opened,
        })
    }
}
