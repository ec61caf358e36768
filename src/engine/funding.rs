//! Funding rate settlement.

use super::core::Simulator;
use super::results::EngineError;
use crate::account::Account;
use crate::data::FundingRate;
use crate::events::{EventPayload, FundingSettledEvent};
use crate::funding::{settle_funding, FundingSettlement};
use tracing::debug;

impl Simulator {
    /// Settle a funding record against the account. Rows without a rate
    /// and accounts without positions settle nothing.
    pub fn settle_funding(
        &mut self,
        account: &mut Account,
        record: &FundingRate,
    ) -> Result<Option<FundingSettlement>, EngineError> {
        let Some(rate) = record.rate else {
            return Ok(None);
        };
        if !account.has_positions() {
            return Ok(None);
        }
        let settlement = settle_funding(account, rate)?;

        debug!(
            ts = %record.ts,
            rate = %rate,
            cost = %settlement.total_cost,
            balance = %account.balance,
            "funding settled"
        );

        self.emit_event(EventPayload::FundingSettled(FundingSettledEvent {
            funding_rate: rate,
            total_cost: settlement.total_cost,
            positions_settled: settlement.positions_settled,
            new_balance: account.balance,
        }));

        Ok(Some(settlement))
    }
}
