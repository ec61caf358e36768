// 5.0: funding settlement. at each funding time longs pay shorts when the rate is positive,
// shorts pay longs when it is negative. the cost is charged on the position's cost basis notional.
// 5.1 prices one position, 5.2 settles the whole account.

use crate::account::Account;
use crate::margin::MarginError;
use crate::position::Position;
use crate::types::{Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of one funding settlement against an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSettlement {
    pub rate: Decimal,
    // positive = paid by the account
    pub total_cost: Quote,
    pub positions_settled: usize,
}

// 5.1: positive cost is paid by the holder, negative is received
pub fn funding_cost(position: &Position, rate: Decimal) -> Result<Quote, MarginError> {
    let signed_rate = match position.side {
        Side::Long => rate,
        Side::Short => -rate,
    };
    position
        .notional_value()
        .and_then(|notional| notional.value().checked_mul(signed_rate))
        .map(Quote::new)
        .ok_or(MarginError::Overflow("funding cost"))
}

// 5.2: every open position is charged once. no guard against settling the same ts twice,
// the caller decides when a rate applies. all costs are priced before anything is written.
pub fn settle_funding(account: &mut Account, rate: Decimal) -> Result<FundingSettlement, MarginError> {
    let costs = account
        .positions
        .iter()
        .map(|position| funding_cost(position, rate))
        .collect::<Result<Vec<_>, _>>()?;

    let total_cost = costs
        .iter()
        .try_fold(Decimal::ZERO, |acc, cost| acc.checked_add(cost.value()))
        .map(Quote::new)
        .ok_or(MarginError::Overflow("funding total"))?;

    for (position, cost) in account.positions.iter_mut().zip(costs) {
        position.add_funding_rate_cost(cost);
    }
    account.update_balance(total_cost.negate());

    Ok(FundingSettlement {
        rate,
        total_cost,
        positions_settled: account.positions.len(),
    })
}
