// 8.0.2: result types and errors for simulator operations.

use crate::account::AccountError;
use crate::data::DataError;
use crate::funding::FundingSettlement;
use crate::liquidation::Liquidation;
use crate::margin::MarginError;
use crate::market::MarketError;
use crate::opening::OpenError;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub bar_ts: Timestamp,
    pub funding: Option<FundingSettlement>,
    pub liquidations: Vec<Liquidation>,
    // arena index of a position opened this step
    pub opened: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Margin error: {0}")]
    Margin(#[from] MarginError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Open error: {0}")]
    Open(#[from] OpenError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl EngineError {
    // only a rejected entry leaves the run in a state worth continuing from
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Open(e) => e.is_insufficient_balance(),
            EngineError::Account(AccountError::InsufficientBalance { .. }) => true,
            _ => false,
        }
    }
}
