//! Account and snapshot state.
//!
//! A single cross-margin account: one balance backs every open position.
//! The account owns its positions in a flat vector and is the only place
//! they are mutated. Snapshots are deep copies taken at the end of a bar.

use crate::position::Position;
use crate::types::{Quote, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Quote,
    pub positions: Vec<Position>,
}

impl Account {
    pub fn new(balance: Quote) -> Self {
        Self {
            balance,
            positions: Vec::new(),
        }
    }

    pub fn with_positions(balance: Quote, positions: Vec<Position>) -> Self {
        Self { balance, positions }
    }

    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    pub fn update_balance(&mut self, amount: Quote) {
        self.balance = self.balance.add(amount);
    }

    // returns the arena index of the new position
    pub fn add_position(&mut self, position: Position) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    pub fn total_unrealized_pnl(&self) -> Quote {
        self.positions.iter().filter_map(|p| p.unrealized_pnl).sum()
    }

    // balance plus paper gains. reporting only, the engine never margins on it
    pub fn equity(&self) -> Quote {
        self.balance.add(self.total_unrealized_pnl())
    }
}

// 10.1: point in time copy of the account, stamped with the close time of the bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub ts: Timestamp,
    pub account: Account,
}

impl AccountSnapshot {
    pub fn capture(account: &Account, ts: Timestamp) -> Self {
        Self {
            ts,
            account: account.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Quote, available: Quote },
}
