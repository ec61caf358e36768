// 6.0: entry signals. the step asks the signal source once per bar, after liquidations,
// whether to open a new position at the bar's close.

use crate::account::Account;
use crate::data::Ohlcv;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Flat,
    // buy this many units of base at the bar close
    Long { quantity: Decimal },
}

pub trait SignalSource {
    fn evaluate(&mut self, bar: &Ohlcv, account: &Account) -> Signal;
}

// default source: never trades, the run only manages what the account starts with
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignal;

impl SignalSource for NoSignal {
    fn evaluate(&mut self, _bar: &Ohlcv, _account: &Account) -> Signal {
        Signal::Flat
    }
}

// 6.1: replays a fixed list, one entry per bar, flat once the list runs out
#[derive(Debug, Clone, Default)]
pub struct ScriptedSignals {
    signals: std::collections::VecDeque<Signal>,
}

impl ScriptedSignals {
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }
}

impl SignalSource for ScriptedSignals {
    fn evaluate(&mut self, _bar: &Ohlcv, _account: &Account) -> Signal {
        self.signals.pop_front().unwrap_or(Signal::Flat)
    }
}
