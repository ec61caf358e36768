//! Simulation record.
//!
//! What a run produces: the parameters it was started with, wall-clock run
//! metadata and one account snapshot per bar, in bar order. Serializes to
//! JSON with decimals as strings so nothing is rounded on the way out.

use crate::account::AccountSnapshot;
use crate::types::{Symbol, Timeframe, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters a run is started with.
///
/// `end` is recorded on the result but does not stop the run. The bar
/// stream decides how many steps there are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSpec {
    pub start: Timestamp,
    pub end: Timestamp,
    pub timeframe: Timeframe,
    pub symbol: Symbol,
}

impl SimulationSpec {
    pub fn new(start: Timestamp, end: Timestamp, timeframe: Timeframe, symbol: Symbol) -> Self {
        Self {
            start,
            end,
            timeframe,
            symbol,
        }
    }

    /// `{start}_{end}_{timeframe}_{symbol}`, RFC 3339 times with `:` as `-`
    pub fn name(&self) -> String {
        let start = self.start.to_string().replace(':', "-");
        let end = self.end.to_string().replace(':', "-");
        format!("{}_{}_{}_{}", start, end, self.timeframe, self.symbol.normalize())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub name: String,
    pub simulation_start_ts: Timestamp,
    pub simulation_end_ts: Timestamp,
    pub timeframe: Timeframe,
    pub symbol: Symbol,
    pub run_start_ts: Option<Timestamp>,
    pub run_end_ts: Option<Timestamp>,
    pub account_snapshots: Vec<AccountSnapshot>,
}

impl Simulation {
    pub fn new(spec: &SimulationSpec) -> Self {
        Self {
            name: spec.name(),
            simulation_start_ts: spec.start,
            simulation_end_ts: spec.end,
            timeframe: spec.timeframe,
            symbol: spec.symbol.clone(),
            run_start_ts: None,
            run_end_ts: None,
            account_snapshots: Vec::new(),
        }
    }

    pub fn add_account_snapshot(&mut self, snapshot: AccountSnapshot) {
        self.account_snapshots.push(snapshot);
    }

    pub fn last_snapshot(&self) -> Option<&AccountSnapshot> {
        self.account_snapshots.last()
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SimulationError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| SimulationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
