// 7.3: funding alignment. bars drive the clock; the funding stream is walked alongside it
// and a record applies only to the bar whose open time equals the record's ts.

use crate::data::FundingRate;
use crate::types::Timestamp;
use std::iter::Peekable;
use tracing::{debug, warn};

pub struct FundingFeed<I: Iterator<Item = FundingRate>> {
    records: Peekable<I>,
    last_seen: Option<FundingRate>,
    exhausted: bool,
}

impl<I: Iterator<Item = FundingRate>> FundingFeed<I> {
    pub fn new(records: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            records: records.into_iter().peekable(),
            last_seen: None,
            exhausted: false,
        }
    }

    /// Record for the bar opening at `ts`, if there is one.
    ///
    /// Records older than `ts` are dropped. A matching record is consumed, so
    /// it is returned at most once. Once the stream runs dry the last record
    /// seen is held and nothing matches again.
    pub fn rate_for(&mut self, ts: Timestamp) -> Option<FundingRate> {
        loop {
            let Some(next) = self.records.peek() else {
                if !self.exhausted {
                    self.exhausted = true;
                    warn!(last = ?self.last_seen.as_ref().map(|r| r.ts), "funding rates exhausted, holding last record");
                }
                return None;
            };

            if next.ts > ts {
                return None;
            }

            let record = self.records.next()?;
            self.last_seen = Some(record.clone());
            if record.ts == ts {
                return Some(record);
            }
            debug!(funding_ts = %record.ts, bar_ts = %ts, "skipping stale funding record");
        }
    }

    pub fn last_seen(&self) -> Option<&FundingRate> {
        self.last_seen.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
