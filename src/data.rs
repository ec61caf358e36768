//! Historical market data.
//!
//! Bars and funding rates come from a [`HistoricalDataSource`]. Both streams
//! are ordered by ascending timestamp. Two sources ship with the crate: an
//! in-memory one for tests and embedding, and a JSON-lines one that reads a
//! directory of per-symbol files named `{symbol}-{timeframe}-{kind}.jsonl`.
//!
//! Funding files use the bar layout with the rate in the `open` column. A
//! null `open` is a funding row without a rate.

use crate::types::{Price, Symbol, Timeframe, Timestamp};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One price bar. `ts` is the bar's open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub ts: Timestamp,
    pub symbol: Symbol,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Decimal,
}

impl Ohlcv {
    pub fn new(
        ts: Timestamp,
        symbol: Symbol,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Decimal,
    ) -> Self {
        Self {
            ts,
            symbol,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Funding rate published at `ts`. `rate` is `None` for rows without a rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub ts: Timestamp,
    pub symbol: Symbol,
    pub rate: Option<Decimal>,
}

impl FundingRate {
    pub fn new(ts: Timestamp, symbol: Symbol, rate: Option<Decimal>) -> Self {
        Self { ts, symbol, rate }
    }
}

pub type OhlcvStream<'a> = Box<dyn Iterator<Item = Ohlcv> + 'a>;
pub type FundingStream<'a> = Box<dyn Iterator<Item = FundingRate> + 'a>;

pub trait HistoricalDataSource {
    /// Bars for `symbol` from `start`, aggregated to `timeframe`
    fn ohlcv(&self, symbol: &Symbol, start: Timestamp, timeframe: Timeframe) -> Result<OhlcvStream<'_>, DataError>;

    /// Funding rates for `symbol` from `start`
    fn funding_rates(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        timeframe: Timeframe,
    ) -> Result<FundingStream<'_>, DataError>;
}

/// Drop bars before `start`. `start` itself must be one of the bars.
pub fn since(bars: Vec<Ohlcv>, start: Timestamp) -> Result<Vec<Ohlcv>, DataError> {
    if !bars.iter().any(|b| b.ts == start) {
        return Err(DataError::StartNotFound {
            start,
            first: bars.first().map(|b| b.ts),
            last: bars.last().map(|b| b.ts),
        });
    }
    Ok(bars.into_iter().filter(|b| b.ts >= start).collect())
}

/// Aggregate an ordered bar stream into `timeframe` buckets.
///
/// Open is the first bar's open, high the max, low the min, close the last
/// bar's close, volume the sum. An empty bucket between two bars becomes a
/// flat bar at the previous close with zero volume, so the output advances
/// by exactly one timeframe per bar.
pub fn resample<I>(bars: I, timeframe: Timeframe) -> Resample<I::IntoIter>
where
    I: IntoIterator<Item = Ohlcv>,
{
    Resample {
        bars: bars.into_iter().peekable(),
        timeframe,
        previous: None,
    }
}

pub struct Resample<I: Iterator<Item = Ohlcv>> {
    bars: Peekable<I>,
    timeframe: Timeframe,
    // bucket and close of the last bar emitted
    previous: Option<(Timestamp, Price)>,
}

impl<I: Iterator<Item = Ohlcv>> Iterator for Resample<I> {
    type Item = Ohlcv;

    fn next(&mut self) -> Option<Ohlcv> {
        let timeframe = self.timeframe;
        let upcoming = self.bars.peek()?;

        if let Some((prev_bucket, prev_close)) = self.previous {
            let expected = prev_bucket.plus(timeframe);
            if timeframe.floor(upcoming.ts) > expected {
                let symbol = upcoming.symbol.clone();
                self.previous = Some((expected, prev_close));
                return Some(Ohlcv::new(
                    expected,
                    symbol,
                    prev_close,
                    prev_close,
                    prev_close,
                    prev_close,
                    Decimal::ZERO,
                ));
            }
        }

        let first = self.bars.next()?;
        let bucket = timeframe.floor(first.ts);

        let mut merged = Ohlcv { ts: bucket, ..first };
        while let Some(bar) = self.bars.next_if(|b| timeframe.floor(b.ts) == bucket) {
            merged.high = merged.high.max(bar.high);
            merged.low = merged.low.min(bar.low);
            merged.close = bar.close;
            merged.volume += bar.volume;
        }
        self.previous = Some((bucket, merged.close));
        Some(merged)
    }
}

// 7.1: in-memory source. bars are filtered by symbol and start, then resampled
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    bars: Vec<Ohlcv>,
    funding_rates: Vec<FundingRate>,
}

impl MemoryDataSource {
    pub fn new(bars: Vec<Ohlcv>, funding_rates: Vec<FundingRate>) -> Self {
        Self { bars, funding_rates }
    }
}

impl HistoricalDataSource for MemoryDataSource {
    fn ohlcv(&self, symbol: &Symbol, start: Timestamp, timeframe: Timeframe) -> Result<OhlcvStream<'_>, DataError> {
        let symbol = symbol.clone();
        let bars = self
            .bars
            .iter()
            .filter(move |b| b.symbol == symbol && b.ts >= start)
            .cloned();
        Ok(Box::new(resample(bars, timeframe)))
    }

    fn funding_rates(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        _timeframe: Timeframe,
    ) -> Result<FundingStream<'_>, DataError> {
        let symbol = symbol.clone();
        Ok(Box::new(
            self.funding_rates
                .iter()
                .filter(move |f| f.symbol == symbol && f.ts >= start)
                .cloned(),
        ))
    }
}

// 7.2: on-disk layout, one JSON object per line
#[derive(Debug, Deserialize)]
struct OhlcvRow {
    date: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct FundingRow {
    date: DateTime<Utc>,
    open: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Futures,
    FundingRate,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Futures => "futures",
            DataKind::FundingRate => "funding_rate",
        }
    }
}

/// Reads `{normalized symbol}-{timeframe}-{kind}.jsonl` files from a directory.
///
/// Bars come from the file of the requested timeframe, or from the 1m file
/// resampled when that one is missing. Funding rates always come from the
/// 8h file.
#[derive(Debug, Clone)]
pub struct JsonLinesDataSource {
    dir: PathBuf,
}

impl JsonLinesDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, symbol: &Symbol, timeframe: Timeframe, kind: DataKind) -> PathBuf {
        self.dir
            .join(format!("{}-{}-{}.jsonl", symbol.normalize(), timeframe, kind.as_str()))
    }

    fn ohlcv_path(&self, symbol: &Symbol, timeframe: Timeframe) -> PathBuf {
        let exact = self.path(symbol, timeframe, DataKind::Futures);
        if exact.exists() {
            return exact;
        }
        let minute = self.path(symbol, Timeframe::OneMinute, DataKind::Futures);
        if minute.exists() {
            debug!(path = %minute.display(), %timeframe, "resampling from 1m bars");
            return minute;
        }
        exact
    }

    fn load_ohlcv(&self, symbol: &Symbol, timeframe: Timeframe) -> Result<Vec<Ohlcv>, DataError> {
        let path = self.ohlcv_path(symbol, timeframe);
        let rows: Vec<(usize, OhlcvRow)> = read_json_lines(&path)?;

        let mut bars = Vec::with_capacity(rows.len());
        for (line, row) in rows {
            let price = |value: Decimal| {
                Price::new(value).ok_or_else(|| DataError::Parse {
                    path: path.clone(),
                    line,
                    message: format!("non-positive price {value}"),
                })
            };
            let bar = Ohlcv::new(
                Timestamp::from_datetime(row.date),
                symbol.clone(),
                price(row.open)?,
                price(row.high)?,
                price(row.low)?,
                price(row.close)?,
                row.volume,
            );
            check_order(&path, line, bars.last().map(|b: &Ohlcv| b.ts), bar.ts)?;
            bars.push(bar);
        }

        info!(path = %path.display(), bars = bars.len(), "loaded bars");
        Ok(bars)
    }

    fn load_funding_rates(&self, symbol: &Symbol) -> Result<Vec<FundingRate>, DataError> {
        let path = self.path(symbol, Timeframe::EightHours, DataKind::FundingRate);
        let rows: Vec<(usize, FundingRow)> = read_json_lines(&path)?;

        let mut rates = Vec::with_capacity(rows.len());
        for (line, row) in rows {
            let rate = FundingRate::new(Timestamp::from_datetime(row.date), symbol.clone(), row.open);
            check_order(&path, line, rates.last().map(|r: &FundingRate| r.ts), rate.ts)?;
            rates.push(rate);
        }

        info!(path = %path.display(), rates = rates.len(), "loaded funding rates");
        Ok(rates)
    }
}

impl HistoricalDataSource for JsonLinesDataSource {
    fn ohlcv(&self, symbol: &Symbol, start: Timestamp, timeframe: Timeframe) -> Result<OhlcvStream<'_>, DataError> {
        let bars = since(self.load_ohlcv(symbol, timeframe)?, start)?;
        Ok(Box::new(resample(bars, timeframe)))
    }

    fn funding_rates(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        _timeframe: Timeframe,
    ) -> Result<FundingStream<'_>, DataError> {
        let rates = self.load_funding_rates(symbol)?;
        Ok(Box::new(rates.into_iter().filter(move |r| r.ts >= start)))
    }
}

fn check_order(path: &Path, line: usize, previous: Option<Timestamp>, ts: Timestamp) -> Result<(), DataError> {
    match previous {
        Some(prev) if ts <= prev => Err(DataError::Parse {
            path: path.to_path_buf(),
            line,
            message: format!("timestamp {ts} not after {prev}"),
        }),
        _ => Ok(()),
    }
}

// blank lines are skipped; line numbers are 1-based
fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<(usize, T)>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|e| DataError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message: e.to_string(),
        })?;
        rows.push((line_no, row));
    }
    Ok(rows)
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Start {start} not in data (first: {first:?}, last: {last:?})")]
    StartNotFound {
        start: Timestamp,
        first: Option<Timestamp>,
        last: Option<Timestamp>,
    },
}
