//! Full runs over a bar stream.

use super::core::Simulator;
use super::results::EngineError;
use crate::account::{Account, AccountSnapshot};
use crate::data::{FundingRate, HistoricalDataSource, Ohlcv};
use crate::events::{EventPayload, SnapshotTakenEvent};
use crate::feed::FundingFeed;
use crate::simulation::{Simulation, SimulationSpec};
use crate::types::Timestamp;
use tracing::{debug, info};

impl Simulator {
    /// Step `account` through every bar and snapshot it after each one.
    ///
    /// Funding records are matched to bars by exact timestamp through a
    /// [`FundingFeed`]. Each snapshot is stamped with the bar's close time.
    /// The run ends with the bar stream, whatever `spec.end` says.
    pub fn run<B, F>(
        &mut self,
        spec: &SimulationSpec,
        account: &mut Account,
        bars: B,
        funding_rates: F,
    ) -> Result<Simulation, EngineError>
    where
        B: IntoIterator<Item = Ohlcv>,
        F: IntoIterator<Item = FundingRate>,
    {
        let mut simulation = Simulation::new(spec);
        simulation.run_start_ts = Some(Timestamp::now());

        info!(
            name = %simulation.name,
            balance = %account.balance,
            positions = account.positions.len(),
            "simulation started"
        );

        let mut feed = FundingFeed::new(funding_rates);
        let mut last_bar_ts = None;

        for bar in bars {
            let funding = feed.rate_for(bar.ts);
            self.simulate_step(account, &bar, funding.as_ref(), spec.timeframe)?;

            let snapshot_ts = bar.ts.plus(spec.timeframe);
            simulation.add_account_snapshot(AccountSnapshot::capture(account, snapshot_ts));
            self.emit_event(EventPayload::SnapshotTaken(SnapshotTakenEvent {
                snapshot_ts,
                balance: account.balance,
                open_positions: account.positions.len(),
            }));
            last_bar_ts = Some(bar.ts);
        }

        // divergence between the two streams shows up here
        debug!(
            last_bar = ?last_bar_ts,
            last_funding = ?feed.last_seen().map(|r| r.ts),
            "last datapoints"
        );

        let run_end = Timestamp::now();
        simulation.run_end_ts = Some(run_end);

        info!(
            snapshots = simulation.account_snapshots.len(),
            balance = %account.balance,
            equity = %account.equity(),
            positions = account.positions.len(),
            elapsed_ms = simulation.run_start_ts.map(|s| s.elapsed_millis(&run_end)),
            "simulation completed"
        );

        Ok(simulation)
    }

    /// Load bars and funding rates for `spec` from `source`, then [`run`](Self::run).
    pub fn run_from_source(
        &mut self,
        source: &dyn HistoricalDataSource,
        spec: &SimulationSpec,
        account: &mut Account,
    ) -> Result<Simulation, EngineError> {
        info!(symbol = %spec.symbol, start = %spec.start, timeframe = %spec.timeframe, "loading market data");
        let bars = source.ohlcv(&spec.symbol, spec.start, spec.timeframe)?;
        let funding_rates = source.funding_rates(&spec.symbol, spec.start, spec.timeframe)?;
        self.run(spec, account, bars, funding_rates)
    }
}
