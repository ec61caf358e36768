//! End-to-end simulation scenarios
//!
//! One leveraged long of 0.01 BTC @ 50000 held through five one-minute bars
//! whose close falls 0.1% per bar. Balances and metrics are checked exactly.

use perp_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ts(rfc3339: &str) -> Timestamp {
    Timestamp::from_datetime(rfc3339.parse().unwrap())
}

/// Five 1m bars from `start`, closes 49950, 49900.05, ... down 0.1% each
fn falling_bars(start: &str) -> Vec<Ohlcv> {
    let mut price = dec!(50000);
    let first = ts(start);
    (0..5)
        .map(|i| {
            price += dec!(-0.001) * price;
            let p = Price::new_unchecked(price);
            Ohlcv::new(
                first.plus_millis(i * 60_000),
                Symbol::btc_usdt(),
                p,
                p,
                p,
                p,
                dec!(1),
            )
        })
        .collect()
}

/// Position as the source fixtures attach it: metrics set for a 100 balance
fn attached_account(balance: Decimal) -> Account {
    let trade = Trade::new(
        ts("2024-01-22T07:49:00Z"),
        Symbol::btc_usdt(),
        TradeSide::Buy,
        dec!(0.01),
        Price::new_unchecked(dec!(50000)),
        Quote::new(dec!(0.25)),
    );
    let mut pos = Position::from_trade(trade);
    pos.initial_margin = Some(Quote::new(dec!(4)));
    pos.maintenance_margin = Some(Quote::new(dec!(2)));
    pos.effective_leverage = Some(Decimal::from(500) / balance);
    pos.liquidation_price = Some(dec!(50000) - (balance - dec!(2)) / dec!(0.01));
    Account::with_positions(Quote::new(balance), vec![pos])
}

fn spec(start: &str, end: &str) -> SimulationSpec {
    SimulationSpec::new(ts(start), ts(end), Timeframe::OneMinute, Symbol::btc_usdt())
}

fn run(account: &mut Account, start: &str, funding: Vec<FundingRate>) -> Simulation {
    let mut sim = Simulator::new(SimulatorConfig::default());
    sim.run(&spec(start, "2024-01-22T09:00:00Z"), account, falling_bars(start), funding)
        .unwrap()
}

const PNLS: [Decimal; 5] = [
    dec!(-0.5),
    dec!(-0.9995),
    dec!(-1.4985005),
    dec!(-1.9970019995),
    dec!(-2.4950049975005),
];

mod no_funding {
    use super::*;

    #[test]
    fn healthy_long_rides_out_the_decline() {
        let mut account = attached_account(dec!(100));
        let result = run(&mut account, "2024-01-22T07:50:00Z", Vec::new());

        assert_eq!(result.account_snapshots.len(), 5);
        for (i, snapshot) in result.account_snapshots.iter().enumerate() {
            assert_eq!(snapshot.ts, ts("2024-01-22T07:51:00Z").plus_millis(i as i64 * 60_000));
            assert_eq!(snapshot.account.balance.value(), dec!(100));

            let pos = &snapshot.account.positions[0];
            assert_eq!(pos.unrealized_pnl, Some(Quote::new(PNLS[i])));
            assert_eq!(pos.liquidation_price, Some(dec!(40200)));
            assert_eq!(pos.effective_leverage, Some(dec!(5)));
            assert_eq!(pos.initial_margin, Some(Quote::new(dec!(4))));
        }
    }

    #[test]
    fn thin_balance_is_liquidated_on_fifth_bar() {
        let mut account = attached_account(dec!(4));
        let result = run(&mut account, "2024-01-22T07:50:00Z", Vec::new());

        for snapshot in &result.account_snapshots[..4] {
            assert_eq!(snapshot.account.balance.value(), dec!(4));
            let pos = &snapshot.account.positions[0];
            assert_eq!(pos.liquidation_price, Some(dec!(49800)));
            assert_eq!(pos.effective_leverage, Some(dec!(125)));
        }

        let last = result.last_snapshot().unwrap();
        assert_eq!(last.ts, ts("2024-01-22T07:55:00Z"));
        assert_eq!(last.account.balance.value(), dec!(1.5049950024995));
        assert!(last.account.positions.is_empty());
        assert_eq!(account.balance.value(), dec!(1.5049950024995));
    }

    #[test]
    fn simulation_metadata() {
        let mut account = attached_account(dec!(100));
        let result = run(&mut account, "2024-01-22T07:50:00Z", Vec::new());

        assert_eq!(
            result.name,
            "2024-01-22T07-50-00+00-00_2024-01-22T09-00-00+00-00_1m_BTC_USDT_USDT"
        );
        assert_eq!(result.simulation_start_ts, ts("2024-01-22T07:50:00Z"));
        assert_eq!(result.timeframe, Timeframe::OneMinute);
        assert!(result.run_start_ts.is_some());
        assert!(result.run_end_ts.is_some());
    }
}

mod with_funding {
    use super::*;

    fn funding_at_eight() -> Vec<FundingRate> {
        vec![FundingRate::new(
            ts("2024-01-22T08:00:00Z"),
            Symbol::btc_usdt(),
            Some(dec!(0.0001)),
        )]
    }

    #[test]
    fn funding_settles_on_matching_bar_only() {
        let mut account = attached_account(dec!(100));
        let result = run(&mut account, "2024-01-22T07:58:00Z", funding_at_eight());
        let snaps = &result.account_snapshots;

        // 07:59 and 08:00 snapshots: before funding
        for snapshot in &snaps[..2] {
            assert_eq!(snapshot.account.balance.value(), dec!(100));
            assert!(snapshot.account.positions[0].funding_rate_costs.is_empty());
        }

        // 08:01 onward: settled once
        for snapshot in &snaps[2..] {
            assert_eq!(snapshot.account.balance.value(), dec!(99.95));
            let pos = &snapshot.account.positions[0];
            assert_eq!(pos.funding_rate_costs, vec![Quote::new(dec!(0.05))]);
            assert_eq!(pos.liquidation_price, Some(dec!(40205)));
            assert_eq!(pos.effective_leverage, Some(dec!(500) / dec!(99.95)));
        }
        assert_eq!(snaps[2].ts, ts("2024-01-22T08:01:00Z"));
    }

    #[test]
    fn funding_pushes_thin_account_into_liquidation() {
        let mut account = attached_account(dec!(4));
        let result = run(&mut account, "2024-01-22T07:58:00Z", funding_at_eight());
        let snaps = &result.account_snapshots;

        // 08:00 bar: funding paid, liquidation price moves up to 49805
        assert_eq!(snaps[2].account.balance.value(), dec!(3.95));
        assert_eq!(snaps[2].account.positions[0].liquidation_price, Some(dec!(49805)));

        // 08:01 bar closes at 49800.29980005, below 49805
        assert_eq!(snaps[3].ts, ts("2024-01-22T08:02:00Z"));
        assert!(snaps[3].account.positions.is_empty());
        assert_eq!(snaps[3].account.balance.value(), dec!(1.9529980005));

        assert_eq!(snaps[4].ts, ts("2024-01-22T08:03:00Z"));
        assert!(snaps[4].account.positions.is_empty());
        assert_eq!(snaps[4].account.balance.value(), dec!(1.9529980005));
    }

    #[test]
    fn null_rate_never_settles() {
        let mut account = attached_account(dec!(100));
        let funding = vec![FundingRate::new(ts("2024-01-22T08:00:00Z"), Symbol::btc_usdt(), None)];
        let result = run(&mut account, "2024-01-22T07:58:00Z", funding);

        for snapshot in &result.account_snapshots {
            assert_eq!(snapshot.account.balance.value(), dec!(100));
            assert!(snapshot.account.positions[0].funding_rate_costs.is_empty());
        }
    }

    #[test]
    fn stale_funding_before_run_is_ignored() {
        let mut account = attached_account(dec!(100));
        let mut funding = vec![FundingRate::new(
            ts("2024-01-22T00:00:00Z"),
            Symbol::btc_usdt(),
            Some(dec!(0.01)),
        )];
        funding.extend(funding_at_eight());

        let result = run(&mut account, "2024-01-22T07:58:00Z", funding);
        assert_eq!(result.last_snapshot().unwrap().account.balance.value(), dec!(99.95));
    }
}

mod components {
    use super::*;

    fn entry(quantity: Decimal) -> Trade {
        build_entry_trade(
            Symbol::btc_usdt(),
            ts("2024-01-22T07:50:00Z"),
            quantity,
            Price::new_unchecked(dec!(50000)),
            &MarketParams::binance_btc_usdt(),
        )
    }

    #[test]
    fn open_small_long_on_large_account() {
        let markets = MarketRegistry::binance_futures();
        let mut account = Account::new(Quote::new(dec!(10000)));

        open_position(&mut account, entry(dec!(0.01)), &markets).unwrap();

        assert_eq!(account.balance.value(), dec!(9999.75));
        let pos = &account.positions[0];
        assert_eq!(pos.initial_margin, Some(Quote::new(dec!(4))));
        assert_eq!(pos.maintenance_margin, Some(Quote::new(dec!(2))));
        assert_eq!(pos.effective_leverage, Some(dec!(500) / dec!(9999.75)));
        assert_eq!(pos.liquidation_price, Some(dec!(-949775)));
    }

    #[test]
    fn open_beyond_balance_changes_nothing() {
        let markets = MarketRegistry::binance_futures();
        let mut account = Account::new(Quote::new(dec!(100)));
        let before = account.clone();

        let err = open_position(&mut account, entry(dec!(1)), &markets).unwrap_err();
        assert!(err.is_insufficient_balance());
        assert_eq!(account, before);
    }

    #[test]
    fn liquidate_at_threshold_and_above() {
        let mut account = attached_account(dec!(100));
        let untouched = account.clone();

        liquidate_positions(&mut account, Price::new_unchecked(dec!(100000))).unwrap();
        assert_eq!(account, untouched);

        liquidate_positions(&mut account, Price::new_unchecked(dec!(40200))).unwrap();
        assert_eq!(account.balance.value(), dec!(2));
        assert!(account.positions.is_empty());
    }

    #[test]
    fn funding_both_directions() {
        let mut paying = attached_account(dec!(100));
        settle_funding(&mut paying, dec!(0.0001)).unwrap();
        assert_eq!(paying.balance.value(), dec!(99.95));
        assert_eq!(paying.positions[0].funding_rate_costs, vec![Quote::new(dec!(0.05))]);

        let mut receiving = attached_account(dec!(100));
        settle_funding(&mut receiving, dec!(-0.0002)).unwrap();
        assert_eq!(receiving.balance.value(), dec!(100.1));
        assert_eq!(receiving.positions[0].funding_rate_costs, vec![Quote::new(dec!(-0.1))]);
    }
}

mod from_files {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_bars(dir: &Path) {
        let lines: Vec<String> = falling_bars("2024-01-22T07:58:00Z")
            .iter()
            .map(|b| {
                let date = b.ts.to_datetime().unwrap().to_rfc3339();
                let c = b.close.value();
                format!(
                    r#"{{"date":"{date}","open":"{c}","high":"{c}","low":"{c}","close":"{c}","volume":"1"}}"#
                )
            })
            .collect();
        fs::write(dir.join("BTC_USDT_USDT-1m-futures.jsonl"), lines.join("\n")).unwrap();
        fs::write(
            dir.join("BTC_USDT_USDT-8h-funding_rate.jsonl"),
            concat!(
                r#"{"date":"2024-01-22T00:00:00Z","open":"0.0003"}"#,
                "\n",
                r#"{"date":"2024-01-22T08:00:00Z","open":"0.0001"}"#,
                "\n",
            ),
        )
        .unwrap();
    }

    #[test]
    fn run_from_json_lines_and_write_result() {
        let data = tempfile::tempdir().unwrap();
        write_bars(data.path());
        let source = JsonLinesDataSource::new(data.path());

        let mut account = attached_account(dec!(4));
        let mut sim = Simulator::new(SimulatorConfig::default());
        let result = sim
            .run_from_source(
                &source,
                &spec("2024-01-22T07:58:00Z", "2024-01-22T08:03:00Z"),
                &mut account,
            )
            .unwrap();

        assert_eq!(result.account_snapshots.len(), 5);
        assert_eq!(account.balance.value(), dec!(1.9529980005));

        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("simulation_result.json");
        result.write_json(&path).unwrap();
        let back = Simulation::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn start_missing_from_data_fails() {
        let data = tempfile::tempdir().unwrap();
        write_bars(data.path());
        let source = JsonLinesDataSource::new(data.path());

        let mut account = attached_account(dec!(100));
        let mut sim = Simulator::new(SimulatorConfig::default());
        let err = sim
            .run_from_source(
                &source,
                &spec("2024-01-22T07:00:00Z", "2024-01-22T08:03:00Z"),
                &mut account,
            )
            .unwrap_err();

        assert!(matches!(err, EngineError::Data(DataError::StartNotFound { .. })));
    }
}
