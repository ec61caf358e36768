//! perp-sim command line.
//!
//! Loads bars and funding rates from a directory of JSON-lines files, seeds
//! an account with one leveraged long, runs the simulation and writes
//! `simulation_result.json` to the output directory.

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use perp_sim::*;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "perp-sim",
    version,
    about = "Simulate a leveraged perpetual-futures account over historical bars"
)]
struct Args {
    /// Directory holding `{symbol}-{timeframe}-{kind}.jsonl` files
    #[arg(long, default_value = "./data/binance-futures")]
    data_dir: PathBuf,

    /// Directory the result JSON is written to
    #[arg(long, default_value = "./output")]
    output_dir: PathBuf,

    /// First bar of the run (RFC 3339); must exist in the data
    #[arg(long)]
    start: DateTime<Utc>,

    /// Recorded on the result only; the data decides where the run ends
    #[arg(long)]
    end: DateTime<Utc>,

    /// Bar timeframe: 1m, 5m, 1h or 8h
    #[arg(long, default_value = "1m")]
    timeframe: Timeframe,

    /// Market symbol as the exchange spells it
    #[arg(long, default_value = Symbol::BTC_USDT)]
    symbol: String,

    /// Starting account balance in quote currency
    #[arg(long, default_value = "10000")]
    balance: Decimal,

    /// Size of the starting position as a multiple of the balance
    #[arg(long, default_value = "10")]
    leverage: Decimal,

    /// Entry price of the starting position
    #[arg(long)]
    entry_price: Decimal,

    /// JSON file with a list of market parameters, replacing the built-in table
    #[arg(long)]
    markets: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!(error = %e, "simulation failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let markets = match &args.markets {
        Some(path) => MarketRegistry::from_json(&fs::read_to_string(path)?)?,
        None => MarketRegistry::binance_futures(),
    };

    let symbol = Symbol::new(args.symbol);
    let params = markets.get(&symbol)?.clone();
    let leverage = Leverage::new(args.leverage).ok_or("leverage must be at least 1")?;
    let entry_price = Price::new(args.entry_price).ok_or("entry price must be positive")?;

    let start = Timestamp::from_datetime(args.start);
    let spec = SimulationSpec::new(start, Timestamp::from_datetime(args.end), args.timeframe, symbol);

    // the seed trade fills one minute before the first bar
    let trade_ts = Timestamp::from_datetime(args.start - Duration::seconds(60));
    let mut account = starting_account(Quote::new(args.balance), leverage, entry_price, trade_ts, &params);

    let source = JsonLinesDataSource::new(&args.data_dir);
    let mut simulator = Simulator::new(SimulatorConfig::new(markets));
    let simulation = simulator.run_from_source(&source, &spec, &mut account)?;

    fs::create_dir_all(&args.output_dir)?;
    let output = args.output_dir.join("simulation_result.json");
    simulation.write_json(&output)?;

    info!(
        path = %output.display(),
        snapshots = simulation.account_snapshots.len(),
        balance = %account.balance,
        "result written"
    );
    Ok(())
}
