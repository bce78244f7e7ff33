//! CLI definition and dispatch.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::csv_replay_feed::CsvReplayFeed;
use crate::adapters::csv_trade_log::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::random_walk_feed::RandomWalkFeed;
use crate::adapters::static_feed::{StaticPriceFeed, fallback_prices};
use crate::adapters::text_report::{self, TextReportAdapter};
use crate::domain::config_validation::{
    validate_autotrade_config, validate_feed_config, validate_session_config,
};
use crate::domain::error::{SimtraderError, TradeError};
use crate::domain::execution::OrderExecutor;
use crate::domain::ledger::Ledger;
use crate::domain::position::{Trade, TradeSide};
use crate::domain::price_book::PriceBook;
use crate::domain::random::{RandomSource, RngSource};
use crate::domain::session_config::SessionConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_feed_port::PriceFeedPort;
use crate::ports::report_port::ReportPort;
use crate::session::{Session, SessionSnapshot};

#[derive(Parser, Debug)]
#[command(name = "simtrader", about = "Simulated spot-trading ledger and auto-trader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a live session against the configured price feed
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Wall-clock length of the session
        #[arg(long, default_value_t = 60)]
        duration_secs: u64,
        /// Stop after this many auto-trade ticks instead (enables auto-trade)
        #[arg(long)]
        ticks: Option<u64>,
        /// Force auto-trade on regardless of the config
        #[arg(long)]
        auto_trade: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trades_csv: Option<PathBuf>,
    },
    /// Apply a CSV file of orders (symbol,side,amount[,price])
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        orders: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trades_csv: Option<PathBuf>,
    },
    /// Validate a session configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// How long a `run` session lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunLength {
    Wall(Duration),
    Ticks(u64),
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            duration_secs,
            ticks,
            auto_trade,
            output,
            trades_csv,
        } => {
            let length = match ticks {
                Some(n) => RunLength::Ticks(n),
                None => RunLength::Wall(Duration::from_secs(duration_secs)),
            };
            run_live(
                &config,
                length,
                auto_trade,
                output.as_deref(),
                trades_csv.as_deref(),
            )
        }
        Command::Replay {
            config,
            orders,
            output,
            trades_csv,
        } => run_replay(&config, &orders, output.as_deref(), trades_csv.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SimtraderError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_session_config(config)?;
    validate_autotrade_config(config)?;
    validate_feed_config(config)
}

/// Build the price feed named by `[feed] source`. The feed seed falls back
/// to `[engine] seed`.
pub fn build_feed(config: &dyn ConfigPort) -> Result<Arc<dyn PriceFeedPort>, SimtraderError> {
    let source = config
        .get_string("feed", "source")
        .unwrap_or_else(|| "static".to_string())
        .trim()
        .to_lowercase();
    let seed = config
        .get_string("feed", "seed")
        .or_else(|| config.get_string("engine", "seed"))
        .and_then(|s| s.trim().parse::<u64>().ok());

    let feed: Arc<dyn PriceFeedPort> = match source.as_str() {
        "static" => Arc::new(StaticPriceFeed::fallback()),
        "random_walk" => Arc::new(RandomWalkFeed::new(
            fallback_prices(),
            config.get_double("feed", "volatility", 0.002),
            seed,
        )),
        "csv" => {
            let path = config
                .get_string("feed", "path")
                .ok_or_else(|| SimtraderError::ConfigMissing {
                    section: "feed".into(),
                    key: "path".into(),
                })?;
            Arc::new(CsvReplayFeed::from_file(path.trim())?)
        }
        other => {
            return Err(SimtraderError::ConfigInvalid {
                section: "feed".into(),
                key: "source".into(),
                reason: format!("unknown feed source '{other}'"),
            });
        }
    };
    info!(source = %source, "price feed ready");
    Ok(feed)
}

pub fn build_random(seed: Option<u64>) -> Box<dyn RandomSource + Send> {
    match seed {
        Some(s) => Box::new(RngSource(StdRng::seed_from_u64(s))),
        None => Box::new(RngSource(StdRng::from_entropy())),
    }
}

/// Drive a live session until `length` elapses, then return its final
/// snapshot and full trade log. The session is always shut down.
pub async fn run_session(
    config: SessionConfig,
    feed: Arc<dyn PriceFeedPort>,
    random: Box<dyn RandomSource + Send>,
    length: RunLength,
) -> Result<(SessionSnapshot, Vec<Trade>), SimtraderError> {
    let tick_interval = config.tick_interval;
    let session = Session::start(config, feed, random);
    let client = session.client();

    let waited = async {
        match length {
            RunLength::Wall(d) => {
                tokio::select! {
                    _ = tokio::time::sleep(d) => {}
                    _ = tokio::signal::ctrl_c() => warn!("interrupted, stopping session"),
                }
            }
            RunLength::Ticks(n) => {
                client.set_auto_trade(true).await?;
                while client.snapshot().await?.ticks < n {
                    tokio::time::sleep(tick_interval).await;
                }
            }
        }
        let snapshot = client.snapshot().await?;
        let trades = client.trade_log().await?;
        Ok::<_, SimtraderError>((snapshot, trades))
    }
    .await;

    session.shutdown().await;
    waited
}

fn run_live(
    config_path: &Path,
    length: RunLength,
    force_auto_trade: bool,
    output: Option<&Path>,
    trades_csv: Option<&Path>,
) -> Result<(), SimtraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let mut config = SessionConfig::from_config(&adapter)?;
    if force_auto_trade {
        config.auto_trade = true;
    }
    let feed = build_feed(&adapter)?;
    let random = build_random(config.seed);

    info!(?length, auto_trade = config.auto_trade, "starting session");
    let runtime = tokio::runtime::Runtime::new()?;
    let (snapshot, trades) =
        runtime.block_on(run_session(config.clone(), feed, random, length))?;

    write_reports(&snapshot, &trades, &config, output, trades_csv)
}

/// One manual order from a replay file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRow {
    pub symbol: String,
    pub side: TradeSide,
    pub amount: f64,
    #[serde(default)]
    pub price: Option<f64>,
}

pub fn load_orders<R: Read>(reader: R) -> Result<Vec<OrderRow>, SimtraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut orders = Vec::new();
    for row in rdr.deserialize::<OrderRow>() {
        let mut row = row?;
        row.symbol = row.symbol.to_uppercase();
        orders.push(row);
    }
    Ok(orders)
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub executed: usize,
    /// Zero-based order index and the reason it was refused.
    pub rejected: Vec<(usize, TradeError)>,
}

/// Apply orders in file order, one second apart starting at `start`.
/// Rejected orders leave the ledger untouched and replay continues.
pub fn replay_orders(
    executor: &mut OrderExecutor,
    prices: &mut PriceBook,
    orders: &[OrderRow],
    start: DateTime<Utc>,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (i, order) in orders.iter().enumerate() {
        let at = start + ChronoDuration::seconds(i as i64);
        if let Some(price) = order.price {
            prices.update(&order.symbol, price, at);
        }
        let result = match order.side {
            TradeSide::Buy => executor
                .buy(&order.symbol, order.amount, order.price, prices, at)
                .map(|_| ()),
            TradeSide::Sell => executor
                .sell(&order.symbol, order.amount, order.price, prices, at)
                .map(|_| ()),
        };
        match result {
            Ok(()) => summary.executed += 1,
            Err(e) => {
                warn!(order = i, symbol = %order.symbol, error = %e, "order rejected");
                summary.rejected.push((i, e));
            }
        }
    }
    summary
}

fn run_replay(
    config_path: &Path,
    orders_path: &Path,
    output: Option<&Path>,
    trades_csv: Option<&Path>,
) -> Result<(), SimtraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let config = SessionConfig::from_config(&adapter)?;
    let feed = build_feed(&adapter)?;

    let file = std::fs::File::open(orders_path)?;
    let orders = load_orders(file)?;
    info!(orders = orders.len(), "replaying orders");

    let start = Utc::now();
    let mut prices = PriceBook::new();
    prices.update_many(&feed.current_prices()?, start);
    let mut executor = OrderExecutor::new(
        Ledger::new(config.initial_balance, start),
        config.execution.clone(),
    );
    let summary = replay_orders(&mut executor, &mut prices, &orders, start);
    info!(
        executed = summary.executed,
        rejected = summary.rejected.len(),
        "replay finished"
    );

    let end = start + ChronoDuration::seconds(orders.len() as i64);
    let snapshot = SessionSnapshot::capture(&executor, &prices, &config, end);
    write_reports(
        &snapshot,
        executor.ledger().all_trades(),
        &config,
        output,
        trades_csv,
    )
}

/// Print the summary to stdout and write any requested report files.
pub fn write_reports(
    snapshot: &SessionSnapshot,
    trades: &[Trade],
    config: &SessionConfig,
    output: Option<&Path>,
    trades_csv: Option<&Path>,
) -> Result<(), SimtraderError> {
    print!("{}", text_report::render(snapshot, trades, config));

    if let Some(path) = output {
        TextReportAdapter.write(snapshot, trades, config, &path.to_string_lossy())?;
        eprintln!("\nReport written to: {}", path.display());
    }
    if let Some(path) = trades_csv {
        CsvTradeLogAdapter.write(snapshot, trades, config, &path.to_string_lossy())?;
        eprintln!("Trade log written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SimtraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let config = SessionConfig::from_config(&adapter)?;
    eprintln!(
        "Config valid: balance {:.2}, strategy {}, auto-trade {}, fee {}",
        config.initial_balance,
        config.strategy,
        if config.auto_trade { "on" } else { "off" },
        config.execution.fee_rate
    );
    Ok(())
}
