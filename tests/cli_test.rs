//! CLI orchestration tests.
//!
//! Tests cover:
//! - Config validation across all sections
//! - Price feed selection from `[feed]`
//! - Order file parsing and replay
//! - Full `replay` and `validate` commands with real files on disk

mod common;

use approx::assert_relative_eq;
use clap::Parser;
use common::*;
use simtrader::adapters::file_config_adapter::FileConfigAdapter;
use simtrader::cli::{self, Cli};
use simtrader::domain::error::{SimtraderError, TradeError};
use simtrader::domain::position::TradeSide;
use std::io::Write;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[session]
initial_balance = 1000000
target_profit = 20
target_period = 30
strategy = combined
auto_trade = false

[engine]
fee_rate = 0.001
tick_interval_ms = 500
price_refresh_ms = 10000
universe_size = 20
seed = 7

[autotrade]
take_profit_pct = 0.5
stop_loss_pct = -2.0

[feed]
source = static
"#;

mod config_checks {
    use super::*;

    #[test]
    fn valid_config_passes_all_sections() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert!(cli::validate_all(&adapter).is_ok());
    }

    #[test]
    fn invalid_feed_section_is_reported() {
        let ini = VALID_INI.replace("source = static", "source = ftp");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        assert!(matches!(
            cli::validate_all(&adapter),
            Err(SimtraderError::ConfigInvalid { ref key, .. }) if key == "source"
        ));
    }

    #[test]
    fn missing_file_is_parse_error() {
        let err = cli::load_config(std::path::Path::new("/nonexistent/simtrader.ini")).err();
        assert!(matches!(err, Some(SimtraderError::ConfigParse { .. })));
    }
}

mod feed_selection {
    use super::*;

    #[test]
    fn static_feed_serves_fallback_table() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let prices = cli::build_feed(&adapter).unwrap().current_prices().unwrap();
        assert_eq!(prices.len(), 50);
        assert_eq!(prices["BTC"], 6_500_000.0);
    }

    #[test]
    fn random_walk_feed_is_seeded() {
        let ini = VALID_INI.replace("source = static", "source = random_walk\nvolatility = 0.01");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let a = cli::build_feed(&adapter).unwrap().current_prices().unwrap();
        let b = cli::build_feed(&adapter).unwrap().current_prices().unwrap();
        assert_eq!(a, b);
        assert_ne!(a["BTC"], 6_500_000.0);
    }

    #[test]
    fn csv_feed_reads_replay_file() {
        let prices = write_temp("tick,symbol,price\n1,BTC,100\n2,BTC,101\n");
        let ini = VALID_INI.replace(
            "source = static",
            &format!("source = csv\npath = {}", prices.path().display()),
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let feed = cli::build_feed(&adapter).unwrap();
        assert_eq!(feed.current_prices().unwrap()["BTC"], 100.0);
        assert_eq!(feed.current_prices().unwrap()["BTC"], 101.0);
    }
}

mod order_replay {
    use super::*;

    #[test]
    fn load_orders_parses_sides_and_optional_price() {
        let orders = cli::load_orders(
            "symbol,side,amount,price\nbtc,buy,0.01,\nBTC,SELL,0.005,6565000\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].symbol, "BTC");
        assert_eq!(orders[0].side, TradeSide::Buy);
        assert_eq!(orders[0].price, None);
        assert_eq!(orders[1].side, TradeSide::Sell);
        assert_eq!(orders[1].price, Some(6_565_000.0));
    }

    #[test]
    fn load_orders_rejects_unknown_side() {
        let err = cli::load_orders("symbol,side,amount,price\nBTC,hold,1,\n".as_bytes()).err();
        assert!(matches!(err, Some(SimtraderError::Csv(_))));
    }

    #[test]
    fn replay_applies_reference_scenario() {
        let orders = cli::load_orders(
            "symbol,side,amount,price\nBTC,buy,0.01,\nBTC,sell,0.005,6565000\nETH,sell,1,\n"
                .as_bytes(),
        )
        .unwrap();
        let mut exec = make_executor(1_000_000.0);
        let mut prices = book(&[("BTC", 6_500_000.0), ("ETH", 400_000.0)]);

        let summary = cli::replay_orders(&mut exec, &mut prices, &orders, t0());

        assert_eq!(summary.executed, 2);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].0, 2);
        assert!(matches!(
            summary.rejected[0].1,
            TradeError::NoOpenPosition { .. }
        ));
        let sell = exec.ledger().all_trades().last().unwrap();
        assert_relative_eq!(sell.profit.unwrap(), 259.675, epsilon = 1e-6);
        assert_eq!(prices.price("BTC"), Some(6_565_000.0));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_command_succeeds() {
        let config = write_temp(VALID_INI);
        let exit = cli::run(Cli::parse_from([
            "simtrader",
            "validate",
            "--config",
            config.path().to_str().unwrap(),
        ]));
        let report = format!("{exit:?}");
        assert!(report.contains('0'), "expected success, got: {report}");
    }

    #[test]
    fn validate_command_fails_on_bad_config() {
        let config = write_temp("[session]\ninitial_balance = -1\n");
        let exit = cli::run(Cli::parse_from([
            "simtrader",
            "validate",
            "--config",
            config.path().to_str().unwrap(),
        ]));
        let report = format!("{exit:?}");
        assert!(report.contains('2'), "expected config exit code, got: {report}");
    }

    #[test]
    fn replay_command_writes_reports() {
        let config = write_temp(VALID_INI);
        let orders = write_temp("symbol,side,amount,price\nBTC,buy,0.01,\nETH,buy,0.5,\nBTC,sell,0.01,6600000\n");
        let dir = tempfile::TempDir::new().unwrap();
        let report = dir.path().join("summary.txt");
        let trades = dir.path().join("trades.csv");

        let exit = cli::run(Cli::parse_from([
            "simtrader",
            "replay",
            "--config",
            config.path().to_str().unwrap(),
            "--orders",
            orders.path().to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
            "--trades-csv",
            trades.to_str().unwrap(),
        ]));
        let code = format!("{exit:?}");
        assert!(code.contains('0'), "expected success, got: {code}");

        let summary = std::fs::read_to_string(&report).unwrap();
        assert!(summary.contains("Closed Trades:    1"));
        assert!(summary.contains("=== Open Positions (1) ==="));

        let csv = std::fs::read_to_string(&trades).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.lines().nth(3).unwrap().contains("sell"));
    }
}
