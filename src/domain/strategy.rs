//! Auto-trade decision procedure.
//!
//! One call to [`tick`] takes at most one action: an exit if any open lot
//! crossed a threshold, otherwise possibly one small random entry.

use chrono::{DateTime, Utc};
use std::fmt;

use super::error::TradeError;
use super::execution::OrderExecutor;
use super::price_book::PriceBook;
use super::random::RandomSource;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskRules {
    /// Unrealized gain (%) above which half a lot is sold.
    pub take_profit_pct: f64,
    /// Share of the lot sold on a take-profit exit.
    pub take_profit_fraction: f64,
    /// Unrealized loss (%, negative) below which the lot is sold in full.
    pub stop_loss_pct: f64,
    pub entry_probability: f64,
    pub min_balance: f64,
    pub max_open_positions: usize,
    pub min_invest_fraction: f64,
    pub max_invest_fraction: f64,
    pub min_quantity: f64,
}

impl Default for RiskRules {
    fn default() -> Self {
        RiskRules {
            take_profit_pct: 0.5,
            take_profit_fraction: 0.5,
            stop_loss_pct: -2.0,
            entry_probability: 0.8,
            min_balance: 1_000.0,
            max_open_positions: 50,
            min_invest_fraction: 0.005,
            max_invest_fraction: 0.02,
            min_quantity: 0.000_01,
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    TakeProfit {
        symbol: String,
        amount: f64,
        unrealized_pct: f64,
    },
    StopLoss {
        symbol: String,
        amount: f64,
        unrealized_pct: f64,
    },
    Entry {
        symbol: String,
        amount: f64,
        invest_fraction: f64,
    },
    Idle,
    Rejected {
        error: TradeError,
    },
}

impl TickOutcome {
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            TickOutcome::TakeProfit { .. } | TickOutcome::StopLoss { .. }
        )
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::TakeProfit {
                symbol,
                unrealized_pct,
                ..
            } => write!(f, "took partial profit on {symbol} (+{unrealized_pct:.2}%)"),
            TickOutcome::StopLoss {
                symbol,
                unrealized_pct,
                ..
            } => write!(f, "stopped out of {symbol} ({unrealized_pct:.2}%)"),
            TickOutcome::Entry {
                symbol,
                invest_fraction,
                ..
            } => write!(
                f,
                "bought a small {symbol} position ({:.2}% of balance)",
                invest_fraction * 100.0
            ),
            TickOutcome::Idle => write!(f, "waiting"),
            TickOutcome::Rejected { error } => write!(f, "skipped: {error}"),
        }
    }
}

/// An exit the strategy wants to take.
#[derive(Debug, Clone, PartialEq)]
enum Exit {
    TakeProfit { symbol: String, amount: f64, price: f64, pct: f64 },
    StopLoss { symbol: String, amount: f64, price: f64, pct: f64 },
}

/// Scan open lots: first take-profit candidate wins, then first stop-loss.
/// Lots without a current quote never trigger.
fn find_exit(executor: &OrderExecutor, prices: &PriceBook, rules: &RiskRules) -> Option<Exit> {
    let quoted = || {
        executor.ledger().open_lots().filter_map(|pos| {
            let price = prices.price(&pos.symbol)?;
            Some((pos, price, pos.unrealized_pct(price)))
        })
    };

    if let Some((pos, price, pct)) = quoted().find(|(_, _, pct)| *pct > rules.take_profit_pct) {
        return Some(Exit::TakeProfit {
            symbol: pos.symbol.clone(),
            amount: pos.amount * rules.take_profit_fraction,
            price,
            pct,
        });
    }

    quoted()
        .find(|(_, _, pct)| *pct < rules.stop_loss_pct)
        .map(|(pos, price, pct)| Exit::StopLoss {
            symbol: pos.symbol.clone(),
            amount: pos.amount,
            price,
            pct,
        })
}

/// Universe symbols that currently have a positive quote.
pub fn tradable_symbols(universe: &[String], prices: &PriceBook) -> Vec<String> {
    universe
        .iter()
        .filter(|s| prices.price(s).is_some_and(|p| p > 0.0))
        .cloned()
        .collect()
}

/// Random subset of `symbols` of at most `size`, in draw order.
pub fn select_universe(
    symbols: &[String],
    size: usize,
    random: &mut dyn RandomSource,
) -> Vec<String> {
    let mut pool: Vec<String> = symbols.to_vec();
    let mut picked = Vec::with_capacity(size.min(pool.len()));
    while picked.len() < size && !pool.is_empty() {
        let idx = random.next_index(pool.len());
        picked.push(pool.swap_remove(idx));
    }
    picked
}

/// Run one auto-trade decision.
///
/// Errors from the executor are reported as [`TickOutcome::Rejected`]; the
/// next tick simply tries again.
pub fn tick(
    executor: &mut OrderExecutor,
    prices: &PriceBook,
    universe: &[String],
    rules: &RiskRules,
    random: &mut dyn RandomSource,
    at: DateTime<Utc>,
) -> TickOutcome {
    if let Some(exit) = find_exit(executor, prices, rules) {
        return match exit {
            Exit::TakeProfit {
                symbol,
                amount,
                price,
                pct,
            } => match executor.sell(&symbol, amount, Some(price), prices, at) {
                Ok(_) => TickOutcome::TakeProfit {
                    symbol,
                    amount,
                    unrealized_pct: pct,
                },
                Err(error) => TickOutcome::Rejected { error },
            },
            Exit::StopLoss {
                symbol,
                amount,
                price,
                pct,
            } => match executor.sell(&symbol, amount, Some(price), prices, at) {
                Ok(_) => TickOutcome::StopLoss {
                    symbol,
                    amount,
                    unrealized_pct: pct,
                },
                Err(error) => TickOutcome::Rejected { error },
            },
        };
    }

    let candidates = tradable_symbols(universe, prices);
    if candidates.is_empty() {
        return TickOutcome::Idle;
    }

    let ledger = executor.ledger();
    let wants_entry = random.next_unit() < rules.entry_probability
        && ledger.balance() > rules.min_balance
        && ledger.open_count() < rules.max_open_positions;
    if !wants_entry {
        return TickOutcome::Idle;
    }

    let symbol = candidates[random.next_index(candidates.len())].clone();
    let Some(price) = prices.price(&symbol) else {
        return TickOutcome::Idle;
    };
    let invest_fraction =
        random.next_in_range(rules.min_invest_fraction, rules.max_invest_fraction);
    let amount = ledger.balance() * invest_fraction / price;
    if amount <= rules.min_quantity {
        return TickOutcome::Idle;
    }

    match executor.buy(&symbol, amount, Some(price), prices, at) {
        Ok(_) => TickOutcome::Entry {
            symbol,
            amount,
            invest_fraction,
        },
        Err(error) => TickOutcome::Rejected { error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::ExecutionConfig;
    use crate::domain::ledger::Ledger;
    use crate::domain::random::ScriptedRandom;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn make_executor(balance: f64) -> OrderExecutor {
        OrderExecutor::new(Ledger::new(balance, t0()), ExecutionConfig::default())
    }

    fn universe(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn prices(quotes: &[(&str, f64)]) -> PriceBook {
        let mut book = PriceBook::new();
        for (symbol, price) in quotes {
            book.update(symbol, *price, t0());
        }
        book
    }

    #[test]
    fn entry_buys_random_symbol_with_random_size() {
        let mut exec = make_executor(1_000_000.0);
        let book = prices(&[("BTC", 6_500_000.0), ("ETH", 400_000.0)]);
        // entry draw, symbol draw (ETH), size draw (midpoint of 0.5%..2%)
        let mut random = ScriptedRandom::new(vec![0.1, 0.75, 0.5]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["BTC", "ETH"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );

        match outcome {
            TickOutcome::Entry {
                symbol,
                amount,
                invest_fraction,
            } => {
                assert_eq!(symbol, "ETH");
                assert_relative_eq!(invest_fraction, 0.0125, epsilon = 1e-12);
                assert_relative_eq!(amount, 12_500.0 / 400_000.0, epsilon = 1e-12);
            }
            other => panic!("expected Entry, got {other:?}"),
        }
        assert_eq!(exec.ledger().open_count(), 1);
    }

    #[test]
    fn entry_skipped_when_draw_misses_probability() {
        let mut exec = make_executor(1_000_000.0);
        let book = prices(&[("BTC", 6_500_000.0)]);
        let mut random = ScriptedRandom::new(vec![0.85]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["BTC"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert_eq!(outcome, TickOutcome::Idle);
        assert!(exec.ledger().all_trades().is_empty());
    }

    #[test]
    fn entry_skipped_below_min_balance() {
        let mut exec = make_executor(999.0);
        let book = prices(&[("XRP", 100.0)]);
        let mut random = ScriptedRandom::new(vec![0.0]);
        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["XRP"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert_eq!(outcome, TickOutcome::Idle);
    }

    #[test]
    fn entry_skipped_at_position_cap() {
        let mut exec = make_executor(1_000_000.0);
        let book = prices(&[("XRP", 100.0)]);
        for _ in 0..3 {
            exec.buy("XRP", 1.0, None, &book, t0()).unwrap();
        }
        let rules = RiskRules {
            max_open_positions: 3,
            ..RiskRules::default()
        };
        let mut random = ScriptedRandom::new(vec![0.0]);
        let outcome = tick(&mut exec, &book, &universe(&["XRP"]), &rules, &mut random, t0());
        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(exec.ledger().open_count(), 3);
    }

    #[test]
    fn entry_skipped_below_min_quantity() {
        let mut exec = make_executor(2_000.0);
        let book = prices(&[("BTC", 1.0e9)]);
        let mut random = ScriptedRandom::new(vec![0.0]);
        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["BTC"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert_eq!(outcome, TickOutcome::Idle);
    }

    #[test]
    fn no_candidates_is_idle() {
        let mut exec = make_executor(1_000_000.0);
        let book = prices(&[("BTC", 100.0)]);
        let mut random = ScriptedRandom::new(vec![0.0]);
        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["DOGE"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert_eq!(outcome, TickOutcome::Idle);
    }

    #[test]
    fn take_profit_sells_half() {
        let mut exec = make_executor(100_000.0);
        exec.buy("ETH", 10.0, Some(100.0), &PriceBook::new(), t0())
            .unwrap();
        let book = prices(&[("ETH", 101.0)]);
        let mut random = ScriptedRandom::new(vec![0.0]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["ETH"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        match &outcome {
            TickOutcome::TakeProfit {
                symbol,
                amount,
                unrealized_pct,
            } => {
                assert_eq!(symbol, "ETH");
                assert_relative_eq!(*amount, 5.0);
                assert_relative_eq!(*unrealized_pct, 1.0, epsilon = 1e-9);
            }
            other => panic!("expected TakeProfit, got {other:?}"),
        }
        assert!(outcome.is_exit());
        let open = exec.ledger().open_positions("ETH");
        assert_relative_eq!(open[0].amount, 5.0);
        // exit ticks never enter
        assert_eq!(exec.ledger().all_trades().len(), 2);
    }

    #[test]
    fn take_profit_has_priority_over_stop_loss() {
        let mut exec = make_executor(100_000.0);
        let empty = PriceBook::new();
        exec.buy("SOL", 10.0, Some(100.0), &empty, t0()).unwrap();
        exec.buy("ETH", 10.0, Some(100.0), &empty, t0()).unwrap();
        let book = prices(&[("SOL", 90.0), ("ETH", 102.0)]);
        let mut random = ScriptedRandom::new(vec![0.0]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["SOL", "ETH"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert!(matches!(outcome, TickOutcome::TakeProfit { ref symbol, .. } if symbol == "ETH"));
        assert_eq!(exec.ledger().open_positions("SOL").len(), 1);
    }

    #[test]
    fn stop_loss_sells_whole_lot() {
        let mut exec = make_executor(100_000.0);
        exec.buy("SOL", 10.0, Some(100.0), &PriceBook::new(), t0())
            .unwrap();
        let book = prices(&[("SOL", 97.0)]);
        let mut random = ScriptedRandom::new(vec![0.0]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["SOL"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert!(matches!(outcome, TickOutcome::StopLoss { ref symbol, amount, .. }
            if symbol == "SOL" && (amount - 10.0).abs() < 1e-12));
        assert_eq!(exec.ledger().open_count(), 0);
    }

    #[test]
    fn within_band_falls_through_to_entry() {
        let mut exec = make_executor(100_000.0);
        exec.buy("SOL", 10.0, Some(100.0), &PriceBook::new(), t0())
            .unwrap();
        let book = prices(&[("SOL", 100.4)]);
        let mut random = ScriptedRandom::new(vec![0.0, 0.0, 0.0]);

        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["SOL"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert!(matches!(outcome, TickOutcome::Entry { .. }));
        assert_eq!(exec.ledger().open_count(), 2);
    }

    #[test]
    fn full_exit_across_lots_lets_entries_resume() {
        let mut exec = make_executor(100_000.0);
        let empty = PriceBook::new();
        exec.buy("ETH", 0.1, Some(100.0), &empty, t0()).unwrap();
        exec.buy("ETH", 0.2, Some(100.0), &empty, t0()).unwrap();
        exec.sell("ETH", 0.3, Some(100.0), &empty, t0()).unwrap();
        assert_eq!(exec.ledger().open_count(), 0);

        let book = prices(&[("ETH", 101.0), ("BTC", 6_500_000.0)]);
        let mut random = ScriptedRandom::new(vec![0.0, 0.0, 0.5]);
        let outcome = tick(
            &mut exec,
            &book,
            &universe(&["BTC"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert!(matches!(outcome, TickOutcome::Entry { ref symbol, .. } if symbol == "BTC"));
    }

    #[test]
    fn unquoted_lots_never_exit() {
        let mut exec = make_executor(100_000.0);
        exec.buy("SOL", 10.0, Some(100.0), &PriceBook::new(), t0())
            .unwrap();
        let mut random = ScriptedRandom::new(vec![0.99]);
        let outcome = tick(
            &mut exec,
            &PriceBook::new(),
            &universe(&["SOL"]),
            &RiskRules::default(),
            &mut random,
            t0(),
        );
        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(exec.ledger().open_count(), 1);
    }

    #[test]
    fn status_strings() {
        let outcome = TickOutcome::TakeProfit {
            symbol: "BTC".into(),
            amount: 0.5,
            unrealized_pct: 0.734,
        };
        assert_eq!(outcome.to_string(), "took partial profit on BTC (+0.73%)");
        let outcome = TickOutcome::Entry {
            symbol: "ETH".into(),
            amount: 1.0,
            invest_fraction: 0.0125,
        };
        assert_eq!(outcome.to_string(), "bought a small ETH position (1.25% of balance)");
        assert_eq!(TickOutcome::Idle.to_string(), "waiting");
    }

    #[test]
    fn select_universe_picks_distinct_symbols() {
        let symbols = universe(&["A", "B", "C", "D"]);
        let mut random = ScriptedRandom::new(vec![0.0, 0.99, 0.5]);
        let picked = select_universe(&symbols, 3, &mut random);
        assert_eq!(picked.len(), 3);
        let mut sorted = picked.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
        assert_eq!(picked[0], "A");
    }

    #[test]
    fn select_universe_caps_at_available() {
        let symbols = universe(&["A", "B"]);
        let mut random = ScriptedRandom::new(vec![0.3]);
        assert_eq!(select_universe(&symbols, 20, &mut random).len(), 2);
    }
}
