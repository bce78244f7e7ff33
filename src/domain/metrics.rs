//! Performance metrics derived from the trade log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ledger::Ledger;
use super::price_book::PriceBook;
use super::valuation::total_value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_value: f64,
    pub balance: f64,
    pub total_profit: f64,
    pub profit_percentage: f64,
    pub total_trades: usize,
    pub open_positions: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// `f64::INFINITY` when there are wins but no losses.
    pub profit_factor: f64,
    pub realized_profit: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub simulation_duration_minutes: i64,
}

impl Metrics {
    /// Computed fresh on every call; nothing is cached.
    pub fn compute(ledger: &Ledger, prices: &PriceBook, now: DateTime<Utc>) -> Self {
        let initial_balance = ledger.initial_balance();
        let total_value = total_value(ledger, prices);
        let total_profit = total_value - initial_balance;
        let profit_percentage = if initial_balance > 0.0 {
            total_profit / initial_balance * 100.0
        } else {
            0.0
        };

        let mut closed_trades = 0usize;
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut realized_profit = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in ledger.all_trades().iter().filter(|t| t.is_sell()) {
            closed_trades += 1;
            let profit = trade.profit.unwrap_or(0.0);
            realized_profit += profit;
            if profit > 0.0 {
                winning_trades += 1;
                total_wins += profit;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                losing_trades += 1;
                total_losses += profit.abs();
                largest_loss = largest_loss.max(profit.abs());
            }
        }

        let win_rate = if closed_trades > 0 {
            winning_trades as f64 / closed_trades as f64 * 100.0
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            total_wins / winning_trades as f64
        } else {
            0.0
        };

        let avg_loss = if losing_trades > 0 {
            total_losses / losing_trades as f64
        } else {
            0.0
        };

        let profit_factor = if avg_loss > 0.0 {
            avg_win / avg_loss
        } else if avg_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let simulation_duration_minutes = (now - ledger.created_at()).num_minutes().max(0);

        Metrics {
            total_value,
            balance: ledger.balance(),
            total_profit,
            profit_percentage,
            total_trades: ledger.all_trades().len(),
            open_positions: ledger.open_count(),
            closed_trades,
            winning_trades,
            losing_trades,
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            realized_profit,
            largest_win,
            largest_loss,
            simulation_duration_minutes,
        }
    }

    pub fn profit_factor_is_unbounded(&self) -> bool {
        self.profit_factor.is_infinite()
    }
}
