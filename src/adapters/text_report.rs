//! Plain-text session summary implementing ReportPort.

use std::fmt::Write as _;
use std::fs;

use crate::domain::error::SimtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::Trade;
use crate::domain::session_config::SessionConfig;
use crate::ports::report_port::ReportPort;
use crate::session::SessionSnapshot;

pub struct TextReportAdapter;

fn format_profit_factor(metrics: &Metrics) -> String {
    if metrics.profit_factor_is_unbounded() {
        "inf".to_string()
    } else {
        format!("{:.2}", metrics.profit_factor)
    }
}

fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

/// Render the summary. `trades` is the full log; it only feeds the trade
/// count line, the recent list comes from the snapshot.
pub fn render(snapshot: &SessionSnapshot, trades: &[Trade], config: &SessionConfig) -> String {
    let m = &snapshot.metrics;
    let g = &snapshot.goal;
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "=== Session Summary ===");
    let _ = writeln!(out, "Strategy:         {}", config.strategy);
    let _ = writeln!(
        out,
        "Auto-trade:       {}",
        if snapshot.auto_trade { "on" } else { "off" }
    );
    let _ = writeln!(out, "Last action:      {}", snapshot.status);
    let _ = writeln!(out, "Initial Balance:  {:.2}", config.initial_balance);
    let _ = writeln!(out, "Cash Balance:     {:.2}", snapshot.balance);
    let _ = writeln!(out, "Total Value:      {:.2}", m.total_value);
    let _ = writeln!(
        out,
        "Total Profit:     {} ({}%)",
        signed(m.total_profit),
        signed(m.profit_percentage)
    );
    let _ = writeln!(out, "Realized Profit:  {}", signed(m.realized_profit));
    let _ = writeln!(out, "Duration:         {} min", m.simulation_duration_minutes);

    let _ = writeln!(out, "\n=== Performance ===");
    let _ = writeln!(out, "Trades:           {}", trades.len());
    let _ = writeln!(out, "Closed Trades:    {}", m.closed_trades);
    let _ = writeln!(
        out,
        "Win Rate:         {:.1}% ({} won / {} lost)",
        m.win_rate, m.winning_trades, m.losing_trades
    );
    let _ = writeln!(out, "Average Win:      {:.2}", m.avg_win);
    let _ = writeln!(out, "Average Loss:     {:.2}", m.avg_loss);
    let _ = writeln!(out, "Largest Win:      {:.2}", m.largest_win);
    let _ = writeln!(out, "Largest Loss:     {:.2}", m.largest_loss);
    let _ = writeln!(out, "Profit Factor:    {}", format_profit_factor(m));

    let _ = writeln!(out, "\n=== Goal ===");
    let _ = writeln!(
        out,
        "Target:           {:.2} (+{}% in {} days)",
        g.target_value, config.target_profit_pct, config.target_period_days
    );
    let _ = writeln!(
        out,
        "Progress:         {:.1}%{}",
        g.progress_pct,
        if g.is_reached() { " (reached)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Daily Growth:     {:.3}% (target {:.3}%) {}",
        g.actual_daily_growth_pct,
        g.daily_target_growth_pct,
        if g.on_track { "on track" } else { "behind" }
    );
    let _ = writeln!(out, "Days Remaining:   {}", g.days_remaining);

    let _ = writeln!(out, "\n=== Open Positions ({}) ===", snapshot.positions.len());
    for p in &snapshot.positions {
        let quoted = match p.quoted_at {
            Some(_) => "",
            None => "  (no quote)",
        };
        let _ = writeln!(
            out,
            "  #{:<5} {:<6} {:>14.5} @ {:>12.2}  now {:>12.2}  {} ({}%){}",
            p.id,
            p.symbol,
            p.amount,
            p.buy_price,
            p.current_price,
            signed(p.unrealized_pnl),
            signed(p.unrealized_pct),
            quoted
        );
    }

    let _ = writeln!(
        out,
        "\n=== Recent Trades ({}) ===",
        snapshot.recent_trades.len()
    );
    for t in &snapshot.recent_trades {
        let profit = match t.profit {
            Some(p) => format!("  {}", signed(p)),
            None => String::new(),
        };
        let _ = writeln!(
            out,
            "  {} {:<4} {:<6} {:>14.5} @ {:>12.2}  total {:>14.2}{}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            t.side,
            t.symbol,
            t.amount,
            t.price,
            t.total,
            profit
        );
    }

    out
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        snapshot: &SessionSnapshot,
        trades: &[Trade],
        config: &SessionConfig,
        output_path: &str,
    ) -> Result<(), SimtraderError> {
        fs::write(output_path, render(snapshot, trades, config)).map_err(|e| {
            SimtraderError::Report {
                reason: format!("failed to write {output_path}: {e}"),
            }
        })
    }
}
