//! Progress toward the session's profit target.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub target_value: f64,
    pub progress_pct: f64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub daily_target_growth_pct: f64,
    pub actual_daily_growth_pct: f64,
    pub on_track: bool,
}

impl GoalProgress {
    /// `elapsed_days` is clamped to at least one day so that growth rates
    /// stay finite on the first day.
    pub fn compute(
        initial_balance: f64,
        current_value: f64,
        target_profit_pct: f64,
        target_period_days: u32,
        elapsed_days: i64,
    ) -> Self {
        let target_value = initial_balance * (1.0 + target_profit_pct / 100.0);
        let target_gain = target_value - initial_balance;
        let progress_pct = if target_gain != 0.0 {
            (current_value - initial_balance) / target_gain * 100.0
        } else {
            0.0
        };

        let days_elapsed = elapsed_days.max(1);
        let days_remaining = i64::from(target_period_days) - days_elapsed;

        let daily_target_growth_pct = if target_period_days > 0 {
            target_profit_pct / f64::from(target_period_days)
        } else {
            0.0
        };
        let actual_daily_growth_pct = if initial_balance > 0.0 {
            (current_value - initial_balance) / initial_balance / days_elapsed as f64 * 100.0
        } else {
            0.0
        };

        GoalProgress {
            target_value,
            progress_pct,
            days_elapsed,
            days_remaining,
            daily_target_growth_pct,
            actual_daily_growth_pct,
            on_track: actual_daily_growth_pct >= daily_target_growth_pct,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.progress_pct >= 100.0
    }
}
