//! Lots and the trade log entries that open and close them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Realized economics of a closed lot or closed slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseDetails {
    pub sell_price: f64,
    pub profit: f64,
    pub profit_percentage: f64,
    pub closed_at: DateTime<Utc>,
}

/// One lot of an instrument acquired in a single buy.
///
/// `cost` and `original_amount` are fixed at open time; `amount` is the
/// still-open quantity and only shrinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: u64,
    pub symbol: String,
    pub amount: f64,
    pub original_amount: f64,
    pub buy_price: f64,
    pub cost: f64,
    pub fee: f64,
    pub opened_at: DateTime<Utc>,
    pub status: PositionStatus,
    pub closed: Option<CloseDetails>,
    /// Set on a closed slice cut from a larger lot.
    pub parent_id: Option<u64>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Cost basis per unit, including the opening fee.
    pub fn cost_per_unit(&self) -> f64 {
        if self.original_amount > 0.0 {
            self.cost / self.original_amount
        } else {
            0.0
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.amount * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.buy_price) * self.amount
    }

    pub fn unrealized_pct(&self, price: f64) -> f64 {
        if self.buy_price > 0.0 {
            (price - self.buy_price) / self.buy_price * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        })
    }
}

/// Immutable audit-trail entry for one executed leg.
///
/// `total` is the full debit for a buy (notional plus fee) and the net
/// credit for a sell (notional minus fee).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub id: u64,
    pub position_id: u64,
    pub symbol: String,
    pub side: TradeSide,
    pub amount: f64,
    pub price: f64,
    pub total: f64,
    pub fee: f64,
    pub profit: Option<f64>,
    pub profit_percentage: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn is_sell(&self) -> bool {
        self.side == TradeSide::Sell
    }
}
