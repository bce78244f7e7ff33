//! Mark-to-market valuation of the ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ledger::Ledger;
use super::position::Position;
use super::price_book::PriceBook;

/// Latest quote for the lot's symbol, or its buy price when there is none.
/// A missing quote is never valued at zero.
pub fn current_price(position: &Position, prices: &PriceBook) -> f64 {
    prices
        .price(&position.symbol)
        .unwrap_or(position.buy_price)
}

pub fn total_value(ledger: &Ledger, prices: &PriceBook) -> f64 {
    let position_value: f64 = ledger
        .open_lots()
        .map(|pos| pos.market_value(current_price(pos, prices)))
        .sum();
    ledger.balance() + position_value
}

pub fn unrealized_pnl(position: &Position, prices: &PriceBook) -> f64 {
    position.unrealized_pnl(current_price(position, prices))
}

pub fn unrealized_pct(position: &Position, prices: &PriceBook) -> f64 {
    position.unrealized_pct(current_price(position, prices))
}

/// An open lot as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    pub id: u64,
    pub symbol: String,
    pub amount: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pct: f64,
    /// When the quote behind `current_price` arrived; `None` when the lot
    /// is valued at its buy price.
    pub quoted_at: Option<DateTime<Utc>>,
}

pub fn position_views(ledger: &Ledger, prices: &PriceBook) -> Vec<PositionView> {
    ledger
        .open_lots()
        .map(|pos| {
            let price = current_price(pos, prices);
            PositionView {
                id: pos.id,
                symbol: pos.symbol.clone(),
                amount: pos.amount,
                buy_price: pos.buy_price,
                current_price: price,
                market_value: pos.market_value(price),
                unrealized_pnl: pos.unrealized_pnl(price),
                unrealized_pct: pos.unrealized_pct(price),
                quoted_at: prices.quote(&pos.symbol).map(|q| q.received_at),
            }
        })
        .collect()
}
