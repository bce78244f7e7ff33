//! Market-order execution against the ledger.
//!
//! The executor is the single writer of ledger state. Each call validates
//! fully before it mutates anything, so a rejected request leaves no trace.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::TradeError;
use super::ledger::{DUST_RATIO, Ledger, SplitOutcome, leaves_dust};
use super::position::{CloseDetails, Position, PositionStatus, Trade, TradeSide};
use super::price_book::PriceBook;

pub const DEFAULT_FEE_RATE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub fee_rate: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

/// Fee charged on a notional amount.
pub fn calculate_fee(notional: f64, config: &ExecutionConfig) -> f64 {
    notional * config.fee_rate
}

/// Explicit price wins; otherwise the latest quote.
fn resolve_price(
    symbol: &str,
    price: Option<f64>,
    prices: &PriceBook,
) -> Result<f64, TradeError> {
    price
        .filter(|p| p.is_finite() && *p > 0.0)
        .or_else(|| prices.price(symbol))
        .ok_or_else(|| TradeError::PriceUnavailable {
            symbol: symbol.to_string(),
        })
}

fn validate_amount(amount: f64) -> Result<(), TradeError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(TradeError::InvalidAmount { amount })
    }
}

#[derive(Debug, Clone)]
pub struct OrderExecutor {
    ledger: Ledger,
    config: ExecutionConfig,
}

impl OrderExecutor {
    pub fn new(ledger: Ledger, config: ExecutionConfig) -> Self {
        OrderExecutor { ledger, config }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Buy `amount` of `symbol`.
    ///
    /// 1. Resolve the price (explicit argument, then the price book)
    /// 2. cost = amount * price, fee = cost * fee_rate
    /// 3. Reject if cost + fee exceeds the balance
    /// 4. Debit, open a new lot and log a buy trade
    pub fn buy(
        &mut self,
        symbol: &str,
        amount: f64,
        price: Option<f64>,
        prices: &PriceBook,
        at: DateTime<Utc>,
    ) -> Result<Position, TradeError> {
        validate_amount(amount)?;
        let price = resolve_price(symbol, price, prices)?;

        let cost = amount * price;
        let fee = calculate_fee(cost, &self.config);
        let total_cost = cost + fee;

        if total_cost > self.ledger.balance() {
            return Err(TradeError::InsufficientBalance {
                required: total_cost,
                available: self.ledger.balance(),
            });
        }

        self.ledger.debit(total_cost);

        let position = Position {
            id: self.ledger.next_id(),
            symbol: symbol.to_string(),
            amount,
            original_amount: amount,
            buy_price: price,
            cost: total_cost,
            fee,
            opened_at: at,
            status: PositionStatus::Open,
            closed: None,
            parent_id: None,
        };
        self.ledger.push_position(position.clone());

        let trade = Trade {
            id: self.ledger.next_id(),
            position_id: position.id,
            symbol: symbol.to_string(),
            side: TradeSide::Buy,
            amount,
            price,
            total: total_cost,
            fee,
            profit: None,
            profit_percentage: None,
            timestamp: at,
        };
        self.ledger.append_trade(trade);

        debug!(symbol, amount, price, total_cost, "bought");
        Ok(position)
    }

    /// Sell up to `amount` of `symbol`, closing lots oldest first.
    ///
    /// Per lot, with `sell = min(lot.amount, remaining)`:
    /// - cost_per_unit = lot.cost / lot.original_amount (fixed at open)
    /// - net = sell * price * (1 - fee_rate)
    /// - profit = net - cost_per_unit * sell
    ///
    /// A slice that would leave only rounding residue in the lot sells the
    /// whole lot instead. Selling more than is open closes every open lot
    /// and stops.
    pub fn sell(
        &mut self,
        symbol: &str,
        amount: f64,
        price: Option<f64>,
        prices: &PriceBook,
        at: DateTime<Utc>,
    ) -> Result<Vec<SplitOutcome>, TradeError> {
        validate_amount(amount)?;
        let price = resolve_price(symbol, price, prices)?;

        let indices = self.ledger.open_indices(symbol);
        if indices.is_empty() {
            return Err(TradeError::NoOpenPosition {
                symbol: symbol.to_string(),
            });
        }

        let mut remaining = amount;
        let mut outcomes = Vec::new();

        for index in indices {
            if remaining <= amount * DUST_RATIO {
                break;
            }

            let lot = &self.ledger.all_positions()[index];
            let lot_id = lot.id;
            let mut sell_amount = lot.amount.min(remaining);
            if leaves_dust(lot, sell_amount) {
                sell_amount = lot.amount;
            }
            let cost_per_unit = lot.cost_per_unit();

            let revenue = sell_amount * price;
            let fee = calculate_fee(revenue, &self.config);
            let net_revenue = revenue - fee;

            let proportional_cost = cost_per_unit * sell_amount;
            let profit = net_revenue - proportional_cost;
            let profit_percentage = if proportional_cost > 0.0 {
                profit / proportional_cost * 100.0
            } else {
                0.0
            };

            let details = CloseDetails {
                sell_price: price,
                profit,
                profit_percentage,
                closed_at: at,
            };
            let Some(outcome) = self.ledger.split_and_close(index, sell_amount, details) else {
                continue;
            };

            self.ledger.credit(net_revenue);

            let trade = Trade {
                id: self.ledger.next_id(),
                position_id: lot_id,
                symbol: symbol.to_string(),
                side: TradeSide::Sell,
                amount: sell_amount,
                price,
                total: net_revenue,
                fee,
                profit: Some(profit),
                profit_percentage: Some(profit_percentage),
                timestamp: at,
            };
            self.ledger.append_trade(trade);

            debug!(symbol, sell_amount, price, profit, partial = outcome.is_partial(), "sold");
            outcomes.push(outcome);
            remaining -= sell_amount;
        }

        Ok(outcomes)
    }

    /// Discard all positions and trades and restore the initial balance.
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.ledger.reset(at);
    }
}
