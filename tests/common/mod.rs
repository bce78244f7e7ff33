#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use simtrader::domain::error::SimtraderError;
use simtrader::domain::execution::{ExecutionConfig, OrderExecutor};
use simtrader::domain::ledger::Ledger;
use simtrader::domain::price_book::PriceBook;
use simtrader::ports::price_feed_port::{PriceCallback, PriceFeedPort};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

pub fn book(quotes: &[(&str, f64)]) -> PriceBook {
    let mut prices = PriceBook::new();
    for (symbol, price) in quotes {
        prices.update(symbol, *price, t0());
    }
    prices
}

pub fn make_executor(initial_balance: f64) -> OrderExecutor {
    OrderExecutor::new(
        Ledger::new(initial_balance, t0()),
        ExecutionConfig::default(),
    )
}

/// In-memory feed with optional push support and injectable failures.
pub struct MockPriceFeed {
    prices: Mutex<HashMap<String, f64>>,
    failing: Mutex<bool>,
    push: bool,
    callback: Mutex<Option<PriceCallback>>,
    pub subscribed: Mutex<Vec<String>>,
}

impl MockPriceFeed {
    pub fn new(quotes: &[(&str, f64)]) -> Self {
        Self {
            prices: Mutex::new(quotes.iter().map(|(s, p)| (s.to_string(), *p)).collect()),
            failing: Mutex::new(false),
            push: false,
            callback: Mutex::new(None),
            subscribed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_push(mut self) -> Self {
        self.push = true;
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Invoke the subscriber callback as a live feed would.
    pub fn push_price(&self, symbol: &str, price: f64) -> bool {
        match self.callback.lock().unwrap().as_ref() {
            Some(cb) => {
                cb(symbol, price);
                true
            }
            None => false,
        }
    }
}

impl PriceFeedPort for MockPriceFeed {
    fn current_prices(&self) -> Result<HashMap<String, f64>, SimtraderError> {
        if *self.failing.lock().unwrap() {
            return Err(SimtraderError::Feed {
                reason: "mock feed offline".into(),
            });
        }
        Ok(self.prices.lock().unwrap().clone())
    }

    fn subscribe(
        &self,
        symbols: &[String],
        on_update: PriceCallback,
    ) -> Result<bool, SimtraderError> {
        if !self.push {
            return Ok(false);
        }
        *self.subscribed.lock().unwrap() = symbols.to_vec();
        *self.callback.lock().unwrap() = Some(on_update);
        Ok(true)
    }
}
