//! Latest known quote per symbol.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub received_at: DateTime<Utc>,
}

/// Quotes survive until replaced; a batch that omits a symbol leaves its
/// previous quote in place. Non-finite and non-positive prices are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBook {
    quotes: HashMap<String, Quote>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the price was rejected.
    pub fn update(&mut self, symbol: &str, price: f64, at: DateTime<Utc>) -> bool {
        if !price.is_finite() || price <= 0.0 {
            return false;
        }
        self.quotes.insert(
            symbol.to_string(),
            Quote {
                price,
                received_at: at,
            },
        );
        true
    }

    /// Returns the number of accepted quotes.
    pub fn update_many(&mut self, prices: &HashMap<String, f64>, at: DateTime<Utc>) -> usize {
        prices
            .iter()
            .filter(|(symbol, price)| self.update(symbol, **price, at))
            .count()
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.quotes.get(symbol).map(|q| q.price)
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Known symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.quotes.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }
}
