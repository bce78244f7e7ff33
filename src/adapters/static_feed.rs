//! Fixed price table feed.

use crate::domain::error::SimtraderError;
use crate::ports::price_feed_port::PriceFeedPort;
use std::collections::HashMap;

/// Quote used for a symbol missing from the fallback table.
pub const UNKNOWN_SYMBOL_PRICE: f64 = 1000.0;

/// Default JPY quotes for the fifty tracked symbols.
pub const FALLBACK_PRICES: [(&str, f64); 50] = [
    ("BTC", 6_500_000.0),
    ("ETH", 400_000.0),
    ("BNB", 50_000.0),
    ("SOL", 20_000.0),
    ("XRP", 100.0),
    ("ADA", 80.0),
    ("DOGE", 15.0),
    ("AVAX", 5_000.0),
    ("DOT", 1_000.0),
    ("MATIC", 150.0),
    ("LINK", 2_000.0),
    ("UNI", 1_000.0),
    ("LTC", 10_000.0),
    ("FTM", 100.0),
    ("ATOM", 1_500.0),
    ("XLM", 20.0),
    ("NEAR", 500.0),
    ("ALGO", 30.0),
    ("VET", 5.0),
    ("FIL", 800.0),
    ("ICP", 1_000.0),
    ("APT", 1_500.0),
    ("ARB", 200.0),
    ("OP", 300.0),
    ("INJ", 2_000.0),
    ("TRX", 15.0),
    ("HBAR", 10.0),
    ("LDO", 400.0),
    ("IMX", 200.0),
    ("GRT", 25.0),
    ("SAND", 100.0),
    ("MANA", 100.0),
    ("AXS", 1_500.0),
    ("THETA", 200.0),
    ("EGLD", 8_000.0),
    ("FLOW", 150.0),
    ("CHZ", 20.0),
    ("KCS", 1_500.0),
    ("QNT", 20_000.0),
    ("AAVE", 15_000.0),
    ("SNX", 500.0),
    ("CRV", 100.0),
    ("MKR", 200_000.0),
    ("COMP", 8_000.0),
    ("ENJ", 50.0),
    ("BAT", 40.0),
    ("ZIL", 5.0),
    ("DASH", 5_000.0),
    ("NEO", 1_500.0),
    ("WAVES", 300.0),
];

pub fn fallback_price(symbol: &str) -> f64 {
    FALLBACK_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
        .unwrap_or(UNKNOWN_SYMBOL_PRICE)
}

pub fn fallback_prices() -> HashMap<String, f64> {
    FALLBACK_PRICES
        .iter()
        .map(|(s, p)| (s.to_string(), *p))
        .collect()
}

/// Always returns the same quotes.
pub struct StaticPriceFeed {
    prices: HashMap<String, f64>,
}

impl StaticPriceFeed {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    pub fn fallback() -> Self {
        Self::new(fallback_prices())
    }
}

impl PriceFeedPort for StaticPriceFeed {
    fn current_prices(&self) -> Result<HashMap<String, f64>, SimtraderError> {
        Ok(self.prices.clone())
    }
}
