//! Seeded geometric random walk around a base price table.

use crate::domain::error::SimtraderError;
use crate::ports::price_feed_port::PriceFeedPort;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

struct WalkState {
    rng: StdRng,
    prices: HashMap<String, f64>,
}

/// Each poll moves every price by a uniform step in
/// `[-volatility, +volatility]` of its current value.
pub struct RandomWalkFeed {
    volatility: f64,
    state: Mutex<WalkState>,
}

impl RandomWalkFeed {
    pub fn new(base: HashMap<String, f64>, volatility: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            volatility,
            state: Mutex::new(WalkState { rng, prices: base }),
        }
    }
}

impl PriceFeedPort for RandomWalkFeed {
    fn current_prices(&self) -> Result<HashMap<String, f64>, SimtraderError> {
        let mut state = self.state.lock().map_err(|_| SimtraderError::Feed {
            reason: "random walk state poisoned".into(),
        })?;
        let WalkState { rng, prices } = &mut *state;

        // iterate in a fixed order so a seed reproduces the same path
        let mut symbols: Vec<String> = prices.keys().cloned().collect();
        symbols.sort();
        for symbol in symbols {
            if let Some(price) = prices.get_mut(&symbol) {
                let step = if self.volatility > 0.0 {
                    rng.gen_range(-self.volatility..=self.volatility)
                } else {
                    0.0
                };
                *price *= 1.0 + step;
            }
        }
        Ok(prices.clone())
    }
}
