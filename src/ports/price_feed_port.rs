//! Price feed port trait.

use crate::domain::error::SimtraderError;
use std::collections::HashMap;

/// Push callback for a single `(symbol, price)` update.
pub type PriceCallback = Box<dyn Fn(&str, f64) + Send + Sync>;

/// Source of current prices. Results may be incomplete or stale; callers
/// treat a missing symbol as "price unavailable".
pub trait PriceFeedPort: Send + Sync {
    fn current_prices(&self) -> Result<HashMap<String, f64>, SimtraderError>;

    /// Start pushing updates for `symbols` to `on_update`. Returns
    /// `Ok(false)` when the feed has no push support, which is the default.
    fn subscribe(
        &self,
        symbols: &[String],
        on_update: PriceCallback,
    ) -> Result<bool, SimtraderError> {
        let _ = (symbols, on_update);
        Ok(false)
    }
}
