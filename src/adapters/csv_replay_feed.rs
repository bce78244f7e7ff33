//! Replays recorded prices from a `tick,symbol,price` CSV file.

use crate::domain::error::SimtraderError;
use crate::ports::price_feed_port::PriceFeedPort;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Deserialize)]
struct PriceRow {
    tick: u64,
    symbol: String,
    price: f64,
}

struct ReplayState {
    cursor: usize,
    current: HashMap<String, f64>,
}

/// Each call to `current_prices` applies the next recorded tick on top of
/// the prices seen so far. Once the file is exhausted the last state is
/// repeated.
pub struct CsvReplayFeed {
    ticks: Vec<Vec<(String, f64)>>,
    state: Mutex<ReplayState>,
}

impl CsvReplayFeed {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimtraderError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| SimtraderError::Feed {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SimtraderError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut grouped: BTreeMap<u64, Vec<(String, f64)>> = BTreeMap::new();
        for row in rdr.deserialize::<PriceRow>() {
            let row = row?;
            grouped
                .entry(row.tick)
                .or_default()
                .push((row.symbol.to_uppercase(), row.price));
        }
        if grouped.is_empty() {
            return Err(SimtraderError::Feed {
                reason: "price replay file has no rows".into(),
            });
        }
        Ok(Self {
            ticks: grouped.into_values().collect(),
            state: Mutex::new(ReplayState {
                cursor: 0,
                current: HashMap::new(),
            }),
        })
    }

    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.cursor >= self.ticks.len())
            .unwrap_or(true)
    }
}

impl PriceFeedPort for CsvReplayFeed {
    fn current_prices(&self) -> Result<HashMap<String, f64>, SimtraderError> {
        let mut state = self.state.lock().map_err(|_| SimtraderError::Feed {
            reason: "replay state poisoned".into(),
        })?;
        if let Some(batch) = self.ticks.get(state.cursor) {
            for (symbol, price) in batch {
                state.current.insert(symbol.clone(), *price);
            }
            state.cursor += 1;
        }
        Ok(state.current.clone())
    }
}
