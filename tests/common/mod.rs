#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use trendfolio::domain::error::PipelineError;
pub use trendfolio::domain::price::{IndexPoint, PricePoint};
use trendfolio::ports::price_store_port::PriceStorePort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_price(symbol: &str, date: NaiveDate, close: f64, volume: i64) -> PricePoint {
    PricePoint {
        symbol: symbol.to_string(),
        date,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        adjusted_close: close,
        volume,
    }
}

/// Linear price ramp starting at `start_price`, one bar per calendar day.
pub fn generate_prices(
    symbol: &str,
    start: NaiveDate,
    count: usize,
    start_price: f64,
    daily_step: f64,
) -> Vec<PricePoint> {
    (0..count)
        .map(|i| {
            make_price(
                symbol,
                start + chrono::Duration::days(i as i64),
                start_price + i as f64 * daily_step,
                10_000,
            )
        })
        .collect()
}

pub fn generate_index(
    index_id: &str,
    start: NaiveDate,
    count: usize,
    start_close: f64,
    daily_step: f64,
) -> Vec<IndexPoint> {
    (0..count)
        .map(|i| {
            let close = start_close + i as f64 * daily_step;
            IndexPoint {
                index_id: index_id.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close - 5.0,
                high: close + 10.0,
                low: close - 10.0,
                close,
            }
        })
        .collect()
}

pub struct MockPriceStore {
    pub prices: HashMap<String, Vec<PricePoint>>,
    pub indices: HashMap<String, Vec<IndexPoint>>,
}

impl MockPriceStore {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            indices: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.prices.insert(symbol.to_string(), points);
        self
    }

    pub fn with_index(mut self, index_id: &str, points: Vec<IndexPoint>) -> Self {
        self.indices.insert(index_id.to_string(), points);
        self
    }
}

impl PriceStorePort for MockPriceStore {
    fn fetch_price_series(&self, symbol: &str) -> Result<Vec<PricePoint>, PipelineError> {
        Ok(self.prices.get(symbol).cloned().unwrap_or_default())
    }

    fn fetch_index_series(&self, index_id: &str) -> Result<Vec<IndexPoint>, PipelineError> {
        Ok(self.indices.get(index_id).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, PipelineError> {
        let mut symbols: Vec<String> = self.prices.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}
