//! Daily price bar representations for stocks and benchmark indices.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub index_id: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PricePoint {
    pub fn pct_change_from(&self, earlier_close: f64) -> Option<f64> {
        if earlier_close > 0.0 {
            Some(self.close / earlier_close - 1.0)
        } else {
            None
        }
    }
}
