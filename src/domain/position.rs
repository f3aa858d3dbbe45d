//! Open position tracking and the closed-trade record.

use chrono::NaiveDate;
use std::fmt;

/// An open long position. `highest_price` is the high-water mark used by the
/// trailing stop; it never decreases while the position is held.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub highest_price: f64,
}

impl Position {
    pub fn open(symbol: &str, shares: i64, entry_price: f64, entry_date: NaiveDate) -> Self {
        Position {
            symbol: symbol.to_string(),
            shares,
            entry_price,
            entry_date,
            highest_price: entry_price,
        }
    }

    /// Raise the high-water mark if today's price exceeds it.
    pub fn observe_price(&mut self, price: f64) {
        if price > self.highest_price {
            self.highest_price = price;
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// Trailing stop trigger: price at or below the stop fraction off the peak.
    pub fn trailing_stop_hit(&self, price: f64, stop_fraction: f64) -> bool {
        price <= self.highest_price * (1.0 - stop_fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    RegimeBear,
    ScoreLow,
    TrailingStop,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::RegimeBear => write!(f, "REGIME_BEAR"),
            ExitReason::ScoreLow => write!(f, "SCORE_LOW"),
            ExitReason::TrailingStop => write!(f, "TRAILING_STOP"),
        }
    }
}

/// A fully closed round-trip, appended once to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: i64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}
