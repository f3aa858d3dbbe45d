//! Portfolio state: cash, open positions, trade log, equity curve.
//!
//! Owned exclusively by one simulation run; positions live in a `BTreeMap`
//! so iteration order is reproducible across runs and platforms.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::position::{Position, TradeRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub open_positions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub trade_log: Vec<TradeRecord>,
    pub equity_curve: Vec<EquitySnapshot>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            trade_log: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.trade_log.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquitySnapshot {
            date,
            equity,
            cash: self.cash,
            open_positions: self.positions.len(),
        });
    }

    /// Cash plus mark-to-market of open positions. A symbol with no print in
    /// `prices` is valued at its entry price (stale-value fallback).
    pub fn total_equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;

    fn sample_position(symbol: &str, shares: i64) -> Position {
        Position::open(
            symbol,
            shares,
            100.0,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100_000.0);
        assert!((portfolio.cash - 100_000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.trade_log.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn add_remove_and_count_positions() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("TCS", 100));
        portfolio.add_position(sample_position("INFY", 50));
        assert!(portfolio.has_position("TCS"));
        assert_eq!(portfolio.position_count(), 2);

        let removed = portfolio.remove_position("TCS");
        assert_eq!(removed.unwrap().shares, 100);
        assert!(!portfolio.has_position("TCS"));
        assert!(portfolio.remove_position("TCS").is_none());
    }

    #[test]
    fn positions_iterate_in_symbol_order() {
        let mut portfolio = Portfolio::new(100_000.0);
        for sym in ["WIPRO", "HDFC", "TCS", "INFY"] {
            portfolio.add_position(sample_position(sym, 1));
        }
        let order: Vec<&str> = portfolio.positions.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["HDFC", "INFY", "TCS", "WIPRO"]);
    }

    #[test]
    fn record_equity_captures_cash_and_count() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("TCS", 100));
        portfolio.cash = 90_000.0;
        portfolio.record_equity(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(), 101_000.0);

        let snap = &portfolio.equity_curve[0];
        assert!((snap.equity - 101_000.0).abs() < f64::EPSILON);
        assert!((snap.cash - 90_000.0).abs() < f64::EPSILON);
        assert_eq!(snap.open_positions, 1);
    }

    #[test]
    fn total_equity_marks_to_market() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("TCS", 100));
        portfolio.cash = 90_000.0;

        let mut prices = HashMap::new();
        prices.insert("TCS".to_string(), 110.0);
        assert!((portfolio.total_equity(&prices) - 101_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_falls_back_to_entry_price() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("TCS", 100));
        portfolio.cash = 90_000.0;

        let prices = HashMap::new();
        assert!((portfolio.total_equity(&prices) - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_trade_appends() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.record_trade(TradeRecord {
            symbol: "TCS".into(),
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            entry_price: 100.0,
            exit_price: 110.0,
            shares: 100,
            pnl: 950.0,
            exit_reason: ExitReason::ScoreLow,
        });
        assert_eq!(portfolio.trade_log.len(), 1);
        assert_eq!(portfolio.trade_log[0].symbol, "TCS");
    }
}
