//! SQLite storage adapter.
//!
//! Backs both the price store and the feature store. Indicators live as
//! nullable columns on `daily_prices`, so the scorer reads one table; the
//! regime calendar and scores have their own tables keyed for idempotent
//! re-runs.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::domain::error::PipelineError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::price::{IndexPoint, PricePoint};
use crate::domain::regime::{Regime, RegimeRecord};
use crate::domain::score::{ScoreRecord, ScorerInput};
use crate::ports::config_port::ConfigPort;
use crate::ports::feature_store_port::FeatureStorePort;
use crate::ports::price_store_port::PriceStorePort;

// Sentinels for open-ended date windows; TEXT dates compare lexically.
const DATE_MIN: &str = "0000-01-01";
const DATE_MAX: &str = "9999-12-31";

#[derive(Debug)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> PipelineError {
    PipelineError::Database {
        reason: e.to_string(),
    }
}

fn sql_err(e: rusqlite::Error) -> PipelineError {
    PipelineError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_row_date(date_str: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            date_str.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn window_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (String, String) {
    (
        start.map_or_else(|| DATE_MIN.to_string(), fmt_date),
        end.map_or_else(|| DATE_MAX.to_string(), fmt_date),
    )
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PipelineError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PipelineError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PipelineError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS daily_prices (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                adjusted_close REAL,
                volume INTEGER,
                ema_50 REAL,
                ema_200 REAL,
                ema_200_slope_20 REAL,
                rolling_high_6m REAL,
                avg_volume_20d REAL,
                rs_90d REAL,
                PRIMARY KEY (symbol, date)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_prices_date ON daily_prices(date);

            CREATE TABLE IF NOT EXISTS index_prices (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                PRIMARY KEY (symbol, date)
            );

            CREATE TABLE IF NOT EXISTS market_regime (
                date TEXT PRIMARY KEY,
                sma_200 REAL NOT NULL,
                sma_200_slope_20 REAL,
                classification TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stock_scores (
                date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                condition_ema_50_200 INTEGER NOT NULL,
                condition_ema_200_slope INTEGER NOT NULL,
                condition_6m_high INTEGER NOT NULL,
                condition_volume INTEGER NOT NULL,
                condition_rs INTEGER NOT NULL,
                total_score INTEGER NOT NULL,
                PRIMARY KEY (date, symbol)
            );
            CREATE INDEX IF NOT EXISTS idx_stock_scores_symbol ON stock_scores(symbol);",
        )
        .map_err(sql_err)?;

        Ok(())
    }

    /// Bulk load of raw daily bars; existing (symbol, date) rows keep their
    /// indicator columns.
    pub fn insert_prices(&self, points: &[PricePoint]) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        for point in points {
            tx.execute(
                "INSERT INTO daily_prices (symbol, date, open, high, low, close, adjusted_close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (symbol, date) DO NOTHING",
                params![
                    point.symbol,
                    fmt_date(point.date),
                    point.open,
                    point.high,
                    point.low,
                    point.close,
                    point.adjusted_close,
                    point.volume
                ],
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)
    }

    pub fn insert_index_prices(&self, points: &[IndexPoint]) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        for point in points {
            tx.execute(
                "INSERT INTO index_prices (symbol, date, open, high, low, close)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (symbol, date) DO NOTHING",
                params![
                    point.index_id,
                    fmt_date(point.date),
                    point.open,
                    point.high,
                    point.low,
                    point.close
                ],
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)
    }
}

impl PriceStorePort for SqliteAdapter {
    fn fetch_price_series(&self, symbol: &str) -> Result<Vec<PricePoint>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, open, high, low, close, adjusted_close, volume
                 FROM daily_prices WHERE symbol = ?1 ORDER BY date ASC",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![symbol], |row| {
                let date_str: String = row.get(1)?;
                Ok(PricePoint {
                    symbol: row.get(0)?,
                    date: parse_row_date(&date_str)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    adjusted_close: row.get(6)?,
                    volume: row.get(7)?,
                })
            })
            .map_err(sql_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(sql_err)?);
        }
        Ok(points)
    }

    fn fetch_index_series(&self, index_id: &str) -> Result<Vec<IndexPoint>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, open, high, low, close
                 FROM index_prices WHERE symbol = ?1 ORDER BY date ASC",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![index_id], |row| {
                let date_str: String = row.get(1)?;
                Ok(IndexPoint {
                    index_id: row.get(0)?,
                    date: parse_row_date(&date_str)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                })
            })
            .map_err(sql_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(sql_err)?);
        }
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM daily_prices ORDER BY symbol")
            .map_err(sql_err)?;

        let rows = stmt.query_map([], |row| row.get(0)).map_err(sql_err)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(sql_err)?);
        }
        Ok(symbols)
    }
}

impl FeatureStorePort for SqliteAdapter {
    fn upsert_indicators(&self, rows: &[IndicatorSet]) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        for ind in rows {
            tx.execute(
                "UPDATE daily_prices
                 SET ema_50 = ?3, ema_200 = ?4, ema_200_slope_20 = ?5,
                     rolling_high_6m = ?6, avg_volume_20d = ?7, rs_90d = ?8
                 WHERE symbol = ?1 AND date = ?2",
                params![
                    ind.symbol,
                    fmt_date(ind.date),
                    ind.ema_50,
                    ind.ema_200,
                    ind.ema_200_slope_20,
                    ind.rolling_high_6m,
                    ind.avg_volume_20d,
                    ind.rs_90d
                ],
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)
    }

    fn upsert_regimes(&self, rows: &[RegimeRecord]) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        for record in rows {
            tx.execute(
                "INSERT OR REPLACE INTO market_regime (date, sma_200, sma_200_slope_20, classification)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    fmt_date(record.date),
                    record.sma_200,
                    record.sma_200_slope_20,
                    record.classification.to_string()
                ],
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)
    }

    fn upsert_scores(&self, rows: &[ScoreRecord]) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        for score in rows {
            tx.execute(
                "INSERT OR REPLACE INTO stock_scores
                 (date, symbol, condition_ema_50_200, condition_ema_200_slope,
                  condition_6m_high, condition_volume, condition_rs, total_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    fmt_date(score.date),
                    score.symbol,
                    score.condition_ema_50_200,
                    score.condition_ema_200_slope,
                    score.condition_6m_high,
                    score.condition_volume,
                    score.condition_rs,
                    score.total_score
                ],
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)
    }

    fn fetch_indicator_rows(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScorerInput>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, close, volume, ema_50, ema_200, ema_200_slope_20,
                        rolling_high_6m, avg_volume_20d, rs_90d
                 FROM daily_prices
                 WHERE close IS NOT NULL
                 ORDER BY symbol, date
                 LIMIT ?1 OFFSET ?2",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                let date_str: String = row.get(1)?;
                Ok(ScorerInput {
                    indicators: IndicatorSet {
                        symbol: row.get(0)?,
                        date: parse_row_date(&date_str)?,
                        ema_50: row.get(4)?,
                        ema_200: row.get(5)?,
                        ema_200_slope_20: row.get(6)?,
                        rolling_high_6m: row.get(7)?,
                        avg_volume_20d: row.get(8)?,
                        rs_90d: row.get(9)?,
                    },
                    close: row.get(2)?,
                    volume: row.get(3)?,
                })
            })
            .map_err(sql_err)?;

        let mut inputs = Vec::new();
        for row in rows {
            inputs.push(row.map_err(sql_err)?);
        }
        Ok(inputs)
    }

    fn fetch_regime_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RegimeRecord>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;
        let (lo, hi) = window_bounds(start, end);

        let mut stmt = conn
            .prepare(
                "SELECT date, sma_200, sma_200_slope_20, classification
                 FROM market_regime
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date ASC",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![lo, hi], |row| {
                let date_str: String = row.get(0)?;
                let label: String = row.get(3)?;
                let classification = Regime::parse(&label).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        format!("unknown regime label: {label}").into(),
                    )
                })?;
                Ok(RegimeRecord {
                    date: parse_row_date(&date_str)?,
                    sma_200: row.get(1)?,
                    sma_200_slope_20: row.get(2)?,
                    classification,
                })
            })
            .map_err(sql_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(sql_err)?);
        }
        Ok(records)
    }

    fn fetch_score_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, String, i32)>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;
        let (lo, hi) = window_bounds(start, end);

        let mut stmt = conn
            .prepare(
                "SELECT date, symbol, total_score FROM stock_scores
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date ASC",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![lo, hi], |row| {
                let date_str: String = row.get(0)?;
                Ok((parse_row_date(&date_str)?, row.get(1)?, row.get(2)?))
            })
            .map_err(sql_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(sql_err)?);
        }
        Ok(records)
    }

    fn fetch_close_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, String, f64)>, PipelineError> {
        let conn = self.pool.get().map_err(pool_err)?;
        let (lo, hi) = window_bounds(start, end);

        let mut stmt = conn
            .prepare(
                "SELECT date, symbol, close FROM daily_prices
                 WHERE close IS NOT NULL AND date >= ?1 AND date <= ?2
                 ORDER BY date ASC",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![lo, hi], |row| {
                let date_str: String = row.get(0)?;
                Ok((parse_row_date(&date_str)?, row.get(1)?, row.get(2)?))
            })
            .map_err(sql_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(sql_err)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn price(symbol: &str, day: u32, close: f64) -> PricePoint {
        PricePoint {
            symbol: symbol.to_string(),
            date: date(day),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            adjusted_close: close,
            volume: 10_000,
        }
    }

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    #[test]
    fn from_config_requires_a_path() {
        match SqliteAdapter::from_config(&EmptyConfig) {
            Err(PipelineError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn price_round_trip_in_date_order() {
        let store = adapter();
        store
            .insert_prices(&[price("TCS", 16, 101.0), price("TCS", 15, 100.0)])
            .unwrap();

        let series = store.fetch_price_series("TCS").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(15));
        assert_eq!(series[1].close, 101.0);
    }

    #[test]
    fn duplicate_price_insert_is_ignored() {
        let store = adapter();
        store.insert_prices(&[price("TCS", 15, 100.0)]).unwrap();
        store.insert_prices(&[price("TCS", 15, 999.0)]).unwrap();

        let series = store.fetch_price_series("TCS").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].close, 100.0);
    }

    #[test]
    fn list_symbols_is_sorted_and_distinct() {
        let store = adapter();
        store
            .insert_prices(&[
                price("WIPRO", 15, 1.0),
                price("INFY", 15, 1.0),
                price("INFY", 16, 1.0),
            ])
            .unwrap();

        assert_eq!(store.list_symbols().unwrap(), vec!["INFY", "WIPRO"]);
    }

    #[test]
    fn indicator_upsert_lands_on_the_price_row() {
        let store = adapter();
        store.insert_prices(&[price("TCS", 15, 100.0)]).unwrap();

        store
            .upsert_indicators(&[IndicatorSet {
                symbol: "TCS".into(),
                date: date(15),
                ema_50: Some(98.0),
                ema_200: Some(95.0),
                ema_200_slope_20: None,
                rolling_high_6m: Some(105.0),
                avg_volume_20d: Some(9_000.0),
                rs_90d: None,
            }])
            .unwrap();

        let rows = store.fetch_indicator_rows(0, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].indicators.ema_50, Some(98.0));
        assert_eq!(rows[0].indicators.ema_200_slope_20, None);
        assert_eq!(rows[0].close, 100.0);
        assert_eq!(rows[0].volume, 10_000);
    }

    #[test]
    fn indicator_rows_paginate_past_the_end() {
        let store = adapter();
        store
            .insert_prices(&[
                price("TCS", 15, 100.0),
                price("TCS", 16, 101.0),
                price("TCS", 17, 102.0),
            ])
            .unwrap();

        assert_eq!(store.fetch_indicator_rows(0, 2).unwrap().len(), 2);
        assert_eq!(store.fetch_indicator_rows(2, 2).unwrap().len(), 1);
        assert!(store.fetch_indicator_rows(4, 2).unwrap().is_empty());
    }

    #[test]
    fn regime_round_trip_with_window() {
        let store = adapter();
        store
            .upsert_regimes(&[
                RegimeRecord {
                    date: date(15),
                    sma_200: 100.0,
                    sma_200_slope_20: None,
                    classification: Regime::Neutral,
                },
                RegimeRecord {
                    date: date(16),
                    sma_200: 101.0,
                    sma_200_slope_20: Some(0.4),
                    classification: Regime::Bull,
                },
            ])
            .unwrap();

        let all = store.fetch_regime_history(None, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].classification, Regime::Neutral);
        assert_eq!(all[1].sma_200_slope_20, Some(0.4));

        let windowed = store
            .fetch_regime_history(Some(date(16)), None)
            .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].classification, Regime::Bull);
    }

    #[test]
    fn regime_upsert_replaces_by_date() {
        let store = adapter();
        let record = RegimeRecord {
            date: date(15),
            sma_200: 100.0,
            sma_200_slope_20: Some(0.1),
            classification: Regime::Bull,
        };
        store.upsert_regimes(&[record.clone()]).unwrap();
        store
            .upsert_regimes(&[RegimeRecord {
                classification: Regime::Bear,
                ..record
            }])
            .unwrap();

        let all = store.fetch_regime_history(None, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].classification, Regime::Bear);
    }

    #[test]
    fn score_round_trip() {
        let store = adapter();
        store
            .upsert_scores(&[ScoreRecord {
                date: date(15),
                symbol: "TCS".into(),
                condition_ema_50_200: true,
                condition_ema_200_slope: true,
                condition_6m_high: false,
                condition_volume: false,
                condition_rs: true,
                total_score: 3,
            }])
            .unwrap();

        let scores = store.fetch_score_history(None, None).unwrap();
        assert_eq!(scores, vec![(date(15), "TCS".to_string(), 3)]);
    }

    #[test]
    fn close_history_respects_the_window() {
        let store = adapter();
        store
            .insert_prices(&[
                price("TCS", 15, 100.0),
                price("TCS", 16, 101.0),
                price("INFY", 16, 50.0),
            ])
            .unwrap();

        let rows = store
            .fetch_close_history(Some(date(16)), Some(date(16)))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(d, _, _)| *d == date(16)));
    }

    #[test]
    fn index_prices_are_separate_from_stock_prices() {
        let store = adapter();
        store
            .insert_index_prices(&[IndexPoint {
                index_id: "NIFTY50".into(),
                date: date(15),
                open: 21_000.0,
                high: 21_200.0,
                low: 20_900.0,
                close: 21_100.0,
            }])
            .unwrap();

        let series = store.fetch_index_series("NIFTY50").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].close, 21_100.0);
        assert!(store.list_symbols().unwrap().is_empty());
    }
}
