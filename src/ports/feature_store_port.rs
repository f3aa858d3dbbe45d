//! Derived-feature store port trait.
//!
//! Covers everything the pipeline writes and reads back after ingestion:
//! per-symbol indicators, the market regime calendar, and daily scores.
//! All upserts are keyed (symbol, date) or (date) and idempotent, so any
//! stage can be re-run without duplicating rows.

use chrono::NaiveDate;

use crate::domain::error::PipelineError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::regime::RegimeRecord;
use crate::domain::score::{ScoreRecord, ScorerInput};

pub trait FeatureStorePort {
    fn upsert_indicators(&self, rows: &[IndicatorSet]) -> Result<(), PipelineError>;

    fn upsert_regimes(&self, rows: &[RegimeRecord]) -> Result<(), PipelineError>;

    fn upsert_scores(&self, rows: &[ScoreRecord]) -> Result<(), PipelineError>;

    /// Batched read for the scorer: indicator rows joined with their raw
    /// close/volume, ordered by (symbol, date). An empty batch means the
    /// offset is past the end.
    fn fetch_indicator_rows(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScorerInput>, PipelineError>;

    /// Regime calendar within the optional date window, ascending by date.
    fn fetch_regime_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RegimeRecord>, PipelineError>;

    /// (date, symbol, total_score) rows within the window, ascending by date.
    fn fetch_score_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, String, i32)>, PipelineError>;

    /// (date, symbol, close) rows within the window, ascending by date.
    fn fetch_close_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, String, f64)>, PipelineError>;
}
