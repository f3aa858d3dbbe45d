//! Stock scorer: five boolean conditions folded into a 0-5 composite score.
//!
//! Each row's score is self-contained, so batches of any size can be scored
//! independently and chunk boundaries never split a computation.

use chrono::NaiveDate;

use super::indicator::IndicatorSet;

pub const VOLUME_BREAKOUT_MULT: f64 = 1.5;

/// A feature row joined with the raw close/volume it was derived from, as
/// produced by the feature store's batched reads.
#[derive(Debug, Clone)]
pub struct ScorerInput {
    pub indicators: IndicatorSet,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub condition_ema_50_200: bool,
    pub condition_ema_200_slope: bool,
    pub condition_6m_high: bool,
    pub condition_volume: bool,
    pub condition_rs: bool,
    pub total_score: i32,
}

impl ScoreRecord {
    pub fn condition_count(&self) -> i32 {
        [
            self.condition_ema_50_200,
            self.condition_ema_200_slope,
            self.condition_6m_high,
            self.condition_volume,
            self.condition_rs,
        ]
        .iter()
        .filter(|&&c| c)
        .count() as i32
    }
}

/// Score a single row. Undefined indicator values make their condition false.
pub fn score_row(input: &ScorerInput) -> ScoreRecord {
    let ind = &input.indicators;

    let condition_ema_50_200 = matches!(
        (ind.ema_50, ind.ema_200),
        (Some(fast), Some(slow)) if fast > slow
    );
    let condition_ema_200_slope = ind.ema_200_slope_20.is_some_and(|s| s > 0.0);
    let condition_6m_high = ind.rolling_high_6m.is_some_and(|h| input.close >= h);
    let condition_volume = ind
        .avg_volume_20d
        .is_some_and(|avg| input.volume as f64 > VOLUME_BREAKOUT_MULT * avg);
    let condition_rs = ind.rs_90d.is_some_and(|rs| rs > 0.0);

    let total_score = [
        condition_ema_50_200,
        condition_ema_200_slope,
        condition_6m_high,
        condition_volume,
        condition_rs,
    ]
    .iter()
    .filter(|&&c| c)
    .count() as i32;

    ScoreRecord {
        date: ind.date,
        symbol: ind.symbol.clone(),
        condition_ema_50_200,
        condition_ema_200_slope,
        condition_6m_high,
        condition_volume,
        condition_rs,
        total_score,
    }
}

/// Score one batch of rows. Output order matches input order.
pub fn score_chunk(inputs: &[ScorerInput]) -> Vec<ScoreRecord> {
    inputs.iter().map(score_row).collect()
}
