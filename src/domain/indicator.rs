//! Indicator engine: per-symbol technical features derived from price history.
//!
//! All series are time-ordered per symbol. Undefined values are `None` and
//! propagate; downstream scoring treats them as condition-false.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::price::{IndexPoint, PricePoint};

/// Minimum price history for a symbol to be worth computing features for.
pub const MIN_HISTORY_ROWS: usize = 28;

pub const EMA_FAST_SPAN: usize = 50;
pub const EMA_SLOW_SPAN: usize = 200;
pub const SLOPE_WINDOW: usize = 20;
pub const ROLLING_HIGH_WINDOW: usize = 126;
pub const AVG_VOLUME_WINDOW: usize = 20;
pub const RELATIVE_STRENGTH_WINDOW: usize = 90;

/// One row of derived features for a (symbol, date).
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub symbol: String,
    pub date: NaiveDate,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    pub ema_200_slope_20: Option<f64>,
    pub rolling_high_6m: Option<f64>,
    pub avg_volume_20d: Option<f64>,
    pub rs_90d: Option<f64>,
}

/// A symbol rejected for insufficient history, reported rather than dropped.
#[derive(Debug, Clone)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub rows: usize,
}

/// Recursive EMA with smoothing k = 2/(span+1), seeded from the first close.
/// Defined from the first observation onward.
pub fn calc_ema(closes: &[f64], span: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    if span == 0 || closes.is_empty() {
        return out;
    }
    let k = 2.0 / (span as f64 + 1.0);
    let mut ema = closes[0];
    out.push(ema);
    for &close in &closes[1..] {
        ema = close * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

/// OLS regression slope of the trailing `window` values against x = 0..window.
/// `None` until `window` observations exist or if any window value is `None`.
pub fn regression_slope(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    let n = window as f64;
    let x_mean = (n - 1.0) / 2.0;
    // Σ(x - x̄)² for x = 0..n is n(n²-1)/12
    let x_var_sum = n * (n * n - 1.0) / 12.0;

    for i in (window - 1)..values.len() {
        let w = &values[i + 1 - window..=i];
        if w.iter().any(|v| v.is_none()) {
            continue;
        }
        let y_mean: f64 = w.iter().map(|v| v.unwrap()).sum::<f64>() / n;
        let cov: f64 = w
            .iter()
            .enumerate()
            .map(|(x, v)| (x as f64 - x_mean) * (v.unwrap() - y_mean))
            .sum();
        out[i] = Some(cov / x_var_sum);
    }
    out
}

/// Rolling maximum over the trailing `window` values, shrinking at the start.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let lo = i.saturating_sub(window - 1);
            values[lo..=i].iter().cloned().fold(f64::MIN, f64::max)
        })
        .collect()
}

/// Rolling mean over the trailing `window` values, shrinking at the start.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let lo = i.saturating_sub(window - 1);
            let w = &values[lo..=i];
            w.iter().sum::<f64>() / w.len() as f64
        })
        .collect()
}

/// Percentage change over `periods` prior observations; `None` until enough
/// history exists or when the base value is non-positive.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i < periods {
                return None;
            }
            let base = values[i - periods];
            if base > 0.0 {
                Some(v / base - 1.0)
            } else {
                None
            }
        })
        .collect()
}

/// Benchmark 90-session return keyed by calendar date, for relative strength.
pub fn index_return_map(index: &[IndexPoint]) -> BTreeMap<NaiveDate, Option<f64>> {
    let closes: Vec<f64> = index.iter().map(|p| p.close).collect();
    let returns = pct_change(&closes, RELATIVE_STRENGTH_WINDOW);
    index
        .iter()
        .zip(returns)
        .map(|(p, r)| (p.date, r))
        .collect()
}

/// Derive the full feature row set for one symbol's ordered price history.
///
/// Returns `None` (to be reported as skipped) when fewer than
/// [`MIN_HISTORY_ROWS`] observations exist.
pub fn compute_symbol_indicators(
    points: &[PricePoint],
    index_returns: &BTreeMap<NaiveDate, Option<f64>>,
) -> Option<Vec<IndicatorSet>> {
    if points.len() < MIN_HISTORY_ROWS {
        return None;
    }

    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let highs: Vec<f64> = points.iter().map(|p| p.high).collect();
    let volumes: Vec<f64> = points.iter().map(|p| p.volume as f64).collect();

    let ema_50 = calc_ema(&closes, EMA_FAST_SPAN);
    // Zero slow EMAs come from degenerate price history; treat as undefined so
    // the slope window rejects them.
    let ema_200: Vec<Option<f64>> = calc_ema(&closes, EMA_SLOW_SPAN)
        .into_iter()
        .map(|v| if v == 0.0 { None } else { Some(v) })
        .collect();
    let slope = regression_slope(&ema_200, SLOPE_WINDOW);
    let high_6m = rolling_max(&highs, ROLLING_HIGH_WINDOW);
    let avg_vol = rolling_mean(&volumes, AVG_VOLUME_WINDOW);
    let stock_return = pct_change(&closes, RELATIVE_STRENGTH_WINDOW);

    let rows = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let rs_90d = match (stock_return[i], index_returns.get(&p.date)) {
                (Some(s), Some(Some(b))) => Some(s - b),
                _ => None,
            };
            IndicatorSet {
                symbol: p.symbol.clone(),
                date: p.date,
                ema_50: Some(ema_50[i]),
                ema_200: ema_200[i],
                ema_200_slope_20: slope[i],
                rolling_high_6m: Some(high_6m[i]),
                avg_volume_20d: Some(avg_vol[i]),
                rs_90d,
            }
        })
        .collect();

    Some(rows)
}
