//! Annualized performance metrics for an equity or price series.
//!
//! Statistics follow sample conventions: standard deviations use the n-1
//! denominator, years are calendar days / 365.25, and annualization assumes
//! 252 trading days. Every ratio degrades to 0.0 when its denominator is
//! undefined rather than propagating NaN into reports.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::PipelineError;

pub const RISK_FREE_RATE: f64 = 0.05;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub name: String,
    pub total_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    pub annual_volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub years: f64,
}

/// Go/no-go verdicts comparing the strategy against its benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdicts {
    pub cagr_beats_benchmark: bool,
    pub drawdown_shallower_than_benchmark: bool,
    pub sharpe_at_least_one: bool,
}

impl Verdicts {
    pub fn evaluate(strategy: &PerformanceMetrics, benchmark: &PerformanceMetrics) -> Self {
        Verdicts {
            cagr_beats_benchmark: strategy.cagr > benchmark.cagr,
            drawdown_shallower_than_benchmark: strategy.max_drawdown.abs()
                < benchmark.max_drawdown.abs(),
            sharpe_at_least_one: strategy.sharpe >= 1.0,
        }
    }

    pub fn all_pass(&self) -> bool {
        self.cagr_beats_benchmark && self.drawdown_shallower_than_benchmark && self.sharpe_at_least_one
    }
}

/// Inner-join two date-keyed series, keeping only dates present in both.
/// Output is ascending by date.
pub fn align_series(
    strategy: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
) -> Vec<(NaiveDate, f64, f64)> {
    let bench_by_date: BTreeMap<NaiveDate, f64> = benchmark.iter().copied().collect();
    let mut aligned: Vec<(NaiveDate, f64, f64)> = strategy
        .iter()
        .filter_map(|&(date, value)| bench_by_date.get(&date).map(|&b| (date, value, b)))
        .collect();
    aligned.sort_by_key(|&(date, _, _)| date);
    aligned
}

/// Compute the full metric set over an aligned (date, value) series.
/// At least two observations are required.
pub fn compute_metrics(
    name: &str,
    series: &[(NaiveDate, f64)],
) -> Result<PerformanceMetrics, PipelineError> {
    if series.len() < 2 {
        return Err(PipelineError::EmptyDateIndex {
            reason: format!("{} series has {} points, need at least 2", name, series.len()),
        });
    }

    let values: Vec<f64> = series.iter().map(|&(_, v)| v).collect();
    let first = values[0];
    let last = values[values.len() - 1];

    let returns = daily_returns(&values);
    let days = (series[series.len() - 1].0 - series[0].0).num_days();
    let years = days as f64 / 365.25;

    let total_return = last / first - 1.0;
    let cagr = if years > 0.0 && first > 0.0 {
        (last / first).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let max_drawdown = max_drawdown(&values);

    let returns_std = sample_std(&returns);
    let annual_volatility = returns_std.map_or(0.0, |s| s * TRADING_DAYS_PER_YEAR.sqrt());

    let daily_rf = RISK_FREE_RATE / TRADING_DAYS_PER_YEAR;
    let mean_excess = mean(&returns).map_or(0.0, |m| m - daily_rf);

    let sharpe = match returns_std {
        Some(s) if s != 0.0 => (mean_excess / s) * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    };

    let negative: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std =
        sample_std(&negative).map_or(0.0, |s| s * TRADING_DAYS_PER_YEAR.sqrt());
    let sortino = if downside_std != 0.0 {
        (mean_excess * TRADING_DAYS_PER_YEAR) / downside_std
    } else {
        0.0
    };

    let calmar = if max_drawdown != 0.0 {
        cagr / max_drawdown.abs()
    } else {
        0.0
    };

    Ok(PerformanceMetrics {
        name: name.to_string(),
        total_return,
        cagr,
        max_drawdown,
        annual_volatility,
        sharpe,
        sortino,
        calmar,
        years,
    })
}

/// Simple daily returns; one fewer element than the input series.
fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

/// Deepest peak-to-trough decline: min over v / running_max - 1. Always
/// non-positive.
fn max_drawdown(values: &[f64]) -> f64 {
    let mut running_max = f64::MIN;
    let mut worst = 0.0_f64;
    for &v in values {
        if v > running_max {
            running_max = v;
        }
        let drawdown = v / running_max - 1.0;
        if drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n-1 denominator); None for fewer than two
/// observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}
