//! Market regime classifier: a daily trend label for the benchmark index.

use chrono::NaiveDate;
use std::fmt;

use super::indicator::{regression_slope, rolling_mean, SLOPE_WINDOW};
use super::price::IndexPoint;

pub const SMA_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Bull,
    Bear,
    Neutral,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bull => write!(f, "BULL"),
            Regime::Bear => write!(f, "BEAR"),
            Regime::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl Regime {
    pub fn parse(s: &str) -> Option<Regime> {
        match s {
            "BULL" => Some(Regime::Bull),
            "BEAR" => Some(Regime::Bear),
            "NEUTRAL" => Some(Regime::Neutral),
            _ => None,
        }
    }
}

/// One classified day, keyed by date.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeRecord {
    pub date: NaiveDate,
    pub sma_200: f64,
    pub sma_200_slope_20: Option<f64>,
    pub classification: Regime,
}

/// Classify every day of the benchmark series.
///
/// SMA uses a shrinking window at the series start, so it is defined from the
/// first observation; the 20-day slope is the only source of NEUTRAL-by-default.
pub fn classify_series(index: &[IndexPoint]) -> Vec<RegimeRecord> {
    let closes: Vec<f64> = index.iter().map(|p| p.close).collect();
    let sma = rolling_mean(&closes, SMA_WINDOW);
    let sma_opt: Vec<Option<f64>> = sma.iter().map(|&v| Some(v)).collect();
    let slope = regression_slope(&sma_opt, SLOPE_WINDOW);

    index
        .iter()
        .enumerate()
        .map(|(i, p)| RegimeRecord {
            date: p.date,
            sma_200: sma[i],
            sma_200_slope_20: slope[i],
            classification: classify_day(p.close, sma[i], slope[i]),
        })
        .collect()
}

fn classify_day(close: f64, sma: f64, slope: Option<f64>) -> Regime {
    let Some(slope) = slope else {
        return Regime::Neutral;
    };
    if close > sma && slope > 0.0 {
        Regime::Bull
    } else if close < sma && slope < 0.0 {
        Regime::Bear
    } else {
        Regime::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_index(closes: &[f64]) -> Vec<IndexPoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| IndexPoint {
                index_id: "NIFTY50".into(),
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect()
    }

    #[test]
    fn neutral_while_slope_undefined() {
        let records = classify_series(&make_index(&[100.0; 19]));
        assert_eq!(records.len(), 19);
        for r in &records {
            assert_eq!(r.classification, Regime::Neutral);
            assert!(r.sma_200_slope_20.is_none());
        }
    }

    #[test]
    fn rising_series_turns_bull() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let records = classify_series(&make_index(&closes));
        let last = records.last().unwrap();
        assert_eq!(last.classification, Regime::Bull);
        assert!(last.sma_200_slope_20.unwrap() > 0.0);
        assert!(closes[59] > last.sma_200);
    }

    #[test]
    fn falling_series_turns_bear() {
        let closes: Vec<f64> = (0..60).map(|i| 1000.0 - 5.0 * i as f64).collect();
        let records = classify_series(&make_index(&closes));
        let last = records.last().unwrap();
        assert_eq!(last.classification, Regime::Bear);
        assert!(last.sma_200_slope_20.unwrap() < 0.0);
    }

    #[test]
    fn flat_series_stays_neutral() {
        let records = classify_series(&make_index(&[100.0; 60]));
        // slope is exactly zero and close == sma: neither BULL nor BEAR
        let last = records.last().unwrap();
        assert_eq!(last.classification, Regime::Neutral);
    }

    #[test]
    fn sign_mismatch_is_neutral() {
        // price collapses below a still-rising average
        let mut closes: Vec<f64> = (0..59).map(|i| 100.0 + 2.0 * i as f64).collect();
        closes.push(50.0);
        let records = classify_series(&make_index(&closes));
        let last = records.last().unwrap();
        assert!(last.sma_200_slope_20.unwrap() > 0.0);
        assert!(closes[59] < last.sma_200);
        assert_eq!(last.classification, Regime::Neutral);
    }

    #[test]
    fn flat_then_jump_transitions_to_bull() {
        // flat at 100 for 199 sessions, then jumps to 150 and holds
        let mut closes = vec![100.0; 199];
        closes.extend(vec![150.0; 40]);
        let records = classify_series(&make_index(&closes));

        assert_eq!(records[150].classification, Regime::Neutral);
        let last = records.last().unwrap();
        assert_eq!(last.classification, Regime::Bull);
        assert!(last.sma_200_slope_20.unwrap() > 0.0);
        assert!(150.0 > last.sma_200);
    }

    #[test]
    fn classification_is_deterministic() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + (i % 7) as f64).collect();
        let index = make_index(&closes);
        assert_eq!(classify_series(&index), classify_series(&index));
    }

    #[test]
    fn regime_display_and_parse_round_trip() {
        for r in [Regime::Bull, Regime::Bear, Regime::Neutral] {
            assert_eq!(Regime::parse(&r.to_string()), Some(r));
        }
        assert_eq!(Regime::parse("SIDEWAYS"), None);
    }
}
