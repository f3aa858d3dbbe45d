//! CSV report adapter.
//!
//! Writes the three simulation artifacts with fixed column names so
//! downstream notebooks can consume them unchanged, plus a Markdown
//! rendition of the summary table.

use std::fs;
use std::path::Path;

use crate::domain::error::PipelineError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::portfolio::EquitySnapshot;
use crate::domain::position::TradeRecord;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

fn csv_err(e: csv::Error) -> PipelineError {
    PipelineError::Report {
        reason: e.to_string(),
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), PipelineError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn summary_row(m: &PerformanceMetrics) -> Vec<String> {
    vec![
        m.name.clone(),
        format!("{:.2}", m.cagr * 100.0),
        format!("{:.2}", m.max_drawdown * 100.0),
        format!("{:.2}", m.sharpe),
        format!("{:.2}", m.sortino),
        format!("{:.2}", m.calmar),
        format!("{:.2}", m.total_return * 100.0),
        format!("{:.2}", m.annual_volatility * 100.0),
        format!("{:.1}", m.years),
    ]
}

/// Read a previously exported equity curve back as a (date, equity) series.
/// Used by the metrics stage, which consumes the simulator's artifact rather
/// than the store.
pub fn read_equity_curve(path: &str) -> Result<Vec<(chrono::NaiveDate, f64)>, PipelineError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let mut series = Vec::new();

    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let date_str = record.get(0).ok_or_else(|| PipelineError::Report {
            reason: format!("{}: missing date column", path),
        })?;
        let date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            PipelineError::Report {
                reason: format!("{}: invalid date {}: {}", path, date_str, e),
            }
        })?;
        let equity: f64 = record
            .get(1)
            .ok_or_else(|| PipelineError::Report {
                reason: format!("{}: missing equity column", path),
            })?
            .parse()
            .map_err(|e| PipelineError::Report {
                reason: format!("{}: invalid equity value: {}", path, e),
            })?;
        series.push((date, equity));
    }

    Ok(series)
}

const SUMMARY_HEADER: [&str; 9] = [
    "Portfolio",
    "CAGR (%)",
    "Max Drawdown (%)",
    "Sharpe Ratio",
    "Sortino Ratio",
    "Calmar Ratio",
    "Total Return (%)",
    "Ann. Volatility (%)",
    "Years",
];

impl ReportPort for CsvReportAdapter {
    fn write_equity_curve(
        &self,
        snapshots: &[EquitySnapshot],
        output_path: &str,
    ) -> Result<(), PipelineError> {
        ensure_parent_dir(output_path)?;
        let mut writer = csv::Writer::from_path(output_path).map_err(csv_err)?;

        writer
            .write_record(["date", "equity", "cash", "open_positions"])
            .map_err(csv_err)?;
        for snap in snapshots {
            writer
                .write_record([
                    snap.date.format("%Y-%m-%d").to_string(),
                    format!("{:.2}", snap.equity),
                    format!("{:.2}", snap.cash),
                    snap.open_positions.to_string(),
                ])
                .map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_trade_log(
        &self,
        trades: &[TradeRecord],
        output_path: &str,
    ) -> Result<(), PipelineError> {
        ensure_parent_dir(output_path)?;
        let mut writer = csv::Writer::from_path(output_path).map_err(csv_err)?;

        writer
            .write_record([
                "symbol",
                "entry_date",
                "exit_date",
                "entry_price",
                "exit_price",
                "shares",
                "pnl",
                "exit_reason",
            ])
            .map_err(csv_err)?;
        for trade in trades {
            writer
                .write_record([
                    trade.symbol.clone(),
                    trade.entry_date.format("%Y-%m-%d").to_string(),
                    trade.exit_date.format("%Y-%m-%d").to_string(),
                    format!("{:.2}", trade.entry_price),
                    format!("{:.2}", trade.exit_price),
                    trade.shares.to_string(),
                    format!("{:.2}", trade.pnl),
                    trade.exit_reason.to_string(),
                ])
                .map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_performance_summary(
        &self,
        rows: &[PerformanceMetrics],
        output_path: &str,
    ) -> Result<(), PipelineError> {
        ensure_parent_dir(output_path)?;
        let mut writer = csv::Writer::from_path(output_path).map_err(csv_err)?;

        writer.write_record(SUMMARY_HEADER).map_err(csv_err)?;
        for metrics in rows {
            writer.write_record(summary_row(metrics)).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_performance_markdown(
        &self,
        rows: &[PerformanceMetrics],
        output_path: &str,
    ) -> Result<(), PipelineError> {
        ensure_parent_dir(output_path)?;

        let mut out = String::new();
        out.push_str(&format!("| {} |\n", SUMMARY_HEADER.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            SUMMARY_HEADER.map(|_| "---|").join("")
        ));
        for metrics in rows {
            out.push_str(&format!("| {} |\n", summary_row(metrics).join(" | ")));
        }

        fs::write(output_path, out)?;
        Ok(())
    }
}
