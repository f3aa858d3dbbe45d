//! Report generation port trait.

use crate::domain::error::PipelineError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::portfolio::EquitySnapshot;
use crate::domain::position::TradeRecord;

/// Port for writing simulation artifacts and the performance report.
pub trait ReportPort {
    fn write_equity_curve(
        &self,
        snapshots: &[EquitySnapshot],
        output_path: &str,
    ) -> Result<(), PipelineError>;

    fn write_trade_log(
        &self,
        trades: &[TradeRecord],
        output_path: &str,
    ) -> Result<(), PipelineError>;

    /// One row per portfolio (strategy first, then benchmark).
    fn write_performance_summary(
        &self,
        rows: &[PerformanceMetrics],
        output_path: &str,
    ) -> Result<(), PipelineError>;

    /// Markdown rendition of the same summary table.
    fn write_performance_markdown(
        &self,
        rows: &[PerformanceMetrics],
        output_path: &str,
    ) -> Result<(), PipelineError>;
}
