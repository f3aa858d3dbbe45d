//! Pipeline error types.
//!
//! Symbol-level data problems are skip-and-continue and never surface here;
//! store-level and configuration problems abort the run.

/// Top-level error type for trendfolio.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {rows} rows, need {minimum}")]
    InsufficientData {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("empty simulation date index ({reason})")]
    EmptyDateIndex { reason: String },

    #[error("report write error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PipelineError> for std::process::ExitCode {
    fn from(err: &PipelineError) -> Self {
        let code: u8 = match err {
            PipelineError::Io(_) | PipelineError::Report { .. } => 1,
            PipelineError::ConfigParse { .. }
            | PipelineError::ConfigMissing { .. }
            | PipelineError::ConfigInvalid { .. }
            | PipelineError::EmptyDateIndex { .. } => 2,
            PipelineError::Database { .. } | PipelineError::DatabaseQuery { .. } => 3,
            PipelineError::NoData { .. } | PipelineError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
