//! Configuration validation.
//!
//! Validates the `[simulation]` and `[pipeline]` sections before any stage
//! runs. Every check is fatal; nothing here is skip-and-continue.

use chrono::NaiveDate;

use crate::domain::error::PipelineError;
use crate::ports::config_port::ConfigPort;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    validate_initial_capital(config)?;
    validate_score_thresholds(config)?;
    validate_trailing_stop(config)?;
    validate_transaction_cost(config)?;
    validate_max_positions(config)?;
    validate_position_size(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_pipeline_config(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    match config.get_string("pipeline", "benchmark_index") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(PipelineError::ConfigMissing {
                section: "pipeline".to_string(),
                key: "benchmark_index".to_string(),
            })
        }
    }

    let min_rows = config.get_int("pipeline", "min_history_rows", 28);
    if min_rows < 1 {
        return Err(PipelineError::ConfigInvalid {
            section: "pipeline".to_string(),
            key: "min_history_rows".to_string(),
            reason: "min_history_rows must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_double("simulation", "initial_capital", 100_000.0);
    if value <= 0.0 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_score_thresholds(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let entry = config.get_int("simulation", "entry_score_threshold", 4);
    if !(0..=5).contains(&entry) {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "entry_score_threshold".to_string(),
            reason: "entry_score_threshold must be between 0 and 5".to_string(),
        });
    }
    let exit = config.get_int("simulation", "exit_score_threshold", 2);
    if !(0..=5).contains(&exit) {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "exit_score_threshold".to_string(),
            reason: "exit_score_threshold must be between 0 and 5".to_string(),
        });
    }
    if exit >= entry {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "exit_score_threshold".to_string(),
            reason: "exit_score_threshold must be below entry_score_threshold".to_string(),
        });
    }
    Ok(())
}

fn validate_trailing_stop(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_double("simulation", "trailing_stop", 0.20);
    if value <= 0.0 || value >= 1.0 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "trailing_stop".to_string(),
            reason: "trailing_stop must be between 0 and 1 exclusive".to_string(),
        });
    }
    Ok(())
}

fn validate_transaction_cost(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_double("simulation", "transaction_cost", 0.004);
    if value < 0.0 || value >= 1.0 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "transaction_cost".to_string(),
            reason: "transaction_cost must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_int("simulation", "max_positions", 10);
    if value < 1 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "max_positions".to_string(),
            reason: "max_positions must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_position_size(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_double("simulation", "position_size", 0.10);
    if value <= 0.0 || value > 1.0 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "position_size".to_string(),
            reason: "position_size must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let value = config.get_double("simulation", "risk_free_rate", 0.05);
    if value < 0.0 || value >= 1.0 {
        return Err(PipelineError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

/// Both dates are optional (the window defaults to the full regime calendar)
/// but when both are given they must be well-formed and ordered.
fn validate_dates(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let start = parse_optional_date(config.get_string("simulation", "start_date"), "start_date")?;
    let end = parse_optional_date(config.get_string("simulation", "end_date"), "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(PipelineError::ConfigInvalid {
                section: "simulation".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
    }
    Ok(())
}

fn parse_optional_date(
    value: Option<String>,
    field: &str,
) -> Result<Option<NaiveDate>, PipelineError> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| PipelineError::ConfigInvalid {
                section: "simulation".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }),
    }
}
