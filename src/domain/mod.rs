//! Core pipeline types and logic.

pub mod price;
pub mod indicator;
pub mod regime;
pub mod score;
pub mod position;
pub mod portfolio;
pub mod simulation;
pub mod metrics;
pub mod scenario;
pub mod config_validation;
pub mod error;
