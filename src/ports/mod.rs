//! Port traits decoupling the domain from storage, configuration and reports.

pub mod config_port;
pub mod feature_store_port;
pub mod price_store_port;
pub mod report_port;
