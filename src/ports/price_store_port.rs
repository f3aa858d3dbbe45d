//! Raw price store port trait.

use crate::domain::error::PipelineError;
use crate::domain::price::{IndexPoint, PricePoint};

/// Read access to the ingested daily bars. All series come back ascending by
/// date.
pub trait PriceStorePort {
    fn fetch_price_series(&self, symbol: &str) -> Result<Vec<PricePoint>, PipelineError>;

    fn fetch_index_series(&self, index_id: &str) -> Result<Vec<IndexPoint>, PipelineError>;

    fn list_symbols(&self) -> Result<Vec<String>, PipelineError>;
}
