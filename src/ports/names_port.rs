//! Instrument name registry port trait.

use crate::domain::error::StockpickError;

pub trait NamesPort {
    /// Raw `(code, display name)` rows, before normalization or exclusion.
    fn load_names(&self) -> Result<Vec<(String, String)>, StockpickError>;
}
