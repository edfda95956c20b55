//! Data access port trait.

use crate::domain::error::StockpickError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Instrument codes with a price history available, sorted.
    fn list_instruments(&self) -> Result<Vec<String>, StockpickError>;

    /// Full daily history for one instrument in ascending date order.
    fn fetch_series(&self, code: &str) -> Result<Vec<OhlcvBar>, StockpickError>;
}
