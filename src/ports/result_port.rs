//! Result persistence port trait.

use crate::domain::aggregate::ResultBucket;
use crate::domain::error::StockpickError;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Port for persisting ranked result buckets.
pub trait ResultPort {
    /// Writes one bucket and returns where it went.
    fn write_bucket(
        &self,
        run_date: NaiveDate,
        bucket: &ResultBucket,
    ) -> Result<PathBuf, StockpickError>;

    /// Default implementation: writes each non-empty bucket in turn.
    fn write_all(
        &self,
        run_date: NaiveDate,
        buckets: &[ResultBucket],
    ) -> Result<Vec<PathBuf>, StockpickError> {
        buckets
            .iter()
            .filter(|b| !b.records.is_empty())
            .map(|b| self.write_bucket(run_date, b))
            .collect()
    }
}
