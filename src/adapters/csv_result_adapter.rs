//! CSV result sink.
//!
//! Each bucket lands in `<base>/<YYYYMMDD>/<rule>/<rule>_results.csv`,
//! UTF-8 with a byte-order mark so spreadsheet tools pick the right encoding
//! for the instrument names.

use crate::domain::aggregate::ResultBucket;
use crate::domain::error::StockpickError;
use crate::domain::scan::MatchRecord;
use crate::ports::result_port::ResultPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    code: &'a str,
    name: &'a str,
    date: String,
    close: f64,
    pct_chg: Option<f64>,
    volume_ratio: Option<f64>,
}

impl<'a> From<&'a MatchRecord> for ResultRow<'a> {
    fn from(record: &'a MatchRecord) -> Self {
        Self {
            code: &record.code,
            name: &record.name,
            date: record.date.format("%Y-%m-%d").to_string(),
            close: record.close,
            pct_chg: record.pct_chg,
            volume_ratio: record.volume_ratio.map(|r| (r * 100.0).round() / 100.0),
        }
    }
}

pub struct CsvResultAdapter {
    base_path: PathBuf,
}

impl CsvResultAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn bucket_path(&self, run_date: NaiveDate, rule: &str) -> PathBuf {
        self.base_path
            .join(run_date.format("%Y%m%d").to_string())
            .join(rule)
            .join(format!("{}_results.csv", rule))
    }
}

fn output_error(path: &std::path::Path, e: impl std::fmt::Display) -> StockpickError {
    StockpickError::Output {
        reason: format!("{}: {}", path.display(), e),
    }
}

impl ResultPort for CsvResultAdapter {
    fn write_bucket(
        &self,
        run_date: NaiveDate,
        bucket: &ResultBucket,
    ) -> Result<PathBuf, StockpickError> {
        let path = self.bucket_path(run_date, bucket.rule.name());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| output_error(dir, e))?;
        }

        let mut file = File::create(&path).map_err(|e| output_error(&path, e))?;
        file.write_all(UTF8_BOM).map_err(|e| output_error(&path, e))?;

        let mut wtr = csv::Writer::from_writer(file);
        for record in &bucket.records {
            wtr.serialize(ResultRow::from(record))
                .map_err(|e| output_error(&path, e))?;
        }
        wtr.flush().map_err(|e| output_error(&path, e))?;

        tracing::debug!(rule = %bucket.rule, rows = bucket.records.len(), path = %path.display(), "bucket written");
        Ok(path)
    }
}
