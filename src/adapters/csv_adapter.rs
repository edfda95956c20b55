//! CSV file data adapter.
//!
//! Reads one `<code>.csv` per instrument from a directory. Columns are
//! located by header, so both the localized export headers (日期, 开盘, ...)
//! and plain English ones (date, open, ...) work in any order.

use crate::domain::error::StockpickError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    PctChg,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim().trim_start_matches('\u{feff}') {
            "日期" | "date" => Some(Column::Date),
            "开盘" | "open" => Some(Column::Open),
            "最高" | "high" => Some(Column::High),
            "最低" | "low" => Some(Column::Low),
            "收盘" | "close" => Some(Column::Close),
            "成交量" | "volume" => Some(Column::Volume),
            "涨跌幅" | "pct_chg" => Some(Column::PctChg),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
            Column::PctChg => "pct_chg",
        }
    }
}

/// Header positions for one file.
struct Layout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    pct_chg: Option<usize>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, StockpickError> {
        let find = |wanted: Column| {
            headers
                .iter()
                .position(|h| Column::from_header(h) == Some(wanted))
        };
        let require = |wanted: Column| {
            find(wanted).ok_or_else(|| StockpickError::DataSource {
                reason: format!("{}: missing {} column", path.display(), wanted.label()),
            })
        };
        Ok(Self {
            date: require(Column::Date)?,
            open: require(Column::Open)?,
            high: require(Column::High)?,
            low: require(Column::Low)?,
            close: require(Column::Close)?,
            volume: require(Column::Volume)?,
            pct_chg: find(Column::PctChg),
        })
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Timestamps like "2024-01-15 00:00:00" keep only the date part.
    let raw = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_number(raw: &str, column: Column, row: usize) -> Result<f64, StockpickError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| StockpickError::DataSource {
            reason: format!("row {}: invalid {} value {:?}: {}", row, column.label(), raw, e),
        })
}

/// Percent change cell; "3.2%" and "3.2" read the same, blank means absent.
fn parse_pct(raw: &str, row: usize) -> Result<Option<f64>, StockpickError> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    parse_number(cleaned, Column::PctChg, row).map(Some)
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, column: Column, row: usize) -> Result<&'r str, StockpickError> {
    record.get(index).ok_or_else(|| StockpickError::DataSource {
        reason: format!("row {}: missing {} value", row, column.label()),
    })
}

impl DataPort for CsvAdapter {
    fn list_instruments(&self) -> Result<Vec<String>, StockpickError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StockpickError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StockpickError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                codes.push(stem.to_string());
            }
        }

        codes.sort();
        Ok(codes)
    }

    fn fetch_series(&self, code: &str) -> Result<Vec<OhlcvBar>, StockpickError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| StockpickError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| StockpickError::DataSource {
            reason: format!("{}: CSV header error: {}", path.display(), e),
        })?;
        let layout = Layout::from_headers(headers, &path)?;

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let record = result.map_err(|e| StockpickError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = field(&record, layout.date, Column::Date, row)?;
            let date = parse_date(date_str).ok_or_else(|| StockpickError::DataSource {
                reason: format!("row {}: invalid date {:?}", row, date_str),
            })?;

            let pct_chg = match layout.pct_chg {
                Some(index) => parse_pct(field(&record, index, Column::PctChg, row)?, row)?,
                None => None,
            };

            bars.push(OhlcvBar {
                date,
                open: parse_number(field(&record, layout.open, Column::Open, row)?, Column::Open, row)?,
                high: parse_number(field(&record, layout.high, Column::High, row)?, Column::High, row)?,
                low: parse_number(field(&record, layout.low, Column::Low, row)?, Column::Low, row)?,
                close: parse_number(field(&record, layout.close, Column::Close, row)?, Column::Close, row)?,
                volume: parse_number(field(&record, layout.volume, Column::Volume, row)?, Column::Volume, row)?,
                pct_chg,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}
