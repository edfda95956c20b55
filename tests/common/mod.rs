#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use stockpick::domain::aggregate::ResultBucket;
use stockpick::domain::error::StockpickError;
pub use stockpick::domain::ohlcv::OhlcvBar;
use stockpick::ports::data_port::DataPort;
use stockpick::ports::names_port::NamesPort;
use stockpick::ports::result_port::ResultPort;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub panics: HashSet<String>,
    pub reverse_listing: bool,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            panics: HashSet::new(),
            reverse_listing: false,
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    /// Fetching this code panics inside the worker.
    pub fn with_panic(mut self, code: &str) -> Self {
        self.panics.insert(code.to_string());
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse_listing = true;
        self
    }
}

impl DataPort for MockDataPort {
    fn list_instruments(&self) -> Result<Vec<String>, StockpickError> {
        let mut codes: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .chain(self.panics.iter())
            .cloned()
            .collect();
        codes.sort();
        codes.dedup();
        if self.reverse_listing {
            codes.reverse();
        }
        Ok(codes)
    }

    fn fetch_series(&self, code: &str) -> Result<Vec<OhlcvBar>, StockpickError> {
        if self.panics.contains(code) {
            panic!("corrupt file for {code}");
        }
        if let Some(reason) = self.errors.get(code) {
            return Err(StockpickError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(code).cloned().unwrap_or_default())
    }
}

pub struct MockNamesPort {
    pub rows: Vec<(String, String)>,
}

impl MockNamesPort {
    pub fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|(c, n)| (c.to_string(), n.to_string()))
                .collect(),
        }
    }
}

impl NamesPort for MockNamesPort {
    fn load_names(&self) -> Result<Vec<(String, String)>, StockpickError> {
        Ok(self.rows.clone())
    }
}

/// Keeps written buckets in memory instead of on disk.
pub struct RecordingResultPort {
    pub written: Mutex<Vec<(NaiveDate, ResultBucket)>>,
}

impl RecordingResultPort {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn buckets(&self) -> Vec<ResultBucket> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(_, b)| b.clone())
            .collect()
    }
}

impl ResultPort for RecordingResultPort {
    fn write_bucket(
        &self,
        run_date: NaiveDate,
        bucket: &ResultBucket,
    ) -> Result<PathBuf, StockpickError> {
        self.written
            .lock()
            .unwrap()
            .push((run_date, bucket.clone()));
        Ok(PathBuf::from(format!("memory/{}", bucket.rule)))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open,
        high,
        low,
        close,
        volume,
        pct_chg: Some(0.5),
    }
}

/// Consecutive calendar days starting 2024-01-01 with a quiet, slightly
/// bullish bar each day.
pub fn flat_series(count: usize) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    (0..count)
        .map(|i| bar(start + Duration::days(i as i64), 10.0, 10.2, 9.9, 10.1, 1000.0))
        .collect()
}

/// Steadily rising closes so that MA(5) > MA(13) > MA(21) once warmed up.
/// The final bar carries `last_volume`; all others trade 1000.
pub fn rising_series(count: usize, last_volume: f64) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    (0..count)
        .map(|i| {
            let close = 10.0 + 0.1 * i as f64;
            let volume = if i + 1 == count { last_volume } else { 1000.0 };
            bar(
                start + Duration::days(i as i64),
                close - 0.05,
                close + 0.05,
                close - 0.1,
                close,
                volume,
            )
        })
        .collect()
}

/// 20 bars: a bearish limit-up anchor at bar 10, a light bearish pullback at
/// bar 14 and a final close above the pullback high.
pub fn breakout_series() -> Vec<OhlcvBar> {
    let start = date(2024, 3, 1);
    let day = |i: i64| start + Duration::days(i);
    let mut bars: Vec<OhlcvBar> = (0..10)
        .map(|i| bar(day(i), 10.0, 10.2, 9.9, 10.1, 1000.0))
        .collect();

    let mut anchor = bar(day(10), 11.2, 11.3, 10.8, 10.9, 5000.0);
    anchor.pct_chg = Some(9.9);
    bars.push(anchor);

    for i in 11..19 {
        if i == 14 {
            bars.push(bar(day(i), 11.1, 11.15, 10.9, 11.0, 2000.0));
        } else {
            bars.push(bar(day(i), 11.0, 11.2, 10.9, 11.1, 2000.0));
        }
    }

    bars.push(bar(day(19), 11.1, 11.4, 11.0, 11.3, 3000.0));
    bars
}

/// 60 rising bars: a limit-up at bar 55 on 5000 volume, a quiet bar 58 and a
/// 3% rebound at bar 59 on 3000 volume. MA(13) sits above MA(55) throughout.
pub fn retrace_series() -> Vec<OhlcvBar> {
    let mut bars = rising_series(60, 3000.0);
    bars[55].volume = 5000.0;
    bars[55].pct_chg = Some(10.0);
    bars[59].pct_chg = Some(3.0);
    bars
}

/// `weeks` full trading weeks (Mon-Fri) from Monday 2024-01-01 with closes
/// rising 0.02 per day. Every day trades 1000 except the final week, which
/// trades `last_week_volume` per day.
pub fn weekly_trend_series(weeks: i64, last_week_volume: f64) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    let mut bars = Vec::new();
    for week in 0..weeks {
        for day in 0..5 {
            let n = (week * 5 + day) as f64;
            let close = 10.0 + 0.02 * n;
            let volume = if week + 1 == weeks {
                last_week_volume
            } else {
                1000.0
            };
            bars.push(bar(
                start + Duration::days(week * 7 + day),
                close - 0.01,
                close + 0.02,
                close - 0.02,
                close,
                volume,
            ));
        }
    }
    bars
}
