//! Daily → weekly resampling.
//!
//! Bars are grouped by calendar week (Monday to Sunday) and labelled with the
//! week-ending Sunday. open = first open, high = max high, low = min low,
//! close = last close, volume = sum. Weeks without bars do not appear.

use crate::domain::ohlcv::OhlcvBar;
use chrono::{Datelike, Duration, NaiveDate};

/// The Sunday closing the calendar week that contains `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - date.weekday().num_days_from_monday() as i64;
    date + Duration::days(days_to_sunday)
}

/// Expects bars in ascending date order.
pub fn resample_weekly(bars: &[OhlcvBar]) -> Vec<OhlcvBar> {
    let mut weeks: Vec<OhlcvBar> = Vec::new();

    for bar in bars {
        let label = week_ending(bar.date);
        match weeks.last_mut() {
            Some(week) if week.date == label => {
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
            }
            _ => weeks.push(OhlcvBar {
                date: label,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                pct_chg: None,
            }),
        }
    }

    for i in 1..weeks.len() {
        let prev_close = weeks[i - 1].close;
        if prev_close > 0.0 {
            weeks[i].pct_chg = Some((weeks[i].close / prev_close - 1.0) * 100.0);
        }
    }

    weeks
}
