//! OHLCV bar representation.

use chrono::NaiveDate;

/// One trading period (a day, or a week after resampling).
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Percent change vs. the previous close, as reported by the source.
    pub pct_chg: Option<f64>,
}

impl OhlcvBar {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Percent change at `index`, falling back to the change between consecutive
/// closes when the source did not report one. `None` for the first bar.
pub fn pct_change_at(bars: &[OhlcvBar], index: usize) -> Option<f64> {
    let bar = bars.get(index)?;
    if let Some(pct) = bar.pct_chg {
        return Some(pct);
    }
    if index == 0 {
        return None;
    }
    let prev_close = bars[index - 1].close;
    if prev_close <= 0.0 {
        return None;
    }
    Some((bar.close / prev_close - 1.0) * 100.0)
}

/// Checks the series invariants the rule engine relies on: strictly
/// increasing dates, finite positive prices and non-negative volume.
pub fn validate_series(bars: &[OhlcvBar]) -> Result<(), String> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(format!("non-positive or non-finite price on {}", bar.date));
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(format!("invalid volume on {}", bar.date));
        }
        if let Some(pct) = bar.pct_chg {
            if !pct.is_finite() {
                return Err(format!("invalid pct_chg on {}", bar.date));
            }
        }
        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(format!(
                "dates not strictly increasing at {} (previous {})",
                bar.date,
                bars[i - 1].date
            ));
        }
    }
    Ok(())
}
