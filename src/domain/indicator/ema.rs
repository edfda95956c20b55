//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No bias adjustment, so every bar carries a value from index 0.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Raw recursive EMA over arbitrary inputs, seeded with `values[0]`.
pub fn ema_values(values: &[f64], span: usize) -> Vec<f64> {
    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = 0.0;
    for (i, v) in values.iter().enumerate() {
        ema = if i == 0 { *v } else { v * k + ema * (1.0 - k) };
        out.push(ema);
    }
    out
}

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .zip(ema_values(&closes, period))
        .map(|(bar, ema)| IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(ema),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
