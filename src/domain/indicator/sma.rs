//! Simple moving averages over close and volume.
//!
//! MA[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Rolling mean with a running sum. `None` until a full window is available.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    build_series(bars, &closes, period, IndicatorType::Sma(period))
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    build_series(bars, &volumes, period, IndicatorType::VolumeSma(period))
}

fn build_series(
    bars: &[OhlcvBar],
    inputs: &[f64],
    period: usize,
    indicator_type: IndicatorType,
) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let values = bars
        .iter()
        .zip(rolling_mean(inputs, period))
        .map(|(bar, mean)| IndicatorPoint {
            date: bar.date,
            valid: mean.is_some(),
            value: IndicatorValue::Simple(mean.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
