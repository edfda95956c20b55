//! MACD-style trend oscillator.
//!
//! Trend Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of the trend line, seeded with its first value
//! Histogram = 2 * (Trend Line - Signal Line)
//!
//! Values exist from the first bar; points before `slow - 1` are flagged as warmup.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let trend_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&trend_line, signal_period);

    let warmup = fast.max(slow) - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            valid: i >= warmup,
            value: IndicatorValue::Macd {
                line: trend_line[i],
                signal: signal_line[i],
                histogram: 2.0 * (trend_line[i] - signal_line[i]),
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
