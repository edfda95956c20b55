//! Shared helper functions for indicator calculations.

use crate::domain::indicator::{
    calculate_ema, calculate_macd, calculate_sma, calculate_volume_sma, IndicatorSeries,
    IndicatorType,
};
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashMap;

pub fn compute_indicator(bars: &[OhlcvBar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::VolumeSma(period) => calculate_volume_sma(bars, period),
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
    }
}

/// Computes each requested indicator once, keyed by its type.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    indicator_types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut indicators = HashMap::with_capacity(indicator_types.len());
    for &indicator_type in indicator_types {
        indicators
            .entry(indicator_type)
            .or_insert_with(|| compute_indicator(bars, indicator_type));
    }
    indicators
}
