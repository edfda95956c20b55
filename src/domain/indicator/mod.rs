//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every transform is causal: the value at position `i` only reads bars `0..=i`.

pub mod ema;
pub mod macd;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use sma::{calculate_sma, calculate_volume_sma, rolling_mean};

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    VolumeSma(usize),
    Ema(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

/// Trend/signal/histogram triple read from a MACD point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl IndicatorSeries {
    /// Value at `index` if the point exists and is past its warm-up.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn macd_at(&self, index: usize) -> Option<MacdReading> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    },
                ..
            }) => Some(MacdReading {
                line: *line,
                signal: *signal,
                histogram: *histogram,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "MA({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}
