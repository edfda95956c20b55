//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod resample;
pub mod scan_config;
pub mod config_validation;
pub mod rule;
pub mod rule_eval;
pub mod universe;
pub mod dispatch;
pub mod scan;
pub mod aggregate;
pub mod error;
