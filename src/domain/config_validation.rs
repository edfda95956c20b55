//! Configuration validation.
//!
//! Validates every scan parameter before any work is dispatched, so a bad
//! threshold aborts the run instead of silently matching nothing.

use crate::domain::error::StockpickError;
use crate::domain::rule::parse_catalog;
use crate::domain::scan_config::ScanConfig;
use crate::domain::universe::{parse_list, UniverseError};
use crate::ports::config_port::ConfigPort;

pub fn validate_scan_config(config: &ScanConfig) -> Result<(), StockpickError> {
    validate_breakout(config)?;
    validate_support(config)?;
    validate_inflection(config)?;
    validate_fan(config)?;
    validate_chase(config)?;
    validate_retrace(config)?;
    validate_macd(config)?;
    require_window("scan", "ranking_volume_ma", config.ranking_volume_ma)?;
    Ok(())
}

/// Integer-valued keys, per section.
const INTEGER_KEYS: &[(&str, &[&str])] = &[
    (
        "breakout",
        &["min_anchor_offset", "max_anchor_offset", "volume_peak_window"],
    ),
    ("support", &["max_anchor_offset", "volume_ma"]),
    ("inflection", &["ma", "volume_ma"]),
    ("fan", &["fast_ma", "medium_ma", "slow_ma", "volume_ma"]),
    ("retrace", &["window", "fast_ma", "slow_ma", "volume_ma"]),
    (
        "macd",
        &["fast", "slow", "signal", "volume_window", "min_bars"],
    ),
    ("scan", &["workers", "ranking_volume_ma"]),
];

/// Real-valued keys, per section.
const REAL_KEYS: &[(&str, &[&str])] = &[
    ("breakout", &["surge_pct", "pullback_volume_ratio"]),
    ("support", &["volume_multiple"]),
    ("inflection", &["volume_multiple"]),
    ("fan", &["volume_multiple"]),
    ("chase", &["surge_pct", "high_tolerance"]),
    (
        "retrace",
        &["limit_up_pct", "support_tolerance", "shrink_ratio", "min_gain_pct"],
    ),
    ("macd", &["volume_multiple"]),
];

/// Checks the raw run settings: numeric syntax, rule list, universe lists
/// and price band.
pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), StockpickError> {
    validate_numeric_syntax(config)?;
    if let Some(rules) = config.get_string("scan", "rules") {
        parse_catalog(&rules)?;
    }
    for key in ["exclude_prefixes", "exclude_markers"] {
        if let Some(list) = config.get_string("universe", key) {
            parse_list(&list).map_err(|e| invalid("universe", key, e.to_string()))?;
        }
    }
    validate_price_band(config)?;
    if config.get_int("scan", "workers", 0) < 0 {
        return Err(invalid("scan", "workers", "workers must be non-negative"));
    }
    Ok(())
}

/// A present key that does not parse must not fall back to its default.
fn validate_numeric_syntax(config: &dyn ConfigPort) -> Result<(), StockpickError> {
    for (section, keys) in INTEGER_KEYS {
        for key in *keys {
            if let Some(raw) = config.get_string(section, key) {
                if raw.trim().parse::<i64>().is_err() {
                    return Err(invalid(section, key, format!("'{raw}' is not an integer")));
                }
            }
        }
    }
    for (section, keys) in REAL_KEYS {
        for key in *keys {
            if let Some(raw) = config.get_string(section, key) {
                if raw.trim().parse::<f64>().is_err() {
                    return Err(invalid(section, key, format!("'{raw}' is not a number")));
                }
            }
        }
    }
    Ok(())
}

fn validate_price_band(config: &dyn ConfigPort) -> Result<(), StockpickError> {
    let min = config.get_string("universe", "min_price");
    let max = config.get_string("universe", "max_price");
    match (min, max) {
        (None, None) => Ok(()),
        (Some(_), Some(_)) => {
            let min = config.get_double("universe", "min_price", f64::NAN);
            let max = config.get_double("universe", "max_price", f64::NAN);
            if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
                return Err(invalid(
                    "universe",
                    "min_price",
                    UniverseError::InvalidPriceBand { min, max }.to_string(),
                ));
            }
            Ok(())
        }
        (Some(_), None) => Err(StockpickError::ConfigMissing {
            section: "universe".to_string(),
            key: "max_price".to_string(),
        }),
        (None, Some(_)) => Err(StockpickError::ConfigMissing {
            section: "universe".to_string(),
            key: "min_price".to_string(),
        }),
    }
}

fn validate_breakout(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.breakout;
    require_positive("breakout", "surge_pct", p.surge_pct)?;
    require_window("breakout", "min_anchor_offset", p.min_anchor_offset)?;
    if p.max_anchor_offset < p.min_anchor_offset {
        return Err(invalid(
            "breakout",
            "max_anchor_offset",
            "max_anchor_offset must not be below min_anchor_offset",
        ));
    }
    require_window("breakout", "volume_peak_window", p.volume_peak_window)?;
    require_ratio("breakout", "pullback_volume_ratio", p.pullback_volume_ratio)
}

fn validate_support(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.support;
    require_window("support", "max_anchor_offset", p.max_anchor_offset)?;
    require_window("support", "volume_ma", p.volume_ma)?;
    require_positive("support", "volume_multiple", p.volume_multiple)
}

fn validate_inflection(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.inflection;
    require_window("inflection", "ma", p.ma)?;
    require_window("inflection", "volume_ma", p.volume_ma)?;
    require_positive("inflection", "volume_multiple", p.volume_multiple)
}

fn validate_fan(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.fan;
    require_window("fan", "fast_ma", p.fast_ma)?;
    require_window("fan", "medium_ma", p.medium_ma)?;
    require_window("fan", "slow_ma", p.slow_ma)?;
    if !(p.fast_ma < p.medium_ma && p.medium_ma < p.slow_ma) {
        return Err(invalid(
            "fan",
            "medium_ma",
            "windows must satisfy fast_ma < medium_ma < slow_ma",
        ));
    }
    require_window("fan", "volume_ma", p.volume_ma)?;
    require_positive("fan", "volume_multiple", p.volume_multiple)
}

fn validate_chase(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.chase;
    require_positive("chase", "surge_pct", p.surge_pct)?;
    require_positive("chase", "high_tolerance", p.high_tolerance)
}

fn validate_retrace(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.retrace;
    if p.window < 3 {
        return Err(invalid("retrace", "window", "window must be at least 3"));
    }
    require_positive("retrace", "limit_up_pct", p.limit_up_pct)?;
    require_window("retrace", "fast_ma", p.fast_ma)?;
    require_window("retrace", "slow_ma", p.slow_ma)?;
    if p.fast_ma >= p.slow_ma {
        return Err(invalid("retrace", "fast_ma", "fast_ma must be below slow_ma"));
    }
    if !(0.0..1.0).contains(&p.support_tolerance) {
        return Err(invalid(
            "retrace",
            "support_tolerance",
            "support_tolerance must be in [0, 1)",
        ));
    }
    require_ratio("retrace", "shrink_ratio", p.shrink_ratio)?;
    if !p.min_gain_pct.is_finite() || p.min_gain_pct < 0.0 {
        return Err(invalid(
            "retrace",
            "min_gain_pct",
            "min_gain_pct must be non-negative",
        ));
    }
    require_window("retrace", "volume_ma", p.volume_ma)
}

fn validate_macd(config: &ScanConfig) -> Result<(), StockpickError> {
    let p = &config.macd;
    require_window("macd", "fast", p.fast)?;
    require_window("macd", "slow", p.slow)?;
    require_window("macd", "signal", p.signal)?;
    if p.fast >= p.slow {
        return Err(invalid("macd", "fast", "fast must be below slow"));
    }
    require_window("macd", "volume_window", p.volume_window)?;
    require_positive("macd", "volume_multiple", p.volume_multiple)?;
    require_window("macd", "min_bars", p.min_bars)
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockpickError {
    StockpickError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_window(section: &str, key: &str, value: usize) -> Result<(), StockpickError> {
    if value == 0 {
        return Err(invalid(section, key, format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn require_positive(section: &str, key: &str, value: f64) -> Result<(), StockpickError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(section, key, format!("{} must be positive", key)));
    }
    Ok(())
}

fn require_ratio(section: &str, key: &str, value: f64) -> Result<(), StockpickError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(invalid(section, key, format!("{} must be in (0, 1]", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::scan_config::{FanParams, MacdParams, RetraceParams};

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn default_scan_config_passes() {
        assert!(validate_scan_config(&ScanConfig::default()).is_ok());
    }

    #[test]
    fn fan_windows_out_of_order_fails() {
        let config = ScanConfig {
            fan: FanParams {
                fast_ma: 13,
                medium_ma: 5,
                ..FanParams::default()
            },
            ..ScanConfig::default()
        };
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "medium_ma"));
    }

    #[test]
    fn macd_fast_not_below_slow_fails() {
        let config = ScanConfig {
            macd: MacdParams {
                fast: 26,
                slow: 26,
                ..MacdParams::default()
            },
            ..ScanConfig::default()
        };
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigInvalid { section, .. } if section == "macd"));
    }

    #[test]
    fn zero_volume_window_fails() {
        let config = ScanConfig {
            macd: MacdParams {
                volume_window: 0,
                ..MacdParams::default()
            },
            ..ScanConfig::default()
        };
        let err = validate_scan_config(&config).unwrap_err();
        assert!(
            matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "volume_window")
        );
    }

    #[test]
    fn retrace_window_too_small_fails() {
        let config = ScanConfig {
            retrace: RetraceParams {
                window: 2,
                ..RetraceParams::default()
            },
            ..ScanConfig::default()
        };
        let err = validate_scan_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "window"));
    }

    #[test]
    fn shrink_ratio_above_one_fails() {
        let config = ScanConfig {
            retrace: RetraceParams {
                shrink_ratio: 1.5,
                ..RetraceParams::default()
            },
            ..ScanConfig::default()
        };
        assert!(validate_scan_config(&config).is_err());
    }

    #[test]
    fn valid_run_config_passes() {
        let config = make_config(
            "[scan]\nrules = ma_fan, macd_trend_weekly\nworkers = 4\n[universe]\nexclude_prefixes = 30,68\nmin_price = 5\nmax_price = 20\n",
        );
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn unknown_rule_fails() {
        let config = make_config("[scan]\nrules = ma_fan,moon_shot\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::UnknownRule(_)));
    }

    #[test]
    fn duplicate_prefix_fails() {
        let config = make_config("[universe]\nexclude_prefixes = 30,30\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(
            matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "exclude_prefixes")
        );
    }

    #[test]
    fn half_price_band_fails() {
        let config = make_config("[universe]\nmin_price = 5\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigMissing { key, .. } if key == "max_price"));
    }

    #[test]
    fn inverted_price_band_fails() {
        let config = make_config("[universe]\nmin_price = 20\nmax_price = 5\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "min_price"));
    }

    #[test]
    fn unparsable_window_fails() {
        let config = make_config("[fan]\nslow_ma = twenty\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(
            matches!(err, StockpickError::ConfigInvalid { section, key, .. } if section == "fan" && key == "slow_ma")
        );
    }

    #[test]
    fn decimal_comma_threshold_fails() {
        let config = make_config("[retrace]\nlimit_up_pct = 9,8\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(
            matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "limit_up_pct")
        );
    }

    #[test]
    fn fractional_window_fails() {
        let config = make_config("[macd]\nvolume_window = 4.5\n");
        assert!(validate_run_config(&config).is_err());
    }

    #[test]
    fn padded_numbers_pass() {
        let config = make_config("[breakout]\nsurge_pct =  9.5 \n[scan]\nworkers = 2\n");
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn negative_workers_fails() {
        let config = make_config("[scan]\nworkers = -2\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, StockpickError::ConfigInvalid { key, .. } if key == "workers"));
    }
}
