//! Scan thresholds and windows.
//!
//! Every constant the pattern rules read lives here so that several
//! configurations can be evaluated side by side. Windows are period counts:
//! on weekly bars a 5-period average spans five weeks.

#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutParams {
    /// Percent gain treated as a limit-up surge.
    pub surge_pct: f64,
    /// Closest anchor, in bars before today.
    pub min_anchor_offset: usize,
    /// Farthest anchor, in bars before today.
    pub max_anchor_offset: usize,
    /// Bars (anchor included) over which the anchor volume must be the peak.
    pub volume_peak_window: usize,
    pub pullback_volume_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupportParams {
    pub max_anchor_offset: usize,
    pub volume_ma: usize,
    pub volume_multiple: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflectionParams {
    pub ma: usize,
    pub volume_ma: usize,
    pub volume_multiple: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FanParams {
    pub fast_ma: usize,
    pub medium_ma: usize,
    pub slow_ma: usize,
    pub volume_ma: usize,
    pub volume_multiple: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChaseParams {
    pub surge_pct: f64,
    /// Today's close must exceed yesterday's high times this factor.
    pub high_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetraceParams {
    /// Trailing bars inspected, today included.
    pub window: usize,
    pub limit_up_pct: f64,
    pub fast_ma: usize,
    pub slow_ma: usize,
    /// Fraction below the fast average still counted as "on support".
    pub support_tolerance: f64,
    pub shrink_ratio: f64,
    pub min_gain_pct: f64,
    pub volume_ma: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    /// Periods before the current one averaged for the volume test.
    pub volume_window: usize,
    pub volume_multiple: f64,
    pub min_bars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub breakout: BreakoutParams,
    pub support: SupportParams,
    pub inflection: InflectionParams,
    pub fan: FanParams,
    pub chase: ChaseParams,
    pub retrace: RetraceParams,
    pub macd: MacdParams,
    /// Volume average used for the volume-ratio ranking metric.
    pub ranking_volume_ma: usize,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            surge_pct: 9.5,
            min_anchor_offset: 1,
            max_anchor_offset: 13,
            volume_peak_window: 21,
            pullback_volume_ratio: 0.5,
        }
    }
}

impl Default for SupportParams {
    fn default() -> Self {
        Self {
            max_anchor_offset: 9,
            volume_ma: 5,
            volume_multiple: 2.5,
        }
    }
}

impl Default for InflectionParams {
    fn default() -> Self {
        Self {
            ma: 60,
            volume_ma: 5,
            volume_multiple: 1.5,
        }
    }
}

impl Default for FanParams {
    fn default() -> Self {
        Self {
            fast_ma: 5,
            medium_ma: 13,
            slow_ma: 21,
            volume_ma: 5,
            volume_multiple: 1.0,
        }
    }
}

impl Default for ChaseParams {
    fn default() -> Self {
        Self {
            surge_pct: 9.5,
            high_tolerance: 0.98,
        }
    }
}

impl Default for RetraceParams {
    fn default() -> Self {
        Self {
            window: 6,
            limit_up_pct: 9.8,
            fast_ma: 13,
            slow_ma: 55,
            support_tolerance: 0.01,
            shrink_ratio: 0.7,
            min_gain_pct: 1.0,
            volume_ma: 5,
        }
    }
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            volume_window: 5,
            volume_multiple: 1.3,
            min_bars: 35,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            breakout: BreakoutParams::default(),
            support: SupportParams::default(),
            inflection: InflectionParams::default(),
            fan: FanParams::default(),
            chase: ChaseParams::default(),
            retrace: RetraceParams::default(),
            macd: MacdParams::default(),
            ranking_volume_ma: 5,
        }
    }
}
