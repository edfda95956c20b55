//! Pattern rule catalog.
//!
//! This module names the patterns the scanner knows about and what each one
//! needs before it can be evaluated:
//! - `PatternRule`: The fixed catalog of named rules
//! - `Granularity`: Whether a rule reads daily bars or resampled weekly bars
//! - `RankKey`: How a rule's result bucket is ordered
//! - `RuleMatch` / `Evidence`: What a rule reports when it fires

use crate::domain::indicator::IndicatorType;
use crate::domain::scan_config::ScanConfig;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternRule {
    BreakoutPullback,
    HighVolumeSupport,
    TrendInflection,
    MaFan,
    ChaseLimitUp,
    LimitUpRetrace,
    MacdTrendDaily,
    MacdTrendWeekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    /// Descending latest percent change.
    PctChange,
    /// Descending latest percent change, then descending volume ratio.
    PctChangeThenVolumeRatio,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Breakout chain: the anchor bar and the pullback bar that today broke.
    Breakout {
        anchor: NaiveDate,
        pullback: NaiveDate,
    },
    /// Single anchor whose range today's close cleared.
    Anchor { anchor: NaiveDate },
    /// Conjunction of conditions evaluated at the last bar.
    Alignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: PatternRule,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule: {0}")]
pub struct UnknownRule(pub String);

impl PatternRule {
    pub const ALL: [PatternRule; 8] = [
        PatternRule::BreakoutPullback,
        PatternRule::HighVolumeSupport,
        PatternRule::TrendInflection,
        PatternRule::MaFan,
        PatternRule::ChaseLimitUp,
        PatternRule::LimitUpRetrace,
        PatternRule::MacdTrendDaily,
        PatternRule::MacdTrendWeekly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PatternRule::BreakoutPullback => "breakout_pullback",
            PatternRule::HighVolumeSupport => "high_volume_support",
            PatternRule::TrendInflection => "trend_inflection",
            PatternRule::MaFan => "ma_fan",
            PatternRule::ChaseLimitUp => "chase_limit_up",
            PatternRule::LimitUpRetrace => "limit_up_retrace",
            PatternRule::MacdTrendDaily => "macd_trend_daily",
            PatternRule::MacdTrendWeekly => "macd_trend_weekly",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PatternRule::BreakoutPullback => {
                "limit-up surge, shrinking pullback, close above the pullback high"
            }
            PatternRule::HighVolumeSupport => {
                "high-volume bullish bar whose low holds, close above its high"
            }
            PatternRule::TrendInflection => "close crosses above the long average on volume",
            PatternRule::MaFan => "fast > medium > slow averages with volume behind the move",
            PatternRule::ChaseLimitUp => "day after limit-up, lighter volume, pressing the high",
            PatternRule::LimitUpRetrace => {
                "recent limit-up, shakeout on support, confirmed rebound"
            }
            PatternRule::MacdTrendDaily => "MACD above zero and rising, volume breakout",
            PatternRule::MacdTrendWeekly => "weekly MACD above zero and rising, volume breakout",
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            PatternRule::MacdTrendWeekly => Granularity::Weekly,
            _ => Granularity::Daily,
        }
    }

    pub fn rank_key(self) -> RankKey {
        match self {
            PatternRule::HighVolumeSupport
            | PatternRule::TrendInflection
            | PatternRule::LimitUpRetrace
            | PatternRule::MacdTrendDaily
            | PatternRule::MacdTrendWeekly => RankKey::PctChangeThenVolumeRatio,
            PatternRule::BreakoutPullback | PatternRule::MaFan | PatternRule::ChaseLimitUp => {
                RankKey::PctChange
            }
        }
    }

    /// Shortest series (in bars of the rule's granularity) the rule evaluates.
    pub fn min_bars(self, config: &ScanConfig) -> usize {
        match self {
            PatternRule::BreakoutPullback => config.breakout.max_anchor_offset + 2,
            PatternRule::HighVolumeSupport => {
                config.support.max_anchor_offset + config.support.volume_ma
            }
            PatternRule::TrendInflection => {
                (config.inflection.ma + 1).max(config.inflection.volume_ma)
            }
            PatternRule::MaFan => {
                let f = &config.fan;
                f.fast_ma.max(f.medium_ma).max(f.slow_ma).max(f.volume_ma)
            }
            PatternRule::ChaseLimitUp => 3,
            PatternRule::LimitUpRetrace => {
                let r = &config.retrace;
                r.window.max(r.fast_ma).max(r.slow_ma).max(r.volume_ma)
            }
            PatternRule::MacdTrendDaily | PatternRule::MacdTrendWeekly => config
                .macd
                .min_bars
                .max(config.macd.volume_window + 1),
        }
    }

    pub fn required_indicators(self, config: &ScanConfig) -> Vec<IndicatorType> {
        match self {
            PatternRule::BreakoutPullback | PatternRule::ChaseLimitUp => vec![],
            PatternRule::HighVolumeSupport => {
                vec![IndicatorType::VolumeSma(config.support.volume_ma)]
            }
            PatternRule::TrendInflection => vec![
                IndicatorType::Sma(config.inflection.ma),
                IndicatorType::VolumeSma(config.inflection.volume_ma),
            ],
            PatternRule::MaFan => vec![
                IndicatorType::Sma(config.fan.fast_ma),
                IndicatorType::Sma(config.fan.medium_ma),
                IndicatorType::Sma(config.fan.slow_ma),
                IndicatorType::VolumeSma(config.fan.volume_ma),
            ],
            PatternRule::LimitUpRetrace => vec![
                IndicatorType::Sma(config.retrace.fast_ma),
                IndicatorType::Sma(config.retrace.slow_ma),
                IndicatorType::VolumeSma(config.retrace.volume_ma),
            ],
            PatternRule::MacdTrendDaily | PatternRule::MacdTrendWeekly => {
                vec![IndicatorType::Macd {
                    fast: config.macd.fast,
                    slow: config.macd.slow,
                    signal: config.macd.signal,
                }]
            }
        }
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternRule {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PatternRule::ALL
            .into_iter()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| UnknownRule(s.trim().to_string()))
    }
}

/// Parses a comma-separated rule list, keeping catalog order and dropping repeats.
pub fn parse_catalog(input: &str) -> Result<Vec<PatternRule>, UnknownRule> {
    let mut rules = Vec::new();
    for token in input.split(',').filter(|t| !t.trim().is_empty()) {
        let rule: PatternRule = token.parse()?;
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }
    rules.sort();
    Ok(rules)
}
