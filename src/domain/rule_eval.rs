//! Rule evaluation engine.
//!
//! Evaluates catalog rules against OHLCV data and pre-computed indicator
//! values, always "as of" the last bar of the series.
//!
//! # Evaluation Semantics
//!
//! - A series shorter than the rule's `min_bars` never matches
//! - An indicator that is missing or still in warmup at a read position
//!   makes the condition false, never an error
//! - Anchor searches run from the most recent bar backwards and stop at the
//!   first admissible chain (first found wins)

use crate::domain::indicator::{IndicatorSeries, IndicatorType, MacdReading};
use crate::domain::ohlcv::{pct_change_at, OhlcvBar};
use crate::domain::rule::{Evidence, PatternRule, RuleMatch};
use crate::domain::scan_config::{
    BreakoutParams, ChaseParams, FanParams, InflectionParams, MacdParams, RetraceParams,
    ScanConfig, SupportParams,
};
use std::collections::HashMap;

/// Bars plus the indicators computed over them.
pub struct SeriesView<'a> {
    pub bars: &'a [OhlcvBar],
    pub indicators: &'a HashMap<IndicatorType, IndicatorSeries>,
}

impl<'a> SeriesView<'a> {
    pub fn new(
        bars: &'a [OhlcvBar],
        indicators: &'a HashMap<IndicatorType, IndicatorSeries>,
    ) -> Self {
        Self { bars, indicators }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    fn simple(&self, indicator_type: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator_type)?.simple_at(index)
    }

    fn ma(&self, period: usize, index: usize) -> Option<f64> {
        self.simple(IndicatorType::Sma(period), index)
    }

    fn volume_ma(&self, period: usize, index: usize) -> Option<f64> {
        self.simple(IndicatorType::VolumeSma(period), index)
    }

    fn macd(&self, params: &MacdParams, index: usize) -> Option<MacdReading> {
        self.indicators
            .get(&IndicatorType::Macd {
                fast: params.fast,
                slow: params.slow,
                signal: params.signal,
            })?
            .macd_at(index)
    }

    fn pct(&self, index: usize) -> Option<f64> {
        pct_change_at(self.bars, index)
    }
}

pub fn evaluate(rule: PatternRule, view: &SeriesView<'_>, config: &ScanConfig) -> Option<RuleMatch> {
    if view.len() < rule.min_bars(config) {
        return None;
    }

    let evidence = match rule {
        PatternRule::BreakoutPullback => breakout_pullback(view, &config.breakout),
        PatternRule::HighVolumeSupport => high_volume_support(view, &config.support),
        PatternRule::TrendInflection => trend_inflection(view, &config.inflection),
        PatternRule::MaFan => ma_fan(view, &config.fan),
        PatternRule::ChaseLimitUp => chase_limit_up(view, &config.chase),
        PatternRule::LimitUpRetrace => limit_up_retrace(view, &config.retrace),
        PatternRule::MacdTrendDaily | PatternRule::MacdTrendWeekly => {
            macd_trend(view, &config.macd)
        }
    }?;

    Some(RuleMatch { rule, evidence })
}

fn breakout_pullback(view: &SeriesView<'_>, p: &BreakoutParams) -> Option<Evidence> {
    let bars = view.bars;
    let today = bars.len() - 1;
    let last = &bars[today];

    for offset in p.min_anchor_offset..=p.max_anchor_offset {
        let Some(idx) = today.checked_sub(offset) else {
            break;
        };
        let anchor = &bars[idx];

        let surged = [idx.checked_sub(1), Some(idx)]
            .into_iter()
            .flatten()
            .any(|i| view.pct(i).is_some_and(|pct| pct > p.surge_pct));
        if !surged || !anchor.is_bearish() {
            continue;
        }

        let peak_start = idx.saturating_sub(p.volume_peak_window.saturating_sub(1));
        if bars[peak_start..idx].iter().any(|b| b.volume > anchor.volume) {
            continue;
        }

        if bars[idx..].iter().any(|b| b.low < anchor.low) {
            continue;
        }

        let pullback = bars[idx + 1..today].iter().find(|b| {
            b.is_bearish()
                && b.volume <= anchor.volume * p.pullback_volume_ratio
                && last.close > b.high
        });
        if let Some(pullback) = pullback {
            return Some(Evidence::Breakout {
                anchor: anchor.date,
                pullback: pullback.date,
            });
        }
    }
    None
}

fn high_volume_support(view: &SeriesView<'_>, p: &SupportParams) -> Option<Evidence> {
    let bars = view.bars;
    let today = bars.len() - 1;
    let last = &bars[today];

    for offset in 1..=p.max_anchor_offset {
        let Some(idx) = today.checked_sub(offset) else {
            break;
        };
        let anchor = &bars[idx];
        let Some(avg) = view.volume_ma(p.volume_ma, idx) else {
            continue;
        };
        if anchor.volume <= avg * p.volume_multiple || !anchor.is_bullish() {
            continue;
        }
        if bars[idx + 1..].iter().all(|b| b.low >= anchor.low) && last.close > anchor.high {
            return Some(Evidence::Anchor { anchor: anchor.date });
        }
    }
    None
}

fn trend_inflection(view: &SeriesView<'_>, p: &InflectionParams) -> Option<Evidence> {
    let bars = view.bars;
    let today = bars.len() - 1;
    let ma_today = view.ma(p.ma, today)?;
    let ma_yesterday = view.ma(p.ma, today - 1)?;
    let vol_avg = view.volume_ma(p.volume_ma, today)?;

    let crossed = bars[today].close > ma_today && bars[today - 1].close <= ma_yesterday;
    let on_volume = bars[today].volume > vol_avg * p.volume_multiple;
    (crossed && on_volume).then_some(Evidence::Alignment)
}

fn ma_fan(view: &SeriesView<'_>, p: &FanParams) -> Option<Evidence> {
    let today = view.len() - 1;
    let bar = &view.bars[today];
    let fast = view.ma(p.fast_ma, today)?;
    let medium = view.ma(p.medium_ma, today)?;
    let slow = view.ma(p.slow_ma, today)?;
    let vol_avg = view.volume_ma(p.volume_ma, today)?;

    let fanned = fast > medium && medium > slow;
    let holding = bar.low >= medium && bar.close >= fast;
    let on_volume = bar.volume > vol_avg * p.volume_multiple;
    (fanned && holding && on_volume).then_some(Evidence::Alignment)
}

fn chase_limit_up(view: &SeriesView<'_>, p: &ChaseParams) -> Option<Evidence> {
    let today = view.len() - 1;
    let bar = &view.bars[today];
    let prev = &view.bars[today - 1];

    let surged = view.pct(today - 1)? > p.surge_pct;
    let lighter = bar.volume < prev.volume;
    let pressing = bar.close > prev.high * p.high_tolerance;
    (surged && lighter && bar.is_bullish() && pressing).then_some(Evidence::Alignment)
}

fn limit_up_retrace(view: &SeriesView<'_>, p: &RetraceParams) -> Option<Evidence> {
    let bars = view.bars;
    let today = bars.len() - 1;
    let yesterday = today - 1;
    let start = today + 1 - p.window;
    let bar = &bars[today];

    let had_limit_up =
        (start..today).any(|i| view.pct(i).is_some_and(|pct| pct >= p.limit_up_pct));
    if !had_limit_up {
        return None;
    }

    let fast = view.ma(p.fast_ma, today)?;
    let slow = view.ma(p.slow_ma, today)?;
    let on_support = fast > slow && bar.close >= fast * (1.0 - p.support_tolerance);
    if !on_support {
        return None;
    }

    let earlier_peak = bars[start..yesterday]
        .iter()
        .map(|b| b.volume)
        .fold(f64::NEG_INFINITY, f64::max);
    let shook_out = bars[yesterday].volume < earlier_peak * p.shrink_ratio;
    if !shook_out {
        return None;
    }

    let vol_avg = view.volume_ma(p.volume_ma, today)?;
    let rebounded = view.pct(today)? > p.min_gain_pct
        && bar.volume > bars[yesterday].volume
        && bar.volume > vol_avg;
    rebounded.then_some(Evidence::Alignment)
}

fn macd_trend(view: &SeriesView<'_>, p: &MacdParams) -> Option<Evidence> {
    let bars = view.bars;
    let today = bars.len() - 1;
    let reading = view.macd(p, today)?;

    let above_zero = reading.line > 0.0 && reading.signal > 0.0;
    let rising = reading.line > reading.signal;

    let prior = &bars[today - p.volume_window..today];
    let avg_volume = prior.iter().map(|b| b.volume).sum::<f64>() / p.volume_window as f64;
    let breakout = bars[today].volume > avg_volume * p.volume_multiple;

    (above_zero && rising && breakout).then_some(Evidence::Alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_helpers::compute_indicators;
    use chrono::{Duration, NaiveDate};

    fn flat_bars(count: usize, close: f64, volume: f64) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count)
            .map(|i| OhlcvBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume,
                pct_chg: Some(0.0),
            })
            .collect()
    }

    fn run(rule: PatternRule, bars: &[OhlcvBar], config: &ScanConfig) -> Option<RuleMatch> {
        let indicators = compute_indicators(bars, &rule.required_indicators(config));
        evaluate(rule, &SeriesView::new(bars, &indicators), config)
    }

    fn set(bar: &mut OhlcvBar, open: f64, high: f64, low: f64, close: f64, volume: f64, pct: f64) {
        bar.open = open;
        bar.high = high;
        bar.low = low;
        bar.close = close;
        bar.volume = volume;
        bar.pct_chg = Some(pct);
    }

    #[test]
    fn flat_series_matches_nothing() {
        let config = ScanConfig::default();
        let bars = flat_bars(120, 10.0, 1000.0);
        for rule in PatternRule::ALL {
            assert!(run(rule, &bars, &config).is_none(), "{} fired", rule);
        }
    }

    #[test]
    fn short_series_never_evaluates() {
        let config = ScanConfig::default();
        let bars = flat_bars(2, 10.0, 1000.0);
        for rule in PatternRule::ALL {
            assert!(run(rule, &bars, &config).is_none());
        }
    }

    #[test]
    fn chase_limit_up_fires_day_after_surge() {
        let config = ScanConfig::default();
        let mut bars = flat_bars(10, 10.0, 1000.0);
        set(&mut bars[8], 10.0, 11.0, 10.0, 11.0, 5000.0, 10.0);
        set(&mut bars[9], 10.8, 11.2, 10.7, 11.1, 3000.0, 0.9);

        let m = run(PatternRule::ChaseLimitUp, &bars, &config).unwrap();
        assert_eq!(m.evidence, Evidence::Alignment);

        bars[9].volume = 6000.0;
        assert!(run(PatternRule::ChaseLimitUp, &bars, &config).is_none());
    }

    #[test]
    fn chase_limit_up_derives_missing_pct() {
        let config = ScanConfig::default();
        let mut bars = flat_bars(10, 10.0, 1000.0);
        set(&mut bars[8], 10.0, 11.0, 10.0, 11.0, 5000.0, 0.0);
        set(&mut bars[9], 10.8, 11.2, 10.7, 11.1, 3000.0, 0.9);
        bars[8].pct_chg = None;

        assert!(run(PatternRule::ChaseLimitUp, &bars, &config).is_some());
    }

    #[test]
    fn high_volume_support_requires_low_to_hold() {
        let config = ScanConfig::default();
        let mut bars = flat_bars(30, 10.0, 1000.0);
        set(&mut bars[25], 10.0, 10.8, 9.9, 10.7, 5000.0, 7.0);
        for bar in &mut bars[26..29] {
            set(bar, 10.5, 10.7, 10.2, 10.5, 900.0, -0.5);
        }
        set(&mut bars[29], 10.6, 11.0, 10.5, 10.9, 1500.0, 3.8);

        let m = run(PatternRule::HighVolumeSupport, &bars, &config).unwrap();
        assert_eq!(
            m.evidence,
            Evidence::Anchor {
                anchor: bars[25].date
            }
        );

        bars[27].low = 9.8;
        assert!(run(PatternRule::HighVolumeSupport, &bars, &config).is_none());
    }

    #[test]
    fn trend_inflection_needs_cross_and_volume() {
        let config = ScanConfig::default();
        let mut bars = flat_bars(70, 10.0, 1000.0);
        set(&mut bars[68], 9.9, 10.0, 9.8, 9.9, 1000.0, -1.0);
        set(&mut bars[69], 9.9, 10.6, 9.9, 10.5, 2000.0, 6.0);
        assert!(run(PatternRule::TrendInflection, &bars, &config).is_some());

        bars[69].volume = 1200.0;
        assert!(run(PatternRule::TrendInflection, &bars, &config).is_none());
    }

    #[test]
    fn trend_inflection_rejects_already_above() {
        let config = ScanConfig::default();
        let mut bars = flat_bars(70, 10.0, 1000.0);
        set(&mut bars[68], 10.0, 10.6, 10.0, 10.5, 1000.0, 5.0);
        set(&mut bars[69], 10.5, 10.9, 10.5, 10.8, 2000.0, 2.8);
        assert!(run(PatternRule::TrendInflection, &bars, &config).is_none());
    }

    #[test]
    fn macd_trend_requires_volume_breakout() {
        let config = ScanConfig::default();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<OhlcvBar> = (0..40)
            .map(|i| {
                let close = 10.0 + i as f64 * 0.1;
                OhlcvBar {
                    date: start + Duration::days(i),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1000.0,
                    pct_chg: None,
                }
            })
            .collect();
        bars[39].volume = 1400.0;
        assert!(run(PatternRule::MacdTrendDaily, &bars, &config).is_some());

        bars[39].volume = 1250.0;
        assert!(run(PatternRule::MacdTrendDaily, &bars, &config).is_none());
    }

    #[test]
    fn missing_indicator_is_not_a_match() {
        let config = ScanConfig::default();
        let bars = flat_bars(40, 10.0, 1000.0);
        let empty = HashMap::new();
        let view = SeriesView::new(&bars, &empty);
        assert!(evaluate(PatternRule::MaFan, &view, &config).is_none());
        assert!(evaluate(PatternRule::MacdTrendDaily, &view, &config).is_none());
    }
}
