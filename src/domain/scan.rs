//! Scan orchestration: one instrument in, one outcome out.
//!
//! `Scanner::scan` runs the configured catalog against a single series and
//! classifies the result. `scan_universe` fans every instrument in the
//! universe out over the worker pool and fans the outcomes back in.
//! Nothing that goes wrong with one instrument escapes its own outcome.

use crate::domain::dispatch::{self, Completed};
use crate::domain::error::StockpickError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::{pct_change_at, validate_series, OhlcvBar};
use crate::domain::resample::resample_weekly;
use crate::domain::rule::{Granularity, PatternRule, RuleMatch};
use crate::domain::rule_eval::{evaluate, SeriesView};
use crate::domain::scan_config::ScanConfig;
use crate::domain::universe::{Universe, UniverseFilter};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    pub bars: Vec<OhlcvBar>,
}

/// Per-instrument hit record handed to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub code: String,
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
    pub pct_chg: Option<f64>,
    /// Latest volume over its short-period average.
    pub volume_ratio: Option<f64>,
    pub matches: Vec<RuleMatch>,
}

impl MatchRecord {
    pub fn rules(&self) -> impl Iterator<Item = PatternRule> + '_ {
        self.matches.iter().map(|m| m.rule)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InputDefect { reason: String },
    InsufficientHistory { bars: usize, minimum: usize },
    OutsidePriceBand { close: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Matched(MatchRecord),
    NoMatch,
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct Scanner {
    catalog: Vec<PatternRule>,
    config: ScanConfig,
    filter: UniverseFilter,
}

impl Scanner {
    pub fn new(catalog: Vec<PatternRule>, config: ScanConfig, filter: UniverseFilter) -> Self {
        let mut catalog = catalog;
        catalog.sort();
        catalog.dedup();
        Self {
            catalog,
            config,
            filter,
        }
    }

    pub fn catalog(&self) -> &[PatternRule] {
        &self.catalog
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn indicators_for(&self, granularity: Granularity) -> Vec<IndicatorType> {
        let mut types: Vec<IndicatorType> = self
            .catalog
            .iter()
            .filter(|r| r.granularity() == granularity)
            .flat_map(|r| r.required_indicators(&self.config))
            .collect();
        if granularity == Granularity::Daily {
            types.push(IndicatorType::VolumeSma(self.config.ranking_volume_ma));
        }
        types.sort();
        types.dedup();
        types
    }

    pub fn scan(&self, instrument: &Instrument) -> ScanOutcome {
        let bars = &instrument.bars;
        let Some(last) = bars.last() else {
            return ScanOutcome::Skipped(SkipReason::InsufficientHistory {
                bars: 0,
                minimum: self.smallest_minimum(),
            });
        };
        if let Err(reason) = validate_series(bars) {
            return ScanOutcome::Skipped(SkipReason::InputDefect { reason });
        }
        if !self.filter.in_price_band(last.close) {
            return ScanOutcome::Skipped(SkipReason::OutsidePriceBand { close: last.close });
        }

        let daily_indicators = compute_indicators(bars, &self.indicators_for(Granularity::Daily));
        let daily = SeriesView::new(bars, &daily_indicators);

        let weekly_bars = if self.has_weekly_rules() {
            resample_weekly(bars)
        } else {
            Vec::new()
        };
        let weekly_indicators =
            compute_indicators(&weekly_bars, &self.indicators_for(Granularity::Weekly));
        let weekly = SeriesView::new(&weekly_bars, &weekly_indicators);

        let mut evaluable = false;
        let mut matches = Vec::new();
        for &rule in &self.catalog {
            let view = match rule.granularity() {
                Granularity::Daily => &daily,
                Granularity::Weekly => &weekly,
            };
            if view.len() < rule.min_bars(&self.config) {
                continue;
            }
            evaluable = true;
            if let Some(m) = evaluate(rule, view, &self.config) {
                matches.push(m);
            }
        }

        if !evaluable {
            return ScanOutcome::Skipped(SkipReason::InsufficientHistory {
                bars: bars.len(),
                minimum: self.smallest_minimum(),
            });
        }
        if matches.is_empty() {
            return ScanOutcome::NoMatch;
        }

        let today = bars.len() - 1;
        let volume_ratio = daily_indicators
            .get(&IndicatorType::VolumeSma(self.config.ranking_volume_ma))
            .and_then(|s| s.simple_at(today))
            .filter(|avg| *avg > 0.0)
            .map(|avg| last.volume / avg);

        ScanOutcome::Matched(MatchRecord {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            date: last.date,
            close: last.close,
            pct_chg: pct_change_at(bars, today),
            volume_ratio,
            matches,
        })
    }

    fn has_weekly_rules(&self) -> bool {
        self.catalog
            .iter()
            .any(|r| r.granularity() == Granularity::Weekly)
    }

    fn smallest_minimum(&self) -> usize {
        self.catalog
            .iter()
            .map(|r| r.min_bars(&self.config))
            .min()
            .unwrap_or(0)
    }
}

/// Everything a finished scan produced, before aggregation.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub matched: Vec<MatchRecord>,
    pub no_match: usize,
    pub skipped: Vec<(String, SkipReason)>,
}

impl ScanReport {
    pub fn scanned(&self) -> usize {
        self.matched.len() + self.no_match + self.skipped.len()
    }
}

/// Loads and scans every instrument in the universe on `workers` threads.
pub fn scan_universe(
    data_port: &(dyn DataPort + Sync),
    universe: &Universe,
    scanner: &Scanner,
    workers: usize,
) -> Result<ScanReport, StockpickError> {
    let available = data_port.list_instruments()?;
    let tasks: Vec<String> = available
        .into_iter()
        .filter(|code| universe.contains(code))
        .collect();

    tracing::info!(
        instruments = tasks.len(),
        workers = dispatch::resolve_workers(workers),
        rules = scanner.catalog().len(),
        "dispatching scan"
    );

    let codes = tasks.clone();
    let completed = dispatch::dispatch(tasks, workers, |code: String| {
        let bars = match data_port.fetch_series(&code) {
            Ok(bars) => bars,
            Err(e) => {
                return ScanOutcome::Skipped(SkipReason::InputDefect {
                    reason: e.to_string(),
                });
            }
        };
        let instrument = Instrument {
            name: universe.name_of(&code).unwrap_or_default().to_string(),
            code,
            bars,
        };
        scanner.scan(&instrument)
    })
    .map_err(|e| StockpickError::WorkerPool {
        reason: e.to_string(),
    })?;

    let mut report = ScanReport::default();
    for Completed { seq, result } in completed {
        let code = codes[seq].clone();
        let outcome = result.unwrap_or_else(|panic| {
            ScanOutcome::Skipped(SkipReason::InputDefect {
                reason: format!("worker panicked: {panic}"),
            })
        });
        match outcome {
            ScanOutcome::Matched(record) => report.matched.push(record),
            ScanOutcome::NoMatch => report.no_match += 1,
            ScanOutcome::Skipped(reason) => {
                tracing::debug!(code = %code, ?reason, "instrument skipped");
                report.skipped.push((code, reason));
            }
        }
    }

    tracing::info!(
        scanned = report.scanned(),
        matched = report.matched.len(),
        skipped = report.skipped.len(),
        "scan complete"
    );
    Ok(report)
}
