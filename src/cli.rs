//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_names_adapter::CsvNamesAdapter;
use crate::adapters::csv_result_adapter::CsvResultAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregate::{aggregate, summarize, ResultBucket};
use crate::domain::config_validation::{validate_run_config, validate_scan_config};
use crate::domain::dispatch::resolve_workers;
use crate::domain::error::StockpickError;
use crate::domain::rule::{parse_catalog, PatternRule};
use crate::domain::scan::{scan_universe, ScanReport, Scanner};
use crate::domain::scan_config::{
    BreakoutParams, ChaseParams, FanParams, InflectionParams, MacdParams, RetraceParams,
    ScanConfig, SupportParams,
};
use crate::domain::universe::{
    parse_list, Universe, UniverseFilter, DEFAULT_EXCLUDE_MARKERS, DEFAULT_EXCLUDE_PREFIXES,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::names_port::NamesPort;
use crate::ports::result_port::ResultPort;

pub const DEFAULT_DATA_DIR: &str = "stock_data";
pub const DEFAULT_NAMES_FILE: &str = "stock_names.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "stockpick", about = "Daily and weekly stock pattern scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan every instrument in the universe and write per-pattern results
    Scan {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        names: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated rule names (default: all)
        #[arg(long)]
        rules: Option<String>,
        /// Worker threads (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List the pattern catalog
    Rules,
    /// Validate a scan configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct ScanOverrides {
    pub data_dir: Option<PathBuf>,
    pub names: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub rules: Option<String>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub data_dir: PathBuf,
    pub names_file: PathBuf,
    pub output_dir: PathBuf,
    pub catalog: Vec<PatternRule>,
    pub workers: usize,
}

/// What a finished scan produced.
#[derive(Debug)]
pub struct ScanSummary {
    pub report: ScanReport,
    pub buckets: Vec<ResultBucket>,
    pub written: Vec<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            data_dir,
            names,
            output,
            rules,
            workers,
            dry_run,
        } => {
            let overrides = ScanOverrides {
                data_dir,
                names,
                output,
                rules,
                workers,
            };
            run_scan(config.as_ref(), &overrides, dry_run)
        }
        Command::Rules => run_rules(),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_scan_config(adapter: &dyn ConfigPort) -> ScanConfig {
    let d = ScanConfig::default();
    ScanConfig {
        breakout: BreakoutParams {
            surge_pct: adapter.get_double("breakout", "surge_pct", d.breakout.surge_pct),
            min_anchor_offset: adapter.get_usize(
                "breakout",
                "min_anchor_offset",
                d.breakout.min_anchor_offset,
            ),
            max_anchor_offset: adapter.get_usize(
                "breakout",
                "max_anchor_offset",
                d.breakout.max_anchor_offset,
            ),
            volume_peak_window: adapter.get_usize(
                "breakout",
                "volume_peak_window",
                d.breakout.volume_peak_window,
            ),
            pullback_volume_ratio: adapter.get_double(
                "breakout",
                "pullback_volume_ratio",
                d.breakout.pullback_volume_ratio,
            ),
        },
        support: SupportParams {
            max_anchor_offset: adapter.get_usize(
                "support",
                "max_anchor_offset",
                d.support.max_anchor_offset,
            ),
            volume_ma: adapter.get_usize("support", "volume_ma", d.support.volume_ma),
            volume_multiple: adapter.get_double(
                "support",
                "volume_multiple",
                d.support.volume_multiple,
            ),
        },
        inflection: InflectionParams {
            ma: adapter.get_usize("inflection", "ma", d.inflection.ma),
            volume_ma: adapter.get_usize("inflection", "volume_ma", d.inflection.volume_ma),
            volume_multiple: adapter.get_double(
                "inflection",
                "volume_multiple",
                d.inflection.volume_multiple,
            ),
        },
        fan: FanParams {
            fast_ma: adapter.get_usize("fan", "fast_ma", d.fan.fast_ma),
            medium_ma: adapter.get_usize("fan", "medium_ma", d.fan.medium_ma),
            slow_ma: adapter.get_usize("fan", "slow_ma", d.fan.slow_ma),
            volume_ma: adapter.get_usize("fan", "volume_ma", d.fan.volume_ma),
            volume_multiple: adapter.get_double("fan", "volume_multiple", d.fan.volume_multiple),
        },
        chase: ChaseParams {
            surge_pct: adapter.get_double("chase", "surge_pct", d.chase.surge_pct),
            high_tolerance: adapter.get_double("chase", "high_tolerance", d.chase.high_tolerance),
        },
        retrace: RetraceParams {
            window: adapter.get_usize("retrace", "window", d.retrace.window),
            limit_up_pct: adapter.get_double("retrace", "limit_up_pct", d.retrace.limit_up_pct),
            fast_ma: adapter.get_usize("retrace", "fast_ma", d.retrace.fast_ma),
            slow_ma: adapter.get_usize("retrace", "slow_ma", d.retrace.slow_ma),
            support_tolerance: adapter.get_double(
                "retrace",
                "support_tolerance",
                d.retrace.support_tolerance,
            ),
            shrink_ratio: adapter.get_double("retrace", "shrink_ratio", d.retrace.shrink_ratio),
            min_gain_pct: adapter.get_double("retrace", "min_gain_pct", d.retrace.min_gain_pct),
            volume_ma: adapter.get_usize("retrace", "volume_ma", d.retrace.volume_ma),
        },
        macd: MacdParams {
            fast: adapter.get_usize("macd", "fast", d.macd.fast),
            slow: adapter.get_usize("macd", "slow", d.macd.slow),
            signal: adapter.get_usize("macd", "signal", d.macd.signal),
            volume_window: adapter.get_usize("macd", "volume_window", d.macd.volume_window),
            volume_multiple: adapter.get_double(
                "macd",
                "volume_multiple",
                d.macd.volume_multiple,
            ),
            min_bars: adapter.get_usize("macd", "min_bars", d.macd.min_bars),
        },
        ranking_volume_ma: adapter.get_usize("scan", "ranking_volume_ma", d.ranking_volume_ma),
    }
}

pub fn build_universe_filter(adapter: &dyn ConfigPort) -> Result<UniverseFilter, StockpickError> {
    let list = |key: &str, default: &str| {
        let raw = adapter
            .get_string("universe", key)
            .unwrap_or_else(|| default.to_string());
        parse_list(&raw).map_err(|e| StockpickError::ConfigInvalid {
            section: "universe".into(),
            key: key.into(),
            reason: e.to_string(),
        })
    };

    let price_band = match (
        adapter.get_string("universe", "min_price"),
        adapter.get_string("universe", "max_price"),
    ) {
        (Some(_), Some(_)) => Some((
            adapter.get_double("universe", "min_price", 0.0),
            adapter.get_double("universe", "max_price", f64::INFINITY),
        )),
        _ => None,
    };

    Ok(UniverseFilter {
        exclude_prefixes: list("exclude_prefixes", DEFAULT_EXCLUDE_PREFIXES)?,
        exclude_markers: list("exclude_markers", DEFAULT_EXCLUDE_MARKERS)?,
        price_band,
    })
}

pub fn resolve_settings(
    adapter: &dyn ConfigPort,
    overrides: &ScanOverrides,
) -> Result<ScanSettings, StockpickError> {
    let path = |explicit: &Option<PathBuf>, section: &str, key: &str, default: &str| {
        explicit.clone().unwrap_or_else(|| {
            PathBuf::from(
                adapter
                    .get_string(section, key)
                    .unwrap_or_else(|| default.to_string()),
            )
        })
    };

    let rules = overrides
        .rules
        .clone()
        .or_else(|| adapter.get_string("scan", "rules"))
        .unwrap_or_default();
    let mut catalog = parse_catalog(&rules)?;
    if catalog.is_empty() {
        catalog = PatternRule::ALL.to_vec();
    }

    Ok(ScanSettings {
        data_dir: path(&overrides.data_dir, "data", "dir", DEFAULT_DATA_DIR),
        names_file: path(&overrides.names, "data", "names_file", DEFAULT_NAMES_FILE),
        output_dir: path(&overrides.output, "output", "dir", DEFAULT_OUTPUT_DIR),
        catalog,
        workers: overrides
            .workers
            .unwrap_or_else(|| adapter.get_usize("scan", "workers", 0)),
    })
}

/// Global preconditions; any failure here aborts before a single instrument is read.
pub fn check_inputs(settings: &ScanSettings) -> Result<(), StockpickError> {
    if !settings.data_dir.is_dir() {
        return Err(StockpickError::MissingPath {
            what: "data directory",
            path: settings.data_dir.clone(),
        });
    }
    if !settings.names_file.is_file() {
        return Err(StockpickError::MissingPath {
            what: "name registry",
            path: settings.names_file.clone(),
        });
    }
    Ok(())
}

/// Registry → universe → dispatch → aggregate → write.
pub fn run_scan_pipeline(
    data_port: &(dyn DataPort + Sync),
    names_port: &dyn NamesPort,
    result_port: &dyn ResultPort,
    scanner: &Scanner,
    filter: &UniverseFilter,
    workers: usize,
    run_date: NaiveDate,
) -> Result<ScanSummary, StockpickError> {
    let universe = Universe::build(names_port.load_names()?, filter);
    tracing::info!(
        instruments = universe.count(),
        excluded = universe.excluded.len(),
        "universe built"
    );

    let report = scan_universe(data_port, &universe, scanner, workers)?;
    let buckets = aggregate(&report.matched);
    let written = result_port.write_all(run_date, &buckets)?;

    Ok(ScanSummary {
        report,
        buckets,
        written,
    })
}

fn run_scan(config_path: Option<&PathBuf>, overrides: &ScanOverrides, dry_run: bool) -> ExitCode {
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            }
        }
        None => FileConfigAdapter::empty(),
    };

    let prepared = validate_run_config(&adapter)
        .and_then(|_| {
            let scan_config = build_scan_config(&adapter);
            validate_scan_config(&scan_config)?;
            Ok(scan_config)
        })
        .and_then(|scan_config| {
            let filter = build_universe_filter(&adapter)?;
            let settings = resolve_settings(&adapter, overrides)?;
            check_inputs(&settings)?;
            Ok((scan_config, filter, settings))
        });
    let (scan_config, filter, settings) = match prepared {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if dry_run {
        print_plan(&settings, &scan_config, &filter);
        eprintln!("\nDry run complete: configuration is valid");
        return ExitCode::SUCCESS;
    }

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let names_port = CsvNamesAdapter::new(settings.names_file.clone());
    let result_port = CsvResultAdapter::new(settings.output_dir.clone());
    let scanner = Scanner::new(settings.catalog.clone(), scan_config, filter.clone());

    eprintln!(
        "Scanning {} with {} rules on {} workers...",
        settings.data_dir.display(),
        scanner.catalog().len(),
        resolve_workers(settings.workers)
    );

    let summary = match run_scan_pipeline(
        &data_port,
        &names_port,
        &result_port,
        &scanner,
        &filter,
        settings.workers,
        Local::now().date_naive(),
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_summary(&summary);
    ExitCode::SUCCESS
}

fn print_plan(settings: &ScanSettings, config: &ScanConfig, filter: &UniverseFilter) {
    eprintln!("\nInputs:");
    eprintln!("  data dir:   {}", settings.data_dir.display());
    eprintln!("  names file: {}", settings.names_file.display());
    eprintln!("  output dir: {}", settings.output_dir.display());
    eprintln!("  workers:    {}", resolve_workers(settings.workers));

    eprintln!("\nRules:");
    for rule in &settings.catalog {
        eprintln!(
            "  {:<22} min {:>3} bars  {}",
            rule.name(),
            rule.min_bars(config),
            rule.description()
        );
    }

    eprintln!("\nUniverse:");
    eprintln!("  excluded prefixes: {}", filter.exclude_prefixes.join(", "));
    eprintln!("  excluded markers:  {}", filter.exclude_markers.join(", "));
    if let Some((min, max)) = filter.price_band {
        eprintln!("  price band:        {min} - {max}");
    }
}

fn print_summary(summary: &ScanSummary) {
    let report = &summary.report;
    eprintln!(
        "\nScanned {} instruments: {} matched, {} no match, {} skipped",
        report.scanned(),
        report.matched.len(),
        report.no_match,
        report.skipped.len()
    );

    if summary.buckets.is_empty() {
        eprintln!("No matches today.");
        return;
    }

    eprintln!("\n=== Matches per pattern ===");
    for (rule, count) in summarize(&summary.buckets) {
        eprintln!("  {:<22} {}", rule.name(), count);
    }
    for path in &summary.written {
        println!("{}", path.display());
    }
}

fn run_rules() -> ExitCode {
    let config = ScanConfig::default();
    for rule in PatternRule::ALL {
        println!(
            "{:<22} {:<7} min {:>3} bars  {}",
            rule.name(),
            format!("{:?}", rule.granularity()).to_lowercase(),
            rule.min_bars(&config),
            rule.description()
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_run_config(&adapter)
        .and_then(|_| validate_scan_config(&build_scan_config(&adapter)))
        .and_then(|_| build_universe_filter(&adapter).map(|_| ()));
    match checked {
        Ok(()) => {
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
