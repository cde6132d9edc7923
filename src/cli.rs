//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::error::BacktestError;
use crate::domain::execution::QuantityGranularity;
use crate::domain::report::CombinedOutput;
use crate::domain::signal::FirstSignal;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "smacross", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [data] symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Overrides [data] dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Where the price data comes from and where results go.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub output_dir: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            output,
        } => run_backtest(&config, symbol.as_deref(), data_dir, output),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    data_dir_override: Option<PathBuf>,
    output_override: Option<PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut settings = match build_data_settings(&adapter, symbol_override) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(dir) = data_dir_override {
        settings.dir = dir;
    }
    if output_override.is_some() {
        settings.output_dir = output_override;
    }

    let data_port = CsvAdapter::new(settings.dir.clone());
    let report_port = CsvReportAdapter::new();

    match run_backtest_pipeline(&data_port, &report_port, &settings, &bt_config) {
        Ok(output) => {
            print_summary(&settings.symbol, &bt_config, &output);
            if let Some(dir) = &settings.output_dir {
                eprintln!("\nResults written to: {}", dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn parse_date_key(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BacktestError> {
    adapter
        .get_string(section, key)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| BacktestError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            })
        })
        .transpose()
}

/// Fails when `key` is present but its value does not parse as `T`, so a
/// typo never silently falls back to the default.
fn check_numeric<T: FromStr>(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BacktestError> {
    if !adapter.has_key(section, key) {
        return Ok(());
    }
    let raw = adapter.get_string(section, key).unwrap_or_default();
    raw.parse::<T>()
        .map(|_| ())
        .map_err(|_| BacktestError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("'{raw}' is not a valid number"),
        })
}

fn int_key(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, BacktestError> {
    check_numeric::<i64>(adapter, section, key)?;
    Ok(adapter.get_int(section, key, default))
}

fn double_key(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    check_numeric::<f64>(adapter, section, key)?;
    Ok(adapter.get_double(section, key, default))
}

fn window_key(
    adapter: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, BacktestError> {
    let raw = int_key(adapter, "backtest", key, default as i64)?;
    usize::try_from(raw).map_err(|_| BacktestError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("{raw} is not a valid window length"),
    })
}

fn parse_granularity(adapter: &dyn ConfigPort) -> Result<QuantityGranularity, BacktestError> {
    match adapter
        .get_string("backtest", "quantity_granularity")
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        None | Some("fractional") => Ok(QuantityGranularity::Fractional),
        Some("whole") => Ok(QuantityGranularity::WholeShares),
        Some(other) => Err(BacktestError::ConfigInvalid {
            section: "backtest".into(),
            key: "quantity_granularity".into(),
            reason: format!("unknown value '{other}' (expected fractional or whole)"),
        }),
    }
}

fn parse_first_signal(adapter: &dyn ConfigPort) -> Result<FirstSignal, BacktestError> {
    match adapter
        .get_string("backtest", "first_signal")
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        None | Some("hold") => Ok(FirstSignal::Hold),
        Some("seed") => Ok(FirstSignal::Seed),
        Some(other) => Err(BacktestError::ConfigInvalid {
            section: "backtest".into(),
            key: "first_signal".into(),
            reason: format!("unknown value '{other}' (expected hold or seed)"),
        }),
    }
}

/// Reads `[backtest]` on top of the defaults and validates the result.
/// Present but unparseable values are `ConfigInvalid`.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let defaults = BacktestConfig::default();

    let trading_days = int_key(
        adapter,
        "backtest",
        "trading_days_per_year",
        i64::from(defaults.trading_days_per_year),
    )?;
    let trading_days_per_year =
        u32::try_from(trading_days).map_err(|_| BacktestError::ConfigInvalid {
            section: "backtest".into(),
            key: "trading_days_per_year".into(),
            reason: format!("{trading_days} is out of range"),
        })?;

    let config = BacktestConfig {
        short_window: window_key(adapter, "short_window", defaults.short_window)?,
        long_window: window_key(adapter, "long_window", defaults.long_window)?,
        initial_cash: double_key(adapter, "backtest", "initial_cash", defaults.initial_cash)?,
        commission_rate: double_key(
            adapter,
            "backtest",
            "commission_rate",
            defaults.commission_rate,
        )?,
        trading_days_per_year,
        quantity_granularity: parse_granularity(adapter)?,
        first_signal: parse_first_signal(adapter)?,
        risk_free_rate: double_key(
            adapter,
            "backtest",
            "risk_free_rate",
            defaults.risk_free_rate,
        )?,
    };

    config.validate()?;
    Ok(config)
}

/// Reads `[data]` and `[report]`. The symbol override wins over the file.
pub fn build_data_settings(
    adapter: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<DataSettings, BacktestError> {
    let symbol = match symbol_override {
        Some(s) => s.trim().to_uppercase(),
        None => adapter
            .get_string("data", "symbol")
            .map(|s| s.to_uppercase())
            .ok_or_else(|| BacktestError::ConfigMissing {
                section: "data".into(),
                key: "symbol".into(),
            })?,
    };

    let start_date = parse_date_key(adapter, "data", "start_date")?;
    let end_date = parse_date_key(adapter, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(BacktestError::ConfigInvalid {
                section: "data".into(),
                key: "start_date".into(),
                reason: format!("start_date {start} is after end_date {end}"),
            });
        }
    }

    Ok(DataSettings {
        dir: adapter
            .get_string("data", "dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data")),
        symbol,
        start_date,
        end_date,
        output_dir: adapter.get_string("report", "output_dir").map(PathBuf::from),
    })
}

/// Fetch, backtest, and optionally write the combined output.
/// Lists what the data source does hold, for a symbol that came back empty.
pub fn available_symbols_hint(data_port: &dyn DataPort) -> Option<String> {
    let symbols = data_port.list_symbols().ok()?;
    if symbols.is_empty() {
        return None;
    }
    Some(format!("available symbols: {}", symbols.join(", ")))
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    settings: &DataSettings,
    bt_config: &BacktestConfig,
) -> Result<CombinedOutput, BacktestError> {
    eprintln!("Fetching {} from {}", settings.symbol, settings.dir.display());
    let series =
        match data_port.fetch_series(&settings.symbol, settings.start_date, settings.end_date) {
            Ok(series) => series,
            Err(err @ BacktestError::NoData { .. }) => {
                if let Some(hint) = available_symbols_hint(data_port) {
                    eprintln!("{hint}");
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };

    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        eprintln!(
            "Running backtest: SMA({}) / SMA({}), {} bars, {} to {}",
            bt_config.short_window,
            bt_config.long_window,
            series.len(),
            first,
            last,
        );
    }

    let output = backtest_engine::run_backtest(&series, bt_config)?;

    if let Some(dir) = &settings.output_dir {
        report_port.write(&output, &settings.symbol, dir)?;
    }

    Ok(output)
}

pub fn print_summary(symbol: &str, bt_config: &BacktestConfig, output: &CombinedOutput) {
    eprintln!("\n=== {} Results ===", symbol);
    eprintln!("Initial Cash:     {:.2}", bt_config.initial_cash);
    match &output.metrics {
        Some(m) => {
            eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
            eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
            eprintln!("Volatility:       {:.2}%", m.annualized_volatility * 100.0);
            eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
            eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
            if m.win_ratio.is_nan() {
                eprintln!("Win Ratio:        n/a");
            } else {
                eprintln!("Win Ratio:        {:.1}%", m.win_ratio * 100.0);
            }
            eprintln!("Round Trips:      {}", m.round_trips);
        }
        None => eprintln!("Metrics:          unavailable (too few observations)"),
    }
    eprintln!("Total Trades:     {}", output.trades.len());
    if !output.skipped.is_empty() {
        eprintln!("Skipped Signals:  {}", output.skipped.len());
    }
    if let Some(equity) = output.final_equity() {
        eprintln!("Final Value:      {:.2}", equity);
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = build_backtest_config(&adapter)
        .and_then(|bt| build_data_settings(&adapter, None).map(|data| (bt, data)));

    match result {
        Ok((bt, data)) => {
            eprintln!("  symbol:      {}", data.symbol);
            eprintln!("  data dir:    {}", data.dir.display());
            eprintln!("  windows:     {} / {}", bt.short_window, bt.long_window);
            eprintln!("  cash:        {:.2}", bt.initial_cash);
            eprintln!("  commission:  {}", bt.commission_rate);
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
