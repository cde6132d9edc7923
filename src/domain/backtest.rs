//! Backtest configuration and the end-to-end pipeline for one price series.

use log::warn;

use super::error::BacktestError;
use super::execution::{self, ExecutionConfig, QuantityGranularity};
use super::metrics::{PerformanceReport, TRADING_DAYS_PER_YEAR};
use super::ohlcv::PriceSeries;
use super::report::{self, CombinedOutput};
use super::signal::{self, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW, FirstSignal, SignalParams};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub trading_days_per_year: u32,
    pub quantity_granularity: QuantityGranularity,
    pub first_signal: FirstSignal,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
            initial_cash: 1_000_000.0,
            commission_rate: 0.001,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            quantity_granularity: QuantityGranularity::Fractional,
            first_signal: FirstSignal::Hold,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            short_window: self.short_window,
            long_window: self.long_window,
            first_signal: self.first_signal,
        }
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            initial_cash: self.initial_cash,
            commission_rate: self.commission_rate,
            granularity: self.quantity_granularity,
        }
    }

    /// Number of leading price points that produce no signal.
    pub fn warmup(&self) -> usize {
        self.long_window.saturating_sub(1)
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        self.signal_params().validate()?;
        self.execution_config().validate()?;
        if self.trading_days_per_year == 0 {
            return Err(BacktestError::invalid_config(
                "trading_days_per_year",
                "trading_days_per_year must be at least 1",
            ));
        }
        if !(self.risk_free_rate.is_finite() && self.risk_free_rate >= 0.0) {
            return Err(BacktestError::invalid_config(
                "risk_free_rate",
                "risk_free_rate must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Signals, simulation, metrics and assembly for a single series.
///
/// Configuration is validated before any computation. Metrics that cannot be
/// computed for lack of return observations leave `metrics` as `None`; every
/// other failure is returned as an error.
pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<CombinedOutput, BacktestError> {
    config.validate()?;

    let signals = signal::generate_with(series, &config.signal_params())?;
    let account = execution::run(series, &signals, &config.execution_config())?;

    let metrics = match PerformanceReport::for_account(
        &account,
        config.trading_days_per_year,
        config.risk_free_rate,
    ) {
        Ok(report) => Some(report),
        Err(BacktestError::InsufficientData { context, have, need }) => {
            warn!("metrics unavailable: insufficient data for {context} ({have} of {need})");
            None
        }
        Err(e) => return Err(e),
    };

    report::assemble(series, &signals, &account, metrics.as_ref())
}
