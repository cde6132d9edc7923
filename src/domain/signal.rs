//! SMA crossover signal generation.
//!
//! A Buy fires when `SMA(short) - SMA(long)` turns from non-positive to
//! positive, a Sell when it turns from positive to non-positive. Every other
//! post-warm-up date is a Hold. Dates before the long SMA is defined produce
//! no signal at all.

use chrono::NaiveDate;
use log::debug;
use std::fmt;

use super::error::BacktestError;
use super::indicator::sma::calculate_sma;
use super::ohlcv::PriceSeries;

pub const DEFAULT_SHORT_WINDOW: usize = 50;
pub const DEFAULT_LONG_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SignalValue {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Buy => write!(f, "BUY"),
            SignalValue::Sell => write!(f, "SELL"),
            SignalValue::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Signal {
    pub date: NaiveDate,
    pub value: SignalValue,
    pub sma_short: f64,
    pub sma_long: f64,
}

/// What the first post-warm-up date emits, when there is no previous spread
/// to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FirstSignal {
    /// Always Hold.
    #[default]
    Hold,
    /// Compare against a non-positive prior spread: Buy if the short SMA
    /// already leads, Hold otherwise.
    Seed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalParams {
    pub short_window: usize,
    pub long_window: usize,
    pub first_signal: FirstSignal,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
            first_signal: FirstSignal::Hold,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.short_window == 0 {
            return Err(BacktestError::invalid_config(
                "short_window",
                "short_window must be at least 1",
            ));
        }
        if self.long_window == 0 {
            return Err(BacktestError::invalid_config(
                "long_window",
                "long_window must be at least 1",
            ));
        }
        if self.short_window >= self.long_window {
            return Err(BacktestError::invalid_config(
                "short_window",
                format!(
                    "short_window ({}) must be less than long_window ({})",
                    self.short_window, self.long_window
                ),
            ));
        }
        Ok(())
    }
}

/// Generate signals with the given windows and the default first-signal policy.
pub fn generate(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<Vec<Signal>, BacktestError> {
    generate_with(
        series,
        &SignalParams {
            short_window,
            long_window,
            ..SignalParams::default()
        },
    )
}

pub fn generate_with(
    series: &PriceSeries,
    params: &SignalParams,
) -> Result<Vec<Signal>, BacktestError> {
    params.validate()?;

    if series.len() < params.long_window {
        return Err(BacktestError::InsufficientData {
            context: "signal generation".to_string(),
            have: series.len(),
            need: params.long_window,
        });
    }

    let points = series.points();
    let short = calculate_sma(points, params.short_window);
    let long = calculate_sma(points, params.long_window);

    let first = long.warmup();
    debug!(
        "{} / {} crossover over {} bars, {} warm-up",
        short,
        long,
        points.len(),
        first
    );
    let mut signals = Vec::with_capacity(points.len() - first);
    let mut prev_positive: Option<bool> = match params.first_signal {
        FirstSignal::Hold => None,
        FirstSignal::Seed => Some(false),
    };

    for (i, point) in points.iter().enumerate().skip(first) {
        let (Some(sma_short), Some(sma_long)) = (short.value_at(i), long.value_at(i)) else {
            continue;
        };
        let positive = sma_short - sma_long > 0.0;

        let value = match prev_positive {
            Some(false) if positive => SignalValue::Buy,
            Some(true) if !positive => SignalValue::Sell,
            _ => SignalValue::Hold,
        };
        prev_positive = Some(positive);

        signals.push(Signal {
            date: point.date,
            value,
            sma_short,
            sma_long,
        });
    }

    Ok(signals)
}
