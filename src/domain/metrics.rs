//! Performance metrics computed from a finished equity curve and trade log.

use super::account::{AccountState, EquityPoint};
use super::error::BacktestError;
use super::position::{RoundTrip, Side, Trade};

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Equality treats two NaN win ratios as equal, so a report with no round
/// trips still compares equal to its clone.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    /// Worst peak-to-trough decline as a fraction, `<= 0`.
    pub max_drawdown: f64,
    /// Longest run of observations spent below a prior peak.
    pub max_drawdown_duration: usize,
    /// NaN when no round trip has completed.
    pub win_ratio: f64,
    pub final_equity: f64,
    pub total_trades: usize,
    pub round_trips: usize,
    pub winning_round_trips: usize,
    pub return_observations: usize,
}

impl PartialEq for PerformanceReport {
    fn eq(&self, other: &Self) -> bool {
        let win_ratio_eq = self.win_ratio == other.win_ratio
            || (self.win_ratio.is_nan() && other.win_ratio.is_nan());
        win_ratio_eq
            && self.total_return == other.total_return
            && self.annualized_return == other.annualized_return
            && self.annualized_volatility == other.annualized_volatility
            && self.sharpe_ratio == other.sharpe_ratio
            && self.max_drawdown == other.max_drawdown
            && self.max_drawdown_duration == other.max_drawdown_duration
            && self.final_equity == other.final_equity
            && self.total_trades == other.total_trades
            && self.round_trips == other.round_trips
            && self.winning_round_trips == other.winning_round_trips
            && self.return_observations == other.return_observations
    }
}

impl PerformanceReport {
    /// Compute with a zero risk-free rate.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        trading_days_per_year: u32,
    ) -> Result<Self, BacktestError> {
        Self::compute_with_risk_free(equity_curve, trades, trading_days_per_year, 0.0)
    }

    /// Total return is measured from the first equity point, so any
    /// commission paid on that date is already inside the base. Use
    /// [`PerformanceReport::for_account`] to measure from the starting cash.
    pub fn compute_with_risk_free(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        trading_days_per_year: u32,
        risk_free_rate: f64,
    ) -> Result<Self, BacktestError> {
        Self::compute_from(None, equity_curve, trades, trading_days_per_year, risk_free_rate)
    }

    /// Metrics for a finished simulation, with total return measured from
    /// `initial_cash` so a first-day commission counts against it.
    pub fn for_account(
        account: &AccountState,
        trading_days_per_year: u32,
        risk_free_rate: f64,
    ) -> Result<Self, BacktestError> {
        Self::compute_from(
            Some(account.initial_cash),
            &account.equity_curve,
            &account.trades,
            trading_days_per_year,
            risk_free_rate,
        )
    }

    fn compute_from(
        initial_equity: Option<f64>,
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        trading_days_per_year: u32,
        risk_free_rate: f64,
    ) -> Result<Self, BacktestError> {
        if trading_days_per_year == 0 {
            return Err(BacktestError::invalid_config(
                "trading_days_per_year",
                "trading_days_per_year must be at least 1",
            ));
        }

        let (first, last) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(BacktestError::InsufficientData {
                    context: "equity curve".to_string(),
                    have: 0,
                    need: 1,
                });
            }
        };
        let base = initial_equity.unwrap_or(first.equity);
        if !(base.is_finite() && base > 0.0) {
            return Err(BacktestError::malformed(
                first.date,
                "equity",
                "initial equity must be positive",
            ));
        }

        let returns = daily_returns(equity_curve);
        if returns.len() < 2 {
            return Err(BacktestError::InsufficientData {
                context: "volatility".to_string(),
                have: returns.len(),
                need: 2,
            });
        }

        let periods_per_year = trading_days_per_year as f64;
        let total_return = last.equity / base - 1.0;
        let annualized_return =
            (1.0 + total_return).powf(periods_per_year / returns.len() as f64) - 1.0;
        let annualized_volatility = sample_stddev(&returns) * periods_per_year.sqrt();

        let sharpe_ratio = if annualized_volatility > 0.0 {
            (annualized_return - risk_free_rate) / annualized_volatility
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let trips = round_trips(trades);
        let winning_round_trips = trips.iter().filter(|t| t.is_win()).count();
        let win_ratio = if trips.is_empty() {
            f64::NAN
        } else {
            winning_round_trips as f64 / trips.len() as f64
        };

        Ok(PerformanceReport {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            win_ratio,
            final_equity: last.equity,
            total_trades: trades.len(),
            round_trips: trips.len(),
            winning_round_trips,
            return_observations: returns.len(),
        })
    }
}

/// Pair each Buy with the next Sell. A trailing Buy with no Sell is still
/// open and is not counted.
pub fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&Trade> = None;

    for trade in trades {
        match trade.side {
            Side::Buy => open = Some(trade),
            Side::Sell => {
                if let Some(entry) = open.take() {
                    trips.push(RoundTrip::from_trades(entry, trade));
                }
            }
        }
    }

    trips
}

/// Simple returns between consecutive points, skipping zero-equity bases.
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0].equity != 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect()
}

fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = point.equity / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}
