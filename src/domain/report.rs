//! Combined tabular output for export and visualization.
//!
//! Assembly only aligns data that has already been computed: one row per
//! signal date, the trade log as-is, and the metrics record.

use chrono::NaiveDate;

use super::account::{AccountState, SkippedSignal};
use super::error::BacktestError;
use super::metrics::PerformanceReport;
use super::ohlcv::PriceSeries;
use super::position::Trade;
use super::signal::{Signal, SignalValue};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReportRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub signal: SignalValue,
    pub cash: f64,
    pub position_qty: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CombinedOutput {
    pub rows: Vec<ReportRow>,
    pub trades: Vec<Trade>,
    pub skipped: Vec<SkippedSignal>,
    /// `None` when too few equity observations exist to compute risk figures.
    pub metrics: Option<PerformanceReport>,
}

impl CombinedOutput {
    pub fn date_axis(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.rows.last().map(|r| r.equity)
    }
}

pub fn assemble(
    series: &PriceSeries,
    signals: &[Signal],
    account: &AccountState,
    report: Option<&PerformanceReport>,
) -> Result<CombinedOutput, BacktestError> {
    if signals.len() != account.equity_curve.len() {
        let date = signals
            .get(account.equity_curve.len())
            .map(|s| s.date)
            .or_else(|| account.equity_curve.get(signals.len()).map(|p| p.date))
            .or_else(|| series.first_date())
            .unwrap_or_default();
        return Err(BacktestError::malformed(
            date,
            "equity_curve",
            format!(
                "{} signals but {} equity points",
                signals.len(),
                account.equity_curve.len()
            ),
        ));
    }

    let rows = signals
        .iter()
        .zip(&account.equity_curve)
        .map(|(signal, point)| {
            if signal.date != point.date {
                return Err(BacktestError::malformed(
                    signal.date,
                    "equity_curve",
                    format!("equity point dated {} is out of step", point.date),
                ));
            }
            let price = series.get(signal.date).ok_or_else(|| {
                BacktestError::malformed(signal.date, "close", "date missing from price series")
            })?;
            Ok(ReportRow {
                date: signal.date,
                close: price.close,
                sma_short: signal.sma_short,
                sma_long: signal.sma_long,
                signal: signal.value,
                cash: point.cash,
                position_qty: point.position_qty,
                equity: point.equity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CombinedOutput {
        rows,
        trades: account.trades.clone(),
        skipped: account.skipped.clone(),
        metrics: report.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series() -> PriceSeries {
        PriceSeries::from_closes(vec![(date(1), 10.0), (date(2), 11.0), (date(3), 12.0)]).unwrap()
    }

    fn signal(d: u32, value: SignalValue) -> Signal {
        Signal {
            date: date(d),
            value,
            sma_short: 10.5,
            sma_long: 10.0,
        }
    }

    fn account_for(dates: &[u32], closes: &[f64]) -> AccountState {
        let mut account = AccountState::new(1_000.0);
        for (&d, &c) in dates.iter().zip(closes) {
            account.record_equity(date(d), c);
        }
        account
    }

    #[test]
    fn assembles_one_row_per_signal() {
        let signals = vec![signal(2, SignalValue::Hold), signal(3, SignalValue::Buy)];
        let account = account_for(&[2, 3], &[11.0, 12.0]);

        let output = assemble(&series(), &signals, &account, None).unwrap();

        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.date_axis(), vec![date(2), date(3)]);
        assert_eq!(output.rows[1].close, 12.0);
        assert_eq!(output.rows[1].signal, SignalValue::Buy);
        assert_eq!(output.rows[1].sma_short, 10.5);
        assert_eq!(output.rows[1].equity, 1_000.0);
        assert_eq!(output.final_equity(), Some(1_000.0));
        assert!(output.metrics.is_none());
    }

    #[test]
    fn rejects_length_mismatch() {
        let signals = vec![signal(2, SignalValue::Hold), signal(3, SignalValue::Hold)];
        let account = account_for(&[2], &[11.0]);

        let err = assemble(&series(), &signals, &account, None).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::MalformedInput { date: d, .. } if d == date(3)
        ));
    }

    #[test]
    fn rejects_misaligned_dates() {
        let signals = vec![signal(2, SignalValue::Hold), signal(3, SignalValue::Hold)];
        let account = account_for(&[1, 3], &[10.0, 12.0]);

        let err = assemble(&series(), &signals, &account, None).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::MalformedInput { date: d, .. } if d == date(2)
        ));
    }

    #[test]
    fn rejects_date_missing_from_series() {
        let signals = vec![signal(5, SignalValue::Hold)];
        let account = account_for(&[5], &[10.0]);

        let err = assemble(&series(), &signals, &account, None).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::MalformedInput { ref field, .. } if field == "close"
        ));
    }

    #[test]
    fn empty_inputs_give_empty_output() {
        let output = assemble(&series(), &[], &AccountState::new(1.0), None).unwrap();
        assert!(output.rows.is_empty());
        assert_eq!(output.final_equity(), None);
    }
}
