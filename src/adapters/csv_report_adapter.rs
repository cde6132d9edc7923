//! CSV report adapter.
//!
//! Writes three tables into the destination directory:
//! - `<symbol>_rows.csv`: one row per date (prices, SMAs, signal, account)
//! - `<symbol>_trades.csv`: the trade log
//! - `<symbol>_metrics.csv`: `metric,value` pairs, absent values left empty

use crate::domain::error::BacktestError;
use crate::domain::report::CombinedOutput;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    pub fn rows_path(destination: &Path, symbol: &str) -> PathBuf {
        destination.join(format!("{}_rows.csv", symbol))
    }

    pub fn trades_path(destination: &Path, symbol: &str) -> PathBuf {
        destination.join(format!("{}_trades.csv", symbol))
    }

    pub fn metrics_path(destination: &Path, symbol: &str) -> PathBuf {
        destination.join(format!("{}_metrics.csv", symbol))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> BacktestError {
    BacktestError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

fn write_rows(path: &Path, output: &CombinedOutput) -> Result<(), BacktestError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record([
        "date",
        "close",
        "sma_short",
        "sma_long",
        "signal",
        "cash",
        "position_qty",
        "equity",
    ])
    .map_err(|e| csv_error(path, e))?;

    for row in &output.rows {
        wtr.write_record([
            row.date.to_string(),
            row.close.to_string(),
            row.sma_short.to_string(),
            row.sma_long.to_string(),
            row.signal.to_string(),
            row.cash.to_string(),
            row.position_qty.to_string(),
            row.equity.to_string(),
        ])
        .map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_trades(path: &Path, output: &CombinedOutput) -> Result<(), BacktestError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(["date", "side", "price", "quantity", "commission", "cash_after"])
        .map_err(|e| csv_error(path, e))?;

    for trade in &output.trades {
        wtr.write_record([
            trade.date.to_string(),
            trade.side.to_string(),
            trade.price.to_string(),
            trade.quantity.to_string(),
            trade.commission.to_string(),
            trade.cash_after.to_string(),
        ])
        .map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

fn format_metric(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn write_metrics(path: &Path, output: &CombinedOutput) -> Result<(), BacktestError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(["metric", "value"])
        .map_err(|e| csv_error(path, e))?;

    let records: Vec<(&str, String)> = match &output.metrics {
        Some(m) => vec![
            ("total_return", format_metric(m.total_return)),
            ("annualized_return", format_metric(m.annualized_return)),
            ("annualized_volatility", format_metric(m.annualized_volatility)),
            ("sharpe_ratio", format_metric(m.sharpe_ratio)),
            ("max_drawdown", format_metric(m.max_drawdown)),
            ("max_drawdown_duration", m.max_drawdown_duration.to_string()),
            ("win_ratio", format_metric(m.win_ratio)),
            ("final_equity", format_metric(m.final_equity)),
            ("total_trades", m.total_trades.to_string()),
            ("round_trips", m.round_trips.to_string()),
            ("winning_round_trips", m.winning_round_trips.to_string()),
            ("return_observations", m.return_observations.to_string()),
        ],
        None => vec![
            (
                "final_equity",
                output.final_equity().map(format_metric).unwrap_or_default(),
            ),
            ("total_trades", output.trades.len().to_string()),
        ],
    };

    for (name, value) in records {
        wtr.write_record([name, value.as_str()])
            .map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        output: &CombinedOutput,
        symbol: &str,
        destination: &Path,
    ) -> Result<(), BacktestError> {
        fs::create_dir_all(destination)?;
        write_rows(&Self::rows_path(destination, symbol), output)?;
        write_trades(&Self::trades_path(destination, symbol), output)?;
        write_metrics(&Self::metrics_path(destination, symbol), output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::PerformanceReport;
    use crate::domain::position::{Side, Trade};
    use crate::domain::report::ReportRow;
    use crate::domain::signal::SignalValue;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_output(metrics: Option<PerformanceReport>) -> CombinedOutput {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        CombinedOutput {
            rows: vec![ReportRow {
                date,
                close: 100.0,
                sma_short: 101.5,
                sma_long: 99.25,
                signal: SignalValue::Buy,
                cash: 0.0,
                position_qty: 10.0,
                equity: 1_000.0,
            }],
            trades: vec![Trade {
                date,
                side: Side::Buy,
                price: 100.0,
                quantity: 10.0,
                commission: 0.0,
                cash_after: 0.0,
            }],
            skipped: vec![],
            metrics,
        }
    }

    fn sample_metrics() -> PerformanceReport {
        PerformanceReport {
            total_return: 0.1,
            annualized_return: 0.2,
            annualized_volatility: 0.3,
            sharpe_ratio: 0.5,
            max_drawdown: -0.05,
            max_drawdown_duration: 3,
            win_ratio: f64::NAN,
            final_equity: 1_100.0,
            total_trades: 1,
            round_trips: 0,
            winning_round_trips: 0,
            return_observations: 20,
        }
    }

    #[test]
    fn writes_all_three_tables() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out");
        let adapter = CsvReportAdapter::new();

        adapter
            .write(&sample_output(Some(sample_metrics())), "AAPL", &dest)
            .unwrap();

        let rows = fs::read_to_string(CsvReportAdapter::rows_path(&dest, "AAPL")).unwrap();
        assert_eq!(
            rows,
            "date,close,sma_short,sma_long,signal,cash,position_qty,equity\n\
             2024-01-15,100,101.5,99.25,BUY,0,10,1000\n"
        );

        let trades = fs::read_to_string(CsvReportAdapter::trades_path(&dest, "AAPL")).unwrap();
        assert_eq!(
            trades,
            "date,side,price,quantity,commission,cash_after\n2024-01-15,BUY,100,10,0,0\n"
        );

        let metrics = fs::read_to_string(CsvReportAdapter::metrics_path(&dest, "AAPL")).unwrap();
        assert!(metrics.starts_with("metric,value\ntotal_return,0.1\n"));
        assert!(metrics.contains("win_ratio,\n"));
        assert!(metrics.contains("max_drawdown,-0.05\n"));
    }

    #[test]
    fn missing_metrics_still_records_final_equity() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new();

        adapter
            .write(&sample_output(None), "MSFT", dir.path())
            .unwrap();

        let metrics =
            fs::read_to_string(CsvReportAdapter::metrics_path(dir.path(), "MSFT")).unwrap();
        assert_eq!(metrics, "metric,value\nfinal_equity,1000\ntotal_trades,1\n");
    }
}
