#![allow(dead_code)]

use chrono::NaiveDate;
use smacross::domain::backtest::BacktestConfig;
use smacross::domain::error::BacktestError;
use smacross::domain::ohlcv::PriceSeries;
use smacross::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        symbol: &str,
        _start_date: Option<NaiveDate>,
        _end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| BacktestError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One close per calendar day starting 2020-01-01.
pub fn make_series(closes: &[f64]) -> PriceSeries {
    let start = date(2020, 1, 1);
    PriceSeries::from_closes(
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (start + chrono::Duration::days(i as i64), c)),
    )
    .unwrap()
}

/// `n` closes rising linearly from `from` to `to` inclusive.
pub fn linear_closes(n: usize, from: f64, to: f64) -> Vec<f64> {
    let step = (to - from) / (n - 1) as f64;
    (0..n).map(|i| from + step * i as f64).collect()
}

pub fn flat_closes(n: usize, value: f64) -> Vec<f64> {
    vec![value; n]
}

pub fn small_config() -> BacktestConfig {
    BacktestConfig {
        short_window: 2,
        long_window: 4,
        initial_cash: 1_000.0,
        commission_rate: 0.0,
        ..BacktestConfig::default()
    }
}
