//! Price data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

/// Source of already-downloaded daily price history.
pub trait DataPort {
    /// Validated series for `symbol`, restricted to the inclusive date range
    /// when bounds are given.
    fn fetch_series(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;
}
