//! Report output port trait.

use crate::domain::error::BacktestError;
use crate::domain::report::CombinedOutput;
use std::path::Path;

/// Port for writing the combined backtest output.
pub trait ReportPort {
    fn write(
        &self,
        output: &CombinedOutput,
        symbol: &str,
        destination: &Path,
    ) -> Result<(), BacktestError>;
}
