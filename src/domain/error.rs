//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for smacross.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("invalid configuration {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("malformed input at {date} ({field}): {reason}")]
    MalformedInput {
        date: NaiveDate,
        field: String,
        reason: String,
    },

    #[error("insufficient data for {context}: have {have}, need {need}")]
    InsufficientData {
        context: String,
        have: usize,
        need: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(date: NaiveDate, field: &str, reason: impl Into<String>) -> Self {
        BacktestError::MalformedInput {
            date,
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::InvalidConfiguration { .. }
            | BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::DataSource { .. } | BacktestError::NoData { .. } => 3,
            BacktestError::MalformedInput { .. } => 4,
            BacktestError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_names_date_and_field() {
        let err = BacktestError::malformed(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "close",
            "price must be positive",
        );
        assert_eq!(
            err.to_string(),
            "malformed input at 2024-03-01 (close): price must be positive"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = BacktestError::InsufficientData {
            context: "signal generation".into(),
            have: 120,
            need: 200,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for signal generation: have 120, need 200"
        );
    }

    #[test]
    fn invalid_configuration_message() {
        let err = BacktestError::invalid_config("commission_rate", "must be in [0, 1)");
        assert_eq!(
            err.to_string(),
            "invalid configuration commission_rate: must be in [0, 1)"
        );
    }
}
