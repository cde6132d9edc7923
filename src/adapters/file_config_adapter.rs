//! INI file configuration adapter.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| BacktestError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
dir = ./data
symbol = AAPL
start_date = 2015-01-01

[backtest]
short_window = 20
long_window = 100
initial_cash = 10000.5
commission_rate = 0.002
quantity_granularity = whole

[report]
output_dir = ./out
"#;

    #[test]
    fn from_string_reads_every_section() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), Some("AAPL".into()));
        assert_eq!(
            adapter.get_string("data", "start_date"),
            Some("2015-01-01".into())
        );
        assert_eq!(adapter.get_int("backtest", "short_window", 50), 20);
        assert_eq!(adapter.get_int("backtest", "long_window", 200), 100);
        assert_eq!(adapter.get_double("backtest", "initial_cash", 0.0), 10000.5);
        assert_eq!(adapter.get_double("backtest", "commission_rate", 0.0), 0.002);
        assert_eq!(
            adapter.get_string("backtest", "quantity_granularity"),
            Some("whole".into())
        );
        assert_eq!(adapter.get_string("report", "output_dir"), Some("./out".into()));
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "end_date"), None);
        assert_eq!(adapter.get_string("nope", "symbol"), None);
        assert_eq!(adapter.get_int("backtest", "trading_days_per_year", 252), 252);
        assert_eq!(adapter.get_double("backtest", "risk_free_rate", 0.0), 0.0);
        assert!(!adapter.has_key("data", "end_date"));
        assert!(adapter.has_key("data", "dir"));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let adapter = FileConfigAdapter::from_string("[data]\nsymbol =\n").unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), None);
    }

    #[test]
    fn non_numeric_values_use_default() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nshort_window = abc\ninitial_cash = lots\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("backtest", "short_window", 50), 50);
        assert_eq!(adapter.get_double("backtest", "initial_cash", 99.9), 99.9);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("data", "dir"), Some("./data".into()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(
            err,
            BacktestError::ConfigParse { ref file, .. } if file.contains("config.ini")
        ));
    }
}
