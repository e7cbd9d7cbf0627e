//! INI file configuration adapter.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::TradekitError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradekitError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| TradekitError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TradekitError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TradekitError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    fn missing(section: &str, key: &str) -> TradekitError {
        TradekitError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    fn invalid(section: &str, key: &str, reason: String) -> TradekitError {
        TradekitError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Result<String, TradekitError> {
        self.config
            .get(section, key)
            .ok_or_else(|| Self::missing(section, key))
    }

    fn get_int(&self, section: &str, key: &str) -> Result<i64, TradekitError> {
        let raw = self.get_string(section, key)?;
        raw.trim()
            .parse()
            .map_err(|_| Self::invalid(section, key, format!("'{}' is not an integer", raw)))
    }

    fn get_double(&self, section: &str, key: &str) -> Result<f64, TradekitError> {
        let raw = self.get_string(section, key)?;
        raw.trim()
            .parse()
            .map_err(|_| Self::invalid(section, key, format!("'{}' is not a number", raw)))
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<bool, TradekitError> {
        let raw = self.get_string(section, key)?;
        Self::parse_bool(&raw)
            .ok_or_else(|| Self::invalid(section, key, format!("'{}' is not a boolean", raw)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SAMPLE: &str = r#"
[backtest]
symbol = BTCUSDT
initial_capital = 10000
warmup = 50
verbose = true
"#;

    #[test]
    fn from_string_parses_values() {
        let config = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(config.get_string("backtest", "symbol").unwrap(), "BTCUSDT");
        assert_eq!(config.get_int("backtest", "warmup").unwrap(), 50);
        assert!((config.get_double("backtest", "initial_capital").unwrap() - 10_000.0).abs() < f64::EPSILON);
        assert!(config.get_bool("backtest", "verbose").unwrap());
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(config.get_string("backtest", "symbol").unwrap(), "BTCUSDT");
    }

    #[test]
    fn missing_key_errors() {
        let config = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert!(matches!(
            config.get_string("backtest", "nope"),
            Err(TradekitError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn malformed_number_errors() {
        let config = FileConfigAdapter::from_string("[a]\nx = not_a_number\n").unwrap();
        assert!(matches!(
            config.get_double("a", "x"),
            Err(TradekitError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn defaults_apply_when_absent() {
        let config = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(config.get_int_or("backtest", "nope", 7), 7);
        assert_eq!(config.get_string_or("backtest", "symbol", "X"), "BTCUSDT");
    }

    #[test]
    fn missing_file_errors() {
        assert!(matches!(
            FileConfigAdapter::from_file("/nonexistent/path.ini"),
            Err(TradekitError::ConfigParse { .. })
        ));
    }
}
