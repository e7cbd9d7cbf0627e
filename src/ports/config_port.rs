//! Configuration boundary.

use crate::domain::error::TradekitError;

/// Typed access to configuration values, keyed by section and key.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Result<String, TradekitError>;
    fn get_int(&self, section: &str, key: &str) -> Result<i64, TradekitError>;
    fn get_double(&self, section: &str, key: &str) -> Result<f64, TradekitError>;
    fn get_bool(&self, section: &str, key: &str) -> Result<bool, TradekitError>;

    fn get_string_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get_string(section, key)
            .unwrap_or_else(|_| default.to_string())
    }

    fn get_int_or(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_int(section, key).unwrap_or(default)
    }

    fn get_double_or(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_double(section, key).unwrap_or(default)
    }
}
