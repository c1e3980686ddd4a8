//! Configuration access port: section/key lookups with typed defaults.

use crate::domain::error::AnalyticsError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// A non-blank string value, or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, AnalyticsError> {
        self.get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AnalyticsError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
