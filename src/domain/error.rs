//! Domain error types.

/// Top-level error type for tradelens.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("ledger unreachable: {reason}")]
    Connectivity { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("calculator {name} failed: {reason}")]
    Calculator { name: String, reason: String },

    #[error("an analysis cycle is already running")]
    CycleInProgress,

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// Wrap a failure raised while a named calculator was running.
    pub fn calculator(name: &str, err: &AnalyticsError) -> Self {
        let reason = match err {
            AnalyticsError::Calculator { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        AnalyticsError::Calculator {
            name: name.to_string(),
            reason,
        }
    }
}

impl From<r2d2::Error> for AnalyticsError {
    fn from(e: r2d2::Error) -> Self {
        AnalyticsError::Connectivity {
            reason: e.to_string(),
        }
    }
}

impl From<rusqlite::Error> for AnalyticsError {
    fn from(e: rusqlite::Error) -> Self {
        AnalyticsError::DatabaseQuery {
            reason: e.to_string(),
        }
    }
}

impl From<&AnalyticsError> for std::process::ExitCode {
    fn from(err: &AnalyticsError) -> Self {
        let code: u8 = match err {
            AnalyticsError::Io(_) => 1,
            AnalyticsError::ConfigParse { .. }
            | AnalyticsError::ConfigMissing { .. }
            | AnalyticsError::ConfigInvalid { .. } => 2,
            AnalyticsError::Connectivity { .. } | AnalyticsError::DatabaseQuery { .. } => 3,
            AnalyticsError::Calculator { .. } | AnalyticsError::CycleInProgress => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculator_wrap_keeps_inner_reason() {
        let inner = AnalyticsError::Calculator {
            name: "inner".into(),
            reason: "bad row".into(),
        };
        let wrapped = AnalyticsError::calculator("strategy", &inner);
        assert_eq!(wrapped.to_string(), "calculator strategy failed: bad row");
    }

    #[test]
    fn calculator_wrap_formats_other_errors() {
        let inner = AnalyticsError::DatabaseQuery {
            reason: "no such table: strategy_performance".into(),
        };
        let wrapped = AnalyticsError::calculator("strategy", &inner);
        assert!(matches!(
            wrapped,
            AnalyticsError::Calculator { ref name, ref reason }
                if name == "strategy" && reason.contains("no such table")
        ));
    }
}
