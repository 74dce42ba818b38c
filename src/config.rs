//! Environment-driven configuration for the detection core.

use std::path::PathBuf;

/// Tunables consumed by the core. External collaborators (capture interface,
/// broker bootstrap address) read their own variables; the core ignores them.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// When on (the default), only corporate destinations are captured and
    /// analyzed; personal traffic is dropped at the pipeline edge.
    pub privacy_mode: bool,
    /// Whether unknown external destinations are monitored (the safe default)
    /// or dropped for strict privacy.
    pub monitor_unknown: bool,
    /// Path of the line-delimited JSON audit ledger.
    pub audit_log_path: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            privacy_mode: true,
            monitor_unknown: true,
            audit_log_path: PathBuf::from("logs/audit_ledger.jsonl"),
        }
    }
}

impl CoreConfig {
    /// Resolve configuration from the environment (with `.env` support).
    ///
    /// Recognized variables: `SHADOWSCOPE_PRIVACY_MODE`,
    /// `SHADOWSCOPE_MONITOR_UNKNOWN`, `SHADOWSCOPE_AUDIT_LOG`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            privacy_mode: env_flag("SHADOWSCOPE_PRIVACY_MODE", defaults.privacy_mode),
            monitor_unknown: env_flag("SHADOWSCOPE_MONITOR_UNKNOWN", defaults.monitor_unknown),
            audit_log_path: std::env::var("SHADOWSCOPE_AUDIT_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log_path),
        }
    }

    #[must_use]
    pub fn with_privacy_mode(mut self, privacy_mode: bool) -> Self {
        self.privacy_mode = privacy_mode;
        self
    }

    #[must_use]
    pub fn with_monitor_unknown(mut self, monitor_unknown: bool) -> Self {
        self.monitor_unknown = monitor_unknown;
        self
    }

    #[must_use]
    pub fn with_audit_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log_path = path.into();
        self
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => value.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}
