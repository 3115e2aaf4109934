//! Shutdown configuration
//!
//! `ShutdownConfig` is immutable once handed to a coordinator. It can be
//! built in code, loaded from a JSON document, and then overridden from the
//! environment:
//!
//! ```json
//! { "signals": ["interrupt", "terminate"], "failure_exit_code": 2 }
//! ```

use crate::constants::{
    DEFAULT_FAILURE_EXIT_CODE, DEFAULT_SUCCESS_EXIT_CODE, GRACE_FAILURE_EXIT_CODE_VAR,
    GRACE_LISTEN_FOR_SIGNALS_VAR, GRACE_SIGNALS_VAR,
};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// OS signals the coordinator can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
}

impl SignalKind {
    /// Conventional signal name, e.g. `SIGINT`
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Hangup => "SIGHUP",
            SignalKind::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        let bare = normalized.strip_prefix("SIG").unwrap_or(&normalized);
        match bare {
            "INT" | "INTERRUPT" => Ok(SignalKind::Interrupt),
            "TERM" | "TERMINATE" => Ok(SignalKind::Terminate),
            "HUP" | "HANGUP" => Ok(SignalKind::Hangup),
            "QUIT" => Ok(SignalKind::Quit),
            _ => Err(Error::invalid_signal(s.trim())),
        }
    }
}

/// Configuration for a shutdown coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Signals that trigger a graceful halt
    pub signals: Vec<SignalKind>,
    /// Whether to start the background signal listener at construction
    pub listen_for_signals: bool,
    /// Exit code used by a graceful halt in non-blocking mode
    pub success_exit_code: i32,
    /// Exit code used by an error halt in non-blocking mode
    pub failure_exit_code: i32,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            signals: vec![SignalKind::Interrupt, SignalKind::Terminate],
            listen_for_signals: true,
            success_exit_code: DEFAULT_SUCCESS_EXIT_CODE,
            failure_exit_code: DEFAULT_FAILURE_EXIT_CODE,
        }
    }
}

impl ShutdownConfig {
    /// Config without a signal listener, for embedding and tests
    pub fn without_signals() -> Self {
        Self {
            listen_for_signals: false,
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config", e))?;
        Self::from_json_str(&contents)
    }

    /// Apply `GRACE_*` environment overrides on top of this config
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(GRACE_SIGNALS_VAR) {
            self.signals = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(SignalKind::from_str)
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(raw) = lookup(GRACE_LISTEN_FOR_SIGNALS_VAR) {
            self.listen_for_signals = parse_bool(&raw).ok_or_else(|| {
                Error::configuration(format!(
                    "{GRACE_LISTEN_FOR_SIGNALS_VAR} must be a boolean, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup(GRACE_FAILURE_EXIT_CODE_VAR) {
            self.failure_exit_code = raw.trim().parse().map_err(|_| {
                Error::configuration(format!(
                    "{GRACE_FAILURE_EXIT_CODE_VAR} must be an integer, got '{raw}'"
                ))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the coordinator cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.listen_for_signals && self.signals.is_empty() {
            return Err(Error::configuration(
                "signal listener enabled but no signals configured",
            ));
        }
        if self.success_exit_code == self.failure_exit_code {
            return Err(Error::configuration(format!(
                "success and failure exit codes must differ (both are {})",
                self.success_exit_code
            )));
        }
        Ok(())
    }

    /// Exit code for a halt with or without an error
    pub fn exit_code(&self, failed: bool) -> i32 {
        if failed {
            self.failure_exit_code
        } else {
            self.success_exit_code
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ShutdownConfig::default();
        assert_eq!(
            config.signals,
            vec![SignalKind::Interrupt, SignalKind::Terminate]
        );
        assert!(config.listen_for_signals);
        assert_eq!(config.exit_code(false), 0);
        assert_eq!(config.exit_code(true), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_signal_kind_parsing() {
        assert_eq!("SIGINT".parse::<SignalKind>().unwrap(), SignalKind::Interrupt);
        assert_eq!("term".parse::<SignalKind>().unwrap(), SignalKind::Terminate);
        assert_eq!(" hangup ".parse::<SignalKind>().unwrap(), SignalKind::Hangup);
        assert_eq!("sigquit".parse::<SignalKind>().unwrap(), SignalKind::Quit);
        assert!("SIGKILL".parse::<SignalKind>().is_err());
    }

    #[test]
    fn test_json_partial_document_uses_defaults() {
        let config = ShutdownConfig::from_json_str(r#"{ "failure_exit_code": 2 }"#).unwrap();
        assert_eq!(config.failure_exit_code, 2);
        assert_eq!(config.success_exit_code, 0);
        assert_eq!(config.signals.len(), 2);
    }

    #[test]
    fn test_json_signals() {
        let config =
            ShutdownConfig::from_json_str(r#"{ "signals": ["hangup", "terminate"] }"#).unwrap();
        assert_eq!(config.signals, vec![SignalKind::Hangup, SignalKind::Terminate]);
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "listen_for_signals": false }}"#).unwrap();

        let config = ShutdownConfig::from_json_file(file.path()).unwrap();
        assert!(!config.listen_for_signals);
    }

    #[test]
    fn test_missing_file_is_file_system_error() {
        let err = ShutdownConfig::from_json_file("/nonexistent/grace.json").unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }

    #[test]
    fn test_overrides() {
        let config = ShutdownConfig::default()
            .with_overrides_from(vars(&[
                ("GRACE_SIGNALS", "SIGHUP, SIGTERM"),
                ("GRACE_FAILURE_EXIT_CODE", "70"),
            ]))
            .unwrap();
        assert_eq!(config.signals, vec![SignalKind::Hangup, SignalKind::Terminate]);
        assert_eq!(config.failure_exit_code, 70);
        assert!(config.listen_for_signals);
    }

    #[test]
    fn test_override_rejects_bad_values() {
        let err = ShutdownConfig::default()
            .with_overrides_from(vars(&[("GRACE_LISTEN_FOR_SIGNALS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("must be a boolean"));

        let err = ShutdownConfig::default()
            .with_overrides_from(vars(&[("GRACE_SIGNALS", "SIGUSR9")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSignal { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_signals_when_listening() {
        let config = ShutdownConfig {
            signals: Vec::new(),
            ..ShutdownConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ShutdownConfig {
            signals: Vec::new(),
            ..ShutdownConfig::without_signals()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_equal_exit_codes() {
        let config = ShutdownConfig {
            failure_exit_code: 0,
            ..ShutdownConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_read_process_environment() {
        std::env::set_var(GRACE_LISTEN_FOR_SIGNALS_VAR, "off");
        let config = ShutdownConfig::default().with_env_overrides();
        std::env::remove_var(GRACE_LISTEN_FOR_SIGNALS_VAR);

        assert!(!config.unwrap().listen_for_signals);
    }
}
