//! Configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! autosave_interval_ms = 30000
//! log_filter = "info"
//!
//! [notify]
//! supervisor_url = "http://127.0.0.1:5001/events"
//! max_retries = 3
//!
//! [status]
//! bind = "127.0.0.1"
//! port = 27111
//!
//! [presence]
//! poll_interval_ms = 5000
//!
//! [store]
//! path = "users.json"
//!
//! [gatekeeper]
//! hold_altitude = 300.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use warden_notify::{NotifyConfig, RetryPolicy};
use warden_presence::PollConfig;
use warden_store::BootstrapSeed;

use crate::ConfigError;
use crate::gatekeeper::DEFAULT_HOLD_ALTITUDE;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub notify: NotifySection,
    pub status: StatusSection,
    pub presence: PresenceSection,
    pub store: StoreSection,
    pub gatekeeper: GatekeeperSection,
    pub bootstrap: BootstrapSeed,
    /// How often authenticated sessions' profiles are saved.
    pub autosave_interval_ms: u64,
    /// Default `tracing` filter; `RUST_LOG` overrides it.
    pub log_filter: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            notify: NotifySection::default(),
            status: StatusSection::default(),
            presence: PresenceSection::default(),
            store: StoreSection::default(),
            gatekeeper: GatekeeperSection::default(),
            bootstrap: BootstrapSeed::default(),
            autosave_interval_ms: 30_000,
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// Supervisor endpoint for single events. Unset disables notifications.
    pub supervisor_url: Option<String>,
    /// Endpoint for roster pushes; defaults to `supervisor_url`.
    pub reconcile_url: Option<String>,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            supervisor_url: None,
            reconcile_url: None,
            max_retries: warden_notify::DEFAULT_MAX_RETRIES,
            base_delay_ms: 1_000,
            connect_timeout_ms: 3_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl NotifySection {
    pub fn to_notify_config(&self) -> NotifyConfig {
        NotifyConfig {
            supervisor_url: self.supervisor_url.clone(),
            reconcile_url: self.reconcile_url.clone(),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.base_delay_ms),
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSection {
    pub bind: String,
    pub port: u16,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 27111,
        }
    }
}

impl StatusSection {
    /// `bind:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSection {
    pub poll_interval_ms: u64,
    pub initial_jitter_ms: u64,
}

impl Default for PresenceSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            initial_jitter_ms: 500,
        }
    }
}

impl PresenceSection {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            initial_jitter: Duration::from_millis(self.initial_jitter_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Path of the JSON account document.
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("users.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperSection {
    pub hold_altitude: f64,
}

impl Default for GatekeeperSection {
    fn default() -> Self {
        Self {
            hold_altitude: DEFAULT_HOLD_ALTITUDE,
        }
    }
}

impl WardenConfig {
    /// Upper bound on `notify.max_retries`.
    pub const MAX_RETRIES: u32 = 10;
    /// Lower bound on `autosave_interval_ms`.
    pub const MIN_AUTOSAVE_MS: u64 = 1_000;

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// - `notify.max_retries` capped to [`Self::MAX_RETRIES`].
    /// - `autosave_interval_ms` raised to [`Self::MIN_AUTOSAVE_MS`].
    /// - A non-finite `gatekeeper.hold_altitude` falls back to the default.
    /// - The poll interval is clamped by [`PollConfig::validated`].
    pub fn validated(mut self) -> Self {
        if self.notify.max_retries > Self::MAX_RETRIES {
            warn!(
                max_retries = self.notify.max_retries,
                max = Self::MAX_RETRIES,
                "max_retries too large, clamping"
            );
            self.notify.max_retries = Self::MAX_RETRIES;
        }
        if self.autosave_interval_ms < Self::MIN_AUTOSAVE_MS {
            warn!(
                autosave_interval_ms = self.autosave_interval_ms,
                min = Self::MIN_AUTOSAVE_MS,
                "autosave interval too short, clamping"
            );
            self.autosave_interval_ms = Self::MIN_AUTOSAVE_MS;
        }
        if !self.gatekeeper.hold_altitude.is_finite() {
            warn!("hold_altitude is not a finite number, using default");
            self.gatekeeper.hold_altitude = DEFAULT_HOLD_ALTITUDE;
        }
        let poll = self.presence.to_poll_config().validated();
        self.presence.poll_interval_ms = poll.poll_interval.as_millis() as u64;
        self.presence.initial_jitter_ms = poll.initial_jitter.as_millis() as u64;
        self
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_empty_gives_defaults() {
        let config = WardenConfig::from_toml_str("").unwrap();
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.status.address(), "127.0.0.1:27111");
        assert_eq!(config.presence.poll_interval_ms, 5_000);
        assert_eq!(config.autosave_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_toml_str_partial_sections_keep_defaults() {
        let config = WardenConfig::from_toml_str(
            r#"
            [notify]
            supervisor_url = "http://sup:5001/events"
            max_retries = 2

            [gatekeeper]
            hold_altitude = 200.0

            [bootstrap]
            salt = "pepper"
            "#,
        )
        .unwrap();

        let notify = config.notify.to_notify_config();
        assert_eq!(notify.supervisor_url.as_deref(), Some("http://sup:5001/events"));
        assert_eq!(notify.roster_url(), Some("http://sup:5001/events"));
        assert_eq!(notify.retry.max_retries, 2);
        assert_eq!(notify.retry.base_delay, Duration::from_secs(1));
        assert_eq!(notify.request_timeout, Duration::from_secs(5));
        assert_eq!(config.gatekeeper.hold_altitude, 200.0);
        assert_eq!(config.bootstrap.salt, "pepper");
        assert_eq!(
            config.bootstrap.password_hash,
            BootstrapSeed::default().password_hash
        );
    }

    #[test]
    fn test_from_toml_str_rejects_wrong_types() {
        let result = WardenConfig::from_toml_str("[status]\nport = \"high\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = WardenConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn test_validated_clamps_out_of_range_values() {
        let mut config = WardenConfig::default();
        config.notify.max_retries = 1_000;
        config.autosave_interval_ms = 5;
        config.presence.poll_interval_ms = 1;
        config.gatekeeper.hold_altitude = f64::NAN;

        let config = config.validated();

        assert_eq!(config.notify.max_retries, WardenConfig::MAX_RETRIES);
        assert_eq!(config.autosave_interval_ms, WardenConfig::MIN_AUTOSAVE_MS);
        assert_eq!(config.presence.poll_interval_ms, 100);
        assert_eq!(config.gatekeeper.hold_altitude, DEFAULT_HOLD_ALTITUDE);
    }

    #[test]
    fn test_status_address_brackets_ipv6() {
        let status = StatusSection {
            bind: "::1".into(),
            port: 8080,
        };
        assert_eq!(status.address(), "[::1]:8080");
    }
}
