//! Device connection configuration.
//!
//! [`ConnectionParams`] is built once per device before dispatch and is
//! read-only for the dispatcher. Credentials can be supplied directly or
//! sourced from `NETGAUGE_*` environment variables.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Default command/connection timeout (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default session keepalive interval (10 seconds).
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(10);

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default NETCONF port.
pub const DEFAULT_NETCONF_PORT: u16 = 830;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Username was neither passed nor found in the environment.
    #[error("no username given and NETGAUGE_USERNAME is not set")]
    MissingUsername,

    /// Password was neither passed nor found in the environment.
    #[error("no password given and NETGAUGE_PASSWORD is not set")]
    MissingPassword,

    /// A duration environment variable did not parse.
    #[error("invalid duration in {var}: {value:?}")]
    InvalidDuration { var: &'static str, value: String },

    /// A port environment variable did not parse.
    #[error("invalid port in {var}: {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

/// A credential string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Connection parameters for one device.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Target hostname or IP address.
    pub host: String,
    /// Device type, as keyed in the command catalog.
    pub device_type: String,
    /// Keep the session cached for reuse across dispatch calls.
    pub persist: bool,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: SecretString,
    /// Privilege-escalation secret; defaults to the password.
    pub secret: Option<SecretString>,
    /// Per-command execution timeout.
    pub timeout: Duration,
    /// Session keepalive interval.
    pub keepalive: Duration,
    /// SSH port.
    pub ssh_port: u16,
    /// NETCONF port.
    pub netconf_port: u16,
}

impl ConnectionParams {
    /// Create connection parameters with explicit credentials and defaults
    /// for everything else.
    pub fn new(
        host: impl Into<String>,
        device_type: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            device_type: device_type.into(),
            persist: false,
            username: username.into(),
            password: password.into(),
            secret: None,
            timeout: DEFAULT_TIMEOUT,
            keepalive: DEFAULT_KEEPALIVE,
            ssh_port: DEFAULT_SSH_PORT,
            netconf_port: DEFAULT_NETCONF_PORT,
        }
    }

    /// Create connection parameters from `NETGAUGE_*` environment variables:
    /// `NETGAUGE_USERNAME`, `NETGAUGE_PASSWORD`, `NETGAUGE_SECRET`,
    /// `NETGAUGE_TIMEOUT`, `NETGAUGE_KEEPALIVE`, `NETGAUGE_SSH_PORT`,
    /// `NETGAUGE_NETCONF_PORT`.
    ///
    /// # Errors
    /// [`ConfigError`] when credentials are absent or a variable fails to
    /// parse.
    pub fn from_env(
        host: impl Into<String>,
        device_type: impl Into<String>,
        persist: bool,
    ) -> Result<Self, ConfigError> {
        let username = std::env::var("NETGAUGE_USERNAME")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingUsername)?;
        let password = std::env::var("NETGAUGE_PASSWORD")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingPassword)?;
        let secret = std::env::var("NETGAUGE_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::new);

        let mut params = Self::new(host, device_type, username, password);
        params.persist = persist;
        params.secret = secret;
        params.timeout = env_duration("NETGAUGE_TIMEOUT", DEFAULT_TIMEOUT)?;
        params.keepalive = env_duration("NETGAUGE_KEEPALIVE", DEFAULT_KEEPALIVE)?;
        params.ssh_port = env_port("NETGAUGE_SSH_PORT", DEFAULT_SSH_PORT)?;
        params.netconf_port = env_port("NETGAUGE_NETCONF_PORT", DEFAULT_NETCONF_PORT)?;
        Ok(params)
    }

    /// Keep the session cached across dispatch calls.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Set the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the session keepalive interval.
    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Set the privilege-escalation secret.
    pub fn with_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the SSH port.
    pub fn with_ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    /// Set the NETCONF port.
    pub fn with_netconf_port(mut self, port: u16) -> Self {
        self.netconf_port = port;
        self
    }

    /// Privilege-escalation secret, falling back to the password.
    pub fn effective_secret(&self) -> &SecretString {
        self.secret.as_ref().unwrap_or(&self.password)
    }

    /// Identity key for the per-device session cache.
    pub fn device_key(&self) -> String {
        format!("{}/{}", self.host, self.device_type)
    }
}

/// Parse a duration string: plain integers are seconds, anything else goes
/// through humantime (`"30s"`, `"1m"`, `"1h30m"`, ...).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).ok()
}

fn env_duration(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => parse_duration(&value).ok_or(ConfigError::InvalidDuration { var, value }),
        Err(_) => Ok(default),
    }
}

fn env_port(var: &'static str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort { var, value }),
        Err(_) => Ok(default),
    }
}
