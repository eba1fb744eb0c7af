use std::time::Duration;

use aero_devremote_protocol::{Limits, DEFAULT_PORT, MAX_PROTOCOL};
use thiserror::Error;

/// Device command timeout, in seconds, used when neither the caller nor the configuration
/// supplies one.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {0}")]
    InvalidEnv(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Port used when the host does not name one.
    pub port: u16,
    pub connect_timeout: Duration,
    /// Socket read/write deadline. `None` blocks for as long as the peer stays silent.
    pub io_timeout: Option<Duration>,
    /// Default device command timeout in seconds, applied when a caller passes `0`.
    pub command_timeout: u32,
    /// Highest protocol version announced in our Hello.
    pub max_protocol: u8,
    pub limits: Limits,
    /// Application name announced in our Hello.
    pub application: String,
    pub application_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            io_timeout: Some(Duration::from_secs(60)),
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            max_protocol: MAX_PROTOCOL,
            limits: Limits::default(),
            application: "aero-devremote".into(),
            application_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl ClientConfig {
    /// Reads overrides from `DEVREMOTE_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(port) = parse(&lookup, "DEVREMOTE_PORT")? {
            if port == 0 {
                return Err(ConfigError::InvalidEnv("DEVREMOTE_PORT"));
            }
            cfg.port = port;
        }
        if let Some(secs) = parse::<u64>(&lookup, "DEVREMOTE_CONNECT_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(ConfigError::InvalidEnv("DEVREMOTE_CONNECT_TIMEOUT_SECS"));
            }
            cfg.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "DEVREMOTE_IO_TIMEOUT_SECS")? {
            cfg.io_timeout = (secs != 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = parse(&lookup, "DEVREMOTE_COMMAND_TIMEOUT_SECS")? {
            cfg.command_timeout = secs;
        }
        if let Some(version) = parse(&lookup, "DEVREMOTE_MAX_PROTOCOL")? {
            if version == 0 {
                return Err(ConfigError::InvalidEnv("DEVREMOTE_MAX_PROTOCOL"));
            }
            cfg.max_protocol = version;
        }
        if let Some(len) = parse(&lookup, "DEVREMOTE_MAX_PACKET_LEN")? {
            if len < aero_devremote_protocol::HEADER_LEN {
                return Err(ConfigError::InvalidEnv("DEVREMOTE_MAX_PACKET_LEN"));
            }
            cfg.limits.max_packet_len = len;
        }

        Ok(cfg)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| ConfigError::InvalidEnv(key))
}
