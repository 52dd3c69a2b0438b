//! Gate configuration
//!
//! Everything here is read once at startup. The CLI layer fills a [`GateConfig`]
//! from flags and environment, then [`GateConfig::validate`] rejects settings the
//! server cannot run with.

use axum::http::HeaderName;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROVIDER_URL: &str = "http://localhost/tokens/list";
pub const DEFAULT_CONTENT_ROOT: &str = "/mnt/streams";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";
pub const DEFAULT_SEGMENT_SUFFIX: &str = ".ts";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown mode '{0}': expected 'simple' or 'full'")]
    UnknownMode(String),

    #[error("invalid forwarding header name '{0}'")]
    InvalidHeader(String),

    #[error("segment suffix cannot be empty")]
    EmptySegmentSuffix,

    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,
}

/// Deployment mode. Selects both the provider document schema and the
/// authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Provider returns `token -> channel`; only token presence is checked.
    #[default]
    Simple,
    /// Provider returns relay allowlist plus address and channel bindings.
    Full,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simple => "simple",
            Mode::Full => "full",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" | "v1" => Ok(Mode::Simple),
            "full" | "v2" => Ok(Mode::Full),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate server configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Upstream entitlement provider URL
    pub provider_url: String,
    /// Directory segments and manifests are served from
    pub content_root: PathBuf,
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Direct peer address of the trusted relay
    pub relay_addr: IpAddr,
    /// Header the relay uses to pass on the client address
    pub forwarded_header: HeaderName,
    /// Path suffix that marks a media segment
    pub segment_suffix: String,
    /// Time between scheduled refreshes
    pub refresh_interval: Duration,
    pub mode: Mode,
}

impl GateConfig {
    /// Create a configuration with defaults for everything but the provider
    /// and the content root
    pub fn new(provider_url: impl Into<String>, content_root: impl Into<PathBuf>) -> Self {
        Self {
            provider_url: provider_url.into(),
            content_root: content_root.into(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
            relay_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            forwarded_header: HeaderName::from_static(DEFAULT_FORWARDED_HEADER),
            segment_suffix: DEFAULT_SEGMENT_SUFFIX.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            mode: Mode::Simple,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn relay_addr(mut self, addr: IpAddr) -> Self {
        self.relay_addr = addr;
        self
    }

    /// Set the forwarding header by name
    pub fn forwarded_header(mut self, name: &str) -> Result<Self, ConfigError> {
        self.forwarded_header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        Ok(self)
    }

    pub fn segment_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.segment_suffix = suffix.into();
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_suffix.is_empty() {
            return Err(ConfigError::EmptySegmentSuffix);
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }
}
