//! CLI argument definitions

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use streamgate::config::{
    GateConfig, Mode, DEFAULT_BIND, DEFAULT_CONTENT_ROOT, DEFAULT_PROVIDER_URL,
    DEFAULT_SEGMENT_SUFFIX,
};
use streamgate::ConfigError;

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(about = "Token-gated segment and manifest server")]
#[command(version)]
pub struct Cli {
    /// Entitlement provider URL
    #[arg(long = "tokens", default_value = DEFAULT_PROVIDER_URL, env = "STREAMGATE_TOKENS_URL")]
    pub provider_url: String,

    /// Root directory of segments and manifests
    #[arg(long, default_value = DEFAULT_CONTENT_ROOT, env = "STREAMGATE_ROOT")]
    pub root: PathBuf,

    /// Address to bind to
    #[arg(short, long, default_value = DEFAULT_BIND, env = "STREAMGATE_BIND")]
    pub bind: SocketAddr,

    /// Authorization mode: simple or full
    #[arg(long, default_value = "simple", value_parser = parse_mode, env = "STREAMGATE_MODE")]
    pub mode: Mode,

    /// Address of the trusted relay in front of the gate
    #[arg(long, default_value = "127.0.0.1", env = "STREAMGATE_RELAY")]
    pub relay: IpAddr,

    /// Header the relay puts the client address in
    #[arg(long, default_value = "X-Forwarded-For", env = "STREAMGATE_FORWARDED_HEADER")]
    pub forwarded_header: String,

    /// Path suffix of media segments
    #[arg(long, default_value = DEFAULT_SEGMENT_SUFFIX, env = "STREAMGATE_SEGMENT_SUFFIX")]
    pub segment_suffix: String,

    /// Seconds between scheduled entitlement refreshes
    #[arg(long, default_value_t = 5, env = "STREAMGATE_REFRESH_SECS")]
    pub refresh_secs: u64,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Turn parsed arguments into a gate configuration
    pub fn to_config(&self) -> Result<GateConfig, ConfigError> {
        let config = GateConfig::new(self.provider_url.clone(), self.root.clone())
            .mode(self.mode)
            .bind_addr(self.bind)
            .relay_addr(self.relay)
            .segment_suffix(self.segment_suffix.clone())
            .refresh_interval(std::time::Duration::from_secs(self.refresh_secs))
            .forwarded_header(&self.forwarded_header)?;

        config.validate()?;
        Ok(config)
    }
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}
