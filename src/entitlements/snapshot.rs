//! Immutable entitlement snapshots and the provider document formats

use crate::config::Mode;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Full-mode provider document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundDocument {
    /// Relay-forwarded client addresses allowed to fetch segments
    #[serde(default)]
    addr: HashMap<String, bool>,
    /// Token -> bound client address
    #[serde(default)]
    ip: HashMap<String, String>,
    /// Token -> bound channel
    #[serde(default)]
    ch: HashMap<String, String>,
}

/// One complete version of the entitlement state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementSnapshot {
    allowed_relay_addresses: HashSet<String>,
    token_to_client_address: HashMap<String, String>,
    token_to_channel: HashMap<String, String>,
}

impl EntitlementSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a provider response body
    ///
    /// In simple mode the body is a flat `token -> channel` object. In full
    /// mode it carries `addr`, `ip` and `ch` maps; absent maps are empty and
    /// only `true` entries of `addr` are allowlisted.
    pub fn parse(mode: Mode, body: &[u8]) -> Result<Self, serde_json::Error> {
        match mode {
            Mode::Simple => {
                let token_to_channel: HashMap<String, String> = serde_json::from_slice(body)?;
                Ok(Self {
                    token_to_channel,
                    ..Self::default()
                })
            }
            Mode::Full => {
                let doc: BoundDocument = serde_json::from_slice(body)?;
                Ok(Self {
                    allowed_relay_addresses: doc
                        .addr
                        .into_iter()
                        .filter_map(|(addr, allowed)| allowed.then_some(addr))
                        .collect(),
                    token_to_client_address: doc.ip,
                    token_to_channel: doc.ch,
                })
            }
        }
    }

    /// Allow a relay-forwarded client address
    pub fn with_relay_address(mut self, addr: impl Into<String>) -> Self {
        self.allowed_relay_addresses.insert(addr.into());
        self
    }

    /// Bind a token to a client address
    pub fn with_client_address(mut self, token: impl Into<String>, addr: impl Into<String>) -> Self {
        self.token_to_client_address.insert(token.into(), addr.into());
        self
    }

    /// Bind a token to a channel
    pub fn with_channel(mut self, token: impl Into<String>, channel: impl Into<String>) -> Self {
        self.token_to_channel.insert(token.into(), channel.into());
        self
    }

    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.token_to_client_address.get(token).map(String::as_str)
    }

    pub fn channel_of(&self, token: &str) -> Option<&str> {
        self.token_to_channel.get(token).map(String::as_str)
    }

    pub fn is_allowed_relay_address(&self, addr: &str) -> bool {
        self.allowed_relay_addresses.contains(addr)
    }

    /// Number of distinct tokens known to either binding map
    pub fn token_count(&self) -> usize {
        self.token_to_channel.len()
            + self
                .token_to_client_address
                .keys()
                .filter(|t| !self.token_to_channel.contains_key(*t))
                .count()
    }

    pub fn relay_address_count(&self) -> usize {
        self.allowed_relay_addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_count() == 0 && self.allowed_relay_addresses.is_empty()
    }
}
