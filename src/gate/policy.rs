//! Authorization policies and their evaluation order

use crate::config::{GateConfig, Mode};
use crate::entitlements::EntitlementSnapshot;
use std::net::IpAddr;
use thiserror::Error;

/// Why a request was denied. Only ever logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("forwarded address is not on the relay allowlist")]
    RelayAddressNotAllowed,

    #[error("no token parameter")]
    MissingToken,

    #[error("token is not known")]
    UnknownToken,

    #[error("path has no channel segment")]
    MalformedPath,

    #[error("token is bound to another channel")]
    ChannelMismatch,

    #[error("forwarded address does not match the token binding")]
    AddressMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// What the gate knows about one request
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// URI path, without query
    pub path: &'a str,
    /// Value of the `token` query parameter
    pub token: Option<&'a str>,
    /// Direct network peer
    pub peer: IpAddr,
    /// Client address asserted by the forwarding header
    pub forwarded_address: Option<&'a str>,
}

/// How the trusted relay is recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayBinding {
    pub relay_addr: IpAddr,
    pub segment_suffix: String,
}

impl RelayBinding {
    fn is_segment(&self, path: &str) -> bool {
        path.ends_with(&self.segment_suffix)
    }
}

/// Authorization policy, selected once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    /// Token must be present in the table; nothing else is checked
    TokenPresence,
    /// Channel binding, plus address binding for relay traffic
    Bound(RelayBinding),
}

impl AuthorizationPolicy {
    pub fn from_config(config: &GateConfig) -> Self {
        match config.mode {
            Mode::Simple => AuthorizationPolicy::TokenPresence,
            Mode::Full => AuthorizationPolicy::Bound(RelayBinding {
                relay_addr: config.relay_addr,
                segment_suffix: config.segment_suffix.clone(),
            }),
        }
    }

    pub fn evaluate(&self, snapshot: &EntitlementSnapshot, req: &GateRequest<'_>) -> Decision {
        let result = match self {
            AuthorizationPolicy::TokenPresence => check_presence(snapshot, req),
            AuthorizationPolicy::Bound(relay) => check_bound(relay, snapshot, req),
        };

        match result {
            Ok(()) => Decision::Allow,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

fn require_token<'a>(req: &GateRequest<'a>) -> Result<&'a str, DenyReason> {
    req.token
        .filter(|t| !t.is_empty())
        .ok_or(DenyReason::MissingToken)
}

fn check_presence(snapshot: &EntitlementSnapshot, req: &GateRequest<'_>) -> Result<(), DenyReason> {
    let token = require_token(req)?;
    snapshot.channel_of(token).ok_or(DenyReason::UnknownToken)?;
    Ok(())
}

fn check_bound(
    relay: &RelayBinding,
    snapshot: &EntitlementSnapshot,
    req: &GateRequest<'_>,
) -> Result<(), DenyReason> {
    let via_relay = req.peer == relay.relay_addr;

    // Relay segment traffic is authorized by the allowlist alone
    if via_relay && relay.is_segment(req.path) {
        let allowed = req
            .forwarded_address
            .is_some_and(|addr| snapshot.is_allowed_relay_address(addr));
        return if allowed {
            Ok(())
        } else {
            Err(DenyReason::RelayAddressNotAllowed)
        };
    }

    let token = require_token(req)?;
    let bound_addr = snapshot.lookup(token).ok_or(DenyReason::UnknownToken)?;

    let channel = path_channel(req.path).ok_or(DenyReason::MalformedPath)?;
    if snapshot.channel_of(token) != Some(channel) {
        return Err(DenyReason::ChannelMismatch);
    }

    // Direct traffic is never address-checked
    if via_relay && req.forwarded_address != Some(bound_addr) {
        return Err(DenyReason::AddressMismatch);
    }

    Ok(())
}

/// First path segment, if the path has at least `/{channel}/{rest}`
fn path_channel(path: &str) -> Option<&str> {
    let (channel, rest) = path.strip_prefix('/')?.split_once('/')?;
    if channel.is_empty() || rest.is_empty() {
        return None;
    }
    Some(channel)
}
