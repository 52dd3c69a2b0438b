//! Streamgate - token-gated delivery of segmented media streams
//!
//! Serves stream segments and manifests from disk, but only to clients holding
//! a currently valid entitlement token. Entitlements are pulled from an upstream
//! provider on a fixed interval and swapped into memory as whole snapshots.

pub mod config;
pub mod entitlements;
pub mod gate;
pub mod server;
pub mod sync;

pub use config::{ConfigError, GateConfig, Mode};
pub use entitlements::{EntitlementSnapshot, EntitlementTable};
pub use gate::{AuthorizationPolicy, Decision, DenyReason, GateRequest};
pub use server::GateServer;
pub use sync::{EntitlementProvider, EntitlementSynchronizer, HttpProvider, SyncError};
