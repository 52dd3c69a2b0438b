//! Request authorization
//!
//! Every request for stream content is checked against one entitlement
//! snapshot and ends in exactly one [`Decision`]. The HTTP middleware that
//! drives this lives in `server::router`; this module is transport-free.
//!
//! Two policies exist:
//! - `TokenPresence`: any token known to the provider opens any resource
//! - `Bound`: tokens are bound to a channel, and to a client address when the
//!   request arrives through the trusted relay. Segment requests through the
//!   relay are allowed on the relay allowlist alone.

mod policy;

pub use policy::{AuthorizationPolicy, Decision, DenyReason, GateRequest, RelayBinding};
