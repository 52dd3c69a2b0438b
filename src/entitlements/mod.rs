//! Entitlements: which tokens are currently valid and what they are bound to
//!
//! A [`EntitlementSnapshot`] is built off to the side from a provider document
//! and then installed into the [`EntitlementTable`] in one swap. Readers take a
//! handle to the current snapshot, so a request never sees half of one refresh
//! and half of another.

mod snapshot;
mod table;

pub use snapshot::EntitlementSnapshot;
pub use table::EntitlementTable;
