//! The live entitlement table

use crate::entitlements::EntitlementSnapshot;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the current snapshot behind a reader/writer lock
///
/// The lock only ever guards an `Arc` clone or an `Arc` swap. Lookups on a
/// snapshot handle run without holding it.
pub struct EntitlementTable {
    current: RwLock<Arc<EntitlementSnapshot>>,
    /// Number of snapshots installed since startup
    version: AtomicU64,
}

impl EntitlementTable {
    /// Create an empty table (version 0)
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(EntitlementSnapshot::new())),
            version: AtomicU64::new(0),
        }
    }

    /// Handle to the snapshot installed right now
    pub fn snapshot(&self) -> Arc<EntitlementSnapshot> {
        self.current.read().clone()
    }

    /// Install a new snapshot, replacing the old one wholesale
    ///
    /// Returns the version of the installed snapshot.
    pub fn replace(&self, snapshot: EntitlementSnapshot) -> u64 {
        let next = Arc::new(snapshot);

        let (previous, version) = {
            let mut current = self.current.write();
            let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
            (std::mem::replace(&mut *current, next), version)
        };

        // Last handle to the old snapshot may be ours; free it outside the lock
        drop(previous);

        version
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Client address the token is bound to
    pub fn lookup(&self, token: &str) -> Option<String> {
        self.snapshot().lookup(token).map(str::to_string)
    }

    pub fn channel_of(&self, token: &str) -> Option<String> {
        self.snapshot().channel_of(token).map(str::to_string)
    }

    pub fn is_allowed_relay_address(&self, addr: &str) -> bool {
        self.snapshot().is_allowed_relay_address(addr)
    }
}

impl Default for EntitlementTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_starts_empty() {
        let table = EntitlementTable::new();

        assert_eq!(table.version(), 0);
        assert!(table.snapshot().is_empty());
        assert_eq!(table.lookup("tokA"), None);
        assert_eq!(table.channel_of("tokA"), None);
        assert!(!table.is_allowed_relay_address("10.0.0.5"));
    }

    #[test]
    fn test_replace_installs_new_snapshot() {
        let table = EntitlementTable::new();

        let version = table.replace(
            EntitlementSnapshot::new()
                .with_relay_address("10.0.0.5")
                .with_client_address("tokA", "203.0.113.9")
                .with_channel("tokA", "live"),
        );

        assert_eq!(version, 1);
        assert_eq!(table.version(), 1);
        assert_eq!(table.lookup("tokA").as_deref(), Some("203.0.113.9"));
        assert_eq!(table.channel_of("tokA").as_deref(), Some("live"));
        assert!(table.is_allowed_relay_address("10.0.0.5"));
    }

    #[test]
    fn test_replace_drops_revoked_tokens_from_every_map() {
        let table = EntitlementTable::new();
        table.replace(
            EntitlementSnapshot::new()
                .with_relay_address("10.0.0.5")
                .with_client_address("tokA", "203.0.113.9")
                .with_channel("tokA", "live")
                .with_client_address("tokB", "203.0.113.10")
                .with_channel("tokB", "live"),
        );

        // tokA and the relay address are revoked upstream
        table.replace(
            EntitlementSnapshot::new()
                .with_client_address("tokB", "203.0.113.10")
                .with_channel("tokB", "live"),
        );

        assert_eq!(table.lookup("tokA"), None);
        assert_eq!(table.channel_of("tokA"), None);
        assert!(!table.is_allowed_relay_address("10.0.0.5"));
        assert_eq!(table.lookup("tokB").as_deref(), Some("203.0.113.10"));
        assert_eq!(table.version(), 2);
    }

    #[test]
    fn test_held_snapshot_is_unaffected_by_replace() {
        let table = EntitlementTable::new();
        table.replace(EntitlementSnapshot::new().with_channel("tokA", "live"));

        let held = table.snapshot();
        table.replace(EntitlementSnapshot::new().with_channel("tokB", "news"));

        assert_eq!(held.channel_of("tokA"), Some("live"));
        assert_eq!(held.channel_of("tokB"), None);
        assert_eq!(table.channel_of("tokA"), None);
        assert_eq!(table.channel_of("tokB").as_deref(), Some("news"));
    }
}
