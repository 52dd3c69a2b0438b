//! Entitlement synchronization
//!
//! The synchronizer pulls the provider document, builds a snapshot from it and
//! installs it in the table. Failures are soft: they are logged and the table
//! keeps serving the last good snapshot until the next tick.

mod provider;

pub use provider::{redact_url, HttpProvider};

use crate::config::Mode;
use crate::entitlements::{EntitlementSnapshot, EntitlementTable};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("provider request failed: {0}")]
    Fetch(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("invalid provider document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of entitlement documents
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    /// Fetch the raw provider document
    async fn fetch(&self) -> Result<Vec<u8>, SyncError>;

    /// Where documents come from (for logs)
    fn source(&self) -> &str;
}

/// Keeps an [`EntitlementTable`] in step with a provider
pub struct EntitlementSynchronizer {
    provider: Arc<dyn EntitlementProvider>,
    table: Arc<EntitlementTable>,
    mode: Mode,
    interval: Duration,
}

impl EntitlementSynchronizer {
    pub fn new(
        provider: Arc<dyn EntitlementProvider>,
        table: Arc<EntitlementTable>,
        mode: Mode,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            table,
            mode,
            interval,
        }
    }

    /// Fetch, parse and install one snapshot
    ///
    /// On failure the current table is left as it is. The error is logged here
    /// and also returned for callers that care.
    pub async fn refresh(&self) -> Result<u64, SyncError> {
        let result = self.try_refresh().await;

        if let Err(e) = &result {
            warn!(source = self.provider.source(), error = %e, "Entitlement refresh failed");
        }

        result
    }

    async fn try_refresh(&self) -> Result<u64, SyncError> {
        let body = self.provider.fetch().await?;
        let snapshot = EntitlementSnapshot::parse(self.mode, &body)?;

        let tokens = snapshot.token_count();
        let relays = snapshot.relay_address_count();
        let previous_tokens = self.table.snapshot().token_count();

        let version = self.table.replace(snapshot);

        if tokens != previous_tokens {
            info!(version, tokens, relays, "Entitlements updated");
        } else {
            debug!(version, tokens, relays, "Entitlements refreshed");
        }

        Ok(version)
    }

    /// Refresh now, then once per interval, forever
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = self.provider.source(),
            interval_ms = self.interval.as_millis() as u64,
            mode = %self.mode,
            "Entitlement synchronizer started"
        );

        loop {
            // First tick completes immediately
            ticker.tick().await;
            let _ = self.refresh().await;
        }
    }

    /// Run the refresh loop on its own task
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move { sync.run().await })
    }
}
