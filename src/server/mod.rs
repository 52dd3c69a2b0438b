//! Gate server implementation
//!
//! Wires the entitlement table, the synchronizer and the authorization gate in
//! front of static content delivery.

mod content;
mod router;

pub use content::{content_type_for, not_found, StaticFiles};
pub use router::{create_router, GateState};

use crate::config::GateConfig;
use crate::entitlements::EntitlementTable;
use crate::gate::AuthorizationPolicy;
use crate::sync::{redact_url, EntitlementProvider, EntitlementSynchronizer, HttpProvider};

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The main gate server
pub struct GateServer {
    config: GateConfig,
    table: Arc<EntitlementTable>,
    synchronizer: Arc<EntitlementSynchronizer>,
}

impl GateServer {
    /// Create a server that pulls entitlements from the configured provider URL
    pub fn new(config: GateConfig) -> Result<Self> {
        let provider = Arc::new(HttpProvider::new(config.provider_url.clone()));
        Self::with_provider(config, provider)
    }

    /// Create a server with a custom entitlement source
    pub fn with_provider(config: GateConfig, provider: Arc<dyn EntitlementProvider>) -> Result<Self> {
        config.validate().context("Invalid gate configuration")?;

        let table = Arc::new(EntitlementTable::new());
        let synchronizer = Arc::new(EntitlementSynchronizer::new(
            provider,
            table.clone(),
            config.mode,
            config.refresh_interval,
        ));

        Ok(Self {
            config,
            table,
            synchronizer,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn table(&self) -> Arc<EntitlementTable> {
        self.table.clone()
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        create_router(GateState {
            table: self.table.clone(),
            policy: Arc::new(AuthorizationPolicy::from_config(&self.config)),
            synchronizer: self.synchronizer.clone(),
            content: Arc::new(StaticFiles::new(self.config.content_root.clone())),
            forwarded_header: self.config.forwarded_header.clone(),
        })
    }

    /// Bind the configured address and run until the listener fails
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;

        self.serve(listener).await
    }

    /// Run the synchronizer and serve requests on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Listener has no local address")?;
        let app = self.router();

        let sync_task = self.synchronizer.spawn();

        info!(
            addr = %addr,
            mode = %self.config.mode,
            provider = %redact_url(&self.config.provider_url),
            root = %self.config.content_root.display(),
            "Gate server listening"
        );

        let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .context("Gate server error");

        sync_task.abort();
        result
    }
}
