//! Route table and the authorization middleware

use crate::entitlements::EntitlementTable;
use crate::gate::{AuthorizationPolicy, Decision, GateRequest};
use crate::server::content::{not_found, StaticFiles};
use crate::sync::EntitlementSynchronizer;

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderName, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Shared state for gate handlers
#[derive(Clone)]
pub struct GateState {
    pub table: Arc<EntitlementTable>,
    pub policy: Arc<AuthorizationPolicy>,
    pub synchronizer: Arc<EntitlementSynchronizer>,
    pub content: Arc<StaticFiles>,
    pub forwarded_header: HeaderName,
}

/// Create the gate router
///
/// `/reload` is registered after the layer and so bypasses authorization.
/// Everything else falls through to content delivery behind the gate.
pub fn create_router(state: GateState) -> Router {
    Router::new()
        .fallback(content_handler)
        .layer(middleware::from_fn_with_state(state.clone(), authorize))
        .route("/reload", any(reload_handler))
        .with_state(state)
}

async fn authorize(
    State(state): State<GateState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let token = token_param(request.uri());

    let decision = {
        let forwarded_address = request
            .headers()
            .get(&state.forwarded_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        let gate_request = GateRequest {
            path: request.uri().path(),
            token: token.as_deref(),
            peer: peer.ip(),
            forwarded_address,
        };

        let snapshot = state.table.snapshot();
        state.policy.evaluate(&snapshot, &gate_request)
    };

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny(reason) => {
            debug!(
                peer = %peer,
                path = request.uri().path(),
                reason = %reason,
                "Request denied"
            );
            not_found()
        }
    }
}

/// First `token` value in the query string; later duplicates are ignored
fn token_param(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .find_map(|(key, value)| (key == "token").then_some(value))
}

async fn content_handler(State(state): State<GateState>, request: Request) -> Response {
    state.content.serve(request.uri().path()).await
}

/// Force a resync, on any method. Always answers 200; the outcome is only logged.
async fn reload_handler(State(state): State<GateState>) -> impl IntoResponse {
    debug!("Reload requested");
    let _ = state.synchronizer.refresh().await;
    StatusCode::OK
}
