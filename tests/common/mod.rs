//! Shared fixtures: a fake entitlement provider and a gate on a loopback port

#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use parking_lot::RwLock;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use streamgate::{
    EntitlementProvider, EntitlementTable, GateConfig, GateServer, HttpProvider, Mode,
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SIMPLE_DOC: &str = r#"{"tokA":"chan1"}"#;
pub const FULL_DOC: &str =
    r#"{"addr":{"10.0.0.5":true},"ip":{"tokA":"203.0.113.9"},"ch":{"tokA":"live"}}"#;

/// An address that is never the test peer
pub const REMOTE_RELAY: &str = "192.0.2.1";
/// The test peer itself, for relay scenarios
pub const LOOPBACK_RELAY: &str = "127.0.0.1";

pub const SEGMENT_BYTES: &[u8] = b"\x47\x40\x00\x10segment";
pub const MANIFEST: &str = "#EXTM3U\n#EXT-X-VERSION:3\nseg001.ts\n";

/// HTTP client that never goes through a proxy
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: String,
}

/// Provider whose answer can be changed between requests
pub struct FakeProvider {
    addr: SocketAddr,
    reply: Arc<RwLock<Reply>>,
}

impl FakeProvider {
    pub async fn start(body: &str) -> Self {
        let reply = Arc::new(RwLock::new(Reply {
            status: StatusCode::OK,
            body: body.to_string(),
        }));

        let app = Router::new()
            .route(
                "/tokens/list",
                get(|State(reply): State<Arc<RwLock<Reply>>>| async move {
                    let reply = reply.read().clone();
                    (reply.status, reply.body)
                }),
            )
            .with_state(reply.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, reply }
    }

    pub fn url(&self) -> String {
        format!("http://{}/tokens/list", self.addr)
    }

    pub fn set_body(&self, body: &str) {
        let mut reply = self.reply.write();
        reply.status = StatusCode::OK;
        reply.body = body.to_string();
    }

    pub fn set_status(&self, status: StatusCode) {
        self.reply.write().status = status;
    }
}

/// A running gate with its own content root
pub struct TestGate {
    pub addr: SocketAddr,
    pub table: Arc<EntitlementTable>,
    pub root: TempDir,
    handle: JoinHandle<()>,
}

impl TestGate {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        client().get(self.url(path_and_query)).send().await.unwrap()
    }

    pub async fn get_forwarded(&self, path_and_query: &str, forwarded: &str) -> reqwest::Response {
        client()
            .get(self.url(path_and_query))
            .header("X-Forwarded-For", forwarded)
            .send()
            .await
            .unwrap()
    }

    pub async fn status(&self, path_and_query: &str) -> u16 {
        self.get(path_and_query).await.status().as_u16()
    }

    pub async fn reload(&self) {
        let response = self.get("/reload").await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

impl Drop for TestGate {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Lay out `live/`, `news/` and `chan1/` with a manifest and a segment each
pub fn content_root() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    for channel in ["live", "news", "chan1"] {
        let dir = root.path().join(channel);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("index.m3u8"), MANIFEST).unwrap();
        std::fs::write(dir.join("seg.ts"), SEGMENT_BYTES).unwrap();
        std::fs::write(dir.join("seg001.ts"), SEGMENT_BYTES).unwrap();
    }
    root
}

/// Start a gate against the fake provider and wait for its first snapshot
pub async fn start_gate(provider: &FakeProvider, mode: Mode, relay: &str) -> TestGate {
    let http = HttpProvider::with_client(
        provider.url(),
        reqwest::Client::builder().no_proxy().build().unwrap(),
    );
    start_gate_with(Arc::new(http), mode, relay).await
}

/// Start a gate with any provider and wait for its first snapshot
pub async fn start_gate_with(
    provider: Arc<dyn EntitlementProvider>,
    mode: Mode,
    relay: &str,
) -> TestGate {
    let root = content_root();

    // Long interval: after the first tick only /reload refreshes
    let config = GateConfig::new("unused", root.path())
        .mode(mode)
        .relay_addr(relay.parse::<IpAddr>().unwrap())
        .refresh_interval(Duration::from_secs(3600));

    let server = GateServer::with_provider(config, provider).unwrap();
    let table = server.table();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    wait_for_version(&table, 1).await;

    TestGate {
        addr,
        table,
        root,
        handle,
    }
}

pub async fn wait_for_version(table: &EntitlementTable, version: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while table.version() < version {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("entitlements were not installed in time");
}
