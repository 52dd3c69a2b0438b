//! Static delivery of segments and manifests from the content root

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// The one not-found response
///
/// Used both for missing files and for every authorization denial, so the two
/// cannot be told apart from outside.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        NOT_FOUND_BODY,
    )
        .into_response()
}

/// Content type for a served file, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("ts") => "video/mp2t",
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("mp4") | Some("m4s") => "video/mp4",
        Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
}

/// Serves files below a root directory
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto the root, refusing anything that could escape it
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0;

        for segment in request_path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.contains(['\\', '\0']) {
                return None;
            }
            resolved.push(segment);
            depth += 1;
        }

        (depth > 0).then_some(resolved)
    }

    /// Serve the file at `request_path`, or the not-found response
    pub async fn serve(&self, request_path: &str) -> Response {
        let Some(path) = self.resolve(request_path) else {
            debug!(path = request_path, "Rejected content path");
            return not_found();
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return not_found(),
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type_for(&path))],
                bytes,
            )
                .into_response(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read content file");
                not_found()
            }
        }
    }
}
