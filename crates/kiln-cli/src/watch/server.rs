//! Live reload server for watch mode.
//!
//! Serves the published site from disk and pushes reload notifications to
//! connected browsers over Server-Sent Events. Served HTML pages get the
//! reload client script injected on the way out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response, Sse},
    routing::get,
    Router,
};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{CliError, Result};
use crate::ui;
use crate::watch::ServerState;

const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");
const RELOAD_SCRIPT_TAG: &str = r#"<script src="/__kiln__/reload.js"></script>"#;

/// Live reload server.
pub struct LiveReloadServer {
    /// Client registry reload events broadcast through
    state: Arc<ServerState>,
    /// Published output directory served from disk
    public_dir: PathBuf,
    host: String,
    port: u16,
}

#[derive(Clone)]
struct AppState {
    clients: Arc<ServerState>,
    public_dir: Arc<PathBuf>,
}

impl LiveReloadServer {
    pub fn new(state: Arc<ServerState>, public_dir: PathBuf, host: String, port: u16) -> Self {
        Self {
            state,
            public_dir,
            host,
            port,
        }
    }

    /// Bind and serve until the task is dropped.
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let app = self.build_router();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {addr}: {e}")))?;

        ui::success(&format!("Live reload server running at http://{addr}"));

        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")))?;

        Ok(())
    }

    fn build_router(self) -> Router {
        let state = AppState {
            clients: self.state,
            public_dir: Arc::new(self.public_dir),
        };

        Router::new()
            // SSE endpoint for reload events
            .route("/__kiln__/events", get(handle_events))
            // Reload client script
            .route("/__kiln__/reload.js", get(handle_reload_script))
            // Everything else serves the published site
            .fallback(handle_request)
            .layer(
                // Allow all origins: the server only ever runs locally.
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }
}

/// Handle SSE connections for reload events.
async fn handle_events(
    State(state): State<AppState>,
) -> Sse<
    impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;

    let (id, rx) = state.clients.register_client();
    tracing::debug!(client = id, "reload client connected");

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

/// Serve the reload client script.
async fn handle_reload_script() -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(RELOAD_SCRIPT))
        .unwrap()
}

/// Serve a file from the published output directory.
async fn handle_request(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(rel) = sanitize_request_path(uri.path()) else {
        return not_found(uri.path());
    };

    let mut file_path = state.public_dir.join(rel);
    if file_path.is_dir() {
        file_path = file_path.join("index.html");
    }

    let content = match tokio::fs::read(&file_path).await {
        Ok(content) => content,
        Err(_) => return not_found(uri.path()),
    };

    let content_type = content_type_for(&file_path);
    let body = if content_type.starts_with("text/html") {
        inject_reload_script(&content)
    } else {
        content
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(body))
        .unwrap()
}

fn not_found(path: &str) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(format!("File not found: {path}")))
        .unwrap()
}

/// Map a request path onto a relative path inside the published tree.
///
/// Rejects parent-directory components so requests cannot climb out of the
/// output directory. An empty path means the site root.
fn sanitize_request_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(PathBuf::from("index.html"));
    }

    let mut rel = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            std::path::Component::Normal(part) => rel.push(part),
            std::path::Component::CurDir => {}
            _ => return None,
        }
    }
    Some(rel)
}

/// Inject the reload client script into an HTML page.
///
/// Adds the script tag before the closing `</body>` tag, appending at the
/// end when the page has none.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + RELOAD_SCRIPT_TAG.len() + 1);
        result.push_str(&html[..pos]);
        result.push_str(RELOAD_SCRIPT_TAG);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(RELOAD_SCRIPT_TAG);
    result.into_bytes()
}

/// Determine content type from file extension.
fn content_type_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
