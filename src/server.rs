//! HTTP surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Resolve a chat message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/` | The configured index document from the frontend dir |
//! | `GET`  | `/{*path}` | A static file from the frontend dir, then the backend dir |
//!
//! # Chat Contract
//!
//! ```json
//! // request
//! { "message": "jam buka?", "session": "optional-id" }
//! // response
//! { "reply": "Setiap hari 08:00-17:00" }
//! // response when answered from the corpus
//! { "reply": "Rp 18.000", "index": 3 }
//! ```
//!
//! `/chat` always answers `200`. A missing, blank, or unparseable message
//! gets the "empty message" reply. Static lookups that miss answer `404`
//! with `{ "error": "File tidak ditemukan" }`.
//!
//! Every response carries long-lived cache headers and
//! `X-Content-Type-Options: nosniff`. CORS permits all origins, methods,
//! and headers.

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::pipeline::Resolver;
use crate::session::{SessionStore, DEFAULT_SESSION};

const NOT_FOUND_MESSAGE: &str = "File tidak ditemukan";
const CACHE_CONTROL_VALUE: &str = "public, max-age=31536000, immutable";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    resolver: Arc<Resolver>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, resolver: Resolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            sessions: SessionStore::with_capacity(config.server.max_sessions),
            config: Arc::new(config),
        }
    }
}

/// Starts the HTTP server on `[server].bind`:`[server].port`.
///
/// Loads the data files and encodes the corpus before binding. Runs until
/// the process receives Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let resolver = Resolver::from_config(config).await?;
    let addr = config.server.addr();
    let app = router(AppState::new(config.clone(), resolver));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "chat server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

/// Builds the router with CORS and the fixed response headers applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .route("/", get(handle_index))
        .route("/{*path}", get(handle_static))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_VALUE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn not_found() -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: NOT_FOUND_MESSAGE.to_string(),
    }
}

// ============ POST /chat ============

#[derive(Deserialize, Default)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

/// Handler for `POST /chat`.
///
/// The body is parsed leniently: anything that is not a JSON object with a
/// string `message` counts as an empty message.
///
/// The session lock is held only to copy the transcript and to merge the
/// new turns back, never across a provider call.
async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Json<ChatResponse> {
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = request.message.unwrap_or_default();
    let session_id = request
        .session
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION);

    let session = state.sessions.get(session_id).await;
    let mut conversation = session.lock().await.clone();
    let start = conversation.len();
    let resolution = state.resolver.resolve(&mut conversation, &message).await;
    session.lock().await.extend_from(&conversation, start);

    Json(ChatResponse {
        reply: resolution.reply,
        index: resolution.index,
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Static files ============

async fn handle_index(State(state): State<AppState>, request: Request) -> Response {
    let server = &state.config.server;
    serve_first(
        &[server.frontend_dir.clone()],
        &server.index_file,
        request,
    )
    .await
}

async fn handle_static(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    let server = &state.config.server;
    serve_first(
        &[server.frontend_dir.clone(), server.backend_dir.clone()],
        &path,
        request,
    )
    .await
}

/// Serves `relative` from the first root that contains it.
async fn serve_first(roots: &[PathBuf], relative: &str, request: Request) -> Response {
    let Some(relative) = safe_relative_path(relative) else {
        return not_found().into_response();
    };

    for root in roots {
        let candidate = root.join(&relative);
        if candidate.is_file() {
            return match ServeFile::new(candidate).oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            };
        }
    }

    not_found().into_response()
}

/// Accepts only plain relative paths; anything with `..`, a root, or a
/// drive prefix is rejected.
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in std::path::Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
