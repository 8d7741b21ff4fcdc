use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, warn};

use crate::fpl::{project, StatKind, StatsError, StatsResolver};
use crate::proxy::{images, ImageRelay, Passthrough};

#[derive(Clone)]
pub struct AppState {
    pub resolver: StatsResolver,
    pub football_data: Passthrough,
    /// Mounted under `/api-rapid` only when configured.
    pub rapid: Option<Passthrough>,
    pub images: ImageRelay,
    pub token_len: usize,
}

/// Build the Axum router: stats, API passthroughs, image relay, then static
/// dashboard files for everything else.
pub fn router(state: AppState, static_dir: &str) -> Router {
    let mut router = Router::new()
        .route("/stats/:kind", get(stats_handler))
        .route("/api/*path", get(api_handler))
        .route("/api-debug", get(api_debug_handler))
        .route("/img/players/:size/:file", get(image_handler));
    if state.rapid.is_some() {
        router = router.route("/api-rapid/*path", get(rapid_handler));
    }
    router
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Presence-only query flags for the stats endpoints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct StatsFlags {
    refresh: bool,
    debug: bool,
}

impl StatsFlags {
    fn from_query(query: Option<&str>) -> Self {
        let mut flags = StatsFlags::default();
        for (key, _) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "refresh" => flags.refresh = true,
                "debug" => flags.debug = true,
                _ => {}
            }
        }
        flags
    }
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        match self {
            StatsError::InvalidResourceKind(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid kind" }))).into_response()
            }
            StatsError::AllCandidatesExhausted { last_status, sample } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Upstream error",
                    "status": "all_failed",
                    "lastStatus": last_status,
                    "sample": sample,
                })),
            )
                .into_response(),
        }
    }
}

/// GET /stats/:kind?refresh&debug
async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, StatsError> {
    serve_stats(&state, &kind, StatsFlags::from_query(query.as_deref())).await
}

async fn serve_stats(state: &AppState, kind: &str, flags: StatsFlags) -> Result<Response, StatsError> {
    let kind: StatKind = kind.parse()?;

    if flags.debug {
        let cache = state.resolver.cache();
        let entry = cache.get().await;
        let fresh = cache.is_fresh().await;
        return Ok(Json(json!({
            "kind": kind,
            "cache": {
                "present": entry.is_some(),
                "fresh": fresh,
                "sourceUrl": entry.as_ref().map(|e| e.source_url.clone()),
                "storedAt": entry.as_ref().map(|e| e.stored_at),
                "expiresAt": entry.as_ref().map(|e| e.expires_at),
            },
            "candidates": state.resolver.candidates(kind),
        }))
        .into_response());
    }

    let resolved = state.resolver.resolve(kind, flags.refresh).await?;
    let items = project(&resolved.payload, kind);
    debug!("Serving {} {} items from {}", items.len(), kind, resolved.source_url);
    Ok(Json(json!({
        "kind": kind,
        "items": items,
        "source": resolved.source_url,
        "cached": resolved.from_cache,
    }))
    .into_response())
}

/// GET /api/*path: `pl-stats/:kind` is served locally, everything else goes
/// to football-data.org.
async fn api_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let path = path.trim_start_matches('/');
    if let Some(kind) = path.strip_prefix("pl-stats/") {
        return serve_stats(&state, kind, StatsFlags::from_query(query.as_deref()))
            .await
            .into_response();
    }
    relay(&state.football_data, path, query.as_deref()).await
}

/// GET /api-rapid/*path
async fn rapid_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match &state.rapid {
        Some(rapid) => relay(rapid, &path, query.as_deref()).await,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn relay(upstream: &Passthrough, path: &str, query: Option<&str>) -> Response {
    match upstream.forward(path, query).await {
        Ok(out) => {
            let status = StatusCode::from_u16(out.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, [(header::CONTENT_TYPE, out.content_type)], out.body).into_response()
        }
        Err(e) => {
            error!("Proxy error: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Proxy error", "detail": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}

/// GET /api-debug
async fn api_debug_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "tokenLength": state.token_len,
        "hasToken": state.token_len > 0,
    }))
}

/// GET /img/players/:size/:file
async fn image_handler(
    State(state): State<Arc<AppState>>,
    Path((size, file)): Path<(String, String)>,
) -> Response {
    if let Err(e) = images::validate(&size, &file) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
    }

    let resp = match state.images.fetch(&size, &file).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Image relay failed for {}/{}: {:#}", size, file, e);
            return (StatusCode::BAD_GATEWAY, Json(json!({ "error": "Image fetch failed" }))).into_response();
        }
    };
    if !resp.status().is_success() {
        debug!("Image host answered {} for {}/{}", resp.status(), size, file);
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "Image fetch failed", "status": resp.status().as_u16() })),
        )
            .into_response();
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_string();
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, images::CACHE_CONTROL.to_string()),
        ],
        Body::from_stream(resp.bytes_stream()),
    )
        .into_response()
}
