use crate::config::AppConfig;
use crate::generator::ScriptTagGenerator;
use crate::inject::inject_tags;
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-sightline-request-id");

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub generator: Arc<ScriptTagGenerator>,
}

impl AppState {
    pub fn new(config: AppConfig, generator: Arc<ScriptTagGenerator>) -> Self {
        Self { config, generator }
    }
}

pub fn router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let router = Router::new()
        .route("/healthz", get(health))
        .route("/_sightline/tags", get(fresh_tags))
        .route("/_sightline/tags/{request_id}", get(tags_for_request))
        .route("/_sightline/inject", post(inject))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.generator.configuration();
    Json(json!({
        "status": "ok",
        "version": config.version(),
        "hash": config.hash(),
    }))
}

async fn fresh_tags(State(state): State<AppState>) -> Response {
    fragment_response(&state, Uuid::new_v4())
}

async fn tags_for_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Response {
    fragment_response(&state, request_id)
}

async fn inject(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let request_id = match request_id_from_headers(&headers) {
        Ok(id) => id.unwrap_or_else(Uuid::new_v4),
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };
    let fragment = state.generator.generate(request_id);
    match inject_tags(body, &fragment) {
        Ok(html) => html_response(html, request_id),
        Err(err) => {
            tracing::error!(%request_id, ?err, "failed to inject diagnostic tags");
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
        }
    }
}

fn fragment_response(state: &AppState, request_id: Uuid) -> Response {
    let fragment = state.generator.generate(request_id);
    tracing::debug!(%request_id, bytes = fragment.len(), "generated diagnostic tags");
    html_response(fragment, request_id)
}

fn html_response(body: String, request_id: Uuid) -> Response {
    let mut resp = Response::new(body.into());
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&request_id.hyphenated().to_string()) {
        headers.insert(REQUEST_ID_HEADER.clone(), value);
    }
    resp
}

fn request_id_from_headers(headers: &HeaderMap) -> Result<Option<Uuid>, String> {
    let Some(value) = headers.get(&REQUEST_ID_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| format!("{REQUEST_ID_HEADER} is not valid ascii"))?;
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|err| format!("{REQUEST_ID_HEADER} is not a uuid: {err}"))
}
