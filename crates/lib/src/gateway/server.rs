//! Gateway HTTP server (single port): webhooks in, responder list and dashboard out.

use crate::channels::TelegramUpdate;
use crate::config::{self, Config};
use crate::dashboard::render_dashboard;
use crate::extract::Extractor;
use crate::gateway::protocol::{ErrorBody, Health, WebhookAck};
use crate::ingest::{Ingestor, RawMessage};
use crate::store::{EnrichedMessage, MessageStore};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub store: Arc<MessageStore>,
    pub ingestor: Ingestor,
    /// When Some, Telegram webhook POSTs must carry this secret header.
    pub telegram_secret: Option<String>,
}

impl GatewayState {
    /// Fresh (empty) store, ingesting through the given extractor.
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> Self {
        let store = Arc::new(MessageStore::new());
        let telegram_secret = config::resolve_telegram_webhook_secret(&config);
        Self {
            config: Arc::new(config),
            ingestor: Ingestor::new(extractor, store.clone()),
            store,
            telegram_secret,
        }
    }
}

/// All gateway routes. `/static` is mounted only when `gateway.staticDir` is an existing directory.
pub fn router(state: GatewayState) -> Router {
    let mut app = Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(webhook))
        .route("/telegram/webhook", post(telegram_webhook))
        .route("/api/responders", get(list_responders))
        .route("/dashboard", get(dashboard));
    match state.config.gateway.static_dir.as_ref() {
        Some(dir) if dir.is_dir() => {
            log::info!("serving static files from {} at /static", dir.display());
            app = app.nest_service("/static", ServeDir::new(dir));
        }
        Some(dir) => log::warn!("static directory {} not found, /static not mounted", dir.display()),
        None => {}
    }
    app.with_state(state)
}

/// Build the extractor from config, bind, and serve until SIGINT/SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    let extractor = config::build_extractor(&config);
    log::info!(
        "extraction backend: {:?}, model {}",
        config.extraction.backend,
        extractor.model()
    );
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    serve(GatewayState::new(config, Arc::new(extractor)), listener).await
}

/// Serve `state` on an already-bound listener until SIGINT/SIGTERM.
pub async fn serve(state: GatewayState, listener: TcpListener) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg)))
}

/// GET / returns a simple health JSON (for liveness checks).
async fn health_http(State(state): State<GatewayState>) -> Json<Health> {
    Json(Health {
        runtime: "running".to_string(),
        port: state.config.gateway.port,
        messages: state.store.len().await,
    })
}

/// POST /webhook — `{name, text, created_at}`; ingests inline and acks once stored.
async fn webhook(
    State(state): State<GatewayState>,
    Json(raw): Json<RawMessage>,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorBody>)> {
    if raw.text.trim().is_empty() {
        log::warn!("webhook: rejected message from {:?} with empty text", raw.name);
        return Err(bad_request("text must not be empty"));
    }
    state.ingestor.ingest(raw).await;
    Ok(Json(WebhookAck::ok()))
}

/// POST /telegram/webhook — Telegram update JSON; verifies optional secret, ingests text messages.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.telegram_secret {
        let provided = headers
            .get(TELEGRAM_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            log::warn!("telegram webhook: secret token mismatch");
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("telegram webhook: invalid update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let update_id = update.update_id;
    match update.into_raw_message() {
        Some(raw) => {
            state.ingestor.ingest(raw).await;
        }
        None => log::debug!("telegram webhook: update {} has no text, ignored", update_id),
    }
    StatusCode::OK
}

/// GET /api/responders — every stored message, oldest first.
async fn list_responders(State(state): State<GatewayState>) -> Json<Vec<EnrichedMessage>> {
    Json(state.store.all().await)
}

/// GET /dashboard — HTML view of the store.
async fn dashboard(State(state): State<GatewayState>) -> Result<Html<String>, StatusCode> {
    match render_dashboard(state.store.all().await) {
        Ok(body) => Ok(Html(body)),
        Err(e) => {
            log::error!("dashboard: render failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
