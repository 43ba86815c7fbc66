//! Router assembly and server startup.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    axum::{
        Json, Router,
        error_handling::HandleErrorLayer,
        http::StatusCode,
        routing::{delete, get, patch, post},
    },
    tower::{BoxError, ServiceBuilder, timeout::TimeoutLayer},
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {tokenvault_core::Manager, tokenvault_store::StoreConfig};

use crate::{
    envelope::{CODE_REQUEST_TIMEOUT, Envelope},
    handlers,
};

pub const DEFAULT_PORT: u16 = 8080;

/// Bound on request handling; requests cut off here surface as HTTP 408.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Shared app state ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
}

/// Everything needed to start the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub cipher_path: PathBuf,
}

// ── Router and startup ───────────────────────────────────────────────────

/// Build the service router (shared between production startup and tests).
pub fn build_app(manager: Arc<Manager>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The timeout layer errors with `BoxError`, so it must sit behind an
    // error handler that turns the elapse into an envelope response.
    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: BoxError| async {
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(Envelope::<()> {
                    resp: None,
                    code: CODE_REQUEST_TIMEOUT,
                    error: vec!["request timed out".into()],
                }),
            )
        }))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    Router::new()
        .route("/new", get(handlers::greet))
        .route("/tokenize", post(handlers::tokenize))
        .route("/detokenize", post(handlers::detokenize))
        .route("/all", get(handlers::all_tokens))
        .route("/id", get(handlers::token_by_id))
        .route("/delete", delete(handlers::delete_token))
        .route("/patch", patch(handlers::patch_tokens))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .layer(timeout)
        .layer(cors)
        .with_state(AppState { manager })
}

/// Build the configured store and manager, then serve until shutdown.
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let store = config.store.build()?;
    let manager = Manager::new(store, &config.cipher_path).await?;
    let app = build_app(Arc::new(manager));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr,
        store = config.store.kind(),
        "token vault service listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
