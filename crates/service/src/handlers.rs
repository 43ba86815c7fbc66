//! Route handlers.
//!
//! Validation failures for one request are batched into `error[]` with a
//! 400; processing failures abort at the first child with a 500.

use {
    axum::{
        Json,
        extract::{Query, State, rejection::JsonRejection},
    },
    serde::Deserialize,
    tracing::{error, info},
};

use tokenvault_core::{
    AllTokens, DetokenizeReceipt, TokenizeRequest, TokenizeResponse, ValidationFailure,
};

use crate::{
    envelope::{ApiError, Success},
    server::AppState,
};

/// `GET /new`
pub async fn greet() -> &'static str {
    "Welcome to the token vault"
}

#[derive(Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    id: String,
}

/// `POST /tokenize`
pub async fn tokenize(
    State(state): State<AppState>,
    payload: Result<Json<TokenizeRequest>, JsonRejection>,
) -> Result<Success<TokenizeResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    info!(id = %request.id, children = request.data.len(), "tokenize request");

    let (failures, ok) = state.manager.validate(&request, false).await;
    if !ok {
        return Err(validation_failed(failures));
    }

    state
        .manager
        .process_tokenize(&request)
        .await
        .map(Success)
        .map_err(internal)
}

/// `POST /detokenize`
pub async fn detokenize(
    State(state): State<AppState>,
    payload: Result<Json<TokenizeRequest>, JsonRejection>,
) -> Result<Success<DetokenizeReceipt>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    info!(id = %request.id, children = request.data.len(), "detokenize request");

    state
        .manager
        .process_detokenize(&request)
        .await
        .map(Success)
        .map_err(internal)
}

/// `PATCH /patch`
pub async fn patch_tokens(
    State(state): State<AppState>,
    payload: Result<Json<TokenizeRequest>, JsonRejection>,
) -> Result<Success<TokenizeResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    info!(id = %request.id, children = request.data.len(), "patch request");

    let (failures, ok) = state.manager.validate(&request, true).await;
    if !ok {
        return Err(validation_failed(failures));
    }

    state
        .manager
        .process_patch(&request)
        .await
        .map(Success)
        .map_err(internal)
}

/// `GET /all`
pub async fn all_tokens(
    State(state): State<AppState>,
) -> Result<Success<AllTokens>, ApiError> {
    state.manager.all_tokens().await.map(Success).map_err(internal)
}

/// `GET /id?id=<composite>`
pub async fn token_by_id(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Success<TokenizeResponse>, ApiError> {
    state
        .manager
        .token_by_id(&query.id)
        .await
        .map(Success)
        .map_err(internal)
}

/// `DELETE /delete?id=<composite>`
pub async fn delete_token(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Success<TokenizeResponse>, ApiError> {
    state
        .manager
        .delete_by_id(&query.id)
        .await
        .map(|_| Success(TokenizeResponse::default()))
        .map_err(internal)
}

/// Fallback for a known path hit with the wrong method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub async fn not_found() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "404 not found")
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::invalid(vec![rejection.to_string()])
}

fn internal(err: tokenvault_core::VaultError) -> ApiError {
    error!(error = %err, "request processing failed");
    ApiError::internal(err)
}

fn validation_failed(failures: Vec<ValidationFailure>) -> ApiError {
    let errors = failures
        .iter()
        .map(|f| format!("error with key {}: {}", f.key, f.error))
        .collect();
    ApiError::invalid(errors)
}
