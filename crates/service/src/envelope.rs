//! The `{resp, code, error}` response envelope shared by every route.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Serialize,
};

pub const CODE_SUCCESS: u8 = 0;
pub const CODE_INTERNAL_SERVER_ERROR: u8 = 1;
pub const CODE_INVALID_REQUEST: u8 = 2;
pub const CODE_METHOD_NOT_ALLOWED: u8 = 3;
/// Requests cut off by the timeout layer.
pub const CODE_REQUEST_TIMEOUT: u8 = 4;

/// Every JSON response carries this shape; `resp` is null on failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub resp: Option<T>,
    pub code: u8,
    pub error: Vec<String>,
}

/// Successful payload, serialized as a code-0 envelope with HTTP 200.
pub struct Success<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            resp: Some(self.0),
            code: CODE_SUCCESS,
            error: Vec::new(),
        })
        .into_response()
    }
}

/// Failure with an HTTP status, an envelope code, and one error string per
/// collected failure.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: u8,
    errors: Vec<String>,
}

impl ApiError {
    /// Backend or processing failure.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: CODE_INTERNAL_SERVER_ERROR,
            errors: vec![err.to_string()],
        }
    }

    /// Caller error, one message per validation failure.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: CODE_INVALID_REQUEST,
            errors,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            code: CODE_METHOD_NOT_ALLOWED,
            errors: vec!["method not allowed".into()],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Envelope::<()> {
                resp: None,
                code: self.code,
                error: self.errors,
            }),
        )
            .into_response()
    }
}
