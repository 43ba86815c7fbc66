//! HTTP surface for the token vault.
//!
//! A thin axum layer over [`tokenvault_core::Manager`]: JSON in, a
//! `{resp, code, error}` envelope out. Route handlers live in
//! [`handlers`]; router assembly and startup in [`server`].

pub mod envelope;
pub mod handlers;
pub mod server;

pub use {
    envelope::{
        CODE_INTERNAL_SERVER_ERROR, CODE_INVALID_REQUEST, CODE_METHOD_NOT_ALLOWED,
        CODE_REQUEST_TIMEOUT, CODE_SUCCESS, Envelope,
    },
    server::{AppState, DEFAULT_PORT, ServiceConfig, build_app, serve},
};
