#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Router tests over the memory backend.

use std::sync::Arc;

use {
    axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    },
    tower::ServiceExt,
};

use {
    tokenvault_core::Manager,
    tokenvault_crypto::CipherMaterial,
    tokenvault_service::build_app,
    tokenvault_store::MemoryStore,
};

const KEY: &str = "abcdefghijklmnopqrstuvwxyzABCDEF";
const IV: &str = "abcdefghijklmnop";

fn app() -> Router {
    let manager = Manager::with_material(
        Arc::new(MemoryStore::new()),
        CipherMaterial::new(KEY, IV),
    );
    build_app(Arc::new(manager))
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn greeting_route_responds() {
    let response = app()
        .oneshot(Request::get("/new").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tokenize_returns_a_code_zero_envelope() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"u1","data":[{"key":"ssn","value":"123-45-6789"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["resp"]["id"], "u1");
    assert_eq!(body["resp"]["data"][0]["key"], "ssn");
    // The value is the token, not the plaintext.
    assert_ne!(body["resp"]["data"][0]["value"], "123-45-6789");
}

#[tokio::test]
async fn tokenize_then_detokenize_round_trips() {
    let app = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"u1","data":[{"key":"ssn","value":"123-45-6789"}]}"#,
        ))
        .await
        .unwrap();
    let issued = body_json(response).await;
    let token = issued["resp"]["data"][0]["value"].as_str().unwrap();

    let detokenize_body = format!(
        r#"{{"id":"u1","data":[{{"key":"ssn","value":"{token}"}}]}}"#
    );
    let response = app
        .oneshot(json_request("POST", "/detokenize", &detokenize_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["resp"]["data"][0]["value"]["found"], true);
    assert_eq!(body["resp"]["data"][0]["value"]["datum"], "123-45-6789");
}

#[tokio::test]
async fn duplicate_keys_in_one_request_are_rejected() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"a","data":[{"key":"x","value":"1"},{"key":"x","value":"2"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], 2);
    assert_eq!(body["error"].as_array().unwrap().len(), 1);
    assert_eq!(body["resp"], serde_json::Value::Null);
}

#[tokio::test]
async fn storing_the_same_request_twice_is_rejected() {
    let app = app();
    let body = r#"{"id":"u1","data":[{"key":"ssn","value":"123-45-6789"}]}"#;

    let first = app
        .clone()
        .oneshot(json_request("POST", "/tokenize", body))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", "/tokenize", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(second).await;
    assert_eq!(envelope["code"], 2);
}

#[tokio::test]
async fn malformed_json_is_an_invalid_request() {
    let response = app()
        .oneshot(json_request("POST", "/tokenize", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn wrong_method_gets_the_method_not_allowed_code() {
    let response = app()
        .oneshot(json_request("GET", "/tokenize", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body = body_json(response).await;
    assert_eq!(body["code"], 3);
}

#[tokio::test]
async fn lookup_and_delete_by_composite_id() {
    let app = app();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"u1","data":[{"key":"ssn","value":"123-45-6789"}]}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(Request::get("/id?id=u1__ssn").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resp"]["id"], "u1");

    let response = app
        .clone()
        .oneshot(
            Request::delete("/delete?id=u1__ssn")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The entry is gone now.
    let response = app
        .oneshot(Request::get("/id?id=u1__ssn").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], 1);
}

#[tokio::test]
async fn patch_reissues_a_token() {
    let app = app();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"u1","data":[{"key":"ssn","value":"old"}]}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/patch",
            r#"{"id":"u1","data":[{"key":"ssn","value":"new"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let patched = body_json(response).await;
    let token = patched["resp"]["data"][0]["value"].as_str().unwrap();

    let detokenize_body = format!(
        r#"{{"id":"u1","data":[{{"key":"ssn","value":"{token}"}}]}}"#
    );
    let response = app
        .oneshot(json_request("POST", "/detokenize", &detokenize_body))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["resp"]["data"][0]["value"]["datum"], "new");
}

#[tokio::test]
async fn all_tokens_groups_by_parent() {
    let app = app();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/tokenize",
            r#"{"id":"u1","data":[{"key":"a","value":"1"},{"key":"b","value":"2"}]}"#,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/all").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let tokens = body["resp"]["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["id"], "u1");
    assert_eq!(tokens[0]["data"].as_array().unwrap().len(), 2);
}
