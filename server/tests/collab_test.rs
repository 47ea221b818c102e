//! Router-level tests for the collab endpoint.
//!
//! Requests are driven straight through the axum router, no socket needed.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use docsync_engine::{update_path, CollabContext, CollabType, UpdateCollabBody};
use docsync_server::config::Config;
use docsync_server::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn test_app(auth_secret: Option<&str>) -> (Router, AppState) {
    let state = AppState::new(Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        auth_secret: auth_secret.map(str::to_string),
    });
    (app(state.clone()), state)
}

fn update_request(object_id: &str, version_vector: u64, token: Option<&str>) -> Request<Body> {
    let body = UpdateCollabBody {
        collab_type: CollabType::Document,
        doc_state: vec![1, 2, 3],
        context: CollabContext { version_vector },
    };

    let mut builder = Request::builder()
        .method("POST")
        .uri(update_path("ws-1", object_id))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_update_returns_version_vector() {
    let (app, state) = test_app(None);

    let response = app.oneshot(update_request("doc-1", 1, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let context: CollabContext = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(context, CollabContext { version_vector: 1 });

    let stored = state.collabs.get("ws-1", "doc-1").unwrap();
    assert_eq!(stored.doc_state, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_update_behind_server_gets_server_version() {
    let (app, _) = test_app(None);

    app.clone()
        .oneshot(update_request("doc-1", 5, None))
        .await
        .unwrap();
    let response = app.oneshot(update_request("doc-1", 2, None)).await.unwrap();

    let body = json_body(response).await;
    assert_eq!(body["version_vector"], 5);
}

#[tokio::test]
async fn test_fetch_stored_collab() {
    let (app, _) = test_app(None);

    app.clone()
        .oneshot(update_request("doc-1", 1, None))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/workspace/ws-1/collab/doc-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["collab_type"], "document");
    assert_eq!(body["version_vector"], 1);
    assert_eq!(body["update_count"], 1);
    assert_eq!(body["doc_state"], serde_json::json!([1, 2, 3]));
}

#[tokio::test]
async fn test_fetch_missing_collab() {
    let (app, _) = test_app(None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/workspace/ws-1/collab/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_type_conflict() {
    let (app, _) = test_app(None);

    app.clone()
        .oneshot(update_request("doc-1", 1, None))
        .await
        .unwrap();

    let folder = UpdateCollabBody {
        collab_type: CollabType::Folder,
        doc_state: vec![9],
        context: CollabContext { version_vector: 2 },
    };
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(update_path("ws-1", "doc-1"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&folder).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (app, state) = test_app(None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(update_path("ws-1", "doc-1"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"collab_type":"document"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert!(state.collabs.is_empty());
}

#[tokio::test]
async fn test_auth_secret_enforced() {
    let (app, state) = test_app(Some("s3cret"));

    let response = app
        .clone()
        .oneshot(update_request("doc-1", 1, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(update_request("doc-1", 1, Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.collabs.is_empty());

    let response = app
        .oneshot(update_request("doc-1", 1, Some("s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_counts_collabs() {
    let (app, _) = test_app(None);

    app.clone()
        .oneshot(update_request("doc-1", 1, None))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["collabs"], 1);
}
