//! In-process HTTP regression tests: build the router via `create_app()`
//! and drive it with `tower::ServiceExt::oneshot`, matching the teacher's
//! `api_regression.rs` style. No bound port, runs in-process.

use std::sync::Arc;

use alibi::api::create_app;
use alibi::context::AppContext;
use alibi::types::Role;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

async fn test_context() -> (Arc<AppContext>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::open(dir.path()).unwrap();
    ctx.identity
        .users
        .add("op1", "operator-password-1", Role::Operator)
        .unwrap();
    (Arc::new(ctx), dir)
}

async fn login(ctx: &Arc<AppContext>, username: &str, password: &str) -> String {
    let app = create_app(ctx.clone());
    let body = json!({ "username": username, "password": password }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    parsed["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn webhook_without_token_is_unauthorized() {
    let (ctx, _dir) = test_context().await;
    let app = create_app(ctx);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/camera-event")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_then_list_and_get_incident_round_trips() {
    let (ctx, _dir) = test_context().await;
    let token = login(&ctx, "op1", "operator-password-1").await;

    let event = json!({
        "event_id": "e1",
        "camera_id": "cam_A",
        "zone_id": "z1",
        "ts": "2026-01-18T10:00:00Z",
        "event_type": "person_detected",
        "confidence": 0.6,
        "severity": 3,
    });
    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/camera-event")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let incident_id = parsed["incident_id"].as_str().unwrap().to_string();

    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/incidents/{incident_id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["_metadata"]["plan"]["recommended_next_step"], "monitor");
}

/// S7: a dismiss decision with no `dismiss_reason` must be rejected with
/// 422 and must never reach `decisions.jsonl`.
#[tokio::test]
async fn dismiss_without_reason_is_rejected_and_not_persisted() {
    let (ctx, _dir) = test_context().await;
    let token = login(&ctx, "op1", "operator-password-1").await;

    let event = json!({
        "event_id": "e1",
        "camera_id": "cam_A",
        "zone_id": "z1",
        "ts": "2026-01-18T10:00:00Z",
        "event_type": "person_detected",
        "confidence": 0.6,
        "severity": 3,
    });
    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/camera-event")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let incident_id = parsed["incident_id"].as_str().unwrap().to_string();

    let decision = json!({ "action_taken": "dismissed" });
    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/incidents/{incident_id}/decision"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(decision.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.store.decisions.all().unwrap().len(), 0);
}

#[tokio::test]
async fn approve_on_non_pending_incident_returns_conflict() {
    let (ctx, _dir) = test_context().await;
    ctx.identity
        .users
        .add("sup1", "supervisor-password-1", Role::Supervisor)
        .unwrap();
    let operator_token = login(&ctx, "op1", "operator-password-1").await;
    let supervisor_token = login(&ctx, "sup1", "supervisor-password-1").await;

    let event = json!({
        "event_id": "e1",
        "camera_id": "cam_A",
        "zone_id": "z1",
        "ts": "2026-01-18T10:00:00Z",
        "event_type": "person_detected",
        "confidence": 0.6,
        "severity": 3,
    });
    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/camera-event")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {operator_token}"))
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let incident_id = parsed["incident_id"].as_str().unwrap().to_string();

    // Plan is "monitor", not "dispatch_pending_review" — approval must conflict.
    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/incidents/{incident_id}/approve"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {supervisor_token}"))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn operator_cannot_manage_users() {
    let (ctx, _dir) = test_context().await;
    let token = login(&ctx, "op1", "operator-password-1").await;

    let app = create_app(ctx.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/users")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
