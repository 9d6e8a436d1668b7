//! HTTP adapter end to end over the in-memory fakes.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{harness, harness_with, Harness, UploadFailure};
use docledger::ledger::PollPolicy;
use std::time::Duration;
use docledger::config::ServerConfig;
use docledger::http::{build_router, AppState, X_REQUEST_ID};
use docledger::orchestrator::SessionRegistry;

fn router(h: &Harness) -> Router {
    router_with(h, &ServerConfig::default())
}

fn router_with(h: &Harness, config: &ServerConfig) -> Router {
    let state = AppState {
        orchestrator: h.orchestrator.clone(),
        sessions: SessionRegistry::new(),
        wallet: Arc::new(h.wallet.clone()),
    };
    build_router(config, state)
}

fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(body).unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_upload_lookup_download_delete() {
    let h = harness();
    h.blobs.script_address("Qm123");
    h.ledger.set_next_id(42);
    let app = router(&h);

    let res = app
        .clone()
        .oneshot(request("POST", "/sessions/chat-1/upload", Body::empty()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let res = app
        .clone()
        .oneshot(request("PUT", "/sessions/chat-1/files/report.pdf", Body::from("%PDF-1.7")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = json(res).await;
    assert_eq!(body["document_id"], 42);
    assert_eq!(body["blob_address"], "Qm123");
    assert!(body["tx_ref"].as_str().unwrap().starts_with("0x"));

    let res = app.clone().oneshot(request("GET", "/sessions/chat-1", Body::empty())).await.unwrap();
    assert_eq!(json(res).await["status"], "idle");

    let res = app.clone().oneshot(request("GET", "/documents/42", Body::empty())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["display_name"], "report.pdf");
    assert_eq!(body["blob_address"], "Qm123");

    let res = app
        .clone()
        .oneshot(request("GET", "/documents/42/content", Body::empty()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report.pdf\""
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.7");

    let res = app.clone().oneshot(request("DELETE", "/documents/42", Body::empty())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["revoked"], true);

    let res = app.oneshot(request("GET", "/documents/42", Body::empty())).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(res).await["error"], "NotFound");
}

#[tokio::test]
async fn test_file_without_arming_is_refused() {
    let h = harness();
    let app = router(&h);

    let res = app
        .oneshot(request("PUT", "/sessions/chat-9/files/a.txt", Body::from("a")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(json(res).await["error"], "SessionNotArmed");
    assert_eq!(h.blobs.upload_count(), 0);
    assert_eq!(h.ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_upload_failure_reports_stage_and_clears_session() {
    let h = harness();
    h.blobs.fail_uploads(Some(UploadFailure::Quota));
    let app = router(&h);

    app.clone()
        .oneshot(request("POST", "/sessions/chat-1/upload", Body::empty()))
        .await
        .unwrap();
    let res = app
        .clone()
        .oneshot(request("PUT", "/sessions/chat-1/files/a.txt", Body::from("a")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INSUFFICIENT_STORAGE);
    let body = json(res).await;
    assert_eq!(body["error"], "QuotaExceeded");
    assert_eq!(body["stage"], "uploading");
    assert!(body["blob_address"].is_null());

    let res = app.oneshot(request("GET", "/sessions/chat-1", Body::empty())).await.unwrap();
    assert_eq!(json(res).await["status"], "idle");
}

#[tokio::test]
async fn test_empty_body_rejected() {
    let h = harness();
    let app = router(&h);

    app.clone()
        .oneshot(request("POST", "/sessions/chat-1/upload", Body::empty()))
        .await
        .unwrap();
    let res = app
        .oneshot(request("PUT", "/sessions/chat-1/files/a.txt", Body::empty()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.blobs.upload_count(), 0);
}

#[tokio::test]
async fn test_request_id_generated_and_propagated() {
    let h = harness();
    let app = router(&h);

    let res = app.clone().oneshot(request("GET", "/health", Body::empty())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let generated = res.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
    assert_eq!(generated.len(), 36);
    let body = json(res).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ledger_reachable"], true);

    let req = Request::builder()
        .uri("/health")
        .header(X_REQUEST_ID, "client-chosen-id")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.headers()[X_REQUEST_ID], "client-chosen-id");
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let h = harness();
    let config = ServerConfig {
        max_upload_bytes: 8,
        ..ServerConfig::default()
    };
    let app = router_with(&h, &config);

    app.clone()
        .oneshot(request("POST", "/sessions/chat-1/upload", Body::empty()))
        .await
        .unwrap();
    let req = Request::builder()
        .method("PUT")
        .uri("/sessions/chat-1/files/big.bin")
        .header(header::CONTENT_LENGTH, 32)
        .body(Body::from(vec![0u8; 32]))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(h.blobs.upload_count(), 0);
    assert_eq!(h.ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_session_status_exposes_pending_tx_ref() {
    let h = harness_with(PollPolicy::fixed(Duration::from_millis(5), 1_000));
    h.ledger.set_accept_after(u32::MAX);
    let app = router(&h);

    app.clone()
        .oneshot(request("POST", "/sessions/chat-1/upload", Body::empty()))
        .await
        .unwrap();
    let upload = tokio::spawn(
        app.clone()
            .oneshot(request("PUT", "/sessions/chat-1/files/a.txt", Body::from("a"))),
    );

    let mut pending = None;
    for _ in 0..200 {
        let res = app.clone().oneshot(request("GET", "/sessions/chat-1", Body::empty())).await.unwrap();
        let body = json(res).await;
        if let Some(tx_ref) = body["tx_ref"].as_str() {
            assert_eq!(body["status"], "running");
            assert_eq!(body["progress"]["state"], "running");
            pending = Some(tx_ref.to_string());
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let pending = pending.expect("session never reported its transaction");

    h.ledger.set_accept_after(1);
    let res = upload.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json(res).await["tx_ref"], pending.as_str());
}
