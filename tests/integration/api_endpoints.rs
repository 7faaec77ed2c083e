//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Monitor create/list/delete round trip over HTTP
//! - Validation, conflict and lookup errors map to the right status codes
//! - Metric history and dashboard aggregates are served
//! - Authentication guards the REST routes only

use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

use crate::helpers::{api::spawn_test_app, eventually};

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_test_app(None).await;

    let response = app.client.get(app.url("/api/v1/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"]["healthy"], true);
}

#[tokio::test]
async fn test_create_list_delete_monitor() {
    let app = spawn_test_app(None).await;

    let response = app
        .client
        .post(app.url("/api/v1/monitors"))
        .json(&json!({
            "url": "https://example.com/health",
            "interval": 45,
            "is_active": false
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: Value = response.json().await.unwrap();
    assert_eq!(created["url"], "https://example.com/health");
    assert_eq!(created["name"], "https://example.com/health");
    assert_eq!(created["method"], "GET");
    assert_eq!(created["interval"], 45);
    assert_eq!(created["timeout"], 10);
    assert_eq!(created["current_status"], "unknown");
    assert_eq!(created["uptime_percentage"], 100.0);
    let id = created["id"].as_str().unwrap().to_string();

    let list: Value = app
        .client
        .get(app.url("/api/v1/monitors"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 1);
    assert_eq!(list["monitors"][0]["id"], id.as_str());

    let response = app
        .client
        .delete(app.url(&format!("/api/v1/monitors/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list: Value = app
        .client
        .get(app.url("/api/v1/monitors"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_create_monitor_errors() {
    let app = spawn_test_app(None).await;
    let create = |body: Value| {
        app.client
            .post(app.url("/api/v1/monitors"))
            .json(&body)
            .send()
    };

    let response = create(json!({ "url": "ftp://example.com" })).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("scheme"));

    let response = create(json!({ "url": "https://example.com", "interval": 0 }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = create(json!({ "name": "no url" })).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url("/api/v1/monitors"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let first = create(json!({ "url": "https://example.com/dup", "is_active": false }))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = create(json!({ "url": "https://example.com/dup", "is_active": false }))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_and_invalid_ids() {
    let app = spawn_test_app(None).await;
    let missing = uuid::Uuid::new_v4();

    let response = app
        .client
        .delete(app.url(&format!("/api/v1/monitors/{missing}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .get(app.url(&format!("/api/v1/monitors/{missing}/metrics")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .delete(app.url("/api/v1/monitors/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_and_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = spawn_test_app(None).await;

    let created: Value = app
        .client
        .post(app.url("/api/v1/monitors"))
        .json(&json!({ "name": "mock", "url": server.uri(), "interval": 60, "timeout": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let list_url = app.url("/api/v1/monitors");
    let client = app.client.clone();
    let probed = eventually(Duration::from_secs(5), || {
        let client = client.clone();
        let list_url = list_url.clone();
        async move {
            let body: Value = client.get(&list_url).send().await.unwrap().json().await.unwrap();
            body["monitors"][0]["current_status"] == "up"
        }
    })
    .await;
    assert!(probed, "monitor never reported up");

    let metrics_url = app.url(&format!("/api/v1/monitors/{id}/metrics?hours=abc"));

    let body: Value = app
        .client
        .get(&metrics_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // malformed hours fall back to the default window
    assert_eq!(body["hours"], 24);
    assert_eq!(body["count"], 1);
    assert_eq!(body["monitor_id"], id.as_str());
    assert_eq!(body["summary"]["total_checks"], 1);
    assert_eq!(body["summary"]["successful_checks"], 1);
    assert_eq!(body["summary"]["uptime_percentage"], 100.0);
    assert_eq!(body["metrics"][0]["status"], "up");
    assert_eq!(body["metrics"][0]["status_code"], 200);

    let body: Value = app
        .client
        .get(app.url(&format!("/api/v1/monitors/{id}/metrics?hours=6")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["hours"], 6);

    let dashboard: Value = app
        .client
        .get(app.url("/api/v1/dashboard/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["total_monitors"], 1);
    assert_eq!(dashboard["active_monitors"], 1);
    assert_eq!(dashboard["up_monitors"], 1);
    assert_eq!(dashboard["down_monitors"], 0);
    assert_eq!(dashboard["overall_uptime"], 100.0);

    let stats: Value = app
        .client
        .get(app.url("/api/v1/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["running_jobs"], 1);
    assert_eq!(stats["probe_slots"]["capacity"], 10);
    assert!(stats["storage"].as_str().unwrap().starts_with("In-Memory"));

    app.pipeline.registry.shutdown().await;
}

#[tokio::test]
async fn test_auth_guards_rest_routes() {
    let app = spawn_test_app(Some("secret-token")).await;

    let response = app.client.get(app.url("/api/v1/monitors")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/api/v1/monitors"))
        .header("Authorization", "Token secret-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/api/v1/monitors"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .get(app.url("/api/v1/monitors"))
        .bearer_auth("secret-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // the observer stream is not guarded
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", app.addr))
        .await
        .unwrap();
    socket.close(None).await.unwrap();
}
