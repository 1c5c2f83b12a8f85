//! End-to-end checks of the HTTP API against an in-memory task store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use u_taskorder::ordering::Task;
use u_taskorder::run::{RunController, RunSettings};
use u_taskorder::sa::{CoolingSchedule, SaConfig};
use u_taskorder::server::{router, AppState};
use u_taskorder::store::{JsonFileStore, MemoryStore, TaskStore};

fn app_with(settings: RunSettings, tasks: Vec<Task>) -> (Router, RunController, Arc<MemoryStore>) {
    let controller = RunController::new(settings);
    let store = Arc::new(MemoryStore::new(tasks));
    let app = router(AppState::new(controller.clone(), store.clone()));
    (app, controller, store)
}

fn quick() -> RunSettings {
    RunSettings {
        annealing: SaConfig::default().with_seed(21).with_progress_interval(20),
        ..RunSettings::default()
    }
}

fn scenario_tasks() -> Vec<Task> {
    vec![Task::new("A", 2.0, 1.0, 5), Task::new("B", 1.0, 5.0, 1)]
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `(event name, data)` pairs of an SSE body.
fn sse_records(text: &str) -> Vec<(String, String)> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    name = Some(v.trim().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data = Some(v.trim().to_string());
                }
            }
            Some((name?, data?))
        })
        .collect()
}

#[tokio::test]
async fn save_then_list_tasks() {
    let (app, _, store) = app_with(quick(), vec![]);
    let body = json!([{"name": "Essay", "deadline": 5, "duration": 2, "difficulty": 3}]);

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/save-tasks")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(ack["success"], true);
    assert_eq!(store.load().await.unwrap(), vec![Task::new("Essay", 2.0, 5.0, 3)]);

    let response = app
        .oneshot(Request::get("/api/tasks").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let listed: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(listed[0]["name"], "Essay");
}

#[tokio::test]
async fn stored_run_streams_until_done_marker() {
    let (app, controller, _) = app_with(quick(), scenario_tasks());

    let response = app
        .oneshot(Request::get("/api/run-sa").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let records = sse_records(&body_text(response).await);
    let names: Vec<&str> = records.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names.first(), Some(&"start"));
    assert_eq!(&names[names.len() - 2..], &["finish", "done"]);
    assert_eq!(records.last().unwrap().1, "[DONE]");

    let start: Value = serde_json::from_str(&records[0].1).unwrap();
    let finish: Value = serde_json::from_str(&records[records.len() - 2].1).unwrap();
    let initial = start["data"]["initial_cost"].as_f64().unwrap();
    let best = finish["data"]["best_cost"].as_f64().unwrap();
    assert!((initial - 17.5).abs() < 1e-9);
    assert!(best <= initial);
    assert_eq!(finish["data"]["detailed_schedule"][0]["name"], "A");
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn posted_empty_list_finishes_with_zero_cost() {
    let (app, _, _) = app_with(quick(), vec![]);

    let response = app
        .oneshot(
            Request::post("/api/run-sa")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("[]"))
                .unwrap(),
        )
        .await
        .unwrap();

    let records = sse_records(&body_text(response).await);
    let names: Vec<&str> = records.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["start", "finish", "done"]);
    let finish: Value = serde_json::from_str(&records[1].1).unwrap();
    assert_eq!(finish["data"]["best_cost"], 0.0);
    assert_eq!(finish["data"]["detailed_schedule"], json!([]));
}

#[tokio::test]
async fn second_run_is_rejected_while_busy() {
    let endless = RunSettings {
        annealing: SaConfig::default()
            .with_initial_temperature(1e9)
            .with_min_temperature(1e-9)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.999_999 })
            .with_iterations_per_temperature(1_000)
            .with_progress_interval(1_000)
            .with_seed(2),
        ..RunSettings::default()
    };
    let (app, controller, _) = app_with(endless, scenario_tasks());

    let first = app
        .clone()
        .oneshot(Request::get("/api/run-sa").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(Request::get("/api/run-sa").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = serde_json::from_str(&body_text(second).await).unwrap();
    assert_eq!(body["error"], "busy");
    assert_eq!(body["active_run"], 1);

    let cancel = app
        .oneshot(Request::post("/api/run-sa/cancel").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&body_text(cancel).await).unwrap();
    assert_eq!(body["cancelled"], true);

    // A cancelled stream ends without finish or done.
    let records = sse_records(&body_text(first).await);
    assert!(records.iter().all(|(name, _)| name != "finish" && name != "done"));
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn corrupt_store_streams_error_then_done() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks_history.json");
    std::fs::write(&path, "[{\"name\": \"Essay\", \"deadline\": 5").unwrap();
    let controller = RunController::new(quick());
    let app = router(AppState::new(controller.clone(), Arc::new(JsonFileStore::new(&path))));

    let response = app
        .oneshot(Request::get("/api/run-sa").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = sse_records(&body_text(response).await);
    let names: Vec<&str> = records.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["error", "done"]);
    let error: Value = serde_json::from_str(&records[0].1).unwrap();
    assert_eq!(error["type"], "error");
    assert!(error["data"]["message"]
        .as_str()
        .unwrap()
        .contains("not a valid task list"));
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn malformed_body_is_json_error() {
    let (app, _, store) = app_with(quick(), vec![Task::new("kept", 1.0, 2.0, 1)]);

    for uri in ["/api/save-tasks", "/api/run-sa"] {
        let response = app
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"[{"name": "x", "difficulty": "hard"}]"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error(), "{uri}: {}", response.status());
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
    assert_eq!(store.load().await.unwrap().len(), 1);
}
