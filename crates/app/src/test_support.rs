use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use comissoes_storage::Database;

use crate::router::{app_router, AppState};
use crate::telemetry;

/// Builds application state over a fresh SQLite file; keep the `TempDir` alive.
pub async fn setup_state() -> (AppState, TempDir) {
    let metrics = telemetry::init_metrics().expect("metrics init");

    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("app.db").display());
    let database = Database::connect(&url).await.expect("connect");
    database.run_migrations().await.expect("migrations");

    (AppState::new(metrics, database), dir)
}

/// Sends one request through a fresh router and decodes the JSON body.
pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = app_router(state.clone())
        .oneshot(request)
        .await
        .expect("handler should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should read")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}
