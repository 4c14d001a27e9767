use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use comissoes_storage::Database;

use crate::service::CommissionService;
use crate::{apidocs, comissao, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    service: CommissionService,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self {
            metrics,
            service: CommissionService::new(storage),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    #[cfg(test)]
    pub fn database(&self) -> &Database {
        self.service.database()
    }

    pub fn service(&self) -> &CommissionService {
        &self.service
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/apidocs", get(apidocs::openapi))
        .route("/apidocs/", get(apidocs::openapi))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/comissao", post(comissao::create).delete(comissao::remove))
        .route("/comissoes", get(comissao::list))
        .route("/dashboard", get(comissao::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/apidocs/")
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
