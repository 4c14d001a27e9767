use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};

use comissoes_core::{Commission, DashboardSummary, SaleRequest, ValidationError};
use comissoes_storage::CommissionRepoError;

use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::service::ServiceError;

const MSG_CREATED: &str = "Venda registrada com sucesso!";
const MSG_REMOVED: &str = "Comissão removida com sucesso!";
const MSG_INVALID_SALE: &str =
    "Dados inválidos. Certifique-se de enviar vendedor, produto e valor_venda.";
const MSG_MISSING_ID: &str = "ID é obrigatório";
const MSG_INVALID_ID: &str = "ID inválido";
const MSG_NOT_FOUND: &str = "Comissão não encontrada";
const MSG_STORAGE: &str = "Erro ao acessar o armazenamento de comissões";

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    message: &'static str,
    comissao: Commission,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    comissoes: Vec<Commission>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    id: Option<String>,
}

/// `POST /comissao`
pub async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ProblemResponse> {
    let result = match serde_json::from_slice::<SaleRequest>(&body) {
        Ok(request) => state.service().add(request).await,
        Err(err) => Err(ValidationError::MalformedBody(err.to_string()).into()),
    };

    let outcome = result
        .map(|record| {
            (
                StatusCode::CREATED,
                Json(CreatedResponse {
                    message: MSG_CREATED,
                    comissao: record,
                }),
            )
        })
        .map_err(ProblemResponse::from);
    observe("add", outcome.as_ref().map(|(status, _)| *status));
    outcome
}

/// `GET /comissoes`
pub async fn list(State(state): State<AppState>) -> Result<Json<ListResponse>, ProblemResponse> {
    let outcome = state
        .service()
        .list()
        .await
        .map(|comissoes| Json(ListResponse { comissoes }))
        .map_err(ProblemResponse::from);
    observe("list", outcome.as_ref().map(|_| StatusCode::OK));
    outcome
}

/// `DELETE /comissao?id=<int>`
pub async fn remove(
    State(state): State<AppState>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ProblemResponse> {
    let result = match query {
        Ok(Query(query)) => state.service().remove(query.id.as_deref()).await,
        Err(rejection) => Err(ValidationError::InvalidId(rejection.body_text()).into()),
    };
    let outcome = result
        .map(|_| {
            Json(MessageResponse {
                message: MSG_REMOVED,
            })
        })
        .map_err(ProblemResponse::from);
    observe("remove", outcome.as_ref().map(|_| StatusCode::OK));
    outcome
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ProblemResponse> {
    let outcome = state
        .service()
        .dashboard()
        .await
        .map(Json)
        .map_err(ProblemResponse::from);
    observe("dashboard", outcome.as_ref().map(|_| StatusCode::OK));
    outcome
}

fn observe(operation: &'static str, outcome: Result<StatusCode, &ProblemResponse>) {
    let status = match outcome {
        Ok(status) => status,
        Err(problem) => problem.status(),
    };
    counter!(
        "comissao_requests_total",
        "operation" => operation,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

impl From<ServiceError> for ProblemResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(err) => {
                let (problem_type, message) = match err {
                    ValidationError::MissingId => ("missing_id", MSG_MISSING_ID),
                    ValidationError::InvalidId(_) => ("invalid_id", MSG_INVALID_ID),
                    _ => ("invalid_sale", MSG_INVALID_SALE),
                };
                ProblemResponse::new(StatusCode::BAD_REQUEST, problem_type, message, err.to_string())
            }
            ServiceError::NotFound(id) => ProblemResponse::new(
                StatusCode::NOT_FOUND,
                "not_found",
                MSG_NOT_FOUND,
                format!("no commission with id {id}"),
            ),
            ServiceError::Persistence(err) => {
                let detail = match err {
                    CommissionRepoError::Constraint(_) => "constraint violation",
                    CommissionRepoError::Database(_) => "database unavailable",
                };
                ProblemResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    MSG_STORAGE,
                    detail,
                )
            }
        }
    }
}
