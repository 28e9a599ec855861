use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::StudentId;
use super::repository::{AllocationRepository, AuditSink, RepositoryError, RunRegistry};
use super::service::{AllocationServiceError, SeatAllocationService};

/// Header naming the operator who triggered a run; recorded in the audit trail.
pub const OPERATOR_HEADER: &str = "x-operator";
const DEFAULT_OPERATOR: &str = "anonymous";

/// Router builder exposing the allocation run, its status, and per-student outcomes.
pub fn allocation_router<R, G, A>(service: Arc<SeatAllocationService<R, G, A>>) -> Router
where
    R: AllocationRepository + 'static,
    G: RunRegistry + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/allocation/run", post(run_handler::<R, G, A>))
        .route("/api/v1/allocation/status", get(status_handler::<R, G, A>))
        .route(
            "/api/v1/allocation/students/:student_id",
            get(student_handler::<R, G, A>),
        )
        .with_state(service)
}

pub(crate) async fn run_handler<R, G, A>(
    State(service): State<Arc<SeatAllocationService<R, G, A>>>,
    headers: HeaderMap,
) -> Response
where
    R: AllocationRepository + 'static,
    G: RunRegistry + 'static,
    A: AuditSink + 'static,
{
    let operator = headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(DEFAULT_OPERATOR);

    match service.run(operator) {
        Ok(run) => (StatusCode::OK, axum::Json(run.view())).into_response(),
        Err(
            error @ (AllocationServiceError::AlreadyCompleted
            | AllocationServiceError::RunInProgress),
        ) => error_response(StatusCode::CONFLICT, &error),
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &other),
    }
}

pub(crate) async fn status_handler<R, G, A>(
    State(service): State<Arc<SeatAllocationService<R, G, A>>>,
) -> Response
where
    R: AllocationRepository + 'static,
    G: RunRegistry + 'static,
    A: AuditSink + 'static,
{
    match service.status() {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &other),
    }
}

pub(crate) async fn student_handler<R, G, A>(
    State(service): State<Arc<SeatAllocationService<R, G, A>>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: AllocationRepository + 'static,
    G: RunRegistry + 'static,
    A: AuditSink + 'static,
{
    let id = StudentId(student_id);
    match service.student(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(AllocationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "student_id": id.0,
                "error": "student not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &other),
    }
}

fn error_response(status: StatusCode, error: &AllocationServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
