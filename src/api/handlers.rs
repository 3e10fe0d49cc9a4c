//! HTTP Request Handlers
//!
//! Axum route handlers for the five orchestrator endpoints: expression
//! submission and inspection for clients, task pull/push for agents.
//!
//! Client-input failures never mutate the store: an expression is parsed
//! and planned before any record is created, so a 422 leaves no trace.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use super::protocol::{
    CalculateRequest, CalculateResponse, ErrorResponse, ExpressionDetailResponse,
    ExpressionsResponse, TaskResponse, TaskResultRequest,
};
use crate::planner::{Plan, Planner};
use crate::store::memory::{StoreError, TaskStore};

/// `POST /api/v1/calculate`: lower the expression into tasks and register
/// them. `201` with the new expression id on success, `422` for any
/// client-input problem, `500` if the store rejects the batch.
pub async fn handle_calculate(
    Extension(store): Extension<Arc<TaskStore>>,
    Extension(planner): Extension<Arc<Planner>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "malformed JSON body");
    };

    if req.expression.trim().is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "expression must not be empty",
        );
    }

    let plan = match planner.plan(&req.expression) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::debug!("Rejected expression {:?}: {}", req.expression, e);
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
        }
    };

    let expr_id = store.add_expression(&req.expression);

    let outcome = match plan {
        Plan::Literal(value) => store.complete_literal(expr_id, value),
        Plan::Tasks(tasks) => store.add_tasks(expr_id, tasks),
    };

    match outcome {
        Ok(()) => {
            tracing::info!("Expression {} accepted: {:?}", expr_id, req.expression);
            (StatusCode::CREATED, Json(CalculateResponse { id: expr_id })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to register tasks for expression {}: {}", expr_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `GET /api/v1/expressions`: every known expression, order unspecified.
pub async fn handle_list_expressions(
    Extension(store): Extension<Arc<TaskStore>>,
) -> Json<ExpressionsResponse> {
    Json(ExpressionsResponse {
        expressions: store.all_expressions(),
    })
}

/// `GET /api/v1/expressions/{id}`: one expression. `400` for a
/// non-integer id, `404` when unknown.
pub async fn handle_get_expression(
    Extension(store): Extension<Arc<TaskStore>>,
    Path(raw_id): Path<String>,
) -> Response {
    let Ok(id) = raw_id.parse::<u64>() else {
        return error_response(StatusCode::BAD_REQUEST, "expression id must be an integer");
    };

    match store.get_expression(id) {
        Some(expression) => {
            (StatusCode::OK, Json(ExpressionDetailResponse { expression })).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("expression {} not found", id),
        ),
    }
}

/// `GET /internal/task`: hand out a ready task with its `res:` references
/// substituted. `404` when nothing is dispatchable.
pub async fn handle_pull_task(Extension(store): Extension<Arc<TaskStore>>) -> Response {
    match store.next_task() {
        Ok(Some(task)) => {
            tracing::debug!(
                "Dispatching task {} ({} {:?} {})",
                task.id,
                task.arg1,
                task.operation,
                task.arg2
            );
            (StatusCode::OK, Json(TaskResponse { task })).into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no tasks available"),
        Err(e) => {
            tracing::error!("Task dispatch failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `POST /internal/task`: absorb an agent's result. `404` for an unknown
/// task id, `422` for malformed JSON, `200` otherwise — including posts
/// the store chose to ignore, so agents can retry blindly.
pub async fn handle_push_result(
    Extension(store): Extension<Arc<TaskStore>>,
    payload: Result<Json<TaskResultRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "malformed JSON body");
    };

    match store.complete_task(req.id, req.result, req.error.as_deref()) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e @ StoreError::TaskNotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            tracing::error!("Failed to absorb result for task {}: {}", req.id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}
