//! Wire Protocol
//!
//! Endpoint paths and the JSON bodies exchanged between clients, the
//! orchestrator, and agents. Every request and reply on the HTTP surface
//! is one of these shapes.

use serde::{Deserialize, Serialize};

use crate::store::types::{Expression, Operation};

// --- API Endpoints ---

/// Public endpoint for submitting an expression.
pub const ENDPOINT_CALCULATE: &str = "/api/v1/calculate";
/// Public endpoint for listing and inspecting expressions.
pub const ENDPOINT_EXPRESSIONS: &str = "/api/v1/expressions";
/// Agent-facing endpoint: GET pulls a ready task, POST pushes a result.
pub const ENDPOINT_INTERNAL_TASK: &str = "/internal/task";

// --- Data Transfer Objects ---

/// Body of `POST /api/v1/calculate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

/// Successful submission reply: the id to poll for the outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub id: u64,
}

/// Reply to `GET /api/v1/expressions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionsResponse {
    pub expressions: Vec<Expression>,
}

/// Reply to `GET /api/v1/expressions/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionDetailResponse {
    pub expression: Expression,
}

/// A dispatched task as the agent sees it.
///
/// Result references have already been substituted: both arguments are
/// plain decimal literals by the time a task leaves the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: u64,
    pub expression_id: u64,
    pub arg1: String,
    pub arg2: String,
    pub operation: Operation,
    /// Advisory compute latency the agent must sleep, in milliseconds.
    pub operation_time: u64,
}

/// Reply to `GET /internal/task` when a ready task exists.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task: TaskPayload,
}

/// Body of `POST /internal/task`.
///
/// `error` carries a worker-side failure (bad argument, division by
/// zero); when set, `result` is ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResultRequest {
    pub id: u64,
    pub result: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Uniform error body for every non-2xx reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
