use axum::extract::Extension;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use super::handlers::{
    handle_calculate, handle_get_expression, handle_list_expressions, handle_pull_task,
    handle_push_result,
};
use super::protocol::{ENDPOINT_CALCULATE, ENDPOINT_EXPRESSIONS, ENDPOINT_INTERNAL_TASK};
use crate::planner::Planner;
use crate::store::memory::TaskStore;

/// Assembles the orchestrator's route table. Method mismatches fall out
/// as axum's built-in 405.
pub fn build_router(store: Arc<TaskStore>, planner: Arc<Planner>) -> Router {
    Router::new()
        .route(ENDPOINT_CALCULATE, post(handle_calculate))
        .route(ENDPOINT_EXPRESSIONS, get(handle_list_expressions))
        .route(
            &format!("{}/:id", ENDPOINT_EXPRESSIONS),
            get(handle_get_expression),
        )
        .route(
            ENDPOINT_INTERNAL_TASK,
            get(handle_pull_task).post(handle_push_result),
        )
        .layer(Extension(store))
        .layer(Extension(planner))
}
