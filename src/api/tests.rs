//! HTTP Dispatch Tests
//!
//! Handler-level checks for every status code in the endpoint table, a
//! wire-shape check for the expression object, and a full in-process
//! orchestrator + agent pipeline over real HTTP.

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::extract::{Extension, Path};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::agent::worker::Agent;
    use crate::api::handlers::{
        handle_calculate, handle_get_expression, handle_list_expressions, handle_pull_task,
        handle_push_result,
    };
    use crate::api::protocol::{
        CalculateRequest, CalculateResponse, ExpressionDetailResponse, TaskResultRequest,
    };
    use crate::api::router::build_router;
    use crate::config::{AgentConfig, OperationTimes};
    use crate::planner::Planner;
    use crate::store::memory::TaskStore;
    use crate::store::types::{Expression, ExpressionStatus, format_scalar};

    fn fixtures() -> (Arc<TaskStore>, Arc<Planner>) {
        (
            Arc::new(TaskStore::new()),
            Arc::new(Planner::new(OperationTimes::default())),
        )
    }

    async fn calculate(
        store: &Arc<TaskStore>,
        planner: &Arc<Planner>,
        expression: &str,
    ) -> StatusCode {
        let response = handle_calculate(
            Extension(store.clone()),
            Extension(planner.clone()),
            Ok(Json(CalculateRequest {
                expression: expression.to_string(),
            })),
        )
        .await;
        response.status()
    }

    // ============================================================
    // SUBMISSION
    // ============================================================

    #[tokio::test]
    async fn test_calculate_accepts_valid_expression() {
        let (store, planner) = fixtures();

        assert_eq!(calculate(&store, &planner, "2+2").await, StatusCode::CREATED);

        let expr = store.get_expression(1).unwrap();
        assert_eq!(expr.status, ExpressionStatus::Processing);
    }

    #[tokio::test]
    async fn test_calculate_rejects_empty_expression() {
        let (store, planner) = fixtures();

        assert_eq!(
            calculate(&store, &planner, "").await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_calculate_rejects_unparseable_expressions_without_side_effects() {
        let (store, planner) = fixtures();

        for input in ["2++2", "(1+2", "2+a", "1.2.3", "-2+3"] {
            assert_eq!(
                calculate(&store, &planner, input).await,
                StatusCode::UNPROCESSABLE_ENTITY,
                "input {:?} should be rejected",
                input
            );
        }

        // Rejected input must leave no expression record behind.
        assert!(store.all_expressions().is_empty());
    }

    // ============================================================
    // INSPECTION
    // ============================================================

    #[tokio::test]
    async fn test_get_expression_rejects_non_integer_id() {
        let (store, _) = fixtures();

        let response =
            handle_get_expression(Extension(store), Path("abc".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_expression_unknown_id_is_not_found() {
        let (store, _) = fixtures();

        let response = handle_get_expression(Extension(store), Path("7".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_expression_returns_known_record() {
        let (store, planner) = fixtures();
        calculate(&store, &planner, "2+2").await;

        let response = handle_get_expression(Extension(store), Path("1".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_expressions_returns_every_record() {
        let (store, planner) = fixtures();
        calculate(&store, &planner, "1+1").await;
        calculate(&store, &planner, "2+2").await;

        let Json(body) = handle_list_expressions(Extension(store)).await;
        assert_eq!(body.expressions.len(), 2);
    }

    // ============================================================
    // TASK PULL / PUSH
    // ============================================================

    #[tokio::test]
    async fn test_pull_task_with_empty_store_is_not_found() {
        let (store, _) = fixtures();

        let response = handle_pull_task(Extension(store)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pull_task_hands_out_a_ready_task_once() {
        let (store, planner) = fixtures();
        calculate(&store, &planner, "2+2").await;

        let first = handle_pull_task(Extension(store.clone())).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = handle_pull_task(Extension(store)).await;
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_push_result_for_unknown_task_is_not_found() {
        let (store, _) = fixtures();

        let response = handle_push_result(
            Extension(store),
            Ok(Json(TaskResultRequest {
                id: 42,
                result: 1.0,
                error: None,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_push_result_completes_the_expression() {
        let (store, planner) = fixtures();
        calculate(&store, &planner, "2+2").await;

        let task = store.next_task().unwrap().unwrap();
        let response = handle_push_result(
            Extension(store.clone()),
            Ok(Json(TaskResultRequest {
                id: task.id,
                result: 4.0,
                error: None,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let expr = store.get_expression(1).unwrap();
        assert_eq!(expr.status, ExpressionStatus::Completed);
        assert_eq!(expr.result.as_deref(), Some("4"));
    }

    // ============================================================
    // WIRE SHAPE
    // ============================================================

    #[test]
    fn test_expression_wire_shape_omits_absent_fields() {
        let pending = Expression {
            id: 1,
            raw: "2+2".to_string(),
            status: ExpressionStatus::Processing,
            result: None,
            error: None,
        };
        let json = serde_json::to_value(&pending).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["expression"], "2+2");
        assert_eq!(json["status"], "PROCESSING");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());

        let completed = Expression {
            result: Some("4".to_string()),
            status: ExpressionStatus::Completed,
            ..pending
        };
        let json = serde_json::to_value(&completed).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["result"], "4");
    }

    // ============================================================
    // END TO END: ORCHESTRATOR + AGENT OVER REAL HTTP
    // ============================================================

    async fn spawn_orchestrator(op_times: OperationTimes) -> String {
        let store = Arc::new(TaskStore::new());
        let planner = Arc::new(Planner::new(op_times));
        let app = build_router(store, planner);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    async fn wait_terminal(client: &reqwest::Client, base: &str, id: u64) -> Expression {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);

        loop {
            let response = client
                .get(format!("{}/api/v1/expressions/{}", base, id))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);

            let body: ExpressionDetailResponse = response.json().await.unwrap();
            if body.expression.status.is_terminal() {
                return body.expression;
            }

            assert!(
                tokio::time::Instant::now() < deadline,
                "expression {} never reached a terminal state",
                id
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_full_pipeline_with_live_agent() {
        let base = spawn_orchestrator(OperationTimes {
            addition_ms: 10,
            subtraction_ms: 10,
            multiplication_ms: 20,
            division_ms: 20,
        })
        .await;

        let agent = Agent::new(&AgentConfig {
            orchestrator_url: base.clone(),
            computing_power: 2,
            log_level: tracing::Level::INFO,
        });
        tokio::spawn(agent.run());

        let client = reqwest::Client::new();

        // Three identical concurrent submissions must get distinct ids and
        // all complete against a computing-power-2 agent.
        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = client
                .post(format!("{}/api/v1/calculate", base))
                .json(&serde_json::json!({ "expression": "2+2" }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::CREATED);

            let body: CalculateResponse = response.json().await.unwrap();
            assert!(!ids.contains(&body.id));
            ids.push(body.id);
        }

        for id in ids {
            let expr = wait_terminal(&client, &base, id).await;
            assert_eq!(expr.status, ExpressionStatus::Completed);
            assert_eq!(expr.result.as_deref(), Some("4"));
        }

        // A compound expression reduces to the minimal round-trip form.
        let response = client
            .post(format!("{}/api/v1/calculate", base))
            .json(&serde_json::json!({ "expression": "2*(3+4)/(5-2)" }))
            .send()
            .await
            .unwrap();
        let body: CalculateResponse = response.json().await.unwrap();
        let expr = wait_terminal(&client, &base, body.id).await;
        assert_eq!(expr.status, ExpressionStatus::Completed);
        assert_eq!(expr.result, Some(format_scalar(14.0 / 3.0)));

        // Division by zero in a nested position ends in ERROR, not COMPLETED.
        let response = client
            .post(format!("{}/api/v1/calculate", base))
            .json(&serde_json::json!({ "expression": "10/(5-5)" }))
            .send()
            .await
            .unwrap();
        let body: CalculateResponse = response.json().await.unwrap();
        let expr = wait_terminal(&client, &base, body.id).await;
        assert_eq!(expr.status, ExpressionStatus::Error);
        assert_eq!(expr.error.as_deref(), Some("division by zero"));
        assert!(expr.result.is_none());
    }

    #[tokio::test]
    async fn test_http_surface_error_codes() {
        let base = spawn_orchestrator(OperationTimes::default()).await;
        let client = reqwest::Client::new();

        // Malformed JSON body → 422.
        let response = client
            .post(format!("{}/api/v1/calculate", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        // Method mismatch → 405.
        let response = client
            .get(format!("{}/api/v1/calculate", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

        // No ready task → 404 with a JSON error body.
        let response = client
            .get(format!("{}/internal/task", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}
