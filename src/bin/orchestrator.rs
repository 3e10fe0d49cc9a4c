use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arith_cluster::api::router::build_router;
use arith_cluster::config::OrchestratorConfig;
use arith_cluster::planner::Planner;
use arith_cluster::store::memory::TaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OrchestratorConfig::from_env();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let store = Arc::new(TaskStore::new());
    let planner = Arc::new(Planner::new(config.op_times));

    // Requeue tasks lost to vanished agents, but only when the operator
    // opted in with an explicit deadline.
    if let Some(deadline_ms) = config.dispatch_deadline_ms {
        let store = store.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(deadline_ms.max(100)));
            loop {
                interval.tick().await;
                let reclaimed = store.reclaim_expired(deadline_ms);
                if reclaimed > 0 {
                    tracing::warn!("Requeued {} task(s) past the dispatch deadline", reclaimed);
                }
            }
        });
    }

    let app = build_router(store, planner);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Orchestrator listening on {}", addr);
    tracing::info!(
        "Operation latencies: add={}ms sub={}ms mul={}ms div={}ms",
        config.op_times.addition_ms,
        config.op_times.subtraction_ms,
        config.op_times.multiplication_ms,
        config.op_times.division_ms
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
