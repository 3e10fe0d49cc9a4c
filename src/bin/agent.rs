use arith_cluster::agent::worker::Agent;
use arith_cluster::config::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::from_env();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    tracing::info!(
        "Agent starting: orchestrator={} computing_power={}",
        config.orchestrator_url,
        config.computing_power
    );

    Agent::new(&config).run().await;

    Ok(())
}
