use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::protocol::{
    ENDPOINT_INTERNAL_TASK, TaskPayload, TaskResponse, TaskResultRequest,
};
use crate::config::AgentConfig;
use crate::store::types::Operation;

const IDLE_BACKOFF_MS: u64 = 1_000;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The pulling worker process.
///
/// Runs N independent puller loops (the agent's "computing power") against
/// one shared HTTP client. The agent holds no state between tasks; every
/// loop iteration is pull → execute → push.
pub struct Agent {
    orchestrator_url: String,
    computing_power: usize,
    client: reqwest::Client,
}

impl Agent {
    pub fn new(config: &AgentConfig) -> Arc<Self> {
        Arc::new(Self {
            orchestrator_url: config.orchestrator_url.trim_end_matches('/').to_string(),
            computing_power: config.computing_power,
            client: reqwest::Client::new(),
        })
    }

    /// Spawns the puller loops and waits on them.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("Starting {} puller loops", self.computing_power);

        let mut handles = Vec::with_capacity(self.computing_power);
        for worker_id in 0..self.computing_power {
            let agent = self.clone();
            handles.push(tokio::spawn(async move {
                agent.worker_loop(worker_id).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn worker_loop(&self, worker_id: usize) {
        tracing::info!("Worker {} started", worker_id);

        loop {
            let task = match self.pull_task().await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    self.idle_backoff().await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Worker {}: failed to pull a task: {}", worker_id, e);
                    self.idle_backoff().await;
                    continue;
                }
            };

            tracing::info!(
                "Worker {}: task {} ({} {:?} {})",
                worker_id,
                task.id,
                task.arg1,
                task.operation,
                task.arg2
            );

            let (result, error) = match execute(&task).await {
                Ok(value) => {
                    tracing::info!("Worker {}: task {} -> {}", worker_id, task.id, value);
                    (value, None)
                }
                Err(message) => {
                    tracing::warn!("Worker {}: task {} failed: {}", worker_id, task.id, message);
                    (0.0, Some(message))
                }
            };

            if let Err(e) = self.push_result(task.id, result, error).await {
                tracing::warn!(
                    "Worker {}: failed to post result for task {}: {}",
                    worker_id,
                    task.id,
                    e
                );
            }
        }
    }

    async fn pull_task(&self) -> Result<Option<TaskPayload>> {
        let response = self
            .client
            .get(format!("{}{}", self.orchestrator_url, ENDPOINT_INTERNAL_TASK))
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("unexpected status {}", response.status());
        }

        let task_response: TaskResponse = response.json().await?;
        Ok(Some(task_response.task))
    }

    async fn push_result(&self, task_id: u64, result: f64, error: Option<String>) -> Result<()> {
        let payload = TaskResultRequest {
            id: task_id,
            result,
            error,
        };

        let response = self
            .client
            .post(format!("{}{}", self.orchestrator_url, ENDPOINT_INTERNAL_TASK))
            .json(&payload)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("unexpected status {}", response.status());
        }

        Ok(())
    }

    async fn idle_backoff(&self) {
        let jitter = rand::random::<u64>() % 200;
        tokio::time::sleep(Duration::from_millis(IDLE_BACKOFF_MS + jitter)).await;
    }
}

/// Runs one task. The advisory latency always elapses in full before the
/// result (or error) is reported, measured from task receipt.
pub async fn execute(task: &TaskPayload) -> Result<f64, String> {
    let started = Instant::now();
    let outcome = compute(task);

    let latency = Duration::from_millis(task.operation_time);
    let remaining = latency.saturating_sub(started.elapsed());
    if !remaining.is_zero() {
        tokio::time::sleep(remaining).await;
    }

    outcome
}

/// The four arithmetic primitives over decimal string arguments. The
/// error string travels back to the orchestrator verbatim.
pub fn compute(task: &TaskPayload) -> Result<f64, String> {
    let arg1: f64 = task
        .arg1
        .parse()
        .map_err(|_| format!("invalid argument 1: {}", task.arg1))?;
    let arg2: f64 = task
        .arg2
        .parse()
        .map_err(|_| format!("invalid argument 2: {}", task.arg2))?;

    match task.operation {
        Operation::Add => Ok(arg1 + arg2),
        Operation::Subtract => Ok(arg1 - arg2),
        Operation::Multiply => Ok(arg1 * arg2),
        Operation::Divide => {
            if arg2 == 0.0 {
                Err("division by zero".to_string())
            } else {
                Ok(arg1 / arg2)
            }
        }
    }
}
