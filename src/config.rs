//! Environment-driven configuration for the two binaries.
//!
//! Both processes are configured purely through environment variables with
//! sensible defaults; there are no CLI flags. Invalid numeric values fall
//! back to the default rather than aborting startup.

use crate::store::types::Operation;

/// Advisory per-operation compute latencies, in milliseconds.
///
/// The planner stamps these onto every task; agents sleep the stamped
/// duration before reporting a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimes {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl OperationTimes {
    pub fn for_operation(&self, operation: Operation) -> u64 {
        match operation {
            Operation::Add => self.addition_ms,
            Operation::Subtract => self.subtraction_ms,
            Operation::Multiply => self.multiplication_ms,
            Operation::Divide => self.division_ms,
        }
    }
}

impl Default for OperationTimes {
    fn default() -> Self {
        Self {
            addition_ms: 100,
            subtraction_ms: 100,
            multiplication_ms: 200,
            division_ms: 200,
        }
    }
}

/// Orchestrator process configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub port: u16,
    pub op_times: OperationTimes,
    pub log_level: tracing::Level,
    /// Optional deadline after which a dispatched task with no result is
    /// handed out again. Unset means a vanished worker strands its task.
    pub dispatch_deadline_ms: Option<u64>,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parsed("PORT", 8080),
            op_times: OperationTimes {
                addition_ms: env_parsed("TIME_ADDITION_MS", 100),
                subtraction_ms: env_parsed("TIME_SUBTRACTION_MS", 100),
                multiplication_ms: env_parsed("TIME_MULTIPLICATIONS_MS", 200),
                division_ms: env_parsed("TIME_DIVISIONS_MS", 200),
            },
            log_level: env_log_level(),
            dispatch_deadline_ms: std::env::var("TASK_DISPATCH_DEADLINE_MS")
                .ok()
                .and_then(|value| value.parse().ok()),
        }
    }
}

/// Agent process configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub orchestrator_url: String,
    /// Number of parallel puller loops.
    pub computing_power: usize,
    pub log_level: tracing::Level,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            orchestrator_url: env_string("ORCHESTRATOR_URL", "http://localhost:8080"),
            computing_power: env_parsed("COMPUTING_POWER", 3),
            log_level: env_log_level(),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using the default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_log_level() -> tracing::Level {
    env_string("LOG_LEVEL", "info")
        .parse()
        .unwrap_or(tracing::Level::INFO)
}
