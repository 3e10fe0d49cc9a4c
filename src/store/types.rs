use serde::{Deserialize, Serialize};

/// One of the four binary arithmetic primitives an agent can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A task argument: a concrete scalar, or a reference to the result of an
/// earlier task in the same expression.
///
/// References stay typed inside the store; the flat `res:<id>` spelling
/// only exists on the wire. References are always in global id space once
/// a task has been registered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    TaskRef(u64),
}

impl Operand {
    /// Wire spelling of the operand: a decimal literal, or `res:<id>` for
    /// a result reference. Dispatch substitutes references before a task
    /// leaves the store, so agents only ever see the literal form.
    pub fn to_wire(self) -> String {
        match self {
            Operand::Literal(value) => format_scalar(value),
            Operand::TaskRef(id) => format!("res:{}", id),
        }
    }
}

/// Lifecycle of a submitted expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ExpressionStatus {
    /// Terminal expressions are immutable; no further task activity may
    /// touch them.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExpressionStatus::Completed | ExpressionStatus::Error)
    }
}

/// A submitted expression and its evaluation record.
///
/// Doubles as the wire object returned by the expression endpoints, so the
/// serde attributes define the public JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: u64,
    #[serde(rename = "expression")]
    pub raw: String,
    pub status: ExpressionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single binary operation tracked by the store.
///
/// `result` is write-once. `is_ready` is true only while the task sits in
/// the ready queue; dispatching flips it off in the same critical section.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: u64,
    pub expression_id: u64,
    pub arg1: Operand,
    pub arg2: Operand,
    pub operation: Operation,
    pub operation_time_ms: u64,
    pub result: Option<f64>,
    /// Ids of same-expression tasks whose results are still outstanding.
    pub dependencies: Vec<u64>,
    pub is_ready: bool,
    pub dispatched_at_ms: Option<u64>,
}

/// Shortest decimal form that round-trips; integral values render without
/// a trailing `.0`.
pub fn format_scalar(value: f64) -> String {
    value.to_string()
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
