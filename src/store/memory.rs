use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::types::{
    Expression, ExpressionStatus, Operand, Task, format_scalar, now_ms,
};
use crate::api::protocol::TaskPayload;
use crate::planner::tasks::PlannedTask;

/// Store failures. `UnresolvedDependency` is an invariant violation and
/// surfaces as HTTP 500; the not-found variants map to 404.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("expression {0} not found")]
    ExpressionNotFound(u64),
    #[error("task {0} not found")]
    TaskNotFound(u64),
    #[error("task {task_id} became ready before its dependency {dependency_id} resolved")]
    UnresolvedDependency { task_id: u64, dependency_id: u64 },
}

#[derive(Default)]
struct StoreState {
    expressions: HashMap<u64, Expression>,
    tasks: HashMap<u64, Task>,
    /// Ordered task ids per expression; the last entry is the root task.
    expr_tasks: HashMap<u64, Vec<u64>>,
    /// Reverse dependency edges: completed task id → tasks waiting on it.
    dependents: HashMap<u64, Vec<u64>>,
    /// FIFO of dispatchable task ids. Membership tracks `Task::is_ready`.
    ready: VecDeque<u64>,
    expr_counter: u64,
    task_counter: u64,
}

/// Concurrent in-memory registry of expressions and tasks.
///
/// One coarse `RwLock` guards every map and both counters as a unit, so
/// all dispatch and result-absorption decisions serialize through a single
/// critical section. That is what makes the DAG invariants cheap to hold:
/// a task is handed out at most once because selecting it and flipping its
/// ready bit happen under the same write lock, and an expression's
/// completion is decided in the same section as the result write that
/// triggered it.
///
/// Readiness is tracked with an explicit FIFO queue plus a
/// reverse-dependency index, so absorbing a result touches only the
/// completed task's dependents and selection is O(1).
pub struct TaskStore {
    state: RwLock<StoreState>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().expect("task store lock poisoned")
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().expect("task store lock poisoned")
    }

    /// Registers a new expression in `Pending` state and returns its id.
    pub fn add_expression(&self, raw: &str) -> u64 {
        let mut state = self.write();

        state.expr_counter += 1;
        let id = state.expr_counter;
        state.expressions.insert(
            id,
            Expression {
                id,
                raw: raw.to_string(),
                status: ExpressionStatus::Pending,
                result: None,
                error: None,
            },
        );

        id
    }

    /// Attaches a planned task batch to an expression.
    ///
    /// Assigns global ids in input order and translates every planner-local
    /// reference — operand `TaskRef`s and the dependency lists — through
    /// the same local→global map, so a dispatched task can never carry a
    /// stale local reference. Dependency-free tasks enter the ready queue
    /// and the expression moves to `Processing`.
    pub fn add_tasks(&self, expr_id: u64, planned: Vec<PlannedTask>) -> Result<(), StoreError> {
        let mut state = self.write();

        if !state.expressions.contains_key(&expr_id) {
            return Err(StoreError::ExpressionNotFound(expr_id));
        }

        // First pass: assign global ids.
        let mut local_to_global = HashMap::with_capacity(planned.len());
        for task in &planned {
            state.task_counter += 1;
            local_to_global.insert(task.local_id, state.task_counter);
        }

        let translate = |operand: Operand| match operand {
            Operand::TaskRef(local) => match local_to_global.get(&local) {
                Some(&global) => Operand::TaskRef(global),
                None => Operand::TaskRef(local),
            },
            literal => literal,
        };

        // Second pass: build the global-space tasks and wire readiness.
        let mut task_ids = Vec::with_capacity(planned.len());
        for task in planned {
            let id = local_to_global[&task.local_id];

            let dependencies: Vec<u64> = task
                .dependencies
                .iter()
                .filter_map(|local| local_to_global.get(local).copied())
                .collect();
            for dep in &dependencies {
                state.dependents.entry(*dep).or_default().push(id);
            }

            let is_ready = dependencies.is_empty();
            if is_ready {
                state.ready.push_back(id);
            }

            let (arg1, arg2) = (translate(task.arg1), translate(task.arg2));
            tracing::debug!(
                "Task {} registered: {} {:?} {}",
                id,
                arg1.to_wire(),
                task.operation,
                arg2.to_wire()
            );

            state.tasks.insert(
                id,
                Task {
                    id,
                    expression_id: expr_id,
                    arg1,
                    arg2,
                    operation: task.operation,
                    operation_time_ms: task.operation_time_ms,
                    result: None,
                    dependencies,
                    is_ready,
                    dispatched_at_ms: None,
                },
            );
            task_ids.push(id);
        }

        state.expr_tasks.insert(expr_id, task_ids);
        if let Some(expr) = state.expressions.get_mut(&expr_id) {
            expr.status = ExpressionStatus::Processing;
        }

        Ok(())
    }

    /// A bare-number expression has no tasks to run; it completes in place.
    pub fn complete_literal(&self, expr_id: u64, value: f64) -> Result<(), StoreError> {
        let mut state = self.write();

        let Some(expr) = state.expressions.get_mut(&expr_id) else {
            return Err(StoreError::ExpressionNotFound(expr_id));
        };
        expr.status = ExpressionStatus::Completed;
        expr.result = Some(format_scalar(value));

        Ok(())
    }

    /// Pops a dispatchable task, substitutes dependency results into its
    /// arguments, and stamps it dispatched — all in one critical section,
    /// which is what guarantees at-most-once dispatch.
    ///
    /// Entries whose owning expression already terminated are discarded on
    /// the way: an errored expression's remaining tasks are never handed
    /// out.
    pub fn next_task(&self) -> Result<Option<TaskPayload>, StoreError> {
        let mut state = self.write();

        while let Some(task_id) = state.ready.pop_front() {
            let Some(task) = state.tasks.get(&task_id) else {
                continue;
            };
            let (expr_id, arg1, arg2, operation, operation_time_ms) = (
                task.expression_id,
                task.arg1,
                task.arg2,
                task.operation,
                task.operation_time_ms,
            );
            let stale = task.result.is_some() || !task.is_ready;

            let terminal = state
                .expressions
                .get(&expr_id)
                .map(|expr| expr.status.is_terminal())
                .unwrap_or(true);
            if terminal || stale {
                if let Some(task) = state.tasks.get_mut(&task_id) {
                    task.is_ready = false;
                }
                continue;
            }

            let arg1 = resolve(&state, task_id, arg1)?;
            let arg2 = resolve(&state, task_id, arg2)?;

            if let Some(task) = state.tasks.get_mut(&task_id) {
                task.is_ready = false;
                task.dispatched_at_ms = Some(now_ms());
            }

            return Ok(Some(TaskPayload {
                id: task_id,
                expression_id: expr_id,
                arg1,
                arg2,
                operation,
                operation_time: operation_time_ms,
            }));
        }

        Ok(None)
    }

    /// Absorbs a task outcome posted by an agent.
    ///
    /// Unknown ids are an error. Posts against a terminal expression, or
    /// against a task that already holds a result, are accepted and
    /// ignored so agents can retry blindly. A worker-reported error
    /// fails the whole expression. A scalar result unblocks dependents
    /// and — in the same critical section — completes the expression off
    /// the root task once every task has a result.
    pub fn complete_task(
        &self,
        task_id: u64,
        value: f64,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.write();

        let Some(task) = state.tasks.get(&task_id) else {
            return Err(StoreError::TaskNotFound(task_id));
        };
        let expr_id = task.expression_id;

        let terminal = state
            .expressions
            .get(&expr_id)
            .map(|expr| expr.status.is_terminal())
            .unwrap_or(true);
        if terminal {
            return Ok(());
        }

        if let Some(message) = error.filter(|message| !message.is_empty()) {
            tracing::warn!("Task {} failed: {}", task_id, message);
            if let Some(expr) = state.expressions.get_mut(&expr_id) {
                expr.status = ExpressionStatus::Error;
                expr.error = Some(message.to_string());
            }
            return Ok(());
        }

        {
            let task = state
                .tasks
                .get_mut(&task_id)
                .expect("task existence checked above");
            if task.result.is_some() {
                return Ok(());
            }
            task.result = Some(value);
        }
        tracing::debug!("Task {} resolved to {}", task_id, value);

        release_dependents(&mut state, task_id);
        finish_if_complete(&mut state, expr_id);

        Ok(())
    }

    pub fn get_expression(&self, id: u64) -> Option<Expression> {
        self.read().expressions.get(&id).cloned()
    }

    pub fn all_expressions(&self) -> Vec<Expression> {
        self.read().expressions.values().cloned().collect()
    }

    /// Returns dispatched-but-unresolved tasks older than `deadline_ms` to
    /// the ready queue, so work lost to a vanished agent is handed out
    /// again. Driven by the orchestrator's reclaim loop; never called
    /// unless a deadline was configured.
    pub fn reclaim_expired(&self, deadline_ms: u64) -> usize {
        let mut guard = self.write();
        let state = &mut *guard;
        let now = now_ms();

        let expired: Vec<u64> = state
            .tasks
            .values()
            .filter(|task| task.result.is_none() && !task.is_ready)
            .filter(|task| {
                task.dispatched_at_ms
                    .is_some_and(|at| now.saturating_sub(at) >= deadline_ms)
            })
            .filter(|task| {
                state
                    .expressions
                    .get(&task.expression_id)
                    .is_some_and(|expr| !expr.status.is_terminal())
            })
            .map(|task| task.id)
            .collect();

        for id in &expired {
            if let Some(task) = state.tasks.get_mut(id) {
                task.is_ready = true;
                task.dispatched_at_ms = None;
                state.ready.push_back(*id);
                tracing::warn!("Task {} passed its dispatch deadline, requeued", id);
            }
        }

        expired.len()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders an operand for dispatch. A reference to a result that is not
/// there yet means the readiness bookkeeping is broken.
fn resolve(state: &StoreState, task_id: u64, operand: Operand) -> Result<String, StoreError> {
    match operand {
        Operand::Literal(value) => Ok(format_scalar(value)),
        Operand::TaskRef(dep_id) => match state.tasks.get(&dep_id).and_then(|dep| dep.result) {
            Some(value) => Ok(format_scalar(value)),
            None => Err(StoreError::UnresolvedDependency {
                task_id,
                dependency_id: dep_id,
            }),
        },
    }
}

/// Drains `completed_id` from its dependents' dependency lists; tasks that
/// become dependency-free enter the ready queue.
fn release_dependents(state: &mut StoreState, completed_id: u64) {
    let Some(dependent_ids) = state.dependents.remove(&completed_id) else {
        return;
    };

    for dependent_id in dependent_ids {
        let Some(task) = state.tasks.get_mut(&dependent_id) else {
            continue;
        };
        if task.result.is_some() {
            continue;
        }

        let before = task.dependencies.len();
        task.dependencies.retain(|dep| *dep != completed_id);
        if before > 0 && task.dependencies.is_empty() {
            task.is_ready = true;
            state.ready.push_back(dependent_id);
        }
    }
}

/// Completes the expression once every task holds a result. The last task
/// in planning order is the root; its value becomes the expression's
/// result.
fn finish_if_complete(state: &mut StoreState, expr_id: u64) {
    let root_result = {
        let Some(task_ids) = state.expr_tasks.get(&expr_id) else {
            return;
        };

        let mut last = None;
        for id in task_ids {
            match state.tasks.get(id).and_then(|task| task.result) {
                Some(value) => last = Some(value),
                None => return,
            }
        }
        last
    };

    if let Some(value) = root_result {
        if let Some(expr) = state.expressions.get_mut(&expr_id) {
            let rendered = format_scalar(value);
            tracing::info!("Expression {} completed: {}", expr_id, rendered);
            expr.status = ExpressionStatus::Completed;
            expr.result = Some(rendered);
        }
    }
}
