//! Task Store Module
//!
//! The concurrent in-memory registry that owns every expression and task
//! record in the orchestrator. All other components hold copies only.
//!
//! ## Responsibilities
//! - **Registration**: assigning process-wide monotonic ids to expressions
//!   and tasks, and translating planner-local references into global id
//!   space.
//! - **Readiness**: tracking which tasks have all dependency results in
//!   hand, and handing each of those out to exactly one agent.
//! - **Reduction**: absorbing posted results, unblocking dependents, and
//!   collapsing the root task's value into the expression's final result.
//!
//! ## Submodules
//! - **`memory`**: the `TaskStore` itself, guarded by one coarse lock.
//! - **`types`**: the domain records (`Expression`, `Task`, `Operand`).

pub mod memory;
pub mod types;
