//! HTTP Dispatch Module
//!
//! The orchestrator's entire HTTP surface: five JSON endpoints over axum.
//!
//! ## Endpoints
//! - `POST /api/v1/calculate` — submit an expression, get back its id.
//! - `GET /api/v1/expressions` — list every expression record.
//! - `GET /api/v1/expressions/{id}` — inspect one expression.
//! - `GET /internal/task` — agents pull a ready task.
//! - `POST /internal/task` — agents push a task result.
//!
//! ## Submodules
//! - **`protocol`**: endpoint paths and the JSON request/reply bodies.
//! - **`handlers`**: the axum handlers, one per endpoint.
//! - **`router`**: route table assembly and state injection.

pub mod handlers;
pub mod protocol;
pub mod router;

#[cfg(test)]
mod tests;
