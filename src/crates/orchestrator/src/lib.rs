//! Multi-agent orchestration engine: plans a run across a set of
//! collaborating agents, executes independent agents concurrently, and
//! routes control between them until the plan settles.
//!
//! `kernel-core` and `kernel-checkpoint` hold the closed state record, agent
//! contract, and checkpoint backends; this crate supplies the pieces that
//! actually drive a run:
//!
//! - [`router`] — the supervisor/planner and the per-step router.
//! - [`executor`] — the bounded parallel group executor and its retry /
//!   circuit-breaker wrapper.
//! - [`streaming`] — reorders concurrent agent output for a subscriber.
//! - [`facade`] — the run controller that ties the above into one `invoke`
//!   call.
//! - [`agents`] — demonstration [`kernel_core::Agent`] implementations.
//! - [`config`] — runtime-tunable knobs, loaded from YAML plus environment
//!   overrides.
//! - [`api`] — the HTTP/websocket surface.

pub mod agents;
pub mod api;
pub mod config;
pub mod executor;
pub mod facade;
pub mod router;
pub mod streaming;

use thiserror::Error;

/// Errors surfaced at the orchestrator's boundary: everything below this
/// crate speaks in [`kernel_core::KernelError`] or
/// [`kernel_checkpoint::CheckpointError`]; this wraps both for callers that
/// only want one error type (the API layer, the binary's `main`).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Kernel(#[from] kernel_core::KernelError),

    #[error(transparent)]
    Checkpoint(#[from] kernel_checkpoint::CheckpointError),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Crate version, as built.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
