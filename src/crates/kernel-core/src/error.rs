//! Error kinds produced by the orchestration kernel.
//!
//! Every error the kernel raises carries one of the [`ErrorKind`] variants from
//! `§7` of the design: a fixed taxonomy rather than an open set of ad-hoc
//! strings, so routing and propagation decisions (retry locally vs. terminate
//! the run) can match on the kind instead of parsing messages.
//!
//! Two error types live here:
//!
//! - [`KernelError`] — raised by the state store, grouper, and other kernel
//!   internals; always carries a [`ErrorKind`].
//! - [`ErrorEntry`] — the record appended to `RunState::errors`; not an
//!   `Error` impl itself, just the schema for the append-only error log
//!   described in the data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed taxonomy of kernel error kinds.
///
/// Agent-scoped kinds (`InvalidStateUpdate`, `AgentTimeout`, `AgentFailure`)
/// are recovered locally by the retry wrapper and never unwind past it.
/// Kernel-scoped kinds (`CyclicPlan`, `FatalKernel`) terminate the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidStateUpdate,
    AgentTimeout,
    AgentFailure,
    CyclicPlan,
    PlannerDegraded,
    StreamDropped,
    BreakerOpen,
    FatalKernel,
}

impl ErrorKind {
    /// Whether this kind terminates the run rather than being absorbed by retry/breaker.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::CyclicPlan | ErrorKind::FatalKernel)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidStateUpdate => "invalid_state_update",
            ErrorKind::AgentTimeout => "agent_timeout",
            ErrorKind::AgentFailure => "agent_failure",
            ErrorKind::CyclicPlan => "cyclic_plan",
            ErrorKind::PlannerDegraded => "planner_degraded",
            ErrorKind::StreamDropped => "stream_dropped",
            ErrorKind::BreakerOpen => "breaker_open",
            ErrorKind::FatalKernel => "fatal_kernel",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by kernel-core operations (state store, grouper, agent contract).
#[derive(Debug, Error, Clone)]
pub enum KernelError {
    #[error("invalid state update: {reason}")]
    InvalidStateUpdate { reason: String },

    #[error("agent '{agent}' timed out after {timeout_s}s")]
    AgentTimeout { agent: String, timeout_s: u64 },

    #[error("agent '{agent}' failed: {reason}")]
    AgentFailure { agent: String, reason: String },

    #[error("cyclic dependency among agents: {agents:?}")]
    CyclicPlan { agents: Vec<String> },

    #[error("fatal kernel invariant violation: {reason}")]
    FatalKernel { reason: String },

    #[error("malformed inbound message: {reason}")]
    InvalidInput { reason: String },
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::InvalidStateUpdate { .. } => ErrorKind::InvalidStateUpdate,
            KernelError::AgentTimeout { .. } => ErrorKind::AgentTimeout,
            KernelError::AgentFailure { .. } => ErrorKind::AgentFailure,
            KernelError::CyclicPlan { .. } => ErrorKind::CyclicPlan,
            KernelError::FatalKernel { .. } => ErrorKind::FatalKernel,
            KernelError::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    pub fn invalid_state_update(reason: impl Into<String>) -> Self {
        KernelError::InvalidStateUpdate {
            reason: reason.into(),
        }
    }

    pub fn agent_timeout(agent: impl Into<String>, timeout_s: u64) -> Self {
        KernelError::AgentTimeout {
            agent: agent.into(),
            timeout_s,
        }
    }

    pub fn agent_failure(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        KernelError::AgentFailure {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    pub fn cyclic_plan(agents: Vec<String>) -> Self {
        KernelError::CyclicPlan { agents }
    }

    pub fn fatal_kernel(reason: impl Into<String>) -> Self {
        KernelError::FatalKernel {
            reason: reason.into(),
        }
    }
}

/// An entry in `RunState::errors`; append-only, one per failed attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEntry {
    pub agent: Option<String>,
    pub error_message: String,
    pub attempt: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
}

impl ErrorEntry {
    pub fn new(
        agent: Option<String>,
        error_message: impl Into<String>,
        attempt: usize,
        kind: ErrorKind,
    ) -> Self {
        Self {
            agent,
            error_message: error_message.into(),
            attempt,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn from_kernel_error(agent: Option<String>, attempt: usize, err: &KernelError) -> Self {
        Self::new(agent, err.to_string(), attempt, err.kind())
    }
}
