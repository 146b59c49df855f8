//! Core types of the agent orchestration kernel.
//!
//! This crate has no async runtime dependency beyond what a handful of
//! trait signatures need (`async_trait` on [`agent::Agent`]); the actual
//! driving loop — supervisor, grouper, parallel executor, router,
//! streaming — lives in the `orchestrator` crate, which depends on this one.
//!
//! ## Modules
//!
//! - [`state`] — `RunState`, `StatePatch`, and `StateStore`, the shared
//!   entity every agent reads from and writes to.
//! - [`messages`] — the typed message record stored in `RunState::messages`.
//! - [`agent`] — the `Agent` trait and registry every orchestrated
//!   collaborator implements.
//! - [`dag`] — Kahn-style levelization of the agent dependency graph into
//!   parallel-safe groups.
//! - [`retry`] — backoff policy math shared by the orchestrator's retry
//!   wrapper.
//! - [`breaker`] — per-agent circuit breaker state machine.
//! - [`error`] — the fixed error-kind taxonomy and the `errors` log entry
//!   shape.

pub mod agent;
pub mod breaker;
pub mod dag;
pub mod error;
pub mod messages;
pub mod retry;
pub mod state;

pub use agent::{Agent, AgentRegistry};
pub use breaker::{BreakerRegistry, BreakerState, CircuitBreaker};
pub use error::{ErrorEntry, ErrorKind, KernelError};
pub use messages::{Message, MessageRole};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use state::{AgentResult, AgentStatus, ProgressAction, ProgressEntry, RunState, StatePatch, StateStore};
