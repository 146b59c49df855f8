//! The typed run state and its single mutator, `patch`.
//!
//! `RunState` is a closed record: every field that can be written is named on
//! [`StatePatch`], so there is no "unknown key" to rekect at runtime the way a
//! free-form map would need to — the Rust type system is the schema check.
//! [`StateStore`] owns the only mutable copy and guards every mutation with a
//! single mutex; readers get a clone, so mutations that land after a `get()`
//! returns can never be observed by that caller (no torn reads).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorEntry, KernelError};
use crate::messages::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Error,
    Fallback,
}

/// `results[agent_name]` — an agent-defined payload plus the minimum shape the
/// kernel requires to reason about completion and fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    pub status: AgentStatus,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AgentResult {
    pub fn success(data: Value) -> Self {
        Self {
            status: AgentStatus::Success,
            message: None,
            data,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn fallback(message: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Fallback,
            message: Some(message.into()),
            data: Value::Null,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressAction {
    Started,
    Completed,
    Failed,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    pub agent: String,
    pub action: ProgressAction,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub meta: Option<Value>,
}

impl ProgressEntry {
    pub fn new(agent: impl Into<String>, action: ProgressAction) -> Self {
        Self {
            agent: agent.into(),
            action,
            timestamp: chrono::Utc::now(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// The single shared entity accumulated over one run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunState {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub current_agent: Option<String>,
    pub task_description: String,
    pub execution_plan: Vec<String>,
    pub dependencies: HashMap<String, HashSet<String>>,
    pub parallel_groups: Vec<Vec<String>>,
    pub current_group: usize,
    pub current_step: usize,
    pub results: HashMap<String, AgentResult>,
    pub context: HashMap<String, Value>,
    pub progress: Vec<ProgressEntry>,
    pub errors: Vec<ErrorEntry>,
    pub is_complete: bool,
}

impl RunState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Default::default()
        }
    }
}

/// A proposed mutation to a [`RunState`]. Accumulating fields are appended;
/// map fields are key-merged (last write wins per key); scalars overwrite
/// when `Some`. This is the only way to mutate a [`RunState`] inside a
/// [`StateStore`].
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub messages: Vec<Message>,
    pub progress: Vec<ProgressEntry>,
    pub errors: Vec<ErrorEntry>,
    pub current_agent: Option<Option<String>>,
    pub task_description: Option<String>,
    pub execution_plan: Option<Vec<String>>,
    pub dependencies: Option<HashMap<String, HashSet<String>>>,
    pub parallel_groups: Option<Vec<Vec<String>>>,
    pub current_group: Option<usize>,
    pub current_step: Option<usize>,
    pub results: HashMap<String, AgentResult>,
    pub context: HashMap<String, Value>,
    pub is_complete: Option<bool>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_progress(mut self, entry: ProgressEntry) -> Self {
        self.progress.push(entry);
        self
    }

    pub fn with_error(mut self, entry: ErrorEntry) -> Self {
        self.errors.push(entry);
        self
    }

    pub fn with_result(mut self, agent: impl Into<String>, result: AgentResult) -> Self {
        self.results.insert(agent.into(), result);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_execution_plan(mut self, plan: Vec<String>) -> Self {
        self.execution_plan = Some(plan);
        self
    }

    pub fn with_dependencies(mut self, deps: HashMap<String, HashSet<String>>) -> Self {
        self.dependencies = Some(deps);
        self
    }

    pub fn with_parallel_groups(mut self, groups: Vec<Vec<String>>) -> Self {
        self.parallel_groups = Some(groups);
        self
    }

    pub fn with_current_group(mut self, group: usize) -> Self {
        self.current_group = Some(group);
        self
    }

    pub fn with_current_agent(mut self, agent: Option<String>) -> Self {
        self.current_agent = Some(agent);
        self
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.is_complete = Some(complete);
        self
    }
}

/// Owns the run-scoped mutex guarding the one shared `RunState`.
///
/// All methods are synchronous and non-blocking beyond the mutex itself —
/// per the concurrency model, no suspension point may occur while the lock
/// is held, so callers must never `.await` between acquiring state and
/// releasing it (these methods never hand the guard back to the caller).
pub struct StateStore {
    inner: Mutex<RunState>,
}

impl StateStore {
    pub fn new(initial: RunState) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// A deep copy of the current state; mutations after this call are never observed.
    pub fn snapshot(&self) -> RunState {
        self.inner.lock().unwrap().clone()
    }

    pub fn append_message(&self, message: Message) {
        self.inner.lock().unwrap().messages.push(message);
    }

    pub fn append_progress(&self, entry: ProgressEntry) {
        self.inner.lock().unwrap().progress.push(entry);
    }

    pub fn append_error(&self, entry: ErrorEntry) {
        self.inner.lock().unwrap().errors.push(entry);
    }

    /// Replace `agent`'s result slot; records a `completed` progress entry
    /// unless `is_fallback` is set, in which case the caller is expected to
    /// have appended its own `fallback` progress entry.
    pub fn set_result(&self, agent: &str, result: AgentResult, is_fallback: bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.results.insert(agent.to_string(), result);
        if !is_fallback {
            guard.progress.push(ProgressEntry::new(agent, ProgressAction::Completed));
        }
    }

    /// Apply a patch, validating the invariants that a typed struct can't
    /// enforce on its own (monotonic `current_group`, in-range `current_step`).
    pub fn patch(&self, patch: StatePatch) -> Result<RunState, KernelError> {
        let mut guard = self.inner.lock().unwrap();

        if let Some(new_group) = patch.current_group {
            if new_group < guard.current_group {
                return Err(KernelError::invalid_state_update(format!(
                    "current_group must not decrease: {} -> {new_group}",
                    guard.current_group
                )));
            }
        }
        if let Some(ref plan) = patch.execution_plan {
            if let Some(step) = patch.current_step {
                if step > plan.len() {
                    return Err(KernelError::invalid_state_update(
                        "current_step out of range for execution_plan",
                    ));
                }
            }
        }

        guard.messages.extend(patch.messages);
        guard.progress.extend(patch.progress);
        guard.errors.extend(patch.errors);

        if let Some(agent) = patch.current_agent {
            guard.current_agent = agent;
        }
        if let Some(desc) = patch.task_description {
            guard.task_description = desc;
        }
        if let Some(plan) = patch.execution_plan {
            guard.execution_plan = plan;
        }
        if let Some(deps) = patch.dependencies {
            guard.dependencies = deps;
        }
        if let Some(groups) = patch.parallel_groups {
            guard.parallel_groups = groups;
        }
        if let Some(group) = patch.current_group {
            guard.current_group = group;
        }
        if let Some(step) = patch.current_step {
            guard.current_step = step;
        }
        if let Some(complete) = patch.is_complete {
            guard.is_complete = complete;
        }
        for (k, v) in patch.results {
            guard.results.insert(k, v);
        }
        for (k, v) in patch.context {
            guard.context.insert(k, v);
        }

        Ok(guard.clone())
    }
}
