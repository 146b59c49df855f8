//! Streaming coordinator: reorders concurrent agent output for a
//! subscriber.
//!
//! Within one parallel group, every agent emits `progress`/`agent_update`
//! events as it runs; those land in a per-agent buffer here rather than on
//! the wire. Once the whole group settles, [`drain_group`] forwards each
//! agent's buffered events, in full, in canonical plan order — so the
//! subscriber sees agent order, not completion order. `execution_plan`,
//! `complete`, and `error` are one-shot events with no agent race to
//! resolve, so [`emit`] sends them straight through.

use std::collections::HashMap;

use dashmap::DashMap;
use kernel_core::{AgentResult, AgentStatus, ErrorKind};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// The five event shapes a subscriber ever receives, tagged for JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    ExecutionPlan {
        agents: Vec<String>,
        total_steps: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Progress {
        node: String,
        current_step: usize,
        total_steps: usize,
        execution_plan: Vec<String>,
    },
    AgentUpdate {
        agent: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        data: Value,
        progress_percent: f64,
        status: AgentStatus,
    },
    Complete {
        thread_id: String,
        results: HashMap<String, AgentResult>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        message: String,
        kind: ErrorKind,
    },
}

impl StreamEvent {
    /// `Progress`/`AgentUpdate` are sampling signals and may be dropped under
    /// backpressure; `ExecutionPlan`/`Complete`/`Error` always go through.
    fn is_droppable(&self) -> bool {
        matches!(self, StreamEvent::Progress { .. } | StreamEvent::AgentUpdate { .. })
    }
}

/// Outcome of one `queue` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    Buffered,
    Dropped,
}

/// One run's per-agent event buffers, bounded at a configured high-water mark.
pub struct StreamingCoordinator {
    queues: DashMap<String, Vec<StreamEvent>>,
    hwm: usize,
}

impl StreamingCoordinator {
    pub fn new(hwm: usize) -> Self {
        Self { queues: DashMap::new(), hwm: hwm.max(1) }
    }

    /// Create an empty buffer for `agent`, if it doesn't already have one.
    pub fn register(&self, agent: &str) {
        self.queues.entry(agent.to_string()).or_default();
    }

    /// Append `event` to `agent`'s buffer. Once the buffer holds `hwm`
    /// events, further droppable events evict the oldest one instead of
    /// growing without bound.
    pub fn queue(&self, agent: &str, event: StreamEvent) -> QueueOutcome {
        let mut buffer = self.queues.entry(agent.to_string()).or_default();
        if buffer.len() >= self.hwm {
            if !event.is_droppable() {
                buffer.push(event);
                return QueueOutcome::Buffered;
            }
            debug!(agent, "dropping oldest buffered event at high-water mark");
            buffer.remove(0);
            buffer.push(event);
            return QueueOutcome::Dropped;
        }
        buffer.push(event);
        QueueOutcome::Buffered
    }

    /// Forward every agent's buffered events to `subscriber`, visiting
    /// agents in `canonical_order` and emptying each buffer as it's sent.
    pub async fn drain_group(&self, subscriber: &mpsc::Sender<StreamEvent>, canonical_order: &[String]) {
        for agent in canonical_order {
            let Some((_, events)) = self.queues.remove(agent) else { continue };
            for event in events {
                if subscriber.send(event).await.is_err() {
                    return;
                }
            }
        }
    }
}

impl Default for StreamingCoordinator {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Send a one-shot event (no agent-ordering race to resolve) straight to
/// the subscriber.
pub async fn emit(subscriber: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> QueueOutcome {
    match subscriber.send(event).await {
        Ok(()) => QueueOutcome::Buffered,
        Err(_closed) => QueueOutcome::Dropped,
    }
}
