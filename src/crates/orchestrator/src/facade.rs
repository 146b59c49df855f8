//! Run controller: the one entry point that turns an inbound request
//! into a finished [`RunState`].
//!
//! Ties together every other module: loads or starts a thread's state,
//! drives supervisor -> executor -> router to a terminal state, streams
//! progress to an optional subscriber, and checkpoints the result. Callers
//! (the sync `/invoke` handler and the websocket handler) differ only in
//! whether they pass a `subscriber`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kernel_checkpoint::{CheckpointMetadata, Checkpointer, JsonSerializer, SerializerProtocol};
use kernel_core::{
    AgentRegistry, BreakerRegistry, ErrorEntry, ErrorKind, Message, RetryPolicy, RunState, StatePatch,
    StateStore,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::executor::ParallelExecutor;
use crate::router::{RouteDecision, Router, Supervisor};
use crate::streaming::{emit, QueueOutcome, StreamEvent, StreamingCoordinator};
use crate::OrchestratorError;

/// Inbound request accepted by [`Facade::invoke`], per the `/invoke` and
/// websocket `invoke` message shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub input: String,
    pub thread_id: Option<String>,
}

/// The long-lived pieces of the engine: agent registry, breaker state, and
/// the checkpoint backend. A fresh [`StateStore`] and [`StreamingCoordinator`]
/// are built per run.
pub struct Facade {
    agents: Arc<AgentRegistry>,
    checkpointer: Arc<dyn Checkpointer>,
    config: EngineConfig,
    supervisor: Supervisor,
    router: Router,
    executor: ParallelExecutor,
}

impl Facade {
    pub fn new(agents: Arc<AgentRegistry>, checkpointer: Arc<dyn Checkpointer>, config: EngineConfig) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(
            config.breaker_threshold,
            Duration::from_secs(config.breaker_timeout_s),
        ));
        let retry_policy = RetryPolicy::new(config.max_retries as usize, config.retry_policy);
        let executor = ParallelExecutor::new(
            agents.clone(),
            breakers,
            retry_policy,
            Duration::from_secs(config.agent_timeout_s),
            config.max_concurrent,
        );
        Self {
            agents,
            checkpointer,
            config,
            supervisor: Supervisor::new(),
            router: Router::new(),
            executor,
        }
    }

    /// Run `request` to a terminal state, optionally streaming progress to
    /// `subscriber`. Returns the terminal snapshot; also persists it.
    pub async fn invoke(
        &self,
        request: InvokeRequest,
        subscriber: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<RunState, OrchestratorError> {
        let thread_id = request.thread_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let initial = self.load_or_new(&thread_id).await?;
        let store = StateStore::new(initial);
        store.patch(StatePatch {
            messages: vec![Message::user(request.input.clone())],
            task_description: Some(request.input),
            ..StatePatch::new()
        })?;

        let streaming = StreamingCoordinator::new(self.config.stream_hwm);
        let deadline = Instant::now() + Duration::from_secs(self.config.run_deadline_s);
        let mut cancelled = false;

        loop {
            let snapshot = store.snapshot();
            if snapshot.is_complete {
                break;
            }
            if Instant::now() >= deadline {
                warn!(thread_id = %thread_id, "run deadline exceeded, terminating at group boundary");
                store.patch(StatePatch::new().with_complete(true))?;
                break;
            }
            if let Some(tx) = &subscriber {
                if tx.is_closed() {
                    info!(thread_id = %thread_id, "subscriber disconnected, cancelling run without a complete event");
                    cancelled = true;
                    break;
                }
            }

            if snapshot.current_group < snapshot.parallel_groups.len() {
                self.run_next_group(&store, &snapshot, &streaming, subscriber.as_ref()).await?;
                continue;
            }

            match self.router.decide(&snapshot) {
                RouteDecision::Supervisor => self.run_supervisor(&store, &snapshot, subscriber.as_ref()).await?,
                RouteDecision::DirectAgent(name) => {
                    self.run_direct_agent(&store, &streaming, subscriber.as_ref(), &name).await?
                }
                RouteDecision::ContinueGroup => {
                    // The group loop above already advances `current_group`
                    // directly; reaching this arm means a group is still
                    // pending and the next iteration will pick it up.
                }
                RouteDecision::Terminate => {
                    store.patch(StatePatch::new().with_complete(true))?;
                }
            }
        }

        let final_state = store.snapshot();
        self.persist(&thread_id, &final_state).await?;

        if !cancelled {
            if let Some(tx) = &subscriber {
                let _ = emit(
                    tx,
                    StreamEvent::Complete { thread_id: thread_id.clone(), results: final_state.results.clone() },
                )
                .await;
            }
        }

        Ok(final_state)
    }

    async fn load_or_new(&self, thread_id: &str) -> Result<RunState, OrchestratorError> {
        match self.checkpointer.get(thread_id, None).await? {
            Some(record) => Ok(JsonSerializer.loads(&record.snapshot)?),
            None => Ok(RunState::new(thread_id.to_string())),
        }
    }

    async fn persist(&self, thread_id: &str, state: &RunState) -> Result<(), OrchestratorError> {
        let snapshot = JsonSerializer.dumps(state)?;
        let metadata = CheckpointMetadata::new("facade").with_extra(json!({
            "current_group": state.current_group,
            "is_complete": state.is_complete,
        }));
        self.checkpointer.put(thread_id, snapshot, metadata).await?;
        Ok(())
    }

    async fn run_supervisor(
        &self,
        store: &StateStore,
        snapshot: &RunState,
        subscriber: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<(), OrchestratorError> {
        let patch = self.supervisor.plan(snapshot);
        let agents = patch.execution_plan.clone().unwrap_or_default();
        let total_steps = patch.parallel_groups.as_ref().map(Vec::len).unwrap_or(0);
        let reason = patch
            .context
            .get("planner_degraded")
            .map(|_| "planner degraded: no intent recognized".to_string());
        store.patch(patch)?;
        if let Some(tx) = subscriber {
            let _ = emit(tx, StreamEvent::ExecutionPlan { agents, total_steps, reason }).await;
        }
        Ok(())
    }

    async fn run_next_group(
        &self,
        store: &StateStore,
        snapshot: &RunState,
        streaming: &StreamingCoordinator,
        subscriber: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<(), OrchestratorError> {
        let group = snapshot.parallel_groups[snapshot.current_group].clone();
        let group_number = snapshot.current_group + 1;
        let total_steps = snapshot.parallel_groups.len();
        let execution_plan = snapshot.execution_plan.clone();
        for agent in &group {
            streaming.register(agent);
        }

        let after = self.executor.run_group(store, &group, group_number).await?;

        let mut dropped = StatePatch::new();
        for agent in &group {
            if let Some(result) = after.results.get(agent) {
                let outcome = streaming.queue(
                    agent,
                    StreamEvent::Progress {
                        node: agent.clone(),
                        current_step: group_number,
                        total_steps,
                        execution_plan: execution_plan.clone(),
                    },
                );
                if outcome == QueueOutcome::Dropped {
                    dropped = dropped.with_error(stream_dropped_entry(agent, "progress"));
                }
                let outcome = streaming.queue(
                    agent,
                    StreamEvent::AgentUpdate {
                        agent: agent.clone(),
                        message: result.message.clone(),
                        data: result.data.clone(),
                        progress_percent: 100.0,
                        status: result.status,
                    },
                );
                if outcome == QueueOutcome::Dropped {
                    dropped = dropped.with_error(stream_dropped_entry(agent, "agent_update"));
                }
            }
        }
        if !dropped.errors.is_empty() {
            store.patch(dropped)?;
        }

        if let Some(tx) = subscriber {
            streaming.drain_group(tx, &group).await;
        }
        Ok(())
    }

    async fn run_direct_agent(
        &self,
        store: &StateStore,
        streaming: &StreamingCoordinator,
        subscriber: Option<&mpsc::Sender<StreamEvent>>,
        name: &str,
    ) -> Result<(), OrchestratorError> {
        let after = self.executor.run_single(store, name).await?;
        streaming.register(name);
        if let Some(result) = after.results.get(name) {
            let outcome = streaming.queue(
                name,
                StreamEvent::AgentUpdate {
                    agent: name.to_string(),
                    message: result.message.clone(),
                    data: result.data.clone(),
                    progress_percent: 100.0,
                    status: result.status,
                },
            );
            if outcome == QueueOutcome::Dropped {
                store.patch(StatePatch::new().with_error(stream_dropped_entry(name, "agent_update")))?;
            }
        }
        if let Some(tx) = subscriber {
            streaming.drain_group(tx, &[name.to_string()]).await;
        }
        Ok(())
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }
}

/// Record a high-water-mark eviction in the run's error log so a client that
/// missed events over the wire can still see, from the persisted state, that
/// its stream was lossy.
fn stream_dropped_entry(agent: &str, event_kind: &str) -> ErrorEntry {
    ErrorEntry::new(
        Some(agent.to_string()),
        format!("stream buffer for '{agent}' hit its high-water mark; oldest {event_kind} event dropped"),
        0,
        ErrorKind::StreamDropped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_checkpoint::MemoryCheckpointer;
    use crate::agents::demonstration_registry;

    fn facade() -> Facade {
        Facade::new(
            Arc::new(demonstration_registry()),
            Arc::new(MemoryCheckpointer::new()),
            EngineConfig { run_deadline_s: 5, ..EngineConfig::default() },
        )
    }

    #[tokio::test]
    async fn single_intent_run_reaches_completion_with_a_result() {
        let facade = facade();
        let state = facade
            .invoke(InvokeRequest { input: "analyze last quarter sales".to_string(), thread_id: None }, None)
            .await
            .unwrap();

        assert!(state.is_complete);
        assert!(state.results.contains_key("analytics"));
    }

    #[tokio::test]
    async fn chained_declarative_routing_runs_document_then_compliance() {
        let facade = facade();
        let state = facade
            .invoke(
                InvokeRequest { input: "write a doc and check compliance".to_string(), thread_id: None },
                None,
            )
            .await
            .unwrap();

        assert!(state.is_complete);
        assert!(state.results.contains_key("document"));
        assert!(state.results.contains_key("compliance"));
    }

    #[tokio::test]
    async fn resuming_a_thread_id_continues_from_its_checkpoint() {
        let facade = facade();
        let first = facade
            .invoke(InvokeRequest { input: "analyze sales".to_string(), thread_id: Some("t-resume".to_string()) }, None)
            .await
            .unwrap();
        assert!(first.is_complete);

        let second = facade
            .invoke(
                InvokeRequest { input: "now also find competitors".to_string(), thread_id: Some("t-resume".to_string()) },
                None,
            )
            .await
            .unwrap();

        assert!(second.messages.len() > first.messages.len());
        assert!(second.results.contains_key("search"));
    }

    #[tokio::test]
    async fn hwm_drop_appends_a_stream_dropped_error() {
        let facade = Facade::new(
            Arc::new(demonstration_registry()),
            Arc::new(MemoryCheckpointer::new()),
            EngineConfig { run_deadline_s: 5, stream_hwm: 1, ..EngineConfig::default() },
        );
        let state = facade
            .invoke(InvokeRequest { input: "analyze last quarter sales".to_string(), thread_id: None }, None)
            .await
            .unwrap();

        assert!(state.errors.iter().any(|e| e.kind == ErrorKind::StreamDropped));
    }

    #[tokio::test]
    async fn unrecognized_intent_still_terminates_via_degraded_search() {
        let facade = facade();
        let state = facade
            .invoke(InvokeRequest { input: "blorp zzz unknown".to_string(), thread_id: None }, None)
            .await
            .unwrap();

        assert!(state.is_complete);
        assert_eq!(state.context.get("planner_degraded"), Some(&serde_json::Value::Bool(true)));
    }
}
