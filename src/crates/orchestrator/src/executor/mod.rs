//! Bounded parallel group executor.
//!
//! Runs every agent in one `parallel_groups` level concurrently, each one
//! wrapped by [`retry::invoke_with_retry`], capped by a semaphore so a wide
//! group never exceeds `max_concurrent` agents in flight. Patches from the
//! whole group are folded into the shared [`StateStore`] one at a time so
//! `StateStore::patch`'s invariant checks stay meaningful.

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use kernel_core::{Agent, AgentRegistry, BreakerRegistry, KernelError, RetryPolicy, RunState, StatePatch, StateStore};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::warn;

use retry::invoke_with_retry;

/// Default memory-guard threshold: a delta below this is unremarkable and
/// isn't worth a context entry or a log line.
const DEFAULT_MEM_THRESHOLD_MB: f64 = 100.0;

/// Everything a single group run needs beyond the state store itself.
pub struct ParallelExecutor {
    registry: Arc<AgentRegistry>,
    breakers: Arc<BreakerRegistry>,
    retry_policy: RetryPolicy,
    agent_timeout: Duration,
    max_concurrent: usize,
    mem_threshold_mb: f64,
}

impl ParallelExecutor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        breakers: Arc<BreakerRegistry>,
        retry_policy: RetryPolicy,
        agent_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            registry,
            breakers,
            retry_policy,
            agent_timeout,
            max_concurrent: max_concurrent.max(1),
            mem_threshold_mb: DEFAULT_MEM_THRESHOLD_MB,
        }
    }

    pub fn with_mem_threshold_mb(mut self, threshold: f64) -> Self {
        self.mem_threshold_mb = threshold;
        self
    }

    /// Run every agent named in `group` against the store's current
    /// snapshot, merge their patches in, and advance `current_group` to
    /// `next_group`. Unknown agent names become an immediate fallback
    /// result rather than a panic: a stale plan should degrade, not crash.
    pub async fn run_group(
        &self,
        store: &StateStore,
        group: &[String],
        next_group: usize,
    ) -> Result<RunState, KernelError> {
        let snapshot = store.snapshot();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let mut handles = Vec::with_capacity(group.len());
        for name in group {
            let agent = self.registry.get(name);
            let semaphore = semaphore.clone();
            let breakers = self.breakers.clone();
            let retry_policy = self.retry_policy;
            let agent_timeout = self.agent_timeout;
            let snapshot = snapshot.clone();
            let name = name.clone();

            let mem_threshold_mb = self.mem_threshold_mb;
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                match agent {
                    Some(agent) => {
                        invoke_with_memory_guard(&agent, &snapshot, &retry_policy, &breakers, agent_timeout, mem_threshold_mb).await
                    }
                    None => unknown_agent_patch(&name),
                }
            }));
        }

        for handle in handles {
            let patch = handle.await.map_err(|e| KernelError::fatal_kernel(format!("executor task panicked: {e}")))?;
            store.patch(patch)?;
        }

        // Settle `current_agent` on the last member of the group that just
        // finished so the router's declarative rules (which key off a single
        // "current" agent) and the critical-failure guard have something to
        // read once this was the last group in the plan.
        store.patch(
            StatePatch::new()
                .with_current_group(next_group)
                .with_current_agent(group.last().cloned()),
        )
    }

    /// Run one agent outside of group sequencing — used for the router's
    /// `DirectAgent` hops, which bypass `parallel_groups` entirely. Sets
    /// `current_agent` before invoking so the router's context rules can see
    /// who just ran.
    pub async fn run_single(&self, store: &StateStore, agent_name: &str) -> Result<RunState, KernelError> {
        store.patch(StatePatch::new().with_current_agent(Some(agent_name.to_string())))?;
        let snapshot = store.snapshot();
        let agent = self.registry.get(agent_name);
        let patch = match agent {
            Some(agent) => {
                invoke_with_memory_guard(&agent, &snapshot, &self.retry_policy, &self.breakers, self.agent_timeout, self.mem_threshold_mb)
                    .await
            }
            None => unknown_agent_patch(agent_name),
        };
        store.patch(patch)
    }
}

async fn invoke_with_memory_guard(
    agent: &Arc<dyn Agent>,
    snapshot: &RunState,
    retry_policy: &RetryPolicy,
    breakers: &BreakerRegistry,
    agent_timeout: Duration,
    mem_threshold_mb: f64,
) -> StatePatch {
    let name = agent.name().to_string();
    let before = read_rss_mb();
    let mut patch = invoke_with_retry(agent, snapshot, retry_policy, breakers, agent_timeout).await;
    if let (Some(before), Some(after)) = (before, read_rss_mb()) {
        let delta = after - before;
        if delta >= mem_threshold_mb {
            warn!(agent = %name, delta_mb = delta, "agent invocation crossed the memory guard threshold");
            patch = patch.with_context(format!("{name}_mem_delta_mb"), Value::from(delta));
        }
    }
    patch
}

fn unknown_agent_patch(name: &str) -> StatePatch {
    warn!(agent = %name, "plan referenced an agent with no registered implementation");
    StatePatch::new()
        .with_progress(kernel_core::ProgressEntry::new(name.to_string(), kernel_core::ProgressAction::Fallback))
        .with_result(name.to_string(), kernel_core::AgentResult::fallback(format!("agent '{name}' is not registered")))
        .with_context(format!("{name}_fallback_used"), Value::Bool(true))
}

/// Resident set size in megabytes, sampled from `/proc/self/status`. `None`
/// off Linux or if the field can't be parsed — the memory guard is a
/// best-effort signal, not a hard limit.
#[cfg(target_os = "linux")]
fn read_rss_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: f64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb / 1024.0);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn read_rss_mb() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kernel_core::AgentResult;

    struct EchoAgent(&'static str);

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, _snapshot: &RunState) -> Result<StatePatch, KernelError> {
            Ok(StatePatch::new().with_result(self.0, AgentResult::success(Value::Null)))
        }
    }

    fn executor(registry: AgentRegistry) -> ParallelExecutor {
        ParallelExecutor::new(
            Arc::new(registry),
            Arc::new(BreakerRegistry::new(5, Duration::from_secs(60))),
            RetryPolicy::new(2, kernel_core::BackoffStrategy::Exponential)
                .with_base(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(5)),
            Duration::from_secs(5),
            4,
        )
    }

    #[tokio::test]
    async fn runs_group_members_concurrently_and_advances_group() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent("search")));
        registry.register(Arc::new(EchoAgent("analytics")));
        let exec = executor(registry);

        let store = StateStore::new(RunState::new("t1"));
        let snapshot = exec
            .run_group(&store, &["search".to_string(), "analytics".to_string()], 1)
            .await
            .unwrap();

        assert!(snapshot.results.contains_key("search"));
        assert!(snapshot.results.contains_key("analytics"));
        assert_eq!(snapshot.current_group, 1);
    }

    #[tokio::test]
    async fn run_group_settles_current_agent_on_the_last_group_member() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent("search")));
        registry.register(Arc::new(EchoAgent("analytics")));
        let exec = executor(registry);

        let store = StateStore::new(RunState::new("t1"));
        let snapshot = exec
            .run_group(&store, &["search".to_string(), "analytics".to_string()], 1)
            .await
            .unwrap();

        assert_eq!(snapshot.current_agent, Some("analytics".to_string()));
    }

    #[tokio::test]
    async fn unregistered_agent_degrades_to_fallback_instead_of_panicking() {
        let exec = executor(AgentRegistry::new());
        let store = StateStore::new(RunState::new("t1"));
        let snapshot = exec.run_group(&store, &["ghost".to_string()], 1).await.unwrap();

        let result = snapshot.results.get("ghost").unwrap();
        assert_eq!(result.status, kernel_core::AgentStatus::Fallback);
    }
}
