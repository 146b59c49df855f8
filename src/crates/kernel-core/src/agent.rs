//! The contract every agent plugged into the kernel must honor.
//!
//! An agent is a pure function from a state snapshot to a patch: it never
//! mutates the snapshot it's given, and re-invoking it with the same
//! snapshot must produce an equivalent patch. The kernel treats the body as
//! opaque — this trait is the only seam.

use async_trait::async_trait;

use crate::error::KernelError;
use crate::state::{RunState, StatePatch};

/// An external collaborator the kernel invokes by name.
///
/// Implementations MUST populate `results[self.name()]` on the returned
/// patch and MUST NOT append to `errors` directly — that log is owned by the
/// retry wrapper that calls `invoke`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Canonical name used as the key into `results`, `dependencies`, and
    /// the supervisor's intent-to-agent table.
    fn name(&self) -> &str;

    /// Produce a patch for the given snapshot, or a failure the retry
    /// wrapper will classify and act on.
    async fn invoke(&self, snapshot: &RunState) -> Result<StatePatch, KernelError>;
}

/// Maps canonical agent names to implementations, populated at startup.
/// The kernel never hard-codes a list of agents; it only knows names that
/// appear in a plan.
#[derive(Default)]
pub struct AgentRegistry {
    agents: std::collections::HashMap<String, std::sync::Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: std::sync::Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AgentResult;
    use serde_json::Value;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, _snapshot: &RunState) -> Result<StatePatch, KernelError> {
            Ok(StatePatch::new().with_result("echo", AgentResult::success(Value::Null)))
        }
    }

    #[tokio::test]
    async fn registry_round_trips_by_name() {
        let mut registry = AgentRegistry::new();
        registry.register(std::sync::Arc::new(EchoAgent));

        assert_eq!(registry.names(), vec!["echo".to_string()]);
        let agent = registry.get("echo").expect("registered");
        let patch = agent.invoke(&RunState::new("t1")).await.unwrap();
        assert!(patch.results.contains_key("echo"));
        assert!(registry.get("missing").is_none());
    }
}
