use async_trait::async_trait;
use kernel_core::{Agent, AgentResult, KernelError, RunState, StatePatch};
use serde_json::{json, Value};

/// Synthesizes a metrics summary from `task_description`. Flags
/// `context["search_needed"]` when the request also asks for competitive
/// research, exercising the router's `analytics -> search` declarative rule.
pub struct AnalyticsAgent;

#[async_trait]
impl Agent for AnalyticsAgent {
    fn name(&self) -> &str {
        "analytics"
    }

    async fn invoke(&self, snapshot: &RunState) -> Result<StatePatch, KernelError> {
        let lowered = snapshot.task_description.to_lowercase();
        let data = json!({
            "summary": format!("analyzed metrics relevant to: {}", snapshot.task_description),
            "revenue_trend": "up",
            "quarter": "Q-latest",
        });

        let mut patch = StatePatch::new().with_result(self.name(), AgentResult::success(data));
        if lowered.contains("compet") || lowered.contains("search") {
            patch = patch.with_context("search_needed", Value::Bool(true));
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(task: &str) -> RunState {
        let mut s = RunState::new("t1");
        s.task_description = task.to_string();
        s
    }

    #[tokio::test]
    async fn produces_a_result_keyed_by_its_own_name() {
        let patch = AnalyticsAgent.invoke(&snapshot("analyze sales")).await.unwrap();
        assert!(patch.results.contains_key("analytics"));
    }

    #[tokio::test]
    async fn flags_search_needed_when_competitors_are_mentioned() {
        let patch = AnalyticsAgent.invoke(&snapshot("analyze revenue vs competitors")).await.unwrap();
        assert_eq!(patch.context.get("search_needed"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn leaves_search_needed_unset_otherwise() {
        let patch = AnalyticsAgent.invoke(&snapshot("analyze last quarter sales")).await.unwrap();
        assert!(!patch.context.contains_key("search_needed"));
    }
}
