use async_trait::async_trait;
use kernel_core::{Agent, AgentResult, KernelError, RunState, StatePatch};
use serde_json::{json, Value};

/// Synthesizes a handful of search results. Flags
/// `context["document_ready"]` when the request also asks for written
/// output, exercising the router's `search -> document` declarative rule.
pub struct SearchAgent;

#[async_trait]
impl Agent for SearchAgent {
    fn name(&self) -> &str {
        "search"
    }

    async fn invoke(&self, snapshot: &RunState) -> Result<StatePatch, KernelError> {
        let lowered = snapshot.task_description.to_lowercase();
        let data = json!({
            "query": snapshot.task_description,
            "results": [
                {"title": "Competitor overview", "score": 0.91},
                {"title": "Market landscape", "score": 0.77},
            ],
        });

        let mut patch = StatePatch::new().with_result(self.name(), AgentResult::success(data));
        if lowered.contains("write") || lowered.contains("doc") || lowered.contains("generate") {
            patch = patch.with_context("document_ready", Value::Bool(true));
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
        let patch = SearchAgent.invoke(&snapshot("find competitors")).await.unwrap();
        assert!(patch.results.contains_key("search"));
    }

    #[tokio::test]
    async fn flags_document_ready_when_writing_is_requested() {
        let patch = SearchAgent.invoke(&snapshot("find competitors then write a doc")).await.unwrap();
        assert_eq!(patch.context.get("document_ready"), Some(&Value::Bool(true)));
    }
}
