use async_trait::async_trait;
use kernel_core::{Agent, AgentResult, KernelError, RunState, StatePatch};
use serde_json::{json, Value};

/// Drafts a document, folding in upstream `analytics`/`search` results when
/// present. Flags `context["requires_compliance"]` when the request also
/// asks for a compliance check, exercising the router's
/// `document -> compliance` declarative rule.
pub struct DocumentAgent;

#[async_trait]
impl Agent for DocumentAgent {
    fn name(&self) -> &str {
        "document"
    }

    async fn invoke(&self, snapshot: &RunState) -> Result<StatePatch, KernelError> {
        let mut sources = Vec::new();
        if snapshot.results.contains_key("analytics") {
            sources.push("analytics");
        }
        if snapshot.results.contains_key("search") {
            sources.push("search");
        }

        let lowered = snapshot.task_description.to_lowercase();
        let data = json!({
            "title": format!("Draft: {}", snapshot.task_description),
            "content": format!("draft covering: {}", snapshot.task_description),
            "sources": sources,
        });

        let mut patch = StatePatch::new().with_result(self.name(), AgentResult::success(data));
        if lowered.contains("compliance") || lowered.contains("check") || lowered.contains("validate") {
            patch = patch.with_context("requires_compliance", Value::Bool(true));
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    fn snapshot(task: &str) -> RunState {
        let mut s = RunState::new("t1");
        s.task_description = task.to_string();
        s
    }

    #[tokio::test]
    async fn produces_a_result_keyed_by_its_own_name() {
        let patch = DocumentAgent.invoke(&snapshot("write a doc")).await.unwrap();
        assert!(patch.results.contains_key("document"));
    }

    #[tokio::test]
    async fn flags_requires_compliance_when_asked() {
        let patch = DocumentAgent.invoke(&snapshot("write a doc and check compliance")).await.unwrap();
        assert_eq!(patch.context.get("requires_compliance"), Some(&JsonValue::Bool(true)));
    }

    #[tokio::test]
    async fn lists_upstream_sources_it_found() {
        let mut snap = snapshot("write a doc");
        snap.results.insert("search".to_string(), AgentResult::success(Value::Null));
        let patch = DocumentAgent.invoke(&snap).await.unwrap();
        let sources = patch.results.get("document").unwrap().data["sources"].as_array().unwrap();
        assert_eq!(sources, &vec![JsonValue::String("search".to_string())]);
    }
}
