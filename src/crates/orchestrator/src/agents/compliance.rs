use async_trait::async_trait;
use kernel_core::{Agent, AgentResult, KernelError, RunState, StatePatch};
use serde_json::{json, Value};

/// Checks the draft produced by `document` for a marker word that stands in
/// for a real policy violation, flagging `context["needs_rework"]` (and
/// `rework_target`) so the router can send control back to `document` —
/// exercising the router's `compliance -> document` declarative rule.
pub struct ComplianceAgent;

const REWORK_MARKER: &str = "todo";

#[async_trait]
impl Agent for ComplianceAgent {
    fn name(&self) -> &str {
        "compliance"
    }

    async fn invoke(&self, snapshot: &RunState) -> Result<StatePatch, KernelError> {
        let draft = snapshot
            .results
            .get("document")
            .and_then(|r| r.data.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let needs_rework = draft.to_lowercase().contains(REWORK_MARKER);
        let data = json!({
            "approved": !needs_rework,
            "reviewed_agent": "document",
        });

        let mut patch = StatePatch::new().with_result(self.name(), AgentResult::success(data));
        if needs_rework {
            patch = patch
                .with_context("needs_rework", Value::Bool(true))
                .with_context("rework_target", Value::String("document".to_string()));
        }
        Ok(patch)
    }
}
