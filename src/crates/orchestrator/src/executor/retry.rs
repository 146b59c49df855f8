//! Retry + circuit breaker wrapper around a single agent invocation.
//!
//! This is the only code that calls an agent's body, catches its failures,
//! and classifies them: agents never see retries, breakers, or timeouts.

use std::sync::Arc;
use std::time::Duration;

use kernel_core::state::{AgentResult, AgentStatus, ProgressAction, ProgressEntry};
use kernel_core::{Agent, BreakerRegistry, ErrorEntry, ErrorKind, RetryPolicy, RunState, StatePatch};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Runs `agent` against `snapshot`, retrying transient failures per `policy`
/// and consulting `breakers` before every attempt, per the fixed ordering:
/// breaker check, attempt, on-exception log+sleep+retry, on-exhaustion trip
/// breaker and synthesize a fallback.
pub async fn invoke_with_retry(
    agent: &Arc<dyn Agent>,
    snapshot: &RunState,
    policy: &RetryPolicy,
    breakers: &BreakerRegistry,
    agent_timeout: Duration,
) -> StatePatch {
    let name = agent.name().to_string();

    if !breakers.allow_call(&name) {
        warn!(agent = %name, "circuit breaker open, short-circuiting to fallback");
        return fallback_patch(&name, "circuit breaker open");
    }

    let mut errors = Vec::new();
    let mut attempt = 0usize;

    loop {
        let outcome = tokio::time::timeout(agent_timeout, agent.invoke(snapshot)).await;

        let (kind, message) = match outcome {
            Ok(Ok(mut patch)) => {
                breakers.record_success(&name);
                if attempt > 0 {
                    info!(agent = %name, attempt, "agent succeeded after retry");
                }
                patch.errors.splice(0..0, errors);
                patch = patch.with_progress(ProgressEntry::new(name.clone(), ProgressAction::Completed));
                return patch;
            }
            Ok(Err(kernel_err)) => (kernel_err.kind(), kernel_err.to_string()),
            Err(_elapsed) => (ErrorKind::AgentTimeout, format!("timed out after {}s", agent_timeout.as_secs())),
        };

        debug!(agent = %name, attempt, error = %message, "agent invocation failed");
        errors.push(ErrorEntry::new(Some(name.clone()), message.clone(), attempt, kind));

        if !policy.should_retry(attempt) {
            breakers.record_failure(&name);
            warn!(agent = %name, attempt, "retries exhausted, falling back");
            let summary = format!("agent '{name}' exhausted retries at attempt {attempt}: {message}");
            let mut patch = StatePatch::new()
                .with_progress(ProgressEntry::new(name.clone(), ProgressAction::Fallback))
                .with_result(name.clone(), AgentResult::fallback(summary))
                .with_context(format!("{name}_fallback_used"), Value::Bool(true))
                .with_context(format!("{name}_needs_retry"), Value::Bool(true));
            patch.errors = errors;
            return patch;
        }

        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}

fn fallback_patch(agent: &str, message: &str) -> StatePatch {
    StatePatch::new()
        .with_progress(ProgressEntry::new(agent.to_string(), ProgressAction::Fallback))
        .with_result(agent.to_string(), AgentResult::fallback(message.to_string()))
        .with_context(format!("{agent}_fallback_used"), Value::Bool(true))
        .with_context(format!("{agent}_needs_retry"), Value::Bool(true))
}
