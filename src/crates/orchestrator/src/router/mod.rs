//! Supervisor and Router: planning and per-step routing.
//!
//! Both are pure functions of a [`RunState`] snapshot — no I/O, no async —
//! so the façade can call them directly between executor steps.

use std::collections::{HashMap, HashSet};

use kernel_core::{Message, RunState, StatePatch};
use serde_json::Value;

/// One of the closed set of intents the supervisor classifies a request into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Intent {
    Analyze,
    Search,
    Generate,
    Validate,
    Compare,
    Predict,
}

/// Canonical agents an intent pulls into the plan, in declared order.
fn intent_agents(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Analyze => &["analytics"],
        Intent::Search => &["search"],
        Intent::Generate => &["document"],
        Intent::Validate => &["compliance"],
        Intent::Compare => &["analytics", "search"],
        Intent::Predict => &["analytics"],
    }
}

const KEYWORD_TABLE: &[(&str, Intent)] = &[
    ("analy", Intent::Analyze),
    ("revenue", Intent::Analyze),
    ("sales", Intent::Analyze),
    ("predict", Intent::Predict),
    ("forecast", Intent::Predict),
    ("search", Intent::Search),
    ("find", Intent::Search),
    ("compet", Intent::Search),
    ("info", Intent::Search),
    ("write", Intent::Generate),
    ("doc", Intent::Generate),
    ("generate", Intent::Generate),
    ("compliance", Intent::Validate),
    ("check", Intent::Validate),
    ("validate", Intent::Validate),
    ("compare", Intent::Compare),
];

/// Classify free text into the ordered, deduplicated intents it mentions.
fn classify(text: &str) -> Vec<Intent> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut intents = Vec::new();
    for (keyword, intent) in KEYWORD_TABLE {
        if lowered.contains(keyword) && seen.insert(*intent) {
            intents.push(*intent);
        }
    }
    intents
}

/// Static dependency table: `document` depends on `analytics`/`search` only
/// when those agents are actually present in the plan; `compliance` always
/// depends on `document` when both are present.
fn static_dependencies(plan: &[String]) -> HashMap<String, HashSet<String>> {
    let present: HashSet<&str> = plan.iter().map(String::as_str).collect();
    let mut deps: HashMap<String, HashSet<String>> = HashMap::new();

    if present.contains("compliance") && present.contains("document") {
        deps.entry("compliance".to_string()).or_default().insert("document".to_string());
    }
    if present.contains("document") {
        let entry = deps.entry("document".to_string()).or_default();
        if present.contains("analytics") {
            entry.insert("analytics".to_string());
        }
        if present.contains("search") {
            entry.insert("search".to_string());
        }
    }

    deps
}

/// Deduplicate while preserving first-seen order.
fn dedup_preserve_order(agents: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    agents.into_iter().filter(|a| seen.insert(a.clone())).collect()
}

/// Planner/classifier. Produces the patch the façade applies after
/// invoking the supervisor at the start of a run, or mid-run when the
/// router sends control back to it.
pub struct Supervisor;

impl Supervisor {
    pub fn new() -> Self {
        Self
    }

    /// Build a fresh plan from `task_description`, or augment the existing
    /// one if `snapshot.execution_plan` is non-empty (re-planning never shrinks).
    pub fn plan(&self, snapshot: &RunState) -> StatePatch {
        let intents = classify(&snapshot.task_description);

        let mut agents: Vec<String> = snapshot.execution_plan.clone();
        for intent in &intents {
            for agent in intent_agents(*intent) {
                agents.push(agent.to_string());
            }
        }
        let mut agents = dedup_preserve_order(agents);

        let degraded = agents.is_empty();
        if degraded {
            agents.push("search".to_string());
        }

        let dependencies = static_dependencies(&agents);
        // The static table above is constructed acyclic by hand, so levelization
        // cannot fail here; fall back to one agent per group defensively.
        let parallel_groups = kernel_core::dag::levelize(&agents, &dependencies)
            .unwrap_or_else(|_| agents.iter().map(|a| vec![a.clone()]).collect());

        let rationale = if degraded {
            "planner degraded: no intent recognized, falling back to search".to_string()
        } else {
            format!("planned agents: {}", agents.join(", "))
        };

        let mut patch = StatePatch::default()
            .with_message(Message::system(rationale))
            .with_progress(kernel_core::ProgressEntry::new("supervisor", kernel_core::ProgressAction::Completed))
            .with_execution_plan(agents)
            .with_dependencies(dependencies)
            .with_parallel_groups(parallel_groups)
            .with_current_group(0);

        if degraded {
            patch = patch.with_context("planner_degraded", Value::Bool(true));
        }

        patch
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single router decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Parallel executor should run the next group.
    ContinueGroup,
    /// Skip straight to a specific agent, bypassing `parallel_groups`.
    DirectAgent(String),
    /// Send control back to the supervisor for re-planning.
    Supervisor,
    /// The run is over.
    Terminate,
}

/// Pure routing decision function, checked in the fixed priority order
/// this mirrors: critical-failure guard, parallel continuation, declarative
/// rules, plan completion, default-to-supervisor.
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, snapshot: &RunState) -> RouteDecision {
        if let Some(current) = &snapshot.current_agent {
            let failures = snapshot
                .errors
                .iter()
                .filter(|e| e.agent.as_deref() == Some(current.as_str()))
                .count();
            if failures >= 3 {
                return RouteDecision::Terminate;
            }
        }

        if !snapshot.parallel_groups.is_empty()
            && snapshot.current_group < snapshot.parallel_groups.len() - 1
        {
            return RouteDecision::ContinueGroup;
        }

        if let Some(current) = &snapshot.current_agent {
            if current == "document" && is_true(&snapshot.context, "requires_compliance") {
                return RouteDecision::DirectAgent("compliance".to_string());
            }
            if current == "compliance" && is_true(&snapshot.context, "needs_rework") {
                let target = snapshot
                    .context
                    .get("rework_target")
                    .and_then(Value::as_str)
                    .unwrap_or("document")
                    .to_string();
                return RouteDecision::DirectAgent(target);
            }
            if current == "analytics" && is_true(&snapshot.context, "search_needed") {
                return RouteDecision::DirectAgent("search".to_string());
            }
            if current == "search" && is_true(&snapshot.context, "document_ready") {
                return RouteDecision::DirectAgent("document".to_string());
            }
        }

        if !snapshot.execution_plan.is_empty()
            && snapshot.execution_plan.iter().all(|a| snapshot.results.contains_key(a))
        {
            return RouteDecision::Terminate;
        }

        RouteDecision::Supervisor
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn is_true(context: &HashMap<String, Value>, key: &str) -> bool {
    context.get(key).and_then(Value::as_bool).unwrap_or(false)
}
