//! Demonstration agent implementations used by tests and the literal
//! end-to-end scenarios the supervisor's keyword table is grounded on.
//!
//! None of these call out to a real model or search index — each produces
//! small, deterministic synthetic output so the executor/router/supervisor
//! loop has something real to drive without depending on an external
//! provider. A production deployment registers its own [`kernel_core::Agent`]
//! implementations under these same names instead.

mod analytics;
mod compliance;
mod document;
mod search;

pub use analytics::AnalyticsAgent;
pub use compliance::ComplianceAgent;
pub use document::DocumentAgent;
pub use search::SearchAgent;

use std::sync::Arc;

use kernel_core::AgentRegistry;

/// An [`AgentRegistry`] pre-populated with all four demonstration agents,
/// for tests and for a default server startup with no custom agents wired in.
pub fn demonstration_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(AnalyticsAgent));
    registry.register(Arc::new(SearchAgent));
    registry.register(Arc::new(DocumentAgent));
    registry.register(Arc::new(ComplianceAgent));
    registry
}
