//! The [`Checkpointer`] trait — session-scoped persistence of state snapshots.
//!
//! A checkpointer stores opaque, already-serialized snapshot bytes keyed by
//! `(thread_id, checkpoint_id)`; it never interprets the payload, so the
//! orchestrator crate is free to evolve the run-state schema without this
//! crate changing. Checkpoint ids are assigned by the backend at `put` time
//! and ordered so that `list` can return newest-first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata stored alongside a snapshot, independent of its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub written_at: DateTime<Utc>,
    pub source: String,
    /// Arbitrary caller-supplied tags (e.g. the group index the snapshot was taken at).
    pub extra: serde_json::Value,
}

impl CheckpointMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            written_at: Utc::now(),
            source: source.into(),
            extra: serde_json::Value::Null,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}

/// A stored checkpoint: id, owning thread, opaque payload, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub checkpoint_id: String,
    pub thread_id: String,
    pub snapshot: Vec<u8>,
    pub metadata: CheckpointMetadata,
}

/// Session-scoped persistence of state snapshots, keyed by thread identifier.
///
/// At-least-once write semantics: a `get` following a completed `put` for the
/// same thread returns that snapshot (read-after-write). Concurrent `put`s
/// for the same `thread_id` are serialized by the implementation.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Durably store `snapshot`, returning the checkpoint id assigned to it.
    async fn put(
        &self,
        thread_id: &str,
        snapshot: Vec<u8>,
        metadata: CheckpointMetadata,
    ) -> Result<String>;

    /// Fetch a checkpoint; `checkpoint_id = None` returns the most recent one.
    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<CheckpointRecord>>;

    /// All checkpoints for a thread, newest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>>;

    /// Remove every checkpoint belonging to a thread.
    async fn delete(&self, thread_id: &str) -> Result<()>;
}
