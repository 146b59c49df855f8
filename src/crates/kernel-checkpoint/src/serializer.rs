//! Serialization protocol for checkpoint snapshots.
//!
//! [`Checkpointer::put`] takes opaque bytes; a [`SerializerProtocol`] is how a
//! caller gets a [`kernel_core::RunState`] into that shape. Kept as a trait
//! rather than a bare function so a caller can swap formats without touching
//! the checkpointer backend.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes.
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes.
    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T>;

    /// Serialize to a `serde_json::Value` instead of bytes, for callers that
    /// want to inspect or merge a snapshot without going through storage.
    fn dumps_json<T: Serialize>(&self, value: &T) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(value)?)
    }

    fn loads_json<T: for<'de> Deserialize<'de>>(&self, value: &serde_json::Value) -> Result<T> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// JSON snapshot format. This is what [`crate::CheckpointMetadata`]'s `extra`
/// field is inspectable as directly in the durable store, so it's the format
/// the façade checkpoints `RunState` with.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_core::{AgentResult, RunState, StatePatch, StateStore};
    use serde_json::json;

    fn sample_run_state() -> RunState {
        let store = StateStore::new(RunState::new("thread-1"));
        store
            .patch(
                StatePatch::new()
                    .with_result("search", AgentResult::success(json!({"hits": 3})))
                    .with_current_group(0),
            )
            .unwrap()
    }

    #[test]
    fn round_trips_a_run_state_through_bytes() {
        let serializer = JsonSerializer::new();
        let state = sample_run_state();

        let bytes = serializer.dumps(&state).unwrap();
        let restored: RunState = serializer.loads(&bytes).unwrap();

        assert_eq!(restored.thread_id, state.thread_id);
        assert_eq!(restored.current_group, state.current_group);
        assert_eq!(restored.results.get("search"), state.results.get("search"));
    }

    #[test]
    fn round_trips_a_run_state_through_json_value() {
        let serializer = JsonSerializer::new();
        let state = sample_run_state();

        let value = serializer.dumps_json(&state).unwrap();
        let restored: RunState = serializer.loads_json(&value).unwrap();

        assert_eq!(restored.thread_id, state.thread_id);
        assert_eq!(restored.results.len(), state.results.len());
    }

    #[test]
    fn a_checkpoint_record_carries_an_opaque_snapshot_of_a_run_state() {
        let serializer = JsonSerializer::new();
        let state = sample_run_state();
        let snapshot = serializer.dumps(&state).unwrap();

        let record = crate::CheckpointRecord {
            checkpoint_id: "checkpoint-1".to_string(),
            thread_id: state.thread_id.clone(),
            snapshot,
            metadata: crate::CheckpointMetadata::new("test"),
        };

        let restored: RunState = serializer.loads(&record.snapshot).unwrap();
        assert_eq!(restored.thread_id, record.thread_id);
    }
}
