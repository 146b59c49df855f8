//! In-memory checkpointer for tests and single-process development.
//!
//! Stores every checkpoint in a `Mutex<HashMap<thread_id, Vec<CheckpointRecord>>>`,
//! ordered oldest-first internally and reversed on read. Nothing survives
//! process restart — use the `local_durable` backend when that matters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::{CheckpointMetadata, CheckpointRecord, Checkpointer};

#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: Mutex<HashMap<String, Vec<CheckpointRecord>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn put(
        &self,
        thread_id: &str,
        snapshot: Vec<u8>,
        metadata: CheckpointMetadata,
    ) -> Result<String> {
        let checkpoint_id = Uuid::new_v4().to_string();
        let record = CheckpointRecord {
            checkpoint_id: checkpoint_id.clone(),
            thread_id: thread_id.to_string(),
            snapshot,
            metadata,
        };
        self.threads
            .lock()
            .unwrap()
            .entry(thread_id.to_string())
            .or_default()
            .push(record);
        Ok(checkpoint_id)
    }

    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<CheckpointRecord>> {
        let threads = self.threads.lock().unwrap();
        let Some(records) = threads.get(thread_id) else {
            return Ok(None);
        };
        let found = match checkpoint_id {
            Some(id) => records.iter().find(|r| r.checkpoint_id == id),
            None => records.last(),
        };
        Ok(found.cloned())
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>> {
        let threads = self.threads.lock().unwrap();
        let mut records = threads.get(thread_id).cloned().unwrap_or_default();
        records.reverse();
        Ok(records)
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        self.threads.lock().unwrap().remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_after_put_round_trips() {
        let saver = MemoryCheckpointer::new();
        let id = saver
            .put("t1", b"snapshot-bytes".to_vec(), CheckpointMetadata::new("test"))
            .await
            .unwrap();

        let record = saver.get("t1", Some(&id)).await.unwrap().unwrap();
        assert_eq!(record.snapshot, b"snapshot-bytes");
        assert_eq!(record.thread_id, "t1");
    }

    #[tokio::test]
    async fn get_without_id_returns_latest() {
        let saver = MemoryCheckpointer::new();
        saver.put("t1", b"first".to_vec(), CheckpointMetadata::new("a")).await.unwrap();
        saver.put("t1", b"second".to_vec(), CheckpointMetadata::new("b")).await.unwrap();

        let record = saver.get("t1", None).await.unwrap().unwrap();
        assert_eq!(record.snapshot, b"second");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let saver = MemoryCheckpointer::new();
        saver.put("t1", b"first".to_vec(), CheckpointMetadata::new("a")).await.unwrap();
        saver.put("t1", b"second".to_vec(), CheckpointMetadata::new("b")).await.unwrap();

        let records = saver.list("t1").await.unwrap();
        assert_eq!(records[0].snapshot, b"second");
        assert_eq!(records[1].snapshot, b"first");
    }

    #[tokio::test]
    async fn delete_removes_all_checkpoints_for_thread() {
        let saver = MemoryCheckpointer::new();
        saver.put("t1", b"x".to_vec(), CheckpointMetadata::new("a")).await.unwrap();
        saver.delete("t1").await.unwrap();
        assert!(saver.get("t1", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_thread_returns_none() {
        let saver = MemoryCheckpointer::new();
        assert!(saver.get("missing", None).await.unwrap().is_none());
        assert!(saver.list("missing").await.unwrap().is_empty());
    }
}
