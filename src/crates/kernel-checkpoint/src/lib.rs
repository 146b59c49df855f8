//! Session-scoped persistence of run-state snapshots.
//!
//! [`Checkpointer`] is the only coupling a caller needs: it stores and
//! retrieves opaque snapshot bytes keyed by `(thread_id, checkpoint_id)`.
//! Two implementations are provided — [`MemoryCheckpointer`] for tests and
//! dev, [`LocalDurableCheckpointer`] for single-process durability backed by
//! SQLite. A production deployment can substitute a shared backing store by
//! implementing the trait; nothing else in this crate needs to change.

pub mod error;
pub mod local_durable;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use error::{CheckpointError, Result};
pub use local_durable::LocalDurableCheckpointer;
pub use memory::MemoryCheckpointer;
pub use serializer::{JsonSerializer, SerializerProtocol};
pub use traits::{CheckpointMetadata, CheckpointRecord, Checkpointer};
