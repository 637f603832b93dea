//! Persistent store contracts consumed by the clone core
//!
//! The metadata store is the single source of truth for clone task records
//! and snapshot records; the data store holds snapshot chunk indices. Both
//! are backed by external services in production and by mocks in tests.

use async_trait::async_trait;

use crate::{
	clone::{CloneInfo, TaskId},
	error::StoreResult,
	snapshot::{ChunkIndexData, IndexDataName, SnapshotInfo},
};

/// Metadata store holding clone task records and snapshot records.
#[async_trait]
pub trait MetaStore: Send + Sync {
	/// Insert a new clone record. Fails if the task id already exists.
	async fn add_clone_info(&self, info: &CloneInfo) -> StoreResult;

	/// Overwrite an existing clone record.
	async fn update_clone_info(&self, info: &CloneInfo) -> StoreResult;

	/// Remove a clone record at the end of a successful clean.
	async fn delete_clone_info(&self, task_id: &TaskId) -> StoreResult;

	async fn get_clone_info(&self, task_id: &TaskId) -> StoreResult<CloneInfo>;

	async fn get_clone_info_list(&self) -> StoreResult<Vec<CloneInfo>>;

	async fn get_snapshot_info(&self, uuid: &str) -> StoreResult<SnapshotInfo>;
}

/// Snapshot data store holding chunk index objects.
#[async_trait]
pub trait DataStore: Send + Sync {
	async fn get_chunk_index_data(&self, name: &IndexDataName) -> StoreResult<ChunkIndexData>;
}
