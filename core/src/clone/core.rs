//! Shared collaborators and entry points of the clone core

use std::sync::Arc;

use crate::{
	client::BlockClient,
	config::CloneOptions,
	error::{CloneError, CloneResult},
	store::{DataStore, MetaStore},
};

use super::{info::CloneInfo, reference::SnapshotReference, types::TaskId};

/// The clone/recovery core.
///
/// Holds the long-lived collaborators shared by every task: the block-storage
/// client, the two persistent stores, and the snapshot reference registry.
/// Admission runs on the caller; task execution runs on a dispatched worker.
pub struct CloneCore {
	pub(super) client: Arc<dyn BlockClient>,
	pub(super) meta_store: Arc<dyn MetaStore>,
	pub(super) data_store: Arc<dyn DataStore>,
	pub(super) snapshot_ref: Arc<SnapshotReference>,
	pub(super) options: CloneOptions,
}

impl CloneCore {
	pub fn new(
		client: Arc<dyn BlockClient>,
		meta_store: Arc<dyn MetaStore>,
		data_store: Arc<dyn DataStore>,
		snapshot_ref: Arc<SnapshotReference>,
		options: CloneOptions,
	) -> Self {
		Self { client, meta_store, data_store, snapshot_ref, options }
	}

	pub fn options(&self) -> &CloneOptions {
		&self.options
	}

	pub fn snapshot_ref(&self) -> &Arc<SnapshotReference> {
		&self.snapshot_ref
	}

	/// Persisted record of a single task.
	pub async fn get_clone_info(&self, task_id: &TaskId) -> CloneResult<CloneInfo> {
		Ok(self.meta_store.get_clone_info(task_id).await?)
	}

	/// Persisted records owned by `user`, newest first.
	pub async fn list_clone_info(&self, user: &str) -> CloneResult<Vec<CloneInfo>> {
		let mut list: Vec<CloneInfo> = self
			.meta_store
			.get_clone_info_list()
			.await
			.map_err(|e| CloneError::internal(e))?
			.into_iter()
			.filter(|info| info.user == user)
			.collect();
		list.sort_by(|a, b| b.create_time.cmp(&a.create_time));
		Ok(list)
	}

	/// Drop the snapshot pin of a snapshot-sourced task.
	pub(super) fn release_snapshot_ref(&self, info: &CloneInfo) {
		if info.file_type == super::types::CloneFileType::Snapshot {
			self.snapshot_ref.decrement(&info.src);
		}
	}
}
