//! Admission checks for clone, recover, and clean requests
//!
//! Admission runs synchronously on the caller and either rejects the request
//! or leaves a durable record behind; only then is a worker dispatched.

use tracing::{info, warn};

use crate::error::{ClientError, CloneError, CloneResult};

use super::{
	core::CloneCore,
	info::CloneInfo,
	types::{CloneFileType, CloneStatus, CloneTaskType, TaskId},
};

impl CloneCore {
	/// Validate a clone/recover request and persist its task record.
	///
	/// A request that exactly matches an existing live or finished record is
	/// answered with that record instead of a duplicate, so user-side retries
	/// are idempotent.
	pub async fn clone_or_recover_pre(
		&self,
		source: &str,
		user: &str,
		destination: &str,
		is_lazy: bool,
		task_type: CloneTaskType,
	) -> CloneResult<CloneInfo> {
		let list = self
			.meta_store
			.get_clone_info_list()
			.await
			.map_err(CloneError::internal)?;

		// A failed task still owns its destination (and pins its source)
		// until the user cleans it.
		for existing in &list {
			if existing.status == CloneStatus::Error
				&& (existing.dest == destination || existing.src == source)
			{
				warn!(
					"Refusing {} to {}: task {} ended in error and is not cleaned",
					task_type, destination, existing.task_id
				);
				return Err(CloneError::SnapshotCannotCreateWhenError);
			}
		}

		for existing in &list {
			let same_request = existing.src == source
				&& existing.user == user
				&& existing.dest == destination
				&& existing.task_type == task_type;

			if same_request && existing.status == CloneStatus::Done {
				return Ok(existing.clone());
			}
			if existing.status.is_live() && existing.dest == destination {
				if same_request {
					return Ok(existing.clone());
				}
				return Err(CloneError::TaskExist);
			}
		}

		let file_type = self.classify_source(source, user).await?;

		let clone_info = CloneInfo::new(
			TaskId::new(),
			user,
			task_type,
			source,
			destination,
			file_type,
			is_lazy,
		);

		self.meta_store.add_clone_info(&clone_info).await?;

		if file_type == CloneFileType::Snapshot {
			self.snapshot_ref.increment(source);
		}

		info!(
			"Admitted {} task {}: {} -> {} (lazy: {})",
			task_type, clone_info.task_id, source, destination, is_lazy
		);
		Ok(clone_info)
	}

	/// Snapshot lookup first; anything that is not a ready snapshot owned by
	/// the caller falls through to a volume lookup.
	async fn classify_source(&self, source: &str, user: &str) -> CloneResult<CloneFileType> {
		match self.meta_store.get_snapshot_info(source).await {
			Ok(snap) => {
				if snap.status != crate::snapshot::SnapshotStatus::Done {
					return Err(CloneError::InvalidSnapshot);
				}
				if snap.user != user {
					return Err(CloneError::InvalidUser);
				}
				Ok(CloneFileType::Snapshot)
			}
			Err(_) => match self.client.get_file_info(source, user).await {
				Ok(_) => Ok(CloneFileType::File),
				Err(ClientError::NotExist) => Err(CloneError::FileNotExist),
				Err(ClientError::AuthFail) => Err(CloneError::InvalidUser),
				Err(ClientError::Failed(msg)) => Err(CloneError::InternalError(msg)),
			},
		}
	}

	/// Validate a clean request and move the record into `cleaning`.
	pub async fn clean_clone_or_recover_task_pre(
		&self,
		user: &str,
		task_id: &TaskId,
	) -> CloneResult<CloneInfo> {
		let mut clone_info = self
			.meta_store
			.get_clone_info(task_id)
			.await
			.map_err(|_| CloneError::FileNotExist)?;

		if clone_info.user != user {
			return Err(CloneError::InvalidUser);
		}
		match clone_info.status {
			CloneStatus::Cleaning => return Err(CloneError::TaskExist),
			CloneStatus::Error => {}
			_ => return Err(CloneError::CannotCleanCloneNotError),
		}

		clone_info.status = CloneStatus::Cleaning;
		self.meta_store.update_clone_info(&clone_info).await?;

		info!("Admitted clean of task {}", task_id);
		Ok(clone_info)
	}
}
