//! Durable clone records and the in-memory task envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::types::{CloneFileType, CloneStatus, CloneStep, CloneTaskType, TaskId};
use crate::{
	client::{FInfo, SegmentInfo},
	snapshot::ChunkIndexData,
};

/// Durable record of one clone/recover task, keyed by task id.
///
/// The metadata store is the source of truth for these; the in-memory copy
/// inside [`CloneTaskInfo`] is written back after every completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneInfo {
	pub task_id: TaskId,
	pub user: String,
	pub task_type: CloneTaskType,

	/// Snapshot UUID or volume name, depending on `file_type`
	pub src: String,
	/// User-visible destination volume name
	pub dest: String,
	pub file_type: CloneFileType,

	/// Id of the working file created by CreateCloneFile
	pub origin_id: Option<u64>,
	/// Id the destination answers to after the rename; for recover tasks the
	/// id of the pre-existing volume
	pub destination_id: Option<u64>,

	pub is_lazy: bool,

	/// Raw wire form of the step cursor; decode with [`CloneStep::try_from`].
	/// Values outside the known set are fatal at dispatch, not at load.
	pub next_step: u8,

	pub status: CloneStatus,
	pub create_time: DateTime<Utc>,
}

impl CloneInfo {
	pub fn new(
		task_id: TaskId,
		user: impl Into<String>,
		task_type: CloneTaskType,
		src: impl Into<String>,
		dest: impl Into<String>,
		file_type: CloneFileType,
		is_lazy: bool,
	) -> Self {
		let status = match task_type {
			CloneTaskType::Clone => CloneStatus::Cloning,
			CloneTaskType::Recover => CloneStatus::Recovering,
		};
		Self {
			task_id,
			user: user.into(),
			task_type,
			src: src.into(),
			dest: dest.into(),
			file_type,
			origin_id: None,
			destination_id: None,
			is_lazy,
			next_step: CloneStep::CreateCloneFile.into(),
			status,
			create_time: Utc::now(),
		}
	}

	pub fn set_next_step(&mut self, step: CloneStep) {
		self.next_step = step.into();
	}
}

/// Mutable execution state of a task being worked.
///
/// `info` mirrors the durable record; the remaining fields are derived during
/// the preamble and the early steps and never persisted.
#[derive(Debug)]
pub struct TaskState {
	pub info: CloneInfo,

	/// Geometry and identity of the clone source
	pub src_file_info: Option<FInfo>,
	/// The pre-existing destination volume, resolved for recover tasks
	pub dest_file_info: Option<FInfo>,
	/// Snapshot chunk index, present for snapshot-sourced tasks
	pub chunk_index: Option<ChunkIndexData>,
	/// Destination chunk locations per segment, in offset order
	pub segments: Vec<SegmentInfo>,
}

/// In-memory envelope around one dispatched task.
///
/// The owning worker mutates the state; status queries take the same lock for
/// a snapshot copy. The lock is never held across a remote call.
#[derive(Debug)]
pub struct CloneTaskInfo {
	state: Mutex<TaskState>,
}

impl CloneTaskInfo {
	pub fn new(info: CloneInfo) -> Self {
		Self {
			state: Mutex::new(TaskState {
				info,
				src_file_info: None,
				dest_file_info: None,
				chunk_index: None,
				segments: Vec::new(),
			}),
		}
	}

	pub async fn lock(&self) -> MutexGuard<'_, TaskState> {
		self.state.lock().await
	}

	/// Snapshot copy of the durable record, for status queries.
	pub async fn clone_info(&self) -> CloneInfo {
		self.state.lock().await.info.clone()
	}

	pub async fn status(&self) -> CloneStatus {
		self.state.lock().await.info.status
	}
}
