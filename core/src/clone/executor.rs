//! The clone task state machine
//!
//! A worker drives a task through the ordered step pipeline, persisting the
//! step cursor after every completed step so a restart resumes at (or before)
//! the crash point. Steps replay safely because every remote call is
//! idempotent.

use tracing::{debug, error, info, warn};

use crate::{
	client::FInfo,
	error::{ClientError, CloneError, CloneResult},
	snapshot::SnapshotStatus,
};

use super::{
	core::CloneCore,
	info::{CloneTaskInfo, TaskState},
	types::{next_step_after, CloneFileType, CloneStatus, CloneStep, CloneTaskType},
};

impl CloneCore {
	/// Drive a clone/recover task to `done` or `error`.
	///
	/// The task's durable record must already exist; `task.info.next_step` is
	/// the resume point. This method never returns an error to the caller:
	/// failures are recorded on the task itself.
	pub async fn handle_clone_or_recover_task(&self, task: &CloneTaskInfo) {
		let (task_id, file_type) = {
			let state = task.lock().await;
			(state.info.task_id, state.info.file_type)
		};

		let preamble = match file_type {
			CloneFileType::Snapshot => self.build_file_info_from_snapshot(task).await,
			CloneFileType::File => self.build_file_info_from_file(task).await,
		};
		if let Err(e) = preamble {
			warn!("Task {} failed resolving its source: {}", task_id, e);
			self.fail_task(task).await;
			return;
		}

		loop {
			let raw_step = task.lock().await.info.next_step;
			let step = match CloneStep::try_from(raw_step) {
				Ok(step) => step,
				Err(_) => {
					error!("Task {} carries unknown step cursor {}", task_id, raw_step);
					self.fail_task(task).await;
					return;
				}
			};
			if step == CloneStep::End {
				break;
			}
			debug!("Task {} executing step {}", task_id, step);

			let result = match step {
				CloneStep::CreateCloneFile => self.step_create_clone_file(task).await,
				CloneStep::CloneMeta => self.step_clone_meta(task).await,
				CloneStep::CreateCloneChunk => self.step_create_clone_chunk(task).await,
				CloneStep::CompleteCloneMeta => self.step_complete_clone_meta(task).await,
				CloneStep::RecoverChunk => self.step_recover_chunk(task).await,
				CloneStep::RenameCloneFile => self.step_rename_clone_file(task).await,
				CloneStep::CompleteCloneFile => self.step_complete_clone_file(task).await,
				CloneStep::End => unreachable!("handled above"),
			};
			if let Err(e) = result {
				warn!("Task {} failed at step {}: {}", task_id, step, e);
				self.fail_task(task).await;
				return;
			}

			// The cursor is the task's durable continuation: it must land in
			// the store before the next step may begin.
			let snapshot = {
				let mut state = task.lock().await;
				let next = next_step_after(state.info.is_lazy, step)
					.unwrap_or(CloneStep::End);
				state.info.set_next_step(next);
				state.info.clone()
			};
			if let Err(e) = self.meta_store.update_clone_info(&snapshot).await {
				error!("Task {} failed persisting cursor after {}: {}", task_id, step, e);
				self.fail_task(task).await;
				return;
			}
		}

		self.finish_task(task).await;
	}

	/// Resolve a snapshot source: snapshot record, chunk index, and (for
	/// recover) the pre-existing destination volume.
	async fn build_file_info_from_snapshot(&self, task: &CloneTaskInfo) -> CloneResult {
		let (src, dest, user, task_type) = {
			let state = task.lock().await;
			(
				state.info.src.clone(),
				state.info.dest.clone(),
				state.info.user.clone(),
				state.info.task_type,
			)
		};

		let snap = self
			.meta_store
			.get_snapshot_info(&src)
			.await
			.map_err(CloneError::internal)?;
		if snap.status != SnapshotStatus::Done {
			return Err(CloneError::InvalidSnapshot);
		}

		let dest_file_info = if task_type == CloneTaskType::Recover {
			Some(self.client.get_file_info(&dest, &user).await?)
		} else {
			None
		};

		let index = self
			.data_store
			.get_chunk_index_data(&snap.index_data_name())
			.await
			.map_err(CloneError::internal)?;

		let mut state = task.lock().await;
		state.src_file_info = Some(FInfo {
			id: 0,
			file_name: snap.file_name.clone(),
			owner: snap.user.clone(),
			chunk_size: snap.chunk_size,
			segment_size: snap.segment_size,
			length: snap.file_length,
			seq_num: snap.seq_num,
		});
		if let Some(dest_info) = dest_file_info {
			state.info.destination_id = Some(dest_info.id);
			state.dest_file_info = Some(dest_info);
		}
		state.chunk_index = Some(index);
		Ok(())
	}

	/// Resolve a volume source and validate its geometry.
	async fn build_file_info_from_file(&self, task: &CloneTaskInfo) -> CloneResult {
		let (src, user) = {
			let state = task.lock().await;
			(state.info.src.clone(), state.info.user.clone())
		};

		let file_info = self.client.get_file_info(&src, &user).await?;
		if file_info.chunk_size == 0 || file_info.segment_size == 0 {
			return Err(CloneError::internal(format!(
				"source {} has invalid geometry (chunk {}, segment {})",
				src, file_info.chunk_size, file_info.segment_size
			)));
		}
		if file_info.length == 0 || file_info.length % file_info.segment_size != 0 {
			return Err(CloneError::internal(format!(
				"source {} length {} is not a multiple of segment size {}",
				src, file_info.length, file_info.segment_size
			)));
		}
		if file_info.segment_size % file_info.chunk_size != 0 {
			return Err(CloneError::internal(format!(
				"source {} segment size {} is not a multiple of chunk size {}",
				src, file_info.segment_size, file_info.chunk_size
			)));
		}

		task.lock().await.src_file_info = Some(file_info);
		Ok(())
	}

	/// Geometry and identity of the in-flight working file, derived from the
	/// resolved source. Rebuilt on demand so a resumed task does not depend
	/// on in-memory leftovers.
	fn working_file_info(&self, state: &TaskState) -> CloneResult<FInfo> {
		let src = state
			.src_file_info
			.as_ref()
			.ok_or_else(|| CloneError::internal("source file info not resolved"))?;
		Ok(FInfo {
			id: state.info.origin_id.unwrap_or_default(),
			file_name: self.options.temp_path(&state.info.task_id),
			owner: state.info.user.clone(),
			chunk_size: src.chunk_size,
			segment_size: src.segment_size,
			length: src.length,
			seq_num: src.seq_num,
		})
	}

	async fn step_create_clone_file(&self, task: &CloneTaskInfo) -> CloneResult {
		let (file_name, user, length, seq_num, chunk_size) = {
			let state = task.lock().await;
			let working = self.working_file_info(&state)?;
			(
				working.file_name,
				working.owner,
				working.length,
				working.seq_num,
				working.chunk_size,
			)
		};

		let created = self
			.client
			.create_clone_file(&file_name, &user, length, seq_num, chunk_size)
			.await?;

		let mut state = task.lock().await;
		state.info.origin_id = Some(created.id);
		if state.info.destination_id.is_none() {
			state.info.destination_id = Some(created.id);
		}
		Ok(())
	}

	/// Allocate every segment of the destination.
	async fn step_clone_meta(&self, task: &CloneTaskInfo) -> CloneResult {
		self.ensure_segments(task, true).await
	}

	/// Establish copy-on-read chunks pointing back at the source.
	async fn step_create_clone_chunk(&self, task: &CloneTaskInfo) -> CloneResult {
		self.ensure_segments(task, false).await?;

		let (src, file_type, chunk_index, segments) = {
			let state = task.lock().await;
			let src = state
				.src_file_info
				.clone()
				.ok_or_else(|| CloneError::internal("source file info not resolved"))?;
			(src, state.info.file_type, state.chunk_index.clone(), state.segments.clone())
		};

		let chunks_per_segment = src.segment_size / src.chunk_size;
		let total_chunks = src.length / src.chunk_size;

		for index in 0..total_chunks {
			let location = match file_type {
				CloneFileType::Snapshot => {
					let chunk_index = chunk_index
						.as_ref()
						.ok_or_else(|| CloneError::internal("chunk index not resolved"))?;
					match chunk_index.get(index) {
						Some(name) => name.to_data_key(),
						// Never-written chunk: leave the hole, reads return zeros.
						None => continue,
					}
				}
				CloneFileType::File => {
					format!("{}:{}", src.file_name, index * src.chunk_size)
				}
			};
			let chunk_id = Self::chunk_id_at(&segments, index, chunks_per_segment)?;
			self.client
				.create_clone_chunk(&location, chunk_id, src.seq_num, 0, src.chunk_size)
				.await?;
		}
		Ok(())
	}

	async fn step_complete_clone_meta(&self, task: &CloneTaskInfo) -> CloneResult {
		let (file_name, user) = {
			let state = task.lock().await;
			let working = self.working_file_info(&state)?;
			(working.file_name, working.owner)
		};
		Ok(self.client.complete_clone_meta(&file_name, &user).await?)
	}

	/// Force copy-through of every chunk, in slices bounded by the configured
	/// split size.
	async fn step_recover_chunk(&self, task: &CloneTaskInfo) -> CloneResult {
		self.ensure_segments(task, false).await?;

		let (src, segments) = {
			let state = task.lock().await;
			let src = state
				.src_file_info
				.clone()
				.ok_or_else(|| CloneError::internal("source file info not resolved"))?;
			(src, state.segments.clone())
		};

		let chunks_per_segment = src.segment_size / src.chunk_size;
		let total_chunks = src.length / src.chunk_size;
		let split = self.options.clone_chunk_split_size;

		for index in 0..total_chunks {
			let chunk_id = Self::chunk_id_at(&segments, index, chunks_per_segment)?;
			let mut offset = 0;
			while offset < src.chunk_size {
				let len = split.min(src.chunk_size - offset);
				self.client.recover_chunk(chunk_id, offset, len).await?;
				offset += len;
			}
		}
		Ok(())
	}

	async fn step_rename_clone_file(&self, task: &CloneTaskInfo) -> CloneResult {
		let (user, origin_id, destination_id, origin, destination) = {
			let state = task.lock().await;
			(
				state.info.user.clone(),
				state
					.info
					.origin_id
					.ok_or_else(|| CloneError::internal("working file id missing"))?,
				state
					.info
					.destination_id
					.ok_or_else(|| CloneError::internal("destination id missing"))?,
				self.options.temp_path(&state.info.task_id),
				state.info.dest.clone(),
			)
		};
		Ok(self
			.client
			.rename_clone_file(&user, origin_id, destination_id, &origin, &destination)
			.await?)
	}

	async fn step_complete_clone_file(&self, task: &CloneTaskInfo) -> CloneResult {
		let (file_name, user) = {
			let state = task.lock().await;
			// Lazy tasks renamed before recovering, so the file already sits
			// at its final name.
			let name = if state.info.is_lazy {
				state.info.dest.clone()
			} else {
				self.options.temp_path(&state.info.task_id)
			};
			(name, state.info.user.clone())
		};
		Ok(self.client.complete_clone_file(&file_name, &user).await?)
	}

	/// Fetch (or, during CloneMeta, allocate) the destination's segment
	/// layout if this worker does not hold it yet.
	async fn ensure_segments(&self, task: &CloneTaskInfo, allocate: bool) -> CloneResult {
		let (working, user, populated) = {
			let state = task.lock().await;
			let working = self.working_file_info(&state)?;
			(working, state.info.user.clone(), !state.segments.is_empty())
		};
		if populated {
			return Ok(());
		}

		let mut segments = Vec::new();
		let mut offset = 0;
		while offset < working.length {
			let segment = self
				.client
				.get_or_allocate_segment_info(allocate, offset, &working, &user)
				.await?;
			segments.push(segment);
			offset += working.segment_size;
		}
		task.lock().await.segments = segments;
		Ok(())
	}

	fn chunk_id_at(
		segments: &[crate::client::SegmentInfo],
		index: u64,
		chunks_per_segment: u64,
	) -> CloneResult<crate::client::ChunkIdInfo> {
		segments
			.get((index / chunks_per_segment) as usize)
			.and_then(|segment| segment.chunks.get((index % chunks_per_segment) as usize))
			.copied()
			.ok_or_else(|| {
				CloneError::internal(format!("no allocated chunk at logical index {index}"))
			})
	}

	/// Record a task failure: error status persisted best effort, snapshot
	/// pin released.
	async fn fail_task(&self, task: &CloneTaskInfo) {
		let snapshot = {
			let mut state = task.lock().await;
			state.info.status = CloneStatus::Error;
			state.info.clone()
		};
		if let Err(e) = self.meta_store.update_clone_info(&snapshot).await {
			error!("Task {} could not persist error status: {}", snapshot.task_id, e);
		}
		self.release_snapshot_ref(&snapshot);
	}

	async fn finish_task(&self, task: &CloneTaskInfo) {
		let snapshot = {
			let mut state = task.lock().await;
			state.info.status = CloneStatus::Done;
			state.info.set_next_step(CloneStep::End);
			state.info.clone()
		};
		if let Err(e) = self.meta_store.update_clone_info(&snapshot).await {
			error!("Task {} could not persist done status: {}", snapshot.task_id, e);
		}
		self.release_snapshot_ref(&snapshot);
		info!(
			"Task {} finished: {} -> {}",
			snapshot.task_id, snapshot.src, snapshot.dest
		);
	}

	/// Delete the destination volume(s) of a failed task and drop its record.
	///
	/// The final path is always attempted. Non-lazy tasks never renamed on
	/// failure paths that died early, so their working file is attempted too;
	/// NOTEXIST is success for each path individually.
	pub async fn handle_clean_clone_or_recover_task(&self, task: &CloneTaskInfo) {
		let clone_info = task.clone_info().await;
		let temp_path = self.options.temp_path(&clone_info.task_id);

		let mut paths = vec![clone_info.dest.clone()];
		if !clone_info.is_lazy {
			paths.push(temp_path);
		}

		for path in &paths {
			match self.client.delete_file(path, &clone_info.user, true).await {
				Ok(()) | Err(ClientError::NotExist) => {}
				Err(e) => {
					warn!("Clean of task {} failed deleting {}: {}", clone_info.task_id, path, e);
					self.fail_task(task).await;
					return;
				}
			}
		}

		if let Err(e) = self.meta_store.delete_clone_info(&clone_info.task_id).await {
			error!("Clean of task {} could not drop its record: {}", clone_info.task_id, e);
			return;
		}
		self.release_snapshot_ref(&clone_info);
		info!("Task {} cleaned", clone_info.task_id);
	}
}
