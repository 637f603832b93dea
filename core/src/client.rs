//! Block-storage client contract consumed by the clone core
//!
//! The real client talks to the storage cluster over RPC; tests substitute a
//! mock. Every call blocks until the cluster answers and is idempotent, so a
//! restarted task can safely replay the step it crashed in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Volume file info as reported by the block-storage cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FInfo {
	pub id: u64,
	pub file_name: String,
	pub owner: String,
	pub chunk_size: u64,
	pub segment_size: u64,
	pub length: u64,
	pub seq_num: u64,
}

/// Physical identity of one destination chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkIdInfo {
	pub chunk_id: u64,
	pub logical_pool_id: u32,
	pub copyset_id: u32,
}

/// Chunk locations of one allocated segment, in logical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentInfo {
	pub chunks: Vec<ChunkIdInfo>,
}

/// Operations the clone core issues against the block-storage cluster.
#[async_trait]
pub trait BlockClient: Send + Sync {
	/// Look up volume metadata, authenticating as `user`.
	async fn get_file_info(&self, file_name: &str, user: &str) -> ClientResult<FInfo>;

	/// Create an empty clone destination with the given geometry.
	async fn create_clone_file(
		&self,
		file_name: &str,
		user: &str,
		length: u64,
		seq_num: u64,
		chunk_size: u64,
	) -> ClientResult<FInfo>;

	/// Fetch segment allocation info, allocating the segment when `allocate`
	/// is set and it does not exist yet.
	async fn get_or_allocate_segment_info(
		&self,
		allocate: bool,
		offset: u64,
		file_info: &FInfo,
		user: &str,
	) -> ClientResult<SegmentInfo>;

	/// Establish a copy-on-read chunk pointing back at `location`.
	async fn create_clone_chunk(
		&self,
		location: &str,
		chunk_id_info: ChunkIdInfo,
		seq_num: u64,
		correct_seq_num: u64,
		chunk_size: u64,
	) -> ClientResult<()>;

	/// Mark the destination's metadata as fully cloned.
	async fn complete_clone_meta(&self, file_name: &str, user: &str) -> ClientResult<()>;

	/// Force copy-through of `len` bytes at `offset` within the chunk.
	async fn recover_chunk(&self, chunk_id_info: ChunkIdInfo, offset: u64, len: u64)
		-> ClientResult<()>;

	/// Rename the working file onto its user-visible destination.
	async fn rename_clone_file(
		&self,
		user: &str,
		origin_id: u64,
		destination_id: u64,
		origin: &str,
		destination: &str,
	) -> ClientResult<()>;

	/// Final commit of the cloned file.
	async fn complete_clone_file(&self, file_name: &str, user: &str) -> ClientResult<()>;

	/// Delete a file, optionally bypassing the recycle bin.
	async fn delete_file(&self, file_name: &str, user: &str, force: bool) -> ClientResult<()>;
}
