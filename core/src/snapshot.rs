//! Snapshot records and chunk index data
//!
//! The snapshot subsystem owns these records; the clone core only reads them
//! to resolve a clone source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle states of a snapshot.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SnapshotStatus {
	Pending,
	Done,
	Deleting,
	Error,
}

/// Durable snapshot record, keyed by its UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
	pub uuid: String,
	pub user: String,
	pub file_name: String,
	pub description: String,
	pub seq_num: u64,
	pub chunk_size: u64,
	pub segment_size: u64,
	pub file_length: u64,
	pub create_time: DateTime<Utc>,
	pub status: SnapshotStatus,
}

impl SnapshotInfo {
	/// Name of this snapshot's chunk index object in the data store.
	pub fn index_data_name(&self) -> IndexDataName {
		IndexDataName {
			file_name: self.file_name.clone(),
			seq_num: self.seq_num,
		}
	}
}

/// Name of a snapshot's chunk index object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDataName {
	pub file_name: String,
	pub seq_num: u64,
}

impl IndexDataName {
	pub fn new(file_name: impl Into<String>, seq_num: u64) -> Self {
		Self { file_name: file_name.into(), seq_num }
	}

	/// Canonical key of the index object in the data store.
	pub fn to_key(&self) -> String {
		format!("{}-{}", self.file_name, self.seq_num)
	}
}

/// Content-addressed identity of one snapshot chunk blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDataName {
	pub file_name: String,
	pub seq_num: u64,
	pub chunk_index: u64,
}

impl ChunkDataName {
	pub fn new(file_name: impl Into<String>, seq_num: u64, chunk_index: u64) -> Self {
		Self { file_name: file_name.into(), seq_num, chunk_index }
	}

	/// Canonical key of the chunk blob in the data store.
	pub fn to_data_key(&self) -> String {
		format!("{}-{}-{}", self.file_name, self.seq_num, self.chunk_index)
	}
}

/// A snapshot's mapping from chunk logical index to chunk blob identity.
///
/// Chunks that were never written do not appear in the index; cloning treats
/// them as holes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkIndexData {
	chunks: BTreeMap<u64, ChunkDataName>,
}

impl ChunkIndexData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put_chunk_data_name(&mut self, name: ChunkDataName) {
		self.chunks.insert(name.chunk_index, name);
	}

	pub fn get(&self, chunk_index: u64) -> Option<&ChunkDataName> {
		self.chunks.get(&chunk_index)
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}
}
