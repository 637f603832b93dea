//! Shared mocks and fixtures for the clone core tests
//!
//! The mocks script one result per method (a queue for DeleteFile, which the
//! clean path calls twice) and record every call so tests can assert on the
//! observed step order.

#![allow(dead_code)]

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use sc_core::{
	client::{BlockClient, ChunkIdInfo, FInfo, SegmentInfo},
	clone::{
		CloneCore, CloneFileType, CloneInfo, CloneStatus, CloneTaskInfo, CloneTaskType,
		SnapshotReference, TaskId,
	},
	config::CloneOptions,
	error::{ClientError, ClientResult, StoreError, StoreResult},
	snapshot::{ChunkDataName, ChunkIndexData, IndexDataName, SnapshotInfo, SnapshotStatus},
	store::{DataStore, MetaStore},
};

pub const CHUNK_SIZE: u64 = 1024 * 1024;
pub const SEGMENT_SIZE: u64 = 2 * CHUNK_SIZE;
pub const FILE_LENGTH: u64 = 2 * SEGMENT_SIZE;
pub const SEQ_NUM: u64 = 100;

pub const USER: &str = "user1";
pub const SOURCE: &str = "id1";
pub const DESTINATION: &str = "destination1";

/// One recorded call against the mock block client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
	GetFileInfo { file_name: String, user: String },
	CreateCloneFile { file_name: String },
	GetOrAllocateSegmentInfo { allocate: bool, offset: u64 },
	CreateCloneChunk { location: String },
	CompleteCloneMeta { file_name: String },
	RecoverChunk { offset: u64, len: u64 },
	RenameCloneFile { origin: String, destination: String },
	CompleteCloneFile { file_name: String },
	DeleteFile { file_name: String },
}

impl ClientCall {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::GetFileInfo { .. } => "GetFileInfo",
			Self::CreateCloneFile { .. } => "CreateCloneFile",
			Self::GetOrAllocateSegmentInfo { .. } => "GetOrAllocateSegmentInfo",
			Self::CreateCloneChunk { .. } => "CreateCloneChunk",
			Self::CompleteCloneMeta { .. } => "CompleteCloneMeta",
			Self::RecoverChunk { .. } => "RecoverChunk",
			Self::RenameCloneFile { .. } => "RenameCloneFile",
			Self::CompleteCloneFile { .. } => "CompleteCloneFile",
			Self::DeleteFile { .. } => "DeleteFile",
		}
	}
}

pub struct MockBlockClient {
	pub file_info_result: Mutex<ClientResult<FInfo>>,
	pub create_clone_file_result: Mutex<ClientResult<FInfo>>,
	pub segment_result: Mutex<ClientResult<SegmentInfo>>,
	pub create_clone_chunk_result: Mutex<ClientResult<()>>,
	pub complete_clone_meta_result: Mutex<ClientResult<()>>,
	pub recover_chunk_result: Mutex<ClientResult<()>>,
	pub rename_result: Mutex<ClientResult<()>>,
	pub complete_clone_file_result: Mutex<ClientResult<()>>,
	/// Popped per call; an empty queue answers OK.
	pub delete_results: Mutex<VecDeque<ClientResult<()>>>,
	pub calls: Mutex<Vec<ClientCall>>,
}

impl MockBlockClient {
	/// Every call succeeds with the canonical fixture geometry.
	pub fn happy() -> Self {
		Self {
			file_info_result: Mutex::new(Ok(source_file_info())),
			create_clone_file_result: Mutex::new(Ok(FInfo { id: 100, ..Default::default() })),
			segment_result: Mutex::new(Ok(segment_info())),
			create_clone_chunk_result: Mutex::new(Ok(())),
			complete_clone_meta_result: Mutex::new(Ok(())),
			recover_chunk_result: Mutex::new(Ok(())),
			rename_result: Mutex::new(Ok(())),
			complete_clone_file_result: Mutex::new(Ok(())),
			delete_results: Mutex::new(VecDeque::new()),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn calls(&self) -> Vec<ClientCall> {
		self.calls.lock().clone()
	}

	/// Observed call kinds with consecutive repeats collapsed, i.e. the step
	/// order the state machine walked.
	pub fn call_kinds(&self) -> Vec<&'static str> {
		let mut kinds: Vec<&'static str> = Vec::new();
		for call in self.calls.lock().iter() {
			if kinds.last() != Some(&call.kind()) {
				kinds.push(call.kind());
			}
		}
		kinds
	}

	pub fn count_of(&self, kind: &str) -> usize {
		self.calls.lock().iter().filter(|c| c.kind() == kind).count()
	}

	fn record(&self, call: ClientCall) {
		self.calls.lock().push(call);
	}
}

#[async_trait]
impl BlockClient for MockBlockClient {
	async fn get_file_info(&self, file_name: &str, user: &str) -> ClientResult<FInfo> {
		self.record(ClientCall::GetFileInfo {
			file_name: file_name.to_string(),
			user: user.to_string(),
		});
		self.file_info_result.lock().clone()
	}

	async fn create_clone_file(
		&self,
		file_name: &str,
		_user: &str,
		_length: u64,
		_seq_num: u64,
		_chunk_size: u64,
	) -> ClientResult<FInfo> {
		self.record(ClientCall::CreateCloneFile { file_name: file_name.to_string() });
		self.create_clone_file_result.lock().clone()
	}

	async fn get_or_allocate_segment_info(
		&self,
		allocate: bool,
		offset: u64,
		_file_info: &FInfo,
		_user: &str,
	) -> ClientResult<SegmentInfo> {
		self.record(ClientCall::GetOrAllocateSegmentInfo { allocate, offset });
		self.segment_result.lock().clone()
	}

	async fn create_clone_chunk(
		&self,
		location: &str,
		_chunk_id_info: ChunkIdInfo,
		_seq_num: u64,
		_correct_seq_num: u64,
		_chunk_size: u64,
	) -> ClientResult<()> {
		self.record(ClientCall::CreateCloneChunk { location: location.to_string() });
		self.create_clone_chunk_result.lock().clone()
	}

	async fn complete_clone_meta(&self, file_name: &str, _user: &str) -> ClientResult<()> {
		self.record(ClientCall::CompleteCloneMeta { file_name: file_name.to_string() });
		self.complete_clone_meta_result.lock().clone()
	}

	async fn recover_chunk(
		&self,
		_chunk_id_info: ChunkIdInfo,
		offset: u64,
		len: u64,
	) -> ClientResult<()> {
		self.record(ClientCall::RecoverChunk { offset, len });
		self.recover_chunk_result.lock().clone()
	}

	async fn rename_clone_file(
		&self,
		_user: &str,
		_origin_id: u64,
		_destination_id: u64,
		origin: &str,
		destination: &str,
	) -> ClientResult<()> {
		self.record(ClientCall::RenameCloneFile {
			origin: origin.to_string(),
			destination: destination.to_string(),
		});
		self.rename_result.lock().clone()
	}

	async fn complete_clone_file(&self, file_name: &str, _user: &str) -> ClientResult<()> {
		self.record(ClientCall::CompleteCloneFile { file_name: file_name.to_string() });
		self.complete_clone_file_result.lock().clone()
	}

	async fn delete_file(&self, file_name: &str, _user: &str, _force: bool) -> ClientResult<()> {
		self.record(ClientCall::DeleteFile { file_name: file_name.to_string() });
		self.delete_results.lock().pop_front().unwrap_or(Ok(()))
	}
}

pub struct MockMetaStore {
	pub list: Mutex<Vec<CloneInfo>>,
	pub list_fails: Mutex<bool>,
	pub snapshot_result: Mutex<StoreResult<SnapshotInfo>>,
	pub clone_info_result: Mutex<StoreResult<CloneInfo>>,
	pub add_result: Mutex<StoreResult<()>>,
	/// Popped per call; an empty queue answers OK.
	pub update_results: Mutex<VecDeque<StoreResult<()>>>,
	pub delete_result: Mutex<StoreResult<()>>,
	pub added: Mutex<Vec<CloneInfo>>,
	pub updates: Mutex<Vec<CloneInfo>>,
	pub deleted: Mutex<Vec<TaskId>>,
}

impl MockMetaStore {
	/// No snapshots, no prior tasks; writes succeed.
	pub fn empty() -> Self {
		Self {
			list: Mutex::new(Vec::new()),
			list_fails: Mutex::new(false),
			snapshot_result: Mutex::new(Err(StoreError::internal("no snapshot record"))),
			clone_info_result: Mutex::new(Err(StoreError::NotFound)),
			add_result: Mutex::new(Ok(())),
			update_results: Mutex::new(VecDeque::new()),
			delete_result: Mutex::new(Ok(())),
			added: Mutex::new(Vec::new()),
			updates: Mutex::new(Vec::new()),
			deleted: Mutex::new(Vec::new()),
		}
	}

	/// A snapshot owned by `user` is known to the store.
	pub fn with_snapshot(user: &str, status: SnapshotStatus) -> Self {
		let store = Self::empty();
		*store.snapshot_result.lock() = Ok(snapshot_info(user, status));
		store
	}

	/// Statuses written through update_clone_info, in order.
	pub fn updated_statuses(&self) -> Vec<CloneStatus> {
		self.updates.lock().iter().map(|info| info.status).collect()
	}

	/// Step cursors written through update_clone_info, in order.
	pub fn updated_cursors(&self) -> Vec<u8> {
		self.updates.lock().iter().map(|info| info.next_step).collect()
	}
}

#[async_trait]
impl MetaStore for MockMetaStore {
	async fn add_clone_info(&self, info: &CloneInfo) -> StoreResult {
		self.added.lock().push(info.clone());
		self.add_result.lock().clone()
	}

	async fn update_clone_info(&self, info: &CloneInfo) -> StoreResult {
		self.updates.lock().push(info.clone());
		self.update_results.lock().pop_front().unwrap_or(Ok(()))
	}

	async fn delete_clone_info(&self, task_id: &TaskId) -> StoreResult {
		self.deleted.lock().push(*task_id);
		self.delete_result.lock().clone()
	}

	async fn get_clone_info(&self, _task_id: &TaskId) -> StoreResult<CloneInfo> {
		self.clone_info_result.lock().clone()
	}

	async fn get_clone_info_list(&self) -> StoreResult<Vec<CloneInfo>> {
		if *self.list_fails.lock() {
			return Err(StoreError::internal("list unavailable"));
		}
		Ok(self.list.lock().clone())
	}

	async fn get_snapshot_info(&self, _uuid: &str) -> StoreResult<SnapshotInfo> {
		self.snapshot_result.lock().clone()
	}
}

pub struct MockDataStore {
	pub index_result: Mutex<StoreResult<ChunkIndexData>>,
	pub requests: Mutex<Vec<IndexDataName>>,
}

impl MockDataStore {
	pub fn with_index() -> Self {
		Self {
			index_result: Mutex::new(Ok(chunk_index())),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn failing() -> Self {
		Self {
			index_result: Mutex::new(Err(StoreError::internal("index unavailable"))),
			requests: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl DataStore for MockDataStore {
	async fn get_chunk_index_data(&self, name: &IndexDataName) -> StoreResult<ChunkIndexData> {
		self.requests.lock().push(name.clone());
		self.index_result.lock().clone()
	}
}

pub fn snapshot_info(user: &str, status: SnapshotStatus) -> SnapshotInfo {
	SnapshotInfo {
		uuid: "uuid1".to_string(),
		user: user.to_string(),
		file_name: "file1".to_string(),
		description: "snap1".to_string(),
		seq_num: SEQ_NUM,
		chunk_size: CHUNK_SIZE,
		segment_size: SEGMENT_SIZE,
		file_length: FILE_LENGTH,
		create_time: Utc::now(),
		status,
	}
}

pub fn source_file_info() -> FInfo {
	FInfo {
		id: 100,
		file_name: "file1".to_string(),
		owner: USER.to_string(),
		chunk_size: CHUNK_SIZE,
		segment_size: SEGMENT_SIZE,
		length: FILE_LENGTH,
		seq_num: SEQ_NUM,
	}
}

pub fn segment_info() -> SegmentInfo {
	SegmentInfo {
		chunks: vec![
			ChunkIdInfo { chunk_id: 1, logical_pool_id: 1, copyset_id: 1 },
			ChunkIdInfo { chunk_id: 2, logical_pool_id: 1, copyset_id: 1 },
		],
	}
}

/// Index covering all four chunks of the fixture geometry.
pub fn chunk_index() -> ChunkIndexData {
	let mut index = ChunkIndexData::new();
	for chunk in 0..(FILE_LENGTH / CHUNK_SIZE) {
		index.put_chunk_data_name(ChunkDataName::new("file1", 1, chunk));
	}
	index
}

pub fn options() -> CloneOptions {
	CloneOptions {
		clone_temp_dir: "/clone".to_string(),
		clone_chunk_split_size: CHUNK_SIZE,
		worker_concurrency: 4,
	}
}

pub struct Fixture {
	pub core: Arc<CloneCore>,
	pub client: Arc<MockBlockClient>,
	pub meta_store: Arc<MockMetaStore>,
	pub data_store: Arc<MockDataStore>,
	pub snapshot_ref: Arc<SnapshotReference>,
}

impl Fixture {
	pub fn new(
		client: MockBlockClient,
		meta_store: MockMetaStore,
		data_store: MockDataStore,
	) -> Self {
		Self::with_options(client, meta_store, data_store, options())
	}

	pub fn with_options(
		client: MockBlockClient,
		meta_store: MockMetaStore,
		data_store: MockDataStore,
		options: CloneOptions,
	) -> Self {
		let client = Arc::new(client);
		let meta_store = Arc::new(meta_store);
		let data_store = Arc::new(data_store);
		let snapshot_ref = Arc::new(SnapshotReference::new());
		let core = Arc::new(CloneCore::new(
			client.clone(),
			meta_store.clone(),
			data_store.clone(),
			snapshot_ref.clone(),
			options,
		));
		Self { core, client, meta_store, data_store, snapshot_ref }
	}

	/// Happy-path collaborators for a snapshot-sourced task.
	pub fn snapshot_sourced() -> Self {
		let meta_store = MockMetaStore::with_snapshot(USER, SnapshotStatus::Done);
		Self::new(MockBlockClient::happy(), meta_store, MockDataStore::with_index())
	}

	/// Happy-path collaborators for a volume-sourced task.
	pub fn file_sourced() -> Self {
		Self::new(MockBlockClient::happy(), MockMetaStore::empty(), MockDataStore::with_index())
	}
}

/// A dispatched-task envelope the way admission would have produced it.
pub fn task(file_type: CloneFileType, task_type: CloneTaskType, is_lazy: bool) -> CloneTaskInfo {
	CloneTaskInfo::new(clone_info(file_type, task_type, is_lazy))
}

pub fn clone_info(
	file_type: CloneFileType,
	task_type: CloneTaskType,
	is_lazy: bool,
) -> CloneInfo {
	CloneInfo::new(TaskId::new(), USER, task_type, SOURCE, DESTINATION, file_type, is_lazy)
}

pub fn error_failed() -> ClientError {
	ClientError::failed("injected failure")
}
