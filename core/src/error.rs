//! Error types for the clone/recovery core

use thiserror::Error;

/// Result type for clone core operations
pub type CloneResult<T = ()> = Result<T, CloneError>;

/// Errors surfaced to callers of the clone core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloneError {
	/// Caller does not own the source, or the cluster rejected the credentials
	#[error("user does not match the owner of the source")]
	InvalidUser,

	/// Snapshot exists but has not finished being taken
	#[error("snapshot is not in done state")]
	InvalidSnapshot,

	/// Neither a snapshot nor a volume exists for the source, or the task id is unknown
	#[error("source file or snapshot does not exist")]
	FileNotExist,

	/// A prior task for the same destination or source ended in error and must be cleaned first
	#[error("a failed task references this source or destination and must be cleaned first")]
	SnapshotCannotCreateWhenError,

	/// A task for this destination is already running, or the clean was already requested
	#[error("task already exists")]
	TaskExist,

	/// Clean requested for a task that is not in error state
	#[error("only tasks in error state can be cleaned")]
	CannotCleanCloneNotError,

	/// Unclassified persistence or transport failure
	#[error("internal error: {0}")]
	InternalError(String),
}

impl CloneError {
	pub fn internal<T: std::fmt::Display>(msg: T) -> Self {
		Self::InternalError(msg.to_string())
	}
}

/// Result type for metadata and data store calls
pub type StoreResult<T = ()> = Result<T, StoreError>;

/// Failures reported by the metadata store or the snapshot data store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("record not found")]
	NotFound,

	#[error("store failure: {0}")]
	Internal(String),
}

impl StoreError {
	pub fn internal<T: std::fmt::Display>(msg: T) -> Self {
		Self::Internal(msg.to_string())
	}
}

impl From<StoreError> for CloneError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::NotFound => CloneError::FileNotExist,
			StoreError::Internal(msg) => CloneError::InternalError(msg),
		}
	}
}

/// Result type for block-storage client calls
pub type ClientResult<T = ()> = Result<T, ClientError>;

/// Transport results from the block-storage cluster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
	#[error("target does not exist")]
	NotExist,

	#[error("authentication failed")]
	AuthFail,

	#[error("request failed: {0}")]
	Failed(String),
}

impl ClientError {
	pub fn failed<T: std::fmt::Display>(msg: T) -> Self {
		Self::Failed(msg.to_string())
	}
}

impl From<ClientError> for CloneError {
	fn from(err: ClientError) -> Self {
		match err {
			ClientError::NotExist => CloneError::FileNotExist,
			ClientError::AuthFail => CloneError::InvalidUser,
			ClientError::Failed(msg) => CloneError::InternalError(msg),
		}
	}
}
