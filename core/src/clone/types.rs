//! Core types for clone and recover tasks

use std::fmt;

use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a clone/recover task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for TaskId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for TaskId {
	fn from(uuid: Uuid) -> Self {
		Self(uuid)
	}
}

/// What kind of work the task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneTaskType {
	/// Materialize a new volume from the source
	Clone,
	/// Repair an existing volume in place from a snapshot
	Recover,
}

/// How the task's source is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneFileType {
	/// Source is a snapshot UUID
	Snapshot,
	/// Source is a volume name
	File,
}

/// Current status of a clone/recover task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneStatus {
	Cloning,
	Recovering,
	Done,
	Error,
	Cleaning,
}

impl CloneStatus {
	/// Task reached a resting state; the record persists until cleaned.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Done | Self::Error)
	}

	/// A worker currently owns this task.
	pub fn is_live(&self) -> bool {
		matches!(self, Self::Cloning | Self::Recovering | Self::Cleaning)
	}

	/// Status transitions are monotonic; `cleaning` is only reachable from
	/// `error`, and a failed clean drops back to `error`.
	pub fn can_transition_to(&self, next: CloneStatus) -> bool {
		use CloneStatus::*;
		matches!(
			(self, next),
			(Cloning, Done) | (Cloning, Error)
				| (Recovering, Done) | (Recovering, Error)
				| (Error, Cleaning)
				| (Cleaning, Error)
		)
	}
}

/// The persisted step cursor: the task's durable continuation.
///
/// The wire form is the raw integer; a record written by a newer release may
/// carry a value outside this set, which the state machine treats as fatal.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum CloneStep {
	CreateCloneFile = 0,
	CloneMeta = 1,
	CreateCloneChunk = 2,
	CompleteCloneMeta = 3,
	RecoverChunk = 4,
	RenameCloneFile = 5,
	CompleteCloneFile = 6,
	End = 7,
}

impl fmt::Display for CloneStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self)
	}
}

/// Step order for lazy tasks: the destination is renamed into place before
/// chunk data is materialized, so reads copy-on-read behind the user's back.
pub const LAZY_STEP_SEQUENCE: [CloneStep; 8] = [
	CloneStep::CreateCloneFile,
	CloneStep::CloneMeta,
	CloneStep::CreateCloneChunk,
	CloneStep::CompleteCloneMeta,
	CloneStep::RenameCloneFile,
	CloneStep::RecoverChunk,
	CloneStep::CompleteCloneFile,
	CloneStep::End,
];

/// Step order for non-lazy tasks: every chunk is materialized before the
/// destination becomes visible under its final name.
pub const STEP_SEQUENCE: [CloneStep; 8] = [
	CloneStep::CreateCloneFile,
	CloneStep::CloneMeta,
	CloneStep::CreateCloneChunk,
	CloneStep::CompleteCloneMeta,
	CloneStep::RecoverChunk,
	CloneStep::CompleteCloneFile,
	CloneStep::RenameCloneFile,
	CloneStep::End,
];

/// The ordered pipeline for a task with the given laziness.
pub fn step_sequence(is_lazy: bool) -> &'static [CloneStep; 8] {
	if is_lazy {
		&LAZY_STEP_SEQUENCE
	} else {
		&STEP_SEQUENCE
	}
}

/// Successor of `step` in the pipeline, or `None` past the end.
pub fn next_step_after(is_lazy: bool, step: CloneStep) -> Option<CloneStep> {
	let sequence = step_sequence(is_lazy);
	let position = sequence.iter().position(|s| *s == step)?;
	sequence.get(position + 1).copied()
}
