//! Clone/recovery core: admission, durable task records, and the step-cursor
//! state machine that materializes clones from snapshots or volumes.

pub mod admission;
pub mod core;
pub mod executor;
pub mod info;
pub mod manager;
pub mod reference;
pub mod types;

pub use self::core::CloneCore;
pub use info::{CloneInfo, CloneTaskInfo, TaskState};
pub use manager::CloneTaskManager;
pub use reference::SnapshotReference;
pub use types::{
	next_step_after, step_sequence, CloneFileType, CloneStatus, CloneStep, CloneTaskType,
	TaskId, LAZY_STEP_SEQUENCE, STEP_SEQUENCE,
};
