//! Process-wide snapshot reference counts
//!
//! The snapshot subsystem consults these counts before destroying a snapshot;
//! deletion is refused while any clone task still reads from it.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Concurrency-safe refcounts of snapshots pinned by active clone tasks.
#[derive(Debug, Default)]
pub struct SnapshotReference {
	refs: Mutex<HashMap<String, u64>>,
}

impl SnapshotReference {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pin a snapshot for the lifetime of a task.
	pub fn increment(&self, uuid: &str) {
		let mut refs = self.refs.lock();
		*refs.entry(uuid.to_string()).or_insert(0) += 1;
	}

	/// Release a pin. Saturates at zero, so releasing an already-terminated
	/// task (the clean path does this) is harmless.
	pub fn decrement(&self, uuid: &str) {
		let mut refs = self.refs.lock();
		if let Some(count) = refs.get_mut(uuid) {
			*count -= 1;
			if *count == 0 {
				refs.remove(uuid);
			}
		}
	}

	/// Number of live tasks currently reading from the snapshot.
	pub fn get_ref(&self, uuid: &str) -> u64 {
		self.refs.lock().get(uuid).copied().unwrap_or(0)
	}
}
