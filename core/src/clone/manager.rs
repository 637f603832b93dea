//! Worker dispatch for admitted clone tasks

use std::{collections::HashMap, sync::Arc};

use tokio::{
	sync::{Mutex, RwLock, Semaphore},
	task::JoinHandle,
};
use tracing::{info, warn};

use super::{core::CloneCore, info::CloneInfo, info::CloneTaskInfo, types::TaskId};

/// Dispatches admitted tasks onto a bounded pool of tokio workers and tracks
/// the live envelopes for status queries.
pub struct CloneTaskManager {
	core: Arc<CloneCore>,
	permits: Arc<Semaphore>,
	tasks: Arc<RwLock<HashMap<TaskId, Arc<CloneTaskInfo>>>>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl CloneTaskManager {
	pub fn new(core: Arc<CloneCore>) -> Self {
		let concurrency = core.options().worker_concurrency;
		Self {
			core,
			permits: Arc::new(Semaphore::new(concurrency)),
			tasks: Arc::new(RwLock::new(HashMap::new())),
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Hand an admitted task to a worker. Returns the live envelope.
	pub async fn dispatch(&self, clone_info: CloneInfo) -> Arc<CloneTaskInfo> {
		self.spawn(clone_info, false).await
	}

	/// Hand an admitted clean to a worker.
	pub async fn dispatch_clean(&self, clone_info: CloneInfo) -> Arc<CloneTaskInfo> {
		self.spawn(clone_info, true).await
	}

	async fn spawn(&self, clone_info: CloneInfo, clean: bool) -> Arc<CloneTaskInfo> {
		let task_id = clone_info.task_id;
		info!("Dispatching {} worker for task {}", if clean { "clean" } else { "clone" }, task_id);

		let task = Arc::new(CloneTaskInfo::new(clone_info));
		self.tasks.write().await.insert(task_id, task.clone());

		let core = self.core.clone();
		let permits = self.permits.clone();
		let tasks = self.tasks.clone();
		let worker_task = task.clone();
		let handle = tokio::spawn(async move {
			let _permit = match permits.acquire_owned().await {
				Ok(permit) => permit,
				Err(_) => {
					warn!("Worker pool closed before task {} ran", task_id);
					return;
				}
			};
			if clean {
				core.handle_clean_clone_or_recover_task(&worker_task).await;
			} else {
				core.handle_clone_or_recover_task(&worker_task).await;
			}
			tasks.write().await.remove(&task_id);
		});
		self.handles.lock().await.push(handle);
		task
	}

	/// Live envelope of a running task, if any.
	pub async fn task(&self, task_id: &TaskId) -> Option<Arc<CloneTaskInfo>> {
		self.tasks.read().await.get(task_id).cloned()
	}

	pub async fn running_count(&self) -> usize {
		self.tasks.read().await.len()
	}

	/// Wait for every worker spawned so far to finish. Used by shutdown and
	/// by tests that need deterministic completion.
	pub async fn wait_idle(&self) {
		let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
		for result in futures::future::join_all(handles).await {
			if let Err(e) = result {
				warn!("Clone worker panicked: {}", e);
			}
		}
	}
}
