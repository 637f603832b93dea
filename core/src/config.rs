//! Clone core configuration

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clone::TaskId;

const DEFAULT_CLONE_TEMP_DIR: &str = "/clone";
const DEFAULT_CHUNK_SPLIT_SIZE: u64 = 1024 * 1024;
const DEFAULT_WORKER_CONCURRENCY: usize = 8;

/// Options governing the clone pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneOptions {
	/// Path prefix under which in-flight clone destinations are created
	pub clone_temp_dir: String,

	/// Maximum byte length handed to a single RecoverChunk call
	pub clone_chunk_split_size: u64,

	/// Upper bound on concurrently running clone/recover workers
	pub worker_concurrency: usize,
}

impl Default for CloneOptions {
	fn default() -> Self {
		Self {
			clone_temp_dir: DEFAULT_CLONE_TEMP_DIR.to_string(),
			clone_chunk_split_size: DEFAULT_CHUNK_SPLIT_SIZE,
			worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
		}
	}
}

impl CloneOptions {
	/// Load options from a JSON file, falling back to defaults when the file
	/// does not exist yet.
	pub fn load_from(path: &Path) -> Result<Self> {
		if path.exists() {
			info!("Loading clone options from {:?}", path);
			let json = fs::read_to_string(path)
				.with_context(|| format!("reading {}", path.display()))?;
			let options: CloneOptions = serde_json::from_str(&json)
				.with_context(|| format!("parsing {}", path.display()))?;
			options.validate()?;
			Ok(options)
		} else {
			warn!("No clone options found at {:?}, using defaults", path);
			Ok(Self::default())
		}
	}

	/// Save options as pretty-printed JSON.
	pub fn save_to(&self, path: &Path) -> Result<()> {
		if let Some(dir) = path.parent() {
			fs::create_dir_all(dir)?;
		}
		let json = serde_json::to_string_pretty(self)?;
		fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		if self.clone_temp_dir.is_empty() {
			bail!("clone_temp_dir must not be empty");
		}
		if self.clone_chunk_split_size == 0 {
			bail!("clone_chunk_split_size must be positive");
		}
		if self.worker_concurrency == 0 {
			bail!("worker_concurrency must be positive");
		}
		Ok(())
	}

	/// Working path of a task's in-flight destination.
	pub fn temp_path(&self, task_id: &TaskId) -> String {
		format!("{}/{}", self.clone_temp_dir, task_id)
	}
}
