//! snapclone core
//!
//! The clone/recovery engine of the snapclone block-storage snapshot service.
//! It admits clone, recover, and clean requests, persists a durable record per
//! task, and drives each task through a fixed step pipeline against the
//! block-storage cluster. The RPC surface, the real store backends, and the
//! snapshot subsystem live in sibling services; this crate consumes them
//! through the [`client`] and [`store`] contracts.

pub mod client;
pub mod clone;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod store;

pub use clone::{CloneCore, CloneInfo, CloneTaskInfo, CloneTaskManager, SnapshotReference};
pub use config::CloneOptions;
pub use error::{ClientError, CloneError, CloneResult, StoreError, StoreResult};

/// Install a global tracing subscriber honoring `RUST_LOG`, with `filter` as
/// the fallback. Safe to call more than once.
pub fn init_tracing(filter: &str) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
