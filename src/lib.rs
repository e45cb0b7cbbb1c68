mod errors;
mod index;
mod models;
mod session;
mod storage;
mod tree;
mod trie;

pub use crate::errors::{KartotekError, KartotekResult};
pub use crate::index::{SearchIndex, DEFAULT_LIMIT, DEFAULT_MAX_PREFIX_KEYS, DEFAULT_MIN_SCORE};
pub use crate::models::{
    ClipboardMode, ClipboardState, ConfigDoc, DirectoryPatch, NewRecord, NodeId, ObjectKind,
    ObjectSnapshot, RecordPatch, RecordSnapshot, SearchRequest, SortBy, ValidityPatch,
};
pub use crate::session::{Session, SessionPaths};
pub use crate::storage::{load_config, load_tree, save_config, save_tree};
pub use crate::tree::{NodeEntry, NodeKind, ObjectMeta, ObjectTree, RecordFields};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs the global tracing subscriber with a daily-rolling JSON log file
/// under `<base>/logs`. Safe to call once per process; later calls fail.
pub fn init_tracing(base: &Path) -> KartotekResult<()> {
    let log_dir = base.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "kartotek.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| KartotekError::Internal(error.to_string()))
}
