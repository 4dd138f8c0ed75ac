//! Interfaces to the external build scheduler and project configuration.
//!
//! Builds never block on another file being modeled: a missing dependency is
//! recorded and handed to the [`BuildScheduler`], which is expected to build
//! the dependency and then revisit the requesting file. The engine only ever
//! talks to these traits; the scheduling policy lives outside.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

// ============================================================================
// Scheduler
// ============================================================================

/// Priority of a scheduled build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildPriority {
    Normal,
    /// Another file's build is waiting on this one; jump the queue.
    Dependency,
}

/// The background scheduler deciding when files are (re)built.
pub trait BuildScheduler: Send + Sync {
    fn enqueue(&self, path: &Path, priority: BuildPriority);
    fn is_queued(&self, path: &Path) -> bool;
    fn dequeue(&self, path: &Path);
}

/// A scheduler that drops every request. Useful for single-file analysis and
/// as a test double where dependencies are irrelevant.
#[derive(Debug, Default)]
pub struct NullScheduler;

impl BuildScheduler for NullScheduler {
    fn enqueue(&self, _path: &Path, _priority: BuildPriority) {}

    fn is_queued(&self, _path: &Path) -> bool {
        false
    }

    fn dequeue(&self, _path: &Path) {}
}

/// A scheduler that records requests for inspection.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    queue: Mutex<Vec<(PathBuf, BuildPriority)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        RecordingScheduler::default()
    }

    /// The queued paths, in request order.
    pub fn queued(&self) -> Vec<PathBuf> {
        self.queue.lock().iter().map(|(p, _)| p.clone()).collect()
    }
}

impl BuildScheduler for RecordingScheduler {
    fn enqueue(&self, path: &Path, priority: BuildPriority) {
        self.queue.lock().push((path.to_path_buf(), priority));
    }

    fn is_queued(&self, path: &Path) -> bool {
        self.queue.lock().iter().any(|(p, _)| p == path)
    }

    fn dequeue(&self, path: &Path) {
        self.queue.lock().retain(|(p, _)| p != path);
    }
}

// ============================================================================
// Search Paths
// ============================================================================

/// Ordered candidate directories for module resolution, derived from project
/// configuration.
pub trait SearchPaths: Send + Sync {
    fn search_paths(&self, importing_file: &Path) -> Vec<PathBuf>;
}

/// A fixed list of search directories.
#[derive(Debug, Default)]
pub struct FixedSearchPaths(pub Vec<PathBuf>);

impl SearchPaths for FixedSearchPaths {
    fn search_paths(&self, _importing_file: &Path) -> Vec<PathBuf> {
        self.0.clone()
    }
}

// ============================================================================
// Abort Flag
// ============================================================================

/// Cooperative cancellation for completion-item production.
///
/// Checked between top-level item-producing loops only; nothing finer grained
/// is interruptible.
#[derive(Debug, Default)]
pub struct AbortFlag(AtomicBool);

impl AbortFlag {
    pub fn new() -> Self {
        AbortFlag(AtomicBool::new(false))
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
