use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use thiserror::Error;

use crate::tree::FileNode;

const PROGRESS_EMIT_INTERVAL_MS: u64 = 200;

/// Errors that abort a scan. Per-item failures never surface here; they are
/// collected as `ScanIssue`s and the item is dropped from the tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("scan cancelled")]
    Cancelled,
    #[error("scan failed: {0}")]
    Unknown(String),
}

/// A non-fatal, per-item failure encountered during a scan.
#[derive(Debug, Clone)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Snapshot of a running scan. Each snapshot is an independent value; the
/// reporter only ever sees the latest one per throttle interval.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub files_scanned: u64,
    pub current_path: PathBuf,
    pub bytes_scanned: u64,
    pub started_at: SystemTime,
}

#[derive(Debug)]
pub struct ScanResult {
    pub root: Arc<FileNode>,
    pub elapsed: Duration,
    /// Total node count, directories included.
    pub node_count: u64,
    pub issues: Vec<ScanIssue>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip dot-entries when listing directories.
    pub skip_hidden: bool,
}

pub type ProgressReporter = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Cooperative cancellation flag, polled before each directory descent and
/// each file-attribute read. Cancelling is sticky: start a new crawler for a
/// fresh scan.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Concurrent filesystem crawler.
///
/// Every directory fans out one unit of work per child and collects all of
/// them before constructing its own node, so the finished tree is delivered
/// whole; progress is the only streaming channel.
pub struct FileCrawler {
    options: ScanOptions,
    cancel: CancelHandle,
}

impl FileCrawler {
    pub fn new() -> Self {
        Self::with_options(ScanOptions::default())
    }

    pub fn with_options(options: ScanOptions) -> Self {
        Self {
            options,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle for cancelling this crawler's scan from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<ScanResult, ScanError> {
        self.scan_with_progress(root, None)
    }

    /// Scan a directory tree, streaming throttled progress snapshots to the
    /// reporter (at most one per ~200ms, latest wins).
    pub fn scan_with_progress<P: AsRef<Path>>(
        &self,
        root: P,
        reporter: Option<ProgressReporter>,
    ) -> Result<ScanResult, ScanError> {
        let root = root.as_ref();

        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ScanError::PathNotFound(root.to_path_buf()));
            }
            Err(err) => return Err(map_root_error(root, &err)),
        };
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let started = Instant::now();
        let progress = ProgressTracker::new(reporter);
        let issues: DashMap<PathBuf, String> = DashMap::new();
        let ctx = ScanContext {
            cancel: &self.cancel,
            options: &self.options,
            progress: &progress,
            issues: &issues,
        };

        if ctx.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        ctx.progress.visit_directory(root);

        // Root listing failures are fatal: an omitted root is "nothing was
        // scanned", which per-item swallowing must never produce.
        let entries = list_entries(root, &ctx).map_err(|err| map_root_error(root, &err))?;

        let scan_children = || {
            entries
                .par_iter()
                .map(|child| scan_entry(child, &ctx))
                .collect::<Result<Vec<Option<Arc<FileNode>>>, ScanError>>()
        };

        let children = ThreadPoolBuilder::new()
            .num_threads(Self::scan_parallelism())
            .build()
            .map(|pool| pool.install(scan_children))
            .unwrap_or_else(|_| scan_children())?;

        let children: Vec<Arc<FileNode>> = children.into_iter().flatten().collect();
        let root_node = Arc::new(FileNode::directory(root, metadata.modified().ok(), children));

        progress.finish();

        let mut issues: Vec<ScanIssue> = issues
            .into_iter()
            .map(|(path, message)| ScanIssue { path, message })
            .collect();
        issues.sort_by(|a, b| a.path.cmp(&b.path));

        let elapsed = started.elapsed();
        log::info!(
            "scan of {} complete: {} nodes, {} bytes, {} skipped, {:?}",
            root.display(),
            root_node.file_count,
            root_node.total_size,
            issues.len(),
            elapsed
        );

        Ok(ScanResult {
            node_count: root_node.file_count,
            root: root_node,
            elapsed,
            issues,
        })
    }

    fn scan_parallelism() -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        // Scan workers block on I/O, so oversubscribe the cores.
        (cores * 2).clamp(4, 64)
    }
}

impl Default for FileCrawler {
    fn default() -> Self {
        Self::new()
    }
}

struct ScanContext<'a> {
    cancel: &'a CancelHandle,
    options: &'a ScanOptions,
    progress: &'a ProgressTracker,
    issues: &'a DashMap<PathBuf, String>,
}

impl ScanContext<'_> {
    fn record_issue(&self, path: &Path, err: &io::Error) {
        log::debug!("skipping {}: {err}", path.display());
        self.issues.insert(path.to_path_buf(), err.to_string());
    }
}

fn scan_entry(path: &Path, ctx: &ScanContext<'_>) -> Result<Option<Arc<FileNode>>, ScanError> {
    if ctx.cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            ctx.record_issue(path, &err);
            return Ok(None);
        }
    };

    let file_type = metadata.file_type();
    if file_type.is_dir() {
        scan_directory(path, metadata.modified().ok(), ctx)
    } else if file_type.is_file() {
        ctx.progress.visit_file(path, metadata.len());
        Ok(Some(Arc::new(FileNode::file(
            path,
            metadata.len(),
            metadata.modified().ok(),
        ))))
    } else {
        // Symlinks and special files are never followed.
        Ok(None)
    }
}

fn scan_directory(
    path: &Path,
    modified: Option<SystemTime>,
    ctx: &ScanContext<'_>,
) -> Result<Option<Arc<FileNode>>, ScanError> {
    if ctx.cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }
    ctx.progress.visit_directory(path);

    let entries = match list_entries(path, ctx) {
        Ok(entries) => entries,
        Err(err) => {
            ctx.record_issue(path, &err);
            return Ok(None);
        }
    };

    let children = entries
        .par_iter()
        .map(|child| scan_entry(child, ctx))
        .collect::<Result<Vec<Option<Arc<FileNode>>>, ScanError>>()?;

    let children: Vec<Arc<FileNode>> = children.into_iter().flatten().collect();
    Ok(Some(Arc::new(FileNode::directory(path, modified, children))))
}

fn list_entries(path: &Path, ctx: &ScanContext<'_>) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        match entry {
            Ok(entry) => {
                if ctx.options.skip_hidden && entry.file_name().to_string_lossy().starts_with('.')
                {
                    continue;
                }
                entries.push(entry.path());
            }
            Err(err) => ctx.record_issue(path, &err),
        }
    }
    Ok(entries)
}

fn map_root_error(path: &Path, err: &io::Error) -> ScanError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        ScanError::PermissionDenied(path.to_path_buf())
    } else {
        ScanError::Unknown(format!("{}: {err}", path.display()))
    }
}

/// Shared progress accumulator. Counters are atomic; the current-path slot is
/// the single mutex-guarded value concurrent workers report into. Emission is
/// coalesced with a compare-and-swap on the last-emit timestamp, so stale
/// intermediate snapshots are dropped rather than queued.
struct ProgressTracker {
    reporter: Option<ProgressReporter>,
    files_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    started_at: SystemTime,
    clock: Instant,
    last_emit_ms: AtomicU64,
    current_path: Mutex<PathBuf>,
}

impl ProgressTracker {
    fn new(reporter: Option<ProgressReporter>) -> Self {
        Self {
            reporter,
            files_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            started_at: SystemTime::now(),
            clock: Instant::now(),
            last_emit_ms: AtomicU64::new(0),
            current_path: Mutex::new(PathBuf::new()),
        }
    }

    fn visit_directory(&self, path: &Path) {
        if self.reporter.is_none() {
            return;
        }
        *self.current_path.lock() = path.to_path_buf();
        self.maybe_emit();
    }

    fn visit_file(&self, path: &Path, bytes: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
        if self.reporter.is_none() {
            return;
        }
        *self.current_path.lock() = path.to_path_buf();
        self.maybe_emit();
    }

    fn maybe_emit(&self) {
        let elapsed_ms = self.clock.elapsed().as_millis() as u64;
        if !Self::should_emit(&self.last_emit_ms, elapsed_ms) {
            return;
        }
        self.emit();
    }

    /// Emit the final snapshot unconditionally once traversal is done.
    fn finish(&self) {
        if self.reporter.is_some() {
            self.emit();
        }
    }

    fn emit(&self) {
        if let Some(reporter) = &self.reporter {
            reporter(ScanProgress {
                files_scanned: self.files_scanned.load(Ordering::Relaxed),
                current_path: self.current_path.lock().clone(),
                bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
                started_at: self.started_at,
            });
        }
    }

    fn should_emit(last_emit_ms: &AtomicU64, elapsed_ms: u64) -> bool {
        let previous = last_emit_ms.load(Ordering::Relaxed);
        if elapsed_ms.saturating_sub(previous) < PROGRESS_EMIT_INTERVAL_MS {
            return false;
        }

        last_emit_ms
            .compare_exchange(previous, elapsed_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(path: &Path, len: usize) {
        let mut file = File::create(path).expect("create file");
        file.write_all(&vec![0u8; len]).expect("write file");
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = FileCrawler::new().scan(dir.path()).expect("scan");

        assert!(result.root.children.is_empty());
        assert_eq!(result.root.file_count, 1);
        assert_eq!(result.root.total_size, 0);
        assert_eq!(result.node_count, 1);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_scan_aggregates_and_sorting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        write_file(&dir.path().join("big.bin"), 600);
        write_file(&sub.join("small.bin"), 400);

        let result = FileCrawler::new().scan(dir.path()).expect("scan");
        let root = &result.root;

        assert_eq!(root.total_size, 1000);
        assert_eq!(root.file_count, 4); // root, sub, 2 files
        assert_eq!(root.max_depth, 2);
        // Largest-first at every level.
        assert_eq!(root.children[0].name, "big.bin");
        assert_eq!(root.children[1].name, "sub");
        assert_eq!(root.children[1].total_size, 400);
    }

    #[test]
    fn test_scan_missing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = FileCrawler::new().scan(&missing).unwrap_err();
        assert_eq!(err, ScanError::PathNotFound(missing));
    }

    #[test]
    fn test_scan_file_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("plain.txt");
        write_file(&file, 3);
        let err = FileCrawler::new().scan(&file).unwrap_err();
        assert_eq!(err, ScanError::NotADirectory(file));
    }

    #[test]
    fn test_cancelled_scan_returns_no_partial_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(&dir.path().join("a.bin"), 10);

        let crawler = FileCrawler::new();
        crawler.cancel_handle().cancel();
        let err = crawler.scan(dir.path()).unwrap_err();
        assert_eq!(err, ScanError::Cancelled);
    }

    #[test]
    fn test_skip_hidden_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(&dir.path().join(".hidden"), 5);
        write_file(&dir.path().join("shown.txt"), 5);

        let options = ScanOptions { skip_hidden: true };
        let result = FileCrawler::with_options(options).scan(dir.path()).expect("scan");
        let names: Vec<&str> = result.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["shown.txt"]);

        let result = FileCrawler::new().scan(dir.path()).expect("scan");
        assert_eq!(result.root.children.len(), 2);
    }

    #[test]
    fn test_progress_final_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(&dir.path().join("a.bin"), 100);
        write_file(&dir.path().join("b.bin"), 200);

        let snapshots: Arc<parking_lot::Mutex<Vec<ScanProgress>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = snapshots.clone();
        let reporter: ProgressReporter = Arc::new(move |progress| sink.lock().push(progress));

        FileCrawler::new()
            .scan_with_progress(dir.path(), Some(reporter))
            .expect("scan");

        let snapshots = snapshots.lock();
        let last = snapshots.last().expect("at least the final snapshot");
        assert_eq!(last.files_scanned, 2);
        assert_eq!(last.bytes_scanned, 300);
    }
}
