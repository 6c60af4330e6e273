pub mod category;
pub mod crawler;
pub mod dupes;
pub mod filter;
pub mod index;
pub mod tree;
pub mod treemap;
pub mod util;

pub use category::{categorize_extension, FileCategory};
pub use crawler::{
    CancelHandle, FileCrawler, ProgressReporter, ScanError, ScanIssue, ScanOptions, ScanProgress,
    ScanResult,
};
pub use dupes::{find_duplicates, DuplicateGroup};
pub use filter::{filter_tree, FilterOptions};
pub use index::TreeIndex;
pub use tree::FileNode;
pub use treemap::{layout, layout_with_threshold, Rect, TreemapRect, DEFAULT_MIN_SIZE_THRESHOLD};
