use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::category::{categorize_extension, FileCategory};

/// A file or directory in a scanned tree.
///
/// Nodes are immutable once constructed: the scanner and the filter engine
/// both go through the constructors below, which compute the cached
/// aggregates bottom-up and sort children largest-first. Consumers hold
/// nodes behind `Arc` so filtered trees can share unchanged subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub path: PathBuf,
    pub name: String,
    /// Own size in bytes; always 0 for directories.
    pub size: u64,
    pub category: FileCategory,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    /// Immediate children, sorted descending by `total_size`.
    pub children: Vec<Arc<FileNode>>,
    /// Own size for files, sum of children's totals for directories.
    pub total_size: u64,
    /// Total node count in this subtree, directories included.
    pub file_count: u64,
    /// 0 for a childless node, else 1 + max over children.
    pub max_depth: u32,
}

impl FileNode {
    /// Construct a file leaf. The category is derived from the extension.
    pub fn file(path: &Path, size: u64, modified: Option<SystemTime>) -> Self {
        let category = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(categorize_extension)
            .unwrap_or(FileCategory::Other);

        Self {
            path: path.to_path_buf(),
            name: node_name(path),
            size,
            category,
            modified,
            is_dir: false,
            children: Vec::new(),
            total_size: size,
            file_count: 1,
            max_depth: 0,
        }
    }

    /// Construct a directory from its finished children.
    ///
    /// Children are sorted descending by `total_size` and the aggregates are
    /// recomputed here, so every tree-producing operation keeps them
    /// consistent with the children array.
    pub fn directory(
        path: &Path,
        modified: Option<SystemTime>,
        mut children: Vec<Arc<FileNode>>,
    ) -> Self {
        children.sort_by(|a, b| b.total_size.cmp(&a.total_size));

        let total_size = children.iter().map(|child| child.total_size).sum();
        let file_count = 1 + children.iter().map(|child| child.file_count).sum::<u64>();
        let max_depth = children
            .iter()
            .map(|child| child.max_depth)
            .max()
            .map(|depth| depth + 1)
            .unwrap_or(0);

        Self {
            path: path.to_path_buf(),
            name: node_name(path),
            size: 0,
            category: FileCategory::Directory,
            modified,
            is_dir: true,
            children,
            total_size,
            file_count,
            max_depth,
        }
    }

    /// This subtree's share of `total`, in percent.
    pub fn percentage_of(&self, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.total_size as f64 / total as f64 * 100.0
        }
    }

    /// The file's extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

fn node_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
