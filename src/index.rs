use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::category::FileCategory;
use crate::filter::compile_name_matcher;
use crate::tree::FileNode;

const KIB: u64 = 1024;

/// Logarithmic size-bucket boundaries: 1 KiB through 1 GiB.
pub const SIZE_BUCKET_BOUNDS: [u64; 7] = [
    KIB,
    10 * KIB,
    100 * KIB,
    KIB * KIB,
    10 * KIB * KIB,
    100 * KIB * KIB,
    KIB * KIB * KIB,
];

const SIZE_BUCKET_COUNT: usize = SIZE_BUCKET_BOUNDS.len() + 1;

fn size_bucket(size: u64) -> usize {
    SIZE_BUCKET_BOUNDS
        .iter()
        .position(|bound| size < *bound)
        .unwrap_or(SIZE_BUCKET_BOUNDS.len())
}

/// Multi-key lookup structure over one finalized tree.
///
/// Built in a single traversal and never mutated; a new tree requires a new
/// index. All queries are O(1) amortized or O(k) in the result size.
pub struct TreeIndex {
    by_path: HashMap<PathBuf, Arc<FileNode>>,
    by_category: HashMap<FileCategory, Vec<Arc<FileNode>>>,
    by_name: HashMap<String, Vec<Arc<FileNode>>>,
    by_extension: HashMap<String, Vec<Arc<FileNode>>>,
    by_size_bucket: Vec<Vec<Arc<FileNode>>>,
    children: HashMap<PathBuf, Vec<Arc<FileNode>>>,
}

impl TreeIndex {
    /// Index every node of the tree rooted at `root`.
    pub fn build(root: &Arc<FileNode>) -> Self {
        let mut index = Self {
            by_path: HashMap::new(),
            by_category: HashMap::new(),
            by_name: HashMap::new(),
            by_extension: HashMap::new(),
            by_size_bucket: vec![Vec::new(); SIZE_BUCKET_COUNT],
            children: HashMap::new(),
        };
        index.insert_subtree(root);
        log::debug!(
            "indexed {} nodes across {} extensions",
            index.by_path.len(),
            index.by_extension.len()
        );
        index
    }

    fn insert_subtree(&mut self, node: &Arc<FileNode>) {
        self.by_path.insert(node.path.clone(), node.clone());
        self.by_category
            .entry(node.category)
            .or_default()
            .push(node.clone());
        self.by_name
            .entry(node.name.clone())
            .or_default()
            .push(node.clone());
        if let Some(ext) = node.extension() {
            self.by_extension
                .entry(ext.to_ascii_lowercase())
                .or_default()
                .push(node.clone());
        }
        self.by_size_bucket[size_bucket(node.total_size)].push(node.clone());

        if node.is_dir {
            self.children
                .insert(node.path.clone(), node.children.clone());
            for child in &node.children {
                self.insert_subtree(child);
            }
        }
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn node_at(&self, path: &Path) -> Option<&Arc<FileNode>> {
        self.by_path.get(path)
    }

    pub fn nodes_by_category(&self, category: FileCategory) -> &[Arc<FileNode>] {
        self.by_category
            .get(&category)
            .map(|nodes| nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn nodes_by_categories(&self, categories: &HashSet<FileCategory>) -> Vec<Arc<FileNode>> {
        categories
            .iter()
            .flat_map(|category| self.nodes_by_category(*category))
            .cloned()
            .collect()
    }

    pub fn nodes_by_name(&self, name: &str) -> &[Arc<FileNode>] {
        self.by_name
            .get(name)
            .map(|nodes| nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn nodes_by_extension(&self, extension: &str) -> &[Arc<FileNode>] {
        self.by_extension
            .get(&extension.to_ascii_lowercase())
            .map(|nodes| nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes whose `total_size` lies in `min..=max`: the union of the
    /// overlapping buckets with an exact-bound pass, since buckets are coarse.
    pub fn nodes_in_size_range(&self, min: u64, max: u64) -> Vec<Arc<FileNode>> {
        if min > max {
            return Vec::new();
        }
        let lo = size_bucket(min);
        let hi = size_bucket(max);
        self.by_size_bucket[lo..=hi]
            .iter()
            .flatten()
            .filter(|node| node.total_size >= min && node.total_size <= max)
            .cloned()
            .collect()
    }

    /// Immediate children of a directory path, largest first.
    pub fn children_of(&self, path: &Path) -> &[Arc<FileNode>] {
        self.children
            .get(path)
            .map(|nodes| nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Combined flat query: matching files under `under_path`, optionally
    /// joined by their ancestor directories.
    ///
    /// Directories are only ever returned when `Directory` is in
    /// `categories`; excluding it hides every directory row, not just empty
    /// ones. Matching files' ancestors are found by walking each match's path
    /// upward to (and excluding) `under_path`.
    pub fn filter(
        &self,
        categories: &HashSet<FileCategory>,
        min_size: u64,
        under_path: &Path,
        name_pattern: Option<&str>,
    ) -> Vec<Arc<FileNode>> {
        let Some(scope) = self.by_path.get(under_path) else {
            return Vec::new();
        };
        let matcher = compile_name_matcher(name_pattern);

        let mut result: Vec<Arc<FileNode>> = Vec::new();
        let mut stack: Vec<&Arc<FileNode>> = scope.children.iter().collect();
        while let Some(node) = stack.pop() {
            if node.is_dir {
                stack.extend(node.children.iter());
            } else if categories.contains(&node.category)
                && node.total_size >= min_size
                && matcher
                    .as_ref()
                    .map(|m| m.is_match(node.name.as_str()))
                    .unwrap_or(true)
            {
                result.push(node.clone());
            }
        }

        if categories.contains(&FileCategory::Directory) {
            let mut ancestors: BTreeSet<PathBuf> = BTreeSet::new();
            for node in &result {
                let mut current = node.path.parent();
                while let Some(path) = current {
                    if path == under_path || !path.starts_with(under_path) {
                        break;
                    }
                    ancestors.insert(path.to_path_buf());
                    current = path.parent();
                }
            }
            for path in ancestors {
                if let Some(dir) = self.by_path.get(&path) {
                    result.push(dir.clone());
                }
            }
        }

        result.sort_by(|a, b| {
            b.total_size
                .cmp(&a.total_size)
                .then_with(|| a.path.cmp(&b.path))
        });
        result
    }
}
