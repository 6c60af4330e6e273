use std::collections::HashSet;
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::category::FileCategory;
use crate::tree::FileNode;

/// Predicate set for reducing a tree. All active predicates must hold for a
/// file to survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: HashSet<FileCategory>,
    pub min_size: u64,
    /// Wildcard pattern matched against the whole display name; `*` matches
    /// any run of characters.
    pub name_pattern: Option<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            categories: FileCategory::all().into_iter().collect(),
            min_size: 0,
            name_pattern: None,
        }
    }
}

/// Produce a new tree containing only matching files and the ancestor
/// directories required to reach them, or `None` when nothing matches.
///
/// Ancestor directories are structural: they survive whenever a descendant
/// does, independent of the category set. The category set additionally lets
/// childless directories survive when `Directory` is explicitly selected.
/// Unchanged subtrees are shared with the input tree, and every rebuilt
/// directory recomputes its aggregates from the filtered children, so
/// filtering twice with the same options yields an identical tree.
pub fn filter_tree(root: &Arc<FileNode>, options: &FilterOptions) -> Option<Arc<FileNode>> {
    let matcher = compile_name_matcher(options.name_pattern.as_deref());
    filter_node(root, options, matcher.as_ref())
}

fn filter_node(
    node: &Arc<FileNode>,
    options: &FilterOptions,
    matcher: Option<&GlobMatcher>,
) -> Option<Arc<FileNode>> {
    if !node.is_dir {
        return file_matches(node, options, matcher).then(|| node.clone());
    }

    let filtered: Vec<Arc<FileNode>> = node
        .children
        .iter()
        .filter_map(|child| filter_node(child, options, matcher))
        .collect();

    if filtered.is_empty() {
        let keep_empty = options.categories.contains(&FileCategory::Directory)
            && node.children.is_empty();
        return keep_empty.then(|| node.clone());
    }

    // Share the subtree when every child survived untouched.
    if filtered.len() == node.children.len()
        && filtered
            .iter()
            .zip(&node.children)
            .all(|(kept, original)| Arc::ptr_eq(kept, original))
    {
        return Some(node.clone());
    }

    Some(Arc::new(FileNode::directory(
        &node.path,
        node.modified,
        filtered,
    )))
}

fn file_matches(
    node: &FileNode,
    options: &FilterOptions,
    matcher: Option<&GlobMatcher>,
) -> bool {
    options.categories.contains(&node.category)
        && node.total_size >= options.min_size
        && matcher
            .map(|m| m.is_match(node.name.as_str()))
            .unwrap_or(true)
}

/// Compile a wildcard pattern into a full-string name matcher. Empty or
/// unparseable patterns disable the name predicate.
pub(crate) fn compile_name_matcher(pattern: Option<&str>) -> Option<GlobMatcher> {
    let pattern = pattern?.trim();
    if pattern.is_empty() {
        return None;
    }
    GlobBuilder::new(pattern)
        .build()
        .ok()
        .map(|glob| glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file(path: &str, size: u64) -> Arc<FileNode> {
        Arc::new(FileNode::file(Path::new(path), size, None))
    }

    fn sample_tree() -> Arc<FileNode> {
        let pictures = Arc::new(FileNode::directory(
            Path::new("/r/pictures"),
            None,
            vec![file("/r/pictures/cat.png", 600)],
        ));
        let empty = Arc::new(FileNode::directory(Path::new("/r/empty"), None, vec![]));
        Arc::new(FileNode::directory(
            Path::new("/r"),
            None,
            vec![pictures, empty, file("/r/main.rs", 400)],
        ))
    }

    fn categories(list: &[FileCategory]) -> HashSet<FileCategory> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_category_filter_keeps_required_ancestors() {
        let root = sample_tree();
        let options = FilterOptions {
            categories: categories(&[FileCategory::Image]),
            ..Default::default()
        };

        let filtered = filter_tree(&root, &options).expect("one image survives");
        assert_eq!(filtered.total_size, 600);
        assert_eq!(filtered.file_count, 3); // root, pictures, cat.png
        assert_eq!(filtered.children.len(), 1);
        assert_eq!(filtered.children[0].name, "pictures");
        assert_eq!(filtered.children[0].children[0].name, "cat.png");
    }

    #[test]
    fn test_no_matches_yields_none() {
        let root = sample_tree();
        let options = FilterOptions {
            categories: categories(&[FileCategory::Video]),
            ..Default::default()
        };
        assert!(filter_tree(&root, &options).is_none());
    }

    #[test]
    fn test_min_size_recomputes_aggregates() {
        let root = sample_tree();
        let options = FilterOptions {
            min_size: 500,
            ..Default::default()
        };

        let filtered = filter_tree(&root, &options).expect("cat.png survives");
        assert_eq!(filtered.total_size, 600);
        assert!(filtered
            .children
            .iter()
            .all(|child| child.name != "main.rs"));
    }

    #[test]
    fn test_wildcard_is_a_full_string_match() {
        let root = sample_tree();
        let matches = |pattern: &str| {
            let options = FilterOptions {
                name_pattern: Some(pattern.to_string()),
                categories: categories(&[FileCategory::Image, FileCategory::Code]),
                ..Default::default()
            };
            filter_tree(&root, &options)
        };

        assert!(matches("*.png").is_some());
        assert!(matches("cat*").is_some());
        // Substrings do not match without wildcards.
        assert!(matches("cat").is_none());
        assert!(matches("*.jpg").is_none());
    }

    #[test]
    fn test_empty_directory_survives_only_when_selected() {
        let root = sample_tree();

        let with_dirs = FilterOptions {
            categories: categories(&[FileCategory::Directory]),
            ..Default::default()
        };
        let filtered = filter_tree(&root, &with_dirs).expect("empty dir survives");
        assert_eq!(filtered.children.len(), 1);
        assert_eq!(filtered.children[0].name, "empty");

        let without_dirs = FilterOptions {
            categories: categories(&[FileCategory::Image]),
            ..Default::default()
        };
        let filtered = filter_tree(&root, &without_dirs).expect("image survives");
        assert!(filtered.children.iter().all(|child| child.name != "empty"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let root = sample_tree();
        let options = FilterOptions {
            categories: categories(&[FileCategory::Image, FileCategory::Code]),
            min_size: 100,
            name_pattern: Some("*".to_string()),
        };

        let once = filter_tree(&root, &options).expect("matches");
        let twice = filter_tree(&once, &options).expect("still matches");
        assert_eq!(once, twice);
        // Identical predicates leave an already-filtered tree fully shared.
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn test_unchanged_subtrees_are_shared() {
        let root = sample_tree();
        let options = FilterOptions {
            min_size: 500,
            ..Default::default()
        };

        let filtered = filter_tree(&root, &options).expect("matches");
        let original_pictures = &root.children[0];
        let kept_pictures = filtered
            .children
            .iter()
            .find(|child| child.name == "pictures")
            .expect("pictures kept");
        assert!(Arc::ptr_eq(kept_pictures, original_pictures));
    }
}
