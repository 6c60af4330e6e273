use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::category::FileCategory;
use crate::index::TreeIndex;
use crate::tree::FileNode;

/// Files sharing identical size and content.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub size: u64,
    pub hash: [u8; 32],
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes freed by keeping one copy.
    pub fn reclaimable(&self) -> u64 {
        self.size * (self.paths.len() as u64 - 1)
    }
}

/// Find files with identical content: group by exact size first, then confirm
/// candidates with a content hash. Unreadable files are skipped, like the
/// scanner skips unreadable items.
pub fn find_duplicates(index: &TreeIndex) -> io::Result<Vec<DuplicateGroup>> {
    let mut by_size: HashMap<u64, Vec<&Arc<FileNode>>> = HashMap::new();
    for category in FileCategory::all() {
        if category == FileCategory::Directory {
            continue;
        }
        for node in index.nodes_by_category(category) {
            if node.size > 0 {
                by_size.entry(node.size).or_default().push(node);
            }
        }
    }

    let mut groups = Vec::new();
    for (size, candidates) in by_size {
        if candidates.len() < 2 {
            continue;
        }

        let mut by_hash: HashMap<[u8; 32], Vec<PathBuf>> = HashMap::new();
        for node in candidates {
            match hash_file(&node.path) {
                Ok(hash) => by_hash.entry(hash).or_default().push(node.path.clone()),
                Err(err) => log::debug!("skipping {}: {err}", node.path.display()),
            }
        }

        for (hash, mut paths) in by_hash {
            if paths.len() < 2 {
                continue;
            }
            paths.sort();
            groups.push(DuplicateGroup { size, hash, paths });
        }
    }

    groups.sort_by(|a, b| {
        b.reclaimable()
            .cmp(&a.reclaimable())
            .then_with(|| a.paths.cmp(&b.paths))
    });
    Ok(groups)
}

fn hash_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(*hasher.finalize().as_bytes())
}
