//! Local traversal — turns root folders into candidate assets.
//!
//! Entries are visited sorted by file name so repeated runs over the same
//! tree produce the same order. Without `recursive`, only the direct
//! children of each root are considered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ferry_core::CandidateAsset;
use walkdir::WalkDir;

pub fn scan_roots(roots: &[PathBuf], recursive: bool) -> Result<Vec<CandidateAsset>> {
    let mut assets = Vec::new();
    for root in roots {
        scan_root(root, recursive, &mut assets)
            .with_context(|| format!("can't scan {}", root.display()))?;
    }
    tracing::debug!(count = assets.len(), "local scan complete");
    Ok(assets)
}

fn scan_root(root: &Path, recursive: bool, out: &mut Vec<CandidateAsset>) -> Result<()> {
    let shared_root: Arc<Path> = Arc::from(root);
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "can't stat file");
                continue;
            }
        };
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        out.push(CandidateAsset::new(shared_root.clone(), relative, size));
    }
    Ok(())
}
