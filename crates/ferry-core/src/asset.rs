//! Local asset identity.
//!
//! An asset is identified by its file name and byte size, not by content.
//! Two different files that share both collide and are treated as the same
//! asset. The remote side stores this string as the device asset id, so it
//! must stay stable across runs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Name+size identity of an asset: `strip_whitespace(base_name + "-" + size)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintId(String);

impl FingerprintId {
    /// Derive the fingerprint for a file called `name` holding `size` bytes.
    ///
    /// Only the final path component of `name` is used.
    pub fn from_name_and_size(name: &str, size: u64) -> Self {
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        let id = format!("{base}-{size}")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Wrap an id that is already in fingerprint form (e.g. one listed by the server).
impl From<String> for FingerprintId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FingerprintId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One local file that may need uploading. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAsset {
    pub id: FingerprintId,
    /// Root the file was discovered under. Shared by every asset of that root.
    pub root: Arc<Path>,
    /// Path relative to `root`, as discovered.
    pub relative_path: PathBuf,
}

impl CandidateAsset {
    pub fn new(root: Arc<Path>, relative_path: impl Into<PathBuf>, size: u64) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: FingerprintId::from_name_and_size(&name, size),
            root,
            relative_path,
        }
    }

    /// Absolute (or root-relative, if the root was relative) path on disk.
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }

    /// File name for log lines.
    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.display().to_string())
    }
}

/// What the remote service returns for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub id: String,
    /// True when the server already held identical content under another id.
    #[serde(default)]
    pub duplicate: bool,
}
