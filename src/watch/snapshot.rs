//! Directory snapshots and change detection.
//!
//! A snapshot records (size, mtime) for every file under the watch root.
//! Diffing the previous cycle's snapshot against the current one yields the
//! paths that are new or still being written to. The diff is a pure function;
//! the watch loop owns the snapshot lifecycle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Size and modification time of one observed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub len: u64,
    pub modified: SystemTime,
}

/// Point-in-time record of all files under a directory.
///
/// Immutable once built; each polling cycle constructs a fresh value.
/// BTreeMap keeps iteration (and therefore diff output) in path order.
pub type DirectorySnapshot = BTreeMap<PathBuf, FileStamp>;

/// Walk `dir` recursively and record every readable regular file.
///
/// Entries that disappear or fail to stat mid-walk are skipped: a transient
/// read error means the producer may still be writing, which is the same as
/// "not yet ready".
pub fn snapshot(dir: &Path) -> DirectorySnapshot {
    let mut result = DirectorySnapshot::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(_) => continue,
        };
        result.insert(
            entry.into_path(),
            FileStamp {
                len: metadata.len(),
                modified,
            },
        );
    }

    result
}

/// Report paths in `current` that are new since `previous` or whose size or
/// mtime changed.
///
/// With no previous snapshot the current one only establishes the baseline,
/// so nothing is reported. Paths removed since `previous` are irrelevant to
/// arrival detection and are not reported either.
pub fn diff(previous: Option<&DirectorySnapshot>, current: &DirectorySnapshot) -> Vec<PathBuf> {
    let previous = match previous {
        Some(p) => p,
        None => return Vec::new(),
    };

    current
        .iter()
        .filter(|(path, stamp)| previous.get(*path) != Some(stamp))
        .map(|(path, _)| path.clone())
        .collect()
}
