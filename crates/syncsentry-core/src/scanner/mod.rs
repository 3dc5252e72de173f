//! Scanner module: enumerates the files a monitored scan is expected to
//! process.
//!
//! Counting uses `jwalk`'s rayon-backed parallel traversal, the same walker
//! the reference [`worker`] uses to collect its work list, so the monitor's
//! `files_total` and the worker's progress agree on what "a file" is.
//!
//! Failures reading the target itself are fatal and categorised through
//! [`ScanError`]. Unreadable subdirectories below the target are skipped
//! with a debug log; one locked folder should not fail the whole count.
pub mod worker;

use crate::error::ScanError;
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// How many walk entries pass between two timeout checks.
const TIMEOUT_CHECK_EVERY: u64 = 64;

/// Compiled file pattern.
///
/// Patterns without a `/` are matched against the file name only, so `*.md`
/// finds markdown files at any depth. Patterns with a `/` are matched against
/// the path relative to the target root.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    pattern: Pattern,
    match_relative_path: bool,
}

impl FileMatcher {
    pub fn new(pattern: &str) -> Result<Self, ScanError> {
        let compiled = Pattern::new(pattern).map_err(|source| ScanError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            match_relative_path: pattern.contains('/'),
        })
    }

    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        if self.match_relative_path {
            let relative = path.strip_prefix(root).unwrap_or(path);
            self.pattern.matches_path(relative)
        } else {
            path.file_name()
                .map(|name| self.pattern.matches(&name.to_string_lossy()))
                .unwrap_or(false)
        }
    }
}

/// Count regular files under `root` whose names match `pattern`.
///
/// With `timeout` set, the walk is abandoned with [`ScanError::TimedOut`]
/// once it has run that long.
pub fn count_matching(
    root: &Path,
    pattern: &str,
    timeout: Option<Duration>,
) -> Result<u64, ScanError> {
    let mut count: u64 = 0;
    walk_matching(root, pattern, timeout, |_| count += 1)?;
    Ok(count)
}

/// Collect the paths of all regular files under `root` matching `pattern`.
///
/// The result is sorted so repeated runs process files in the same order.
pub fn collect_matching(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths = Vec::new();
    walk_matching(root, pattern, None, |path| paths.push(path))?;
    paths.sort_unstable();
    Ok(paths)
}

fn walk_matching(
    root: &Path,
    pattern: &str,
    timeout: Option<Duration>,
    mut visit: impl FnMut(PathBuf),
) -> Result<(), ScanError> {
    let matcher = FileMatcher::new(pattern)?;
    check_root(root)?;

    let start = Instant::now();
    let mut visited: u64 = 0;

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    for entry_result in walker {
        if visited.is_multiple_of(TIMEOUT_CHECK_EVERY) {
            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    return Err(ScanError::TimedOut {
                        path: root.to_path_buf(),
                        limit,
                    });
                }
            }
        }
        visited += 1;

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let kind = err
                    .io_error()
                    .map(|io_err| io_err.kind())
                    .unwrap_or(io::ErrorKind::Other);
                let err_path = err.path().map(Path::to_path_buf);
                if err_path.as_deref() == Some(root) {
                    let source = io::Error::new(kind, err.to_string());
                    return Err(ScanError::from_io(root.to_path_buf(), source));
                }
                debug!("Skipping unreadable entry {:?}: {}", err_path, err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if matcher.matches(root, &path) {
            visit(path);
        }
    }

    debug!(
        "Walked {} entries under {} in {:?}",
        visited,
        root.display(),
        start.elapsed()
    );
    Ok(())
}

/// Fail fast with a categorised error when the root itself is unusable.
///
/// jwalk reports root failures as ordinary entry errors; probing up front
/// keeps the not-found and permission cases deterministic.
fn check_root(root: &Path) -> Result<(), ScanError> {
    let meta = fs::metadata(root).map_err(|e| ScanError::from_io(root.to_path_buf(), e))?;
    if meta.is_dir() {
        fs::read_dir(root).map_err(|e| ScanError::from_io(root.to_path_buf(), e))?;
    }
    Ok(())
}
