// obox-core/src/project.rs

//! Locates the directory a tool should operate in, given a marker file such
//! as `package.json` or `pyproject.toml`.
//!
//! The search walks up from the starting directory first. Only when no
//! ancestor holds the marker does it look *down* the tree, through a
//! [`DescendantSearch`] so tests can swap the external finder out.

use crate::process::{command_exists, run, Command, RunOptions};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Depth limit for the downward search.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Finds files named like the marker below a directory.
#[async_trait]
pub trait DescendantSearch: Send + Sync {
    /// Returns matching file paths in the order the searcher reports them.
    /// An empty vector covers both "nothing found" and "searcher unavailable".
    async fn search(&self, root: &Path, marker: &str) -> Vec<PathBuf>;
}

/// Downward search backed by the `fd` binary.
///
/// Hidden entries are included, matching is case-insensitive and restricted
/// to regular files, and ignore files are respected.
#[derive(Debug, Clone)]
pub struct FdSearch {
    program: String,
    max_depth: usize,
}

impl FdSearch {
    pub fn new(max_depth: usize) -> Self {
        Self {
            program: "fd".to_string(),
            max_depth,
        }
    }

    fn command(&self, marker: &str) -> Command {
        let pattern = format!("^{}$", regex::escape(marker));
        let depth = self.max_depth.to_string();
        Command::argv([
            self.program.as_str(),
            "-H",
            "-i",
            "-t",
            "f",
            "--color",
            "never",
            "--max-depth",
            depth.as_str(),
            pattern.as_str(),
        ])
    }
}

impl Default for FdSearch {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[async_trait]
impl DescendantSearch for FdSearch {
    async fn search(&self, root: &Path, marker: &str) -> Vec<PathBuf> {
        if !command_exists(&self.program).await {
            debug!(program = %self.program, "Finder not on PATH, skipping downward search");
            return Vec::new();
        }

        let command = self.command(marker);
        let result = run(&command, &RunOptions::new().in_dir(root)).await;
        if result.code != Some(0) {
            debug!(command = %command, code = ?result.code, stderr = %result.stderr, "Downward search found nothing");
            return Vec::new();
        }

        result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| root.join(line))
            .collect()
    }
}

/// A search that never finds anything; disables the downward phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDescendantSearch;

#[async_trait]
impl DescendantSearch for NoDescendantSearch {
    async fn search(&self, _root: &Path, _marker: &str) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Nearest directory at or above `start` that contains `marker`.
pub fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

/// [`find_project_root_from`] starting at the current directory with the
/// default `fd` search.
pub async fn find_project_root(marker: &str) -> Option<PathBuf> {
    let start = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "Cannot read current directory");
            return None;
        }
    };
    find_project_root_from(&start, marker, &FdSearch::default()).await
}

/// Directory holding `marker`: the nearest ancestor of `start` first, then the
/// parent of the first file the downward search reports.
///
/// `None` means "no project root"; callers fall back to the current directory
/// or ask for one.
pub async fn find_project_root_from(
    start: &Path,
    marker: &str,
    search: &dyn DescendantSearch,
) -> Option<PathBuf> {
    if let Some(dir) = find_upward(start, marker) {
        debug!(marker, root = %dir.display(), "Project root found above start");
        return Some(dir);
    }

    let found = search
        .search(start, marker)
        .await
        .into_iter()
        .next()
        .and_then(|path| path.parent().map(Path::to_path_buf));

    match &found {
        Some(dir) => info!(marker, root = %dir.display(), "Project root found below start"),
        None => info!(marker, start = %start.display(), "No project root found"),
    }
    found
}

/// Every candidate root for `marker`.
///
/// An enclosing root wins outright. Otherwise all distinct directories found
/// below `start` are returned, so a caller can ask which one was meant.
pub async fn find_project_roots(
    start: &Path,
    marker: &str,
    search: &dyn DescendantSearch,
) -> Vec<PathBuf> {
    if let Some(dir) = find_upward(start, marker) {
        return vec![dir];
    }

    let mut roots: Vec<PathBuf> = Vec::new();
    for path in search.search(start, marker).await {
        if let Some(dir) = path.parent() {
            if !roots.iter().any(|r| r == dir) {
                roots.push(dir.to_path_buf());
            }
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const MARKER: &str = "obox_test_marker_7f3a.txt";

    /// Returns canned results and counts how often it was asked.
    struct CannedSearch {
        results: Vec<PathBuf>,
        calls: AtomicUsize,
    }

    impl CannedSearch {
        fn new(results: Vec<PathBuf>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DescendantSearch for CannedSearch {
        async fn search(&self, _root: &Path, _marker: &str) -> Vec<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.clone()
        }
    }

    #[tokio::test]
    async fn test_finds_marker_three_levels_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MARKER), "").unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        let search = CannedSearch::new(vec![]);
        let root = find_project_root_from(&nested, MARKER, &search).await;
        assert_eq!(root, Some(dir.path().to_path_buf()));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0, "Downward search should not run");
    }

    #[tokio::test]
    async fn test_nearest_ancestor_wins() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("workspace").join("member");
        fs::create_dir_all(inner.join("src")).unwrap();
        fs::write(dir.path().join(MARKER), "").unwrap();
        fs::write(inner.join(MARKER), "").unwrap();

        let root = find_project_root_from(&inner.join("src"), MARKER, &NoDescendantSearch).await;
        assert_eq!(root, Some(inner));
    }

    #[tokio::test]
    async fn test_absent_when_nothing_matches() {
        let dir = tempdir().unwrap();
        let search = CannedSearch::new(vec![]);
        let root = find_project_root_from(dir.path(), MARKER, &search).await;
        assert_eq!(root, None);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_first_downward_match() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("frontend").join(MARKER);
        let second = dir.path().join("backend").join(MARKER);
        let search = CannedSearch::new(vec![first, second]);

        let root = find_project_root_from(dir.path(), MARKER, &search).await;
        assert_eq!(root, Some(dir.path().join("frontend")));
    }

    #[tokio::test]
    async fn test_find_project_roots_dedupes_directories() {
        let dir = tempdir().unwrap();
        let search = CannedSearch::new(vec![
            dir.path().join("web").join(MARKER),
            dir.path().join("web").join(MARKER.to_uppercase()),
            dir.path().join("api").join(MARKER),
        ]);

        let roots = find_project_roots(dir.path(), MARKER, &search).await;
        assert_eq!(roots, vec![dir.path().join("web"), dir.path().join("api")]);
    }

    #[tokio::test]
    async fn test_find_project_roots_prefers_enclosing_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MARKER), "").unwrap();
        let nested = dir.path().join("pkg");
        fs::create_dir_all(&nested).unwrap();
        let search = CannedSearch::new(vec![nested.join("other").join(MARKER)]);

        let roots = find_project_roots(&nested, MARKER, &search).await;
        assert_eq!(roots, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_fd_command_escapes_marker() {
        let command = FdSearch::default().command("package.json");
        assert_eq!(
            command.to_string(),
            r"fd -H -i -t f --color never --max-depth 5 ^package\.json$"
        );
    }

    #[tokio::test]
    async fn test_fd_search_finds_nested_marker() {
        if !command_exists("fd").await {
            println!("Skipping test_fd_search_finds_nested_marker: 'fd' not found in PATH.");
            return;
        }
        let dir = tempdir().unwrap();
        let nested = dir.path().join("one").join("two");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(MARKER), "").unwrap();

        let root = find_project_root_from(dir.path(), MARKER, &FdSearch::default()).await;
        assert_eq!(root, Some(nested));
    }

    #[tokio::test]
    async fn test_fd_search_respects_depth_limit() {
        if !command_exists("fd").await {
            println!("Skipping test_fd_search_respects_depth_limit: 'fd' not found in PATH.");
            return;
        }
        let dir = tempdir().unwrap();
        let deep = dir.path().join("1").join("2").join("3").join("4").join("5").join("6");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join(MARKER), "").unwrap();

        let root = find_project_root_from(dir.path(), MARKER, &FdSearch::default()).await;
        assert_eq!(root, None);
    }
}
