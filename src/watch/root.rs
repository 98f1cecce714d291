// src/watch/root.rs

//! Pick the single directory a watch subscription is rooted at.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::watch::path_utils::resolve_against;
use crate::watch::patterns::{scan_pattern, LocalPatternSet, PatternSet};

/// Every affirmative pattern of the global set and all local sets.
pub fn all_affirmative_patterns<'a>(
    global: &'a PatternSet,
    locals: &'a [LocalPatternSet],
) -> Vec<&'a String> {
    std::iter::once(global)
        .chain(locals.iter().map(|l| &l.patterns))
        .flat_map(PatternSet::all_affirmative)
        .collect()
}

/// Directory a pattern can only ever match below.
///
/// For a glob this is its literal base; for a literal file path it is the
/// file's parent directory.
pub fn pattern_base_dir(pattern: &str, cwd: &Path) -> PathBuf {
    let scanned = scan_pattern(pattern);
    let base = resolve_against(cwd, Path::new(&scanned.base));
    if scanned.is_glob {
        base
    } else {
        base.parent().map(Path::to_path_buf).unwrap_or(base)
    }
}

/// Longest common ancestor of `paths`, compared segment by segment.
pub fn common_ancestor(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut common: Vec<Component<'_>> = first.components().collect();

    for path in rest {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    if common.is_empty() {
        None
    } else {
        Some(common.iter().collect())
    }
}

/// Resolve the directory to subscribe to.
///
/// Falls back to `cwd` when there are no patterns, when the bases share no
/// ancestor, or when the common ancestor is not an accessible directory.
pub fn resolve_watch_directory(
    global: &PatternSet,
    locals: &[LocalPatternSet],
    cwd: &Path,
    fs: &dyn FileSystem,
) -> PathBuf {
    let bases: Vec<PathBuf> = all_affirmative_patterns(global, locals)
        .into_iter()
        .map(|p| pattern_base_dir(p, cwd))
        .collect();

    let Some(candidate) = common_ancestor(&bases) else {
        debug!(cwd = %cwd.display(), "no common pattern base; watching cwd");
        return cwd.to_path_buf();
    };

    if fs.is_dir(&candidate) {
        debug!(dir = %candidate.display(), "resolved watch directory");
        candidate
    } else {
        info!(
            dir = %candidate.display(),
            cwd = %cwd.display(),
            "common pattern directory is not accessible; watching cwd instead"
        );
        cwd.to_path_buf()
    }
}
