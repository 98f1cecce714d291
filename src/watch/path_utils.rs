// src/watch/path_utils.rs

//! Path helpers shared by the graph builder, the pattern builders and the
//! watcher. None of these touch the filesystem except [`relative_str`].

use std::path::{Component, Path, PathBuf};

/// Render a path with forward slashes, as glob patterns expect.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Remove every leading `./` from a pattern or path string.
pub fn strip_dot_slash(mut s: &str) -> &str {
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s
}

/// Resolve `.` and `..` components without consulting the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().collect()
}

/// Resolve `path` against `cwd` (if relative) and normalize it lexically.
pub fn resolve_against(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&cwd.join(path))
    }
}

/// Lexical relative path from `base` to `path`, using `..` where needed.
///
/// Both inputs are resolved against nothing; pass absolute paths.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    let base = normalize_lexically(base);
    let path = normalize_lexically(path);

    let base_parts: Vec<Component<'_>> = base.components().collect();
    let path_parts: Vec<Component<'_>> = path.components().collect();

    let common = base_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    rel
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // macOS reports events under /private/var/... for /var/... roots.
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

/// Express an absolute path relative to `cwd`, falling back to a lexical
/// `../` path when it lives outside of `cwd`.
pub fn relative_to_cwd(cwd: &Path, absolute: &Path) -> String {
    let absolute = normalize_lexically(absolute);
    relative_str(cwd, &absolute).unwrap_or_else(|| to_slash(&relative_path(cwd, &absolute)))
}
