// src/config/pointer.rs

//! Classification of schema/documents pointers.
//!
//! Every raw pointer string from the config is classified exactly once when
//! the config is validated. The rest of the crate matches on [`Pointer`]
//! instead of re-inspecting strings.

use serde::Deserialize;

/// Characters that make a string an invalid filesystem path for our purposes.
const INVALID_PATH_CHARS: &[char] = &['‘', '“', '!', '%', '^', '<', '>', '`'];

/// A schema or documents pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// A plain relative or absolute file path.
    FilePath(String),
    /// A glob pattern, possibly negated with a leading `!`.
    Glob(String),
    /// A remote URL (e.g. an introspection endpoint).
    Url(String),
    /// Inline source text (e.g. SDL written directly in the config).
    InlineSource(String),
}

impl Pointer {
    pub fn classify(raw: &str) -> Self {
        if is_url(raw) {
            Pointer::Url(raw.to_string())
        } else if is_glob(raw) {
            Pointer::Glob(raw.to_string())
        } else if is_valid_path(raw) {
            Pointer::FilePath(raw.to_string())
        } else {
            Pointer::InlineSource(raw.to_string())
        }
    }

    /// The raw pointer text as written in the config.
    pub fn as_str(&self) -> &str {
        match self {
            Pointer::FilePath(s)
            | Pointer::Glob(s)
            | Pointer::Url(s)
            | Pointer::InlineSource(s) => s,
        }
    }

    /// File paths and globs refer to the local filesystem; URLs and inline
    /// sources never do.
    pub fn is_path_like(&self) -> bool {
        matches!(self, Pointer::FilePath(_) | Pointer::Glob(_))
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_url(raw: &str) -> bool {
    raw.contains("://") && url::Url::parse(raw).is_ok()
}

/// A glob must still read as a single path: inline SDL such as
/// `type Query { me: User }` contains braces but also whitespace.
pub fn is_glob(raw: &str) -> bool {
    looks_like_path(raw) && (raw.starts_with('!') || raw.contains(['*', '?', '[', '{']))
}

/// Like [`is_valid_path`], but `!` is allowed since globs use it for
/// negation and character classes.
fn looks_like_path(raw: &str) -> bool {
    !raw.is_empty()
        && !raw
            .chars()
            .any(|c| c.is_whitespace() || (c != '!' && INVALID_PATH_CHARS.contains(&c)))
}

pub fn is_valid_path(raw: &str) -> bool {
    !raw.is_empty()
        && !raw
            .chars()
            .any(|c| c.is_whitespace() || INVALID_PATH_CHARS.contains(&c))
}

/// A config value that may be written either as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Classify an optional single-or-list value into pointers.
pub fn classify_all(value: Option<OneOrMany>) -> Vec<Pointer> {
    value
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .map(|raw| Pointer::classify(raw))
        .collect()
}
