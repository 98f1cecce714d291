// src/watch/patterns.rs

//! Pattern classification and pattern-set construction.
//!
//! Patterns come from three scopes: `watch`, `documents` and `schemas`. Each
//! scope exists once for the whole config ("global") and once per output
//! target ("local"). A pattern prefixed with `!` is negated.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::config::model::{ConfigFile, OutputTarget};
use crate::config::pointer::Pointer;
use crate::errors::{CodegenError, Result};
use crate::watch::path_utils::{relative_to_cwd, resolve_against, strip_dot_slash, to_slash};

/// Result of scanning a single pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPattern {
    /// Whether the pattern excludes what it matches.
    pub negated: bool,
    /// Leading characters that are not part of the match itself
    /// (the negation marker and any `./`), e.g. `!./`.
    pub prefix: String,
    /// Longest literal path prefix (no glob characters).
    pub base: String,
    /// Remainder after `base`; empty for literal paths.
    pub glob: String,
    /// Whether the pattern contains any glob syntax after the prefix.
    pub is_glob: bool,
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '[', '{', '('])
}

/// Scan a pattern for its negation flag, prefix and literal base.
pub fn scan_pattern(pattern: &str) -> ScannedPattern {
    let mut rest = pattern;
    let mut prefix = String::new();
    let mut negated = false;

    // `!(...)` is an extglob, not a negation.
    if rest.starts_with('!') && !rest.starts_with("!(") {
        negated = true;
        prefix.push('!');
        rest = &rest[1..];
    }

    let stripped = strip_dot_slash(rest);
    prefix.push_str(&rest[..rest.len() - stripped.len()]);
    rest = stripped;

    let is_glob = has_glob_chars(rest);
    let (base, glob) = if is_glob {
        let segments: Vec<&str> = rest.split('/').collect();
        let idx = segments
            .iter()
            .position(|s| has_glob_chars(s))
            .unwrap_or(segments.len());
        (segments[..idx].join("/"), segments[idx..].join("/"))
    } else {
        (rest.to_string(), String::new())
    };

    ScannedPattern {
        negated,
        prefix,
        base,
        glob,
        is_glob,
    }
}

/// A list of patterns for one scope, partitioned by polarity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedPatterns {
    /// Every pattern, in declaration order.
    pub patterns: Vec<String>,
    /// Only the non-negated patterns.
    pub affirmative: Vec<String>,
    /// Only the negated patterns (still carrying their `!`).
    pub negated: Vec<String>,
}

/// Partition `patterns` into affirmative and negated lists.
pub fn sort_patterns(patterns: Vec<String>) -> SortedPatterns {
    let (negated, affirmative): (Vec<String>, Vec<String>) = patterns
        .iter()
        .cloned()
        .partition(|p| scan_pattern(p).negated);

    SortedPatterns {
        patterns,
        affirmative,
        negated,
    }
}

/// Strip the negation prefix from every pattern.
///
/// Fails if any input is not negated: callers must filter with
/// [`sort_patterns`] first.
pub fn invert_negated_patterns(patterns: &[String]) -> Result<Vec<String>> {
    patterns
        .iter()
        .map(|pattern| {
            let scanned = scan_pattern(pattern);
            if !scanned.negated {
                return Err(CodegenError::PatternContract(format!(
                    "expected only negated patterns, got '{pattern}'"
                )));
            }
            Ok(invert_scanned(pattern, &scanned))
        })
        .collect()
}

/// Remove the scanned prefix from a negated pattern.
///
/// A scan that claims negation without a literal `!` is tolerated: the
/// pattern is returned unchanged and a warning is logged.
pub fn invert_scanned(pattern: &str, scanned: &ScannedPattern) -> String {
    if !scanned.prefix.starts_with('!') {
        warn!(
            pattern = %pattern,
            prefix = %scanned.prefix,
            "pattern reported as negated without a leading '!'; using it unchanged"
        );
        return pattern.to_string();
    }
    pattern
        .strip_prefix(scanned.prefix.as_str())
        .unwrap_or(pattern)
        .to_string()
}

/// Patterns for the three scopes of one config level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    pub watch: SortedPatterns,
    pub documents: SortedPatterns,
    pub schemas: SortedPatterns,
}

impl PatternSet {
    /// Affirmative patterns of every scope, watch first.
    pub fn all_affirmative(&self) -> impl Iterator<Item = &String> {
        self.watch
            .affirmative
            .iter()
            .chain(self.documents.affirmative.iter())
            .chain(self.schemas.affirmative.iter())
    }
}

/// The pattern set of a single output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPatternSet {
    pub output: String,
    pub patterns: PatternSet,
}

/// Normalize a pattern so it can be matched against cwd-relative paths.
///
/// - leading `./` is dropped,
/// - an absolute pattern below `cwd` becomes relative to `cwd`,
/// - a leading `!` is preserved.
pub fn normalize_pattern(raw: &str, cwd: &Path) -> String {
    let (negation, body) = match raw.strip_prefix('!') {
        Some(body) if !raw.starts_with("!(") => ("!", body),
        _ => ("", raw),
    };
    let body = strip_dot_slash(body);

    let body = if Path::new(body).is_absolute() {
        match Path::new(body).strip_prefix(cwd) {
            Ok(rel) => to_slash(rel),
            Err(_) => to_slash(Path::new(body)),
        }
    } else {
        body.to_string()
    };

    format!("{negation}{body}")
}

fn patterns_from_pointers(pointers: &[Pointer], cwd: &Path) -> Vec<String> {
    pointers
        .iter()
        .filter(|p| p.is_path_like())
        .map(|p| normalize_pattern(p.as_str(), cwd))
        .collect()
}

/// Build the pattern set for the top-level config.
///
/// The config file itself is always part of the global watch scope, so
/// editing it triggers a rebuild.
pub fn make_global_pattern_set(config: &ConfigFile, cwd: &Path) -> PatternSet {
    let mut watch: Vec<String> = config
        .watch()
        .patterns()
        .iter()
        .map(|p| normalize_pattern(p, cwd))
        .collect();
    let config_path = resolve_against(cwd, config.config_path());
    watch.push(relative_to_cwd(cwd, &config_path));

    PatternSet {
        watch: sort_patterns(watch),
        documents: sort_patterns(patterns_from_pointers(config.documents(), cwd)),
        schemas: sort_patterns(patterns_from_pointers(config.schema(), cwd)),
    }
}

/// Build the pattern set for one output target.
pub fn make_local_pattern_set(target: &OutputTarget, cwd: &Path) -> LocalPatternSet {
    let watch = target
        .watch_pattern
        .iter()
        .map(|p| normalize_pattern(p, cwd))
        .collect();

    LocalPatternSet {
        output: target.output.clone(),
        patterns: PatternSet {
            watch: sort_patterns(watch),
            documents: sort_patterns(patterns_from_pointers(&target.documents, cwd)),
            schemas: sort_patterns(patterns_from_pointers(&target.schema, cwd)),
        },
    }
}

/// Local pattern sets for every output target, in declaration order.
pub fn make_local_pattern_sets(config: &ConfigFile, cwd: &Path) -> Vec<LocalPatternSet> {
    config
        .generates()
        .iter()
        .map(|t| make_local_pattern_set(t, cwd))
        .collect()
}

fn glob_builder(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| CodegenError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compile one glob with the matching rules used everywhere in the crate:
/// `*` stays within a path segment, `**` crosses segments.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Ok(glob_builder(pattern)?.compile_matcher())
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(glob_builder(pat)?);
    }
    builder.build().map_err(|source| CodegenError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_detects_negation_and_prefix() {
        let scanned = scan_pattern("!./foo/bar/never-watch.graphql");
        assert!(scanned.negated);
        assert_eq!(scanned.prefix, "!./");
        assert_eq!(scanned.base, "foo/bar/never-watch.graphql");
        assert!(!scanned.is_glob);
    }

    #[test]
    fn scan_splits_base_from_glob() {
        let scanned = scan_pattern("./foo/bar/**/*.graphql");
        assert!(!scanned.negated);
        assert_eq!(scanned.prefix, "./");
        assert_eq!(scanned.base, "foo/bar");
        assert_eq!(scanned.glob, "**/*.graphql");
        assert!(scanned.is_glob);
    }

    #[test]
    fn extglob_is_not_a_negation() {
        assert!(!scan_pattern("!(foo).graphql").negated);
    }

    #[test]
    fn sort_partitions_by_polarity() {
        let sorted = sort_patterns(vec![
            "a/**".to_string(),
            "!a/b.graphql".to_string(),
            "c.graphql".to_string(),
        ]);
        assert_eq!(sorted.patterns.len(), 3);
        assert_eq!(sorted.affirmative, vec!["a/**", "c.graphql"]);
        assert_eq!(sorted.negated, vec!["!a/b.graphql"]);
    }

    #[test]
    fn invert_strips_whole_prefix() {
        let inverted =
            invert_negated_patterns(&["!x/**".to_string(), "!./y.graphql".to_string()]).unwrap();
        assert_eq!(inverted, vec!["x/**", "y.graphql"]);
    }

    #[test]
    fn invert_rejects_affirmative_input() {
        let err = invert_negated_patterns(&["x/**".to_string()]).unwrap_err();
        assert!(matches!(err, CodegenError::PatternContract(msg) if msg.contains("x/**")));
    }

    #[test]
    fn invert_tolerates_negation_without_bang() {
        let scanned = ScannedPattern {
            negated: true,
            prefix: String::new(),
            base: "odd.graphql".to_string(),
            glob: String::new(),
            is_glob: false,
        };
        assert_eq!(invert_scanned("odd.graphql", &scanned), "odd.graphql");
    }

    #[test]
    fn normalize_relativizes_absolute_patterns() {
        let cwd = Path::new("/proj");
        assert_eq!(normalize_pattern("/proj/src/*.graphql", cwd), "src/*.graphql");
        assert_eq!(normalize_pattern("!./src/skip.graphql", cwd), "!src/skip.graphql");
        assert_eq!(normalize_pattern("/elsewhere/x.graphql", cwd), "/elsewhere/x.graphql");
    }

    fn config() -> ConfigFile {
        use crate::config::model::{RawConfigFile, RawOutputTarget, RawWatch};
        use crate::config::pointer::OneOrMany;

        let raw = RawConfigFile {
            schema: Some(OneOrMany::One("https://api.example.com/graphql".to_string())),
            documents: Some(OneOrMany::Many(vec![
                "./src/**/*.graphql".to_string(),
                "!/proj/src/skip.graphql".to_string(),
            ])),
            watch: Some(RawWatch::Patterns(OneOrMany::One("extra/**".to_string()))),
            generates: vec![RawOutputTarget {
                output: "types.ts".to_string(),
                schema: Some(OneOrMany::One("/proj/local.graphql".to_string())),
                watch_pattern: Some(OneOrMany::One("!extra/ignored/**".to_string())),
                ..RawOutputTarget::default()
            }],
            ..RawConfigFile::default()
        };
        ConfigFile::try_from(raw)
            .unwrap()
            .with_config_path("/proj/config/gendag.toml")
    }

    #[test]
    fn global_set_includes_config_file_and_skips_urls() {
        let set = make_global_pattern_set(&config(), Path::new("/proj"));

        assert_eq!(set.watch.affirmative, vec!["extra/**", "config/gendag.toml"]);
        assert_eq!(set.documents.affirmative, vec!["src/**/*.graphql"]);
        assert_eq!(set.documents.negated, vec!["!src/skip.graphql"]);
        assert!(set.schemas.patterns.is_empty());
    }

    #[test]
    fn local_set_keeps_negations_and_relativizes() {
        let cfg = config();
        let locals = make_local_pattern_sets(&cfg, Path::new("/proj"));

        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].output, "types.ts");
        assert_eq!(locals[0].patterns.schemas.affirmative, vec!["local.graphql"]);
        assert_eq!(locals[0].patterns.watch.negated, vec!["!extra/ignored/**"]);
        assert!(locals[0].patterns.documents.patterns.is_empty());
    }

    #[test]
    fn star_does_not_cross_directories() {
        let m = compile_glob("src/*.graphql").unwrap();
        assert!(m.is_match("src/a.graphql"));
        assert!(!m.is_match("src/nested/a.graphql"));
        let m = compile_glob("src/**/*.graphql").unwrap();
        assert!(m.is_match("src/nested/deeper/a.graphql"));
    }

    #[test]
    fn invalid_globs_name_the_pattern() {
        let err = build_globset(&["src/[".to_string()]).unwrap_err();
        assert!(matches!(err, CodegenError::InvalidPattern { pattern, .. } if pattern == "src/["));
    }
}
