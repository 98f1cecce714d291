// src/watch/rebuild.rs

//! Decide whether a changed file affects any output target.
//!
//! One [`LocalMatcher`] is compiled per output target, combining the global
//! pattern set with the target's own. Rules are evaluated in a fixed order and
//! the first one that fires decides:
//!
//! 1. a negated watch pattern matches: no rebuild (beats everything else),
//! 2. an affirmative watch pattern matches: rebuild,
//! 3. the combined documents list matches (honouring its own negations),
//! 4. the combined schemas list matches (honouring its own negations),
//! 5. otherwise no rebuild.
//!
//! Negations in documents/schemas only act inside their own combined list, so
//! they never suppress matches coming from another target or another scope.

use std::path::Path;

use globset::GlobSet;
use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::watch::path_utils::{relative_to_cwd, to_slash};
use crate::watch::patterns::{
    build_globset, invert_negated_patterns, LocalPatternSet, PatternSet, SortedPatterns,
};

/// Which rule decided the outcome for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    WatchExcluded,
    WatchMatched,
    DocumentsMatched,
    SchemasMatched,
    NoMatch,
}

impl Decision {
    pub fn triggers(self) -> bool {
        matches!(
            self,
            Decision::WatchMatched | Decision::DocumentsMatched | Decision::SchemasMatched
        )
    }
}

/// A combined list of patterns evaluated as one unit: a path matches when an
/// affirmative pattern matches and no negated pattern does.
#[derive(Debug, Clone)]
struct ScopeMatcher {
    affirmative: GlobSet,
    negated: GlobSet,
}

impl ScopeMatcher {
    fn compile(global: &SortedPatterns, local: &SortedPatterns) -> Result<Self> {
        let affirmative: Vec<String> = global
            .affirmative
            .iter()
            .chain(local.affirmative.iter())
            .cloned()
            .collect();
        let negated: Vec<String> = global
            .negated
            .iter()
            .chain(local.negated.iter())
            .cloned()
            .collect();

        Ok(Self {
            affirmative: build_globset(&affirmative)?,
            negated: build_globset(&invert_negated_patterns(&negated)?)?,
        })
    }

    fn matches(&self, path: &PathForms<'_>) -> bool {
        path.matched_by(&self.affirmative) && !path.matched_by(&self.negated)
    }
}

/// The changed path as seen by the matchers. Patterns are cwd-relative except
/// for absolute patterns outside cwd, which are tested against `absolute`.
struct PathForms<'a> {
    relative: &'a str,
    absolute: &'a str,
}

impl PathForms<'_> {
    fn matched_by(&self, set: &GlobSet) -> bool {
        set.is_match(self.relative) || set.is_match(self.absolute)
    }
}

/// Compiled matcher for one output target.
#[derive(Debug, Clone)]
pub struct LocalMatcher {
    output: String,
    watch_negated: GlobSet,
    watch_affirmative: GlobSet,
    documents: ScopeMatcher,
    schemas: ScopeMatcher,
}

impl LocalMatcher {
    fn compile(global: &PatternSet, local: &LocalPatternSet) -> Result<Self> {
        let watch_negated: Vec<String> = global
            .watch
            .negated
            .iter()
            .chain(local.patterns.watch.negated.iter())
            .cloned()
            .collect();
        let watch_affirmative: Vec<String> = global
            .watch
            .affirmative
            .iter()
            .chain(local.patterns.watch.affirmative.iter())
            .cloned()
            .collect();

        Ok(Self {
            output: local.output.clone(),
            watch_negated: build_globset(&invert_negated_patterns(&watch_negated)?)?,
            watch_affirmative: build_globset(&watch_affirmative)?,
            documents: ScopeMatcher::compile(&global.documents, &local.patterns.documents)?,
            schemas: ScopeMatcher::compile(&global.schemas, &local.patterns.schemas)?,
        })
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    fn decide(&self, path: &PathForms<'_>) -> Decision {
        if path.matched_by(&self.watch_negated) {
            Decision::WatchExcluded
        } else if path.matched_by(&self.watch_affirmative) {
            Decision::WatchMatched
        } else if self.documents.matches(path) {
            Decision::DocumentsMatched
        } else if self.schemas.matches(path) {
            Decision::SchemasMatched
        } else {
            Decision::NoMatch
        }
    }
}

/// The compiled rebuild decision function.
#[derive(Debug, Clone)]
pub struct RebuildDecider {
    cwd: std::path::PathBuf,
    matchers: Vec<LocalMatcher>,
}

/// Compile a [`RebuildDecider`] from the global and per-target pattern sets.
pub fn make_should_rebuild(
    global: &PatternSet,
    locals: &[LocalPatternSet],
    cwd: &Path,
) -> Result<RebuildDecider> {
    let matchers = locals
        .iter()
        .map(|local| LocalMatcher::compile(global, local))
        .collect::<Result<Vec<_>>>()?;

    Ok(RebuildDecider {
        cwd: cwd.to_path_buf(),
        matchers,
    })
}

impl RebuildDecider {
    pub fn matchers(&self) -> &[LocalMatcher] {
        &self.matchers
    }

    /// Per-target decisions for `absolute_path`, in declaration order.
    pub fn decisions(&self, absolute_path: &Path) -> Result<Vec<(&str, Decision)>> {
        let relative = self.relative(absolute_path)?;
        let absolute = to_slash(absolute_path);
        let forms = PathForms {
            relative: &relative,
            absolute: &absolute,
        };

        let decisions = self
            .matchers
            .iter()
            .map(|m| (m.output(), m.decide(&forms)))
            .collect::<Vec<_>>();
        trace!(path = %relative, ?decisions, "rebuild decisions");
        Ok(decisions)
    }

    /// True if the change affects at least one output target.
    pub fn should_rebuild(&self, absolute_path: &Path) -> Result<bool> {
        Ok(self
            .decisions(absolute_path)?
            .into_iter()
            .any(|(_, d)| d.triggers()))
    }

    /// Outputs whose matcher fired for `absolute_path`.
    pub fn affected_outputs(&self, absolute_path: &Path) -> Result<Vec<String>> {
        Ok(self
            .decisions(absolute_path)?
            .into_iter()
            .filter(|(_, d)| d.triggers())
            .map(|(output, _)| output.to_string())
            .collect())
    }

    fn relative(&self, absolute_path: &Path) -> Result<String> {
        if !absolute_path.is_absolute() {
            return Err(CodegenError::PathContract(format!(
                "expected an absolute path, got '{}'",
                absolute_path.display()
            )));
        }
        let relative = relative_to_cwd(&self.cwd, absolute_path);
        if Path::new(&relative).is_absolute() {
            return Err(CodegenError::PathContract(format!(
                "could not express '{}' relative to '{}'",
                absolute_path.display(),
                self.cwd.display()
            )));
        }
        Ok(relative)
    }
}
