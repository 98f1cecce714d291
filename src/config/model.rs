// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::pointer::{OneOrMany, Pointer};
use crate::types::TriggerWhileRunningBehaviour;

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// schema = "schema.graphql"
/// documents = ["src/**/*.graphql", "!src/**/*.skip.graphql"]
/// watch = true
///
/// [config]
/// triggered_while_running_behaviour = "queue"
/// concurrency = 4
///
/// [[generates]]
/// output = "src/types.ts"
/// cmd = "my-plugin typescript"
/// ```
///
/// This type is only deserialized; use [`ConfigFile`] (via `TryFrom`) for
/// the validated, classified form used by the rest of the crate.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global schema pointers, mixed into every output.
    #[serde(default)]
    pub schema: Option<OneOrMany>,

    /// Global documents pointers, mixed into every output.
    #[serde(default)]
    pub documents: Option<OneOrMany>,

    /// `true`/`false`, or global watch patterns.
    #[serde(default)]
    pub watch: Option<RawWatch>,

    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Output targets from `[[generates]]`, in declaration order.
    #[serde(default)]
    pub generates: Vec<RawOutputTarget>,
}

/// Top-level `watch` value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawWatch {
    Flag(bool),
    Patterns(OneOrMany),
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` or `"cancel"`.
    ///
    /// - `"queue"` (default): let the running generation finish, then run
    ///   everything triggered in the meantime.
    /// - `"cancel"`: abort the running generation and restart.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of outputs generated at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            concurrency: default_concurrency(),
        }
    }
}

/// `[[generates]]` entry as written in the config.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOutputTarget {
    /// Output path (file, or directory for preset outputs).
    pub output: String,

    /// Output-specific schema pointers, added to the global ones.
    #[serde(default)]
    pub schema: Option<OneOrMany>,

    /// Output-specific documents pointers, added to the global ones.
    #[serde(default)]
    pub documents: Option<OneOrMany>,

    /// Extra patterns that should trigger a rebuild of this output.
    #[serde(default)]
    pub watch_pattern: Option<OneOrMany>,

    /// Plugin command whose stdout becomes the output contents.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Preset name; preset outputs are directories written by the plugin.
    #[serde(default)]
    pub preset: Option<String>,

    /// File extension emitted by the preset (e.g. `.generated.ts`).
    #[serde(default)]
    pub preset_extension: Option<String>,
}

/// Watch setting after validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchConfig {
    #[default]
    Disabled,
    Enabled,
    Patterns(Vec<String>),
}

impl WatchConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WatchConfig::Disabled)
    }

    /// Global watch patterns; empty when `watch` was a boolean.
    pub fn patterns(&self) -> &[String] {
        match self {
            WatchConfig::Patterns(p) => p,
            WatchConfig::Disabled | WatchConfig::Enabled => &[],
        }
    }
}

/// One validated output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub output: String,
    pub schema: Vec<Pointer>,
    pub documents: Vec<Pointer>,
    pub watch_pattern: Vec<String>,
    pub cmd: Option<String>,
    pub preset: Option<String>,
    pub preset_extension: Option<String>,
}

impl OutputTarget {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            schema: Vec::new(),
            documents: Vec::new(),
            watch_pattern: Vec::new(),
            cmd: None,
            preset: None,
            preset_extension: None,
        }
    }

    pub fn is_preset(&self) -> bool {
        self.preset.is_some()
    }
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>`, which guarantees:
/// - at least one output target,
/// - unique output keys,
/// - `concurrency >= 1`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config_path: PathBuf,
    config: ConfigSection,
    schema: Vec<Pointer>,
    documents: Vec<Pointer>,
    watch: WatchConfig,
    generates: Vec<OutputTarget>,
}

impl ConfigFile {
    /// Create a `ConfigFile` without validation.
    ///
    /// Only used internally by the `TryFrom` implementation.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        schema: Vec<Pointer>,
        documents: Vec<Pointer>,
        watch: WatchConfig,
        generates: Vec<OutputTarget>,
    ) -> Self {
        Self {
            config_path: crate::config::loader::default_config_path(),
            config,
            schema,
            documents,
            watch,
            generates,
        }
    }

    /// Attach the path the config was loaded from.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn config_section_mut(&mut self) -> &mut ConfigSection {
        &mut self.config
    }

    pub fn schema(&self) -> &[Pointer] {
        &self.schema
    }

    pub fn documents(&self) -> &[Pointer] {
        &self.documents
    }

    pub fn watch(&self) -> &WatchConfig {
        &self.watch
    }

    /// Output targets in declaration order.
    pub fn generates(&self) -> &[OutputTarget] {
        &self.generates
    }

    pub fn target(&self, output: &str) -> Option<&OutputTarget> {
        self.generates.iter().find(|t| t.output == output)
    }
}
