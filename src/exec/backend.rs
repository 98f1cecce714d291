// src/exec/backend.rs

//! Pluggable generator abstraction.
//!
//! The runner asks an `OutputGenerator` for the text of one output target.
//! Production code uses [`CommandGenerator`]; tests can provide their own
//! implementation that records calls and returns canned output.
//!
//! [`CommandGenerator`]: super::command::CommandGenerator

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::config::model::{ConfigFile, OutputTarget};
use crate::config::pointer::Pointer;
use crate::watch::path_utils::resolve_against;

/// Everything a generator needs to produce one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Output key as written in the config.
    pub output: String,
    /// Absolute output path.
    pub output_path: PathBuf,
    /// Global pointers first, then the target's own.
    pub schema: Vec<Pointer>,
    /// Global pointers first, then the target's own.
    pub documents: Vec<Pointer>,
    pub cwd: PathBuf,
    pub cmd: Option<String>,
    pub preset: Option<String>,
}

impl GenerationRequest {
    pub fn for_target(config: &ConfigFile, target: &OutputTarget, cwd: &Path) -> Self {
        Self {
            output: target.output.clone(),
            output_path: resolve_against(cwd, Path::new(&target.output)),
            schema: config
                .schema()
                .iter()
                .chain(target.schema.iter())
                .cloned()
                .collect(),
            documents: config
                .documents()
                .iter()
                .chain(target.documents.iter())
                .cloned()
                .collect(),
            cwd: cwd.to_path_buf(),
            cmd: target.cmd.clone(),
            preset: target.preset.clone(),
        }
    }

    pub fn is_preset(&self) -> bool {
        self.preset.is_some()
    }
}

/// Produces the plugin output string for one target.
pub trait OutputGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigSection, WatchConfig};

    #[test]
    fn global_pointers_come_first() {
        let mut target = OutputTarget::new("out/types.ts");
        target.schema = vec![Pointer::classify("local.graphql")];
        target.documents = vec![Pointer::classify("src/**/*.graphql")];
        let config = ConfigFile::new_unchecked(
            ConfigSection::default(),
            vec![Pointer::classify("schema.graphql")],
            Vec::new(),
            WatchConfig::Disabled,
            vec![target.clone()],
        );

        let request = GenerationRequest::for_target(&config, &target, Path::new("/proj"));
        assert_eq!(request.output_path, PathBuf::from("/proj/out/types.ts"));
        assert_eq!(
            request.schema,
            vec![
                Pointer::classify("schema.graphql"),
                Pointer::classify("local.graphql")
            ]
        );
        assert_eq!(request.documents, vec![Pointer::classify("src/**/*.graphql")]);
        assert!(!request.is_preset());
    }
}
