#![allow(dead_code)]

use gendag::config::{ConfigFile, OneOrMany, RawConfigFile, RawOutputTarget, RawWatch};
use gendag::types::TriggerWhileRunningBehaviour;

fn push(slot: &mut Option<OneOrMany>, value: &str) {
    let value = value.to_string();
    *slot = Some(match slot.take() {
        None => OneOrMany::One(value),
        Some(OneOrMany::One(first)) => OneOrMany::Many(vec![first, value]),
        Some(OneOrMany::Many(mut all)) => {
            all.push(value);
            OneOrMany::Many(all)
        }
    });
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    config_path: Option<String>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            config_path: None,
        }
    }

    pub fn with_target(mut self, target: OutputTargetBuilder) -> Self {
        self.config.generates.push(target.build());
        self
    }

    pub fn with_schema(mut self, pointer: &str) -> Self {
        push(&mut self.config.schema, pointer);
        self
    }

    pub fn with_documents(mut self, pointer: &str) -> Self {
        push(&mut self.config.documents, pointer);
        self
    }

    pub fn with_watch(mut self, enabled: bool) -> Self {
        self.config.watch = Some(RawWatch::Flag(enabled));
        self
    }

    pub fn with_watch_pattern(mut self, pattern: &str) -> Self {
        let mut patterns = match self.config.watch.take() {
            Some(RawWatch::Patterns(existing)) => Some(existing),
            _ => None,
        };
        push(&mut patterns, pattern);
        self.config.watch = patterns.map(RawWatch::Patterns);
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.config.concurrency = concurrency;
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        let config =
            ConfigFile::try_from(self.config).expect("Failed to build valid config from builder");
        match self.config_path {
            Some(path) => config.with_config_path(path),
            None => config,
        }
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[generates]]` entry.
pub struct OutputTargetBuilder {
    target: RawOutputTarget,
}

impl OutputTargetBuilder {
    pub fn new(output: &str) -> Self {
        Self {
            target: RawOutputTarget {
                output: output.to_string(),
                cmd: Some(format!("echo generated {output}")),
                ..RawOutputTarget::default()
            },
        }
    }

    pub fn schema(mut self, pointer: &str) -> Self {
        push(&mut self.target.schema, pointer);
        self
    }

    pub fn documents(mut self, pointer: &str) -> Self {
        push(&mut self.target.documents, pointer);
        self
    }

    pub fn watch_pattern(mut self, pattern: &str) -> Self {
        push(&mut self.target.watch_pattern, pattern);
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.target.cmd = Some(cmd.to_string());
        self
    }

    pub fn preset(mut self, preset: &str, extension: Option<&str>) -> Self {
        self.target.preset = Some(preset.to_string());
        self.target.preset_extension = extension.map(str::to_string);
        self
    }

    pub fn build(self) -> RawOutputTarget {
        self.target
    }
}
