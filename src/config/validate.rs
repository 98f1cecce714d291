// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, OutputTarget, RawConfigFile, RawOutputTarget, RawWatch, WatchConfig};
use crate::config::pointer::classify_all;
use crate::errors::{CodegenError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CodegenError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let watch = match raw.watch {
            None | Some(RawWatch::Flag(false)) => WatchConfig::Disabled,
            Some(RawWatch::Flag(true)) => WatchConfig::Enabled,
            Some(RawWatch::Patterns(p)) => WatchConfig::Patterns(p.into_vec()),
        };

        let generates = raw.generates.into_iter().map(classify_target).collect();

        Ok(ConfigFile::new_unchecked(
            raw.config,
            classify_all(raw.schema),
            classify_all(raw.documents),
            watch,
            generates,
        ))
    }
}

fn classify_target(raw: RawOutputTarget) -> OutputTarget {
    OutputTarget {
        output: raw.output,
        schema: classify_all(raw.schema),
        documents: classify_all(raw.documents),
        watch_pattern: raw.watch_pattern.map(|p| p.into_vec()).unwrap_or_default(),
        cmd: raw.cmd,
        preset: raw.preset,
        preset_extension: raw.preset_extension,
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_outputs(cfg)?;
    validate_global_config(cfg)?;
    validate_outputs(cfg)?;
    Ok(())
}

fn ensure_has_outputs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.generates.is_empty() {
        return Err(CodegenError::ConfigError(
            "config must contain at least one [[generates]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.concurrency == 0 {
        return Err(CodegenError::ConfigError(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_outputs(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for target in cfg.generates.iter() {
        if target.output.trim().is_empty() {
            return Err(CodegenError::ConfigError(
                "[[generates]] entry has an empty `output`".to_string(),
            ));
        }
        if !seen.insert(target.output.as_str()) {
            return Err(CodegenError::ConfigError(format!(
                "output '{}' is declared more than once in [[generates]]",
                target.output
            )));
        }
        if target.preset_extension.is_some() && target.preset.is_none() {
            return Err(CodegenError::ConfigError(format!(
                "output '{}' sets `preset_extension` without a `preset`",
                target.output
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pointer::{OneOrMany, Pointer};

    fn raw_target(output: &str) -> RawOutputTarget {
        RawOutputTarget {
            output: output.to_string(),
            ..RawOutputTarget::default()
        }
    }

    #[test]
    fn rejects_empty_generates() {
        let err = ConfigFile::try_from(RawConfigFile::default()).unwrap_err();
        assert!(matches!(err, CodegenError::ConfigError(msg) if msg.contains("[[generates]]")));
    }

    #[test]
    fn rejects_duplicate_outputs() {
        let raw = RawConfigFile {
            generates: vec![raw_target("a.ts"), raw_target("a.ts")],
            ..RawConfigFile::default()
        };
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, CodegenError::ConfigError(msg) if msg.contains("'a.ts'")));
    }

    #[test]
    fn classifies_pointers_once() {
        let mut target = raw_target("types.ts");
        target.schema = Some(OneOrMany::Many(vec![
            "http://localhost/graphql".to_string(),
            "schema/*.graphql".to_string(),
        ]));
        let raw = RawConfigFile {
            watch: Some(RawWatch::Flag(true)),
            generates: vec![target],
            ..RawConfigFile::default()
        };

        let cfg = ConfigFile::try_from(raw).unwrap();
        assert!(cfg.watch().is_enabled());
        assert!(cfg.watch().patterns().is_empty());
        assert_eq!(
            cfg.generates()[0].schema,
            vec![
                Pointer::Url("http://localhost/graphql".into()),
                Pointer::Glob("schema/*.graphql".into()),
            ]
        );
    }
}
