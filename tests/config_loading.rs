// tests/config_loading.rs

use std::io::Write;

use gendag::config::{load_and_validate, Pointer, WatchConfig};
use gendag::errors::CodegenError;
use gendag::types::TriggerWhileRunningBehaviour;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_is_loaded_and_classified() {
    let file = config_file(
        r#"
schema = "https://api.example.com/graphql"
documents = ["src/**/*.graphql", "!src/**/*.skip.graphql"]
watch = ["extra/**"]

[config]
triggered_while_running_behaviour = "cancel"
concurrency = 2

[[generates]]
output = "src/types.ts"
cmd = "plugin typescript"
watch_pattern = "codegen/*.js"

[[generates]]
output = "src/gql/"
preset = "client"
preset_extension = ".generated.ts"
documents = "src/gql/**/*.graphql"
"#,
    );

    let config = load_and_validate(file.path()).unwrap();

    assert_eq!(config.config_path(), file.path());
    assert_eq!(
        config.config_section().triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert_eq!(config.config_section().concurrency, 2);
    assert_eq!(
        config.schema(),
        &[Pointer::Url("https://api.example.com/graphql".to_string())]
    );
    assert_eq!(config.documents().len(), 2);
    assert_eq!(
        config.watch(),
        &WatchConfig::Patterns(vec!["extra/**".to_string()])
    );

    let types = config.target("src/types.ts").unwrap();
    assert_eq!(types.watch_pattern, vec!["codegen/*.js"]);
    assert!(!types.is_preset());

    let preset = config.target("src/gql/").unwrap();
    assert!(preset.is_preset());
    assert_eq!(preset.preset_extension.as_deref(), Some(".generated.ts"));
}

#[test]
fn defaults_apply_when_sections_are_missing() {
    let file = config_file(
        r#"
[[generates]]
output = "types.ts"
cmd = "plugin"
"#,
    );

    let config = load_and_validate(file.path()).unwrap();

    assert_eq!(
        config.config_section().triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
    assert_eq!(config.config_section().concurrency, 4);
    assert_eq!(config.watch(), &WatchConfig::Disabled);
    assert!(!config.watch().is_enabled());
}

#[test]
fn watch_flag_enables_watching_without_patterns() {
    let file = config_file(
        r#"
watch = true

[[generates]]
output = "types.ts"
"#,
    );

    let config = load_and_validate(file.path()).unwrap();
    assert!(config.watch().is_enabled());
    assert!(config.watch().patterns().is_empty());
}

#[test]
fn missing_outputs_are_a_config_error() {
    let file = config_file("schema = \"schema.graphql\"\n");

    match load_and_validate(file.path()) {
        Err(CodegenError::ConfigError(msg)) => assert!(msg.contains("[[generates]]")),
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn duplicate_outputs_are_rejected() {
    let file = config_file(
        r#"
[[generates]]
output = "types.ts"

[[generates]]
output = "types.ts"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(CodegenError::ConfigError(_))
    ));
}

#[test]
fn unknown_behaviour_is_a_parse_error() {
    let file = config_file(
        r#"
[config]
triggered_while_running_behaviour = "restart"

[[generates]]
output = "types.ts"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(CodegenError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("gendag.toml")),
        Err(CodegenError::IoError(_))
    ));
}
