// tests/runner_fake_generator.rs

mod common;

use std::time::Duration;

use common::{abs, producer_chain, run_with};
use gendag::engine::OutputStatus;
use gendag::errors::CodegenError;
use gendag::fs::MockFileSystem;
use gendag_test_utils::{
    init_tracing, with_timeout, ConfigFileBuilder, FakeGenerator, OutputTargetBuilder,
};

const PRODUCER: &str = "generated/schema.graphql";

#[tokio::test]
async fn consumers_start_only_after_the_producer_finished() {
    init_tracing();
    let generator = FakeGenerator::new().delay(PRODUCER, Duration::from_millis(50));
    let fs = MockFileSystem::new();

    let report = with_timeout(run_with(producer_chain().build(), &generator, &fs, None)).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(generator.started()[0], PRODUCER);
    assert_eq!(generator.finished()[0], PRODUCER);
    assert_eq!(generator.started().len(), 3);
    assert_eq!(
        report
            .outputs
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>(),
        vec![PRODUCER, "a.ts", "b.ts"]
    );
    assert!(fs.writes().contains(&abs("a.ts")));
}

#[tokio::test]
async fn failed_producer_blocks_consumers_but_not_independent_outputs() {
    init_tracing();
    let config = producer_chain()
        .with_target(OutputTargetBuilder::new("standalone.ts").schema("api.graphql"))
        .build();
    let generator = FakeGenerator::new().fail_on(PRODUCER, "invalid schema");
    let fs = MockFileSystem::new();

    let report = with_timeout(run_with(config, &generator, &fs, None)).await;

    assert_eq!(
        report.status(PRODUCER),
        Some(&OutputStatus::Failed("invalid schema".to_string()))
    );
    for consumer in ["a.ts", "b.ts"] {
        assert_eq!(
            report.status(consumer),
            Some(&OutputStatus::Blocked {
                dependency: PRODUCER.to_string()
            })
        );
    }
    assert_eq!(report.status("standalone.ts"), Some(&OutputStatus::Written));

    let mut failed = report.failed();
    failed.sort();
    assert_eq!(failed, vec!["a.ts", "b.ts", PRODUCER]);

    let started = generator.started();
    assert!(!started.contains(&"a.ts".to_string()));
    assert!(!started.contains(&"b.ts".to_string()));
}

#[tokio::test]
async fn identical_output_is_left_untouched() {
    let config = ConfigFileBuilder::new()
        .with_target(OutputTargetBuilder::new("types.ts").schema("schema.graphql"))
        .build();
    let generator = FakeGenerator::new().respond("types.ts", "export type A = {};\n");
    let fs = MockFileSystem::new();
    fs.add_file(abs("types.ts"), "export type A = {};\n");

    let report = with_timeout(run_with(config, &generator, &fs, None)).await;

    assert_eq!(report.status("types.ts"), Some(&OutputStatus::Unchanged));
    assert!(fs.writes().is_empty());
}

#[tokio::test]
async fn selection_pulls_in_dependents_and_skips_the_rest() {
    let config = producer_chain()
        .with_target(OutputTargetBuilder::new("standalone.ts").schema("api.graphql"))
        .build();
    let generator = FakeGenerator::new();
    let fs = MockFileSystem::new();

    let report = with_timeout(run_with(
        config,
        &generator,
        &fs,
        Some(vec![PRODUCER.to_string()]),
    ))
    .await;

    assert_eq!(report.status("standalone.ts"), Some(&OutputStatus::Skipped));
    for output in [PRODUCER, "a.ts", "b.ts"] {
        assert_eq!(report.status(output), Some(&OutputStatus::Written));
    }
    assert!(!generator.started().contains(&"standalone.ts".to_string()));
}

#[tokio::test]
async fn unselected_producer_does_not_hold_back_selected_consumer() {
    let generator = FakeGenerator::new();
    let fs = MockFileSystem::new();

    let report = with_timeout(run_with(
        producer_chain().build(),
        &generator,
        &fs,
        Some(vec!["a.ts".to_string()]),
    ))
    .await;

    assert_eq!(report.status(PRODUCER), Some(&OutputStatus::Skipped));
    assert_eq!(report.status("a.ts"), Some(&OutputStatus::Written));
    assert_eq!(generator.started(), vec!["a.ts"]);
}

#[tokio::test]
async fn preset_outputs_are_not_written_by_the_runner() {
    let config = ConfigFileBuilder::new()
        .with_target(
            OutputTargetBuilder::new("src/gql/")
                .schema("schema.graphql")
                .preset("near-operation-file", Some(".generated.ts")),
        )
        .build();
    let generator = FakeGenerator::new();
    let fs = MockFileSystem::new();

    let report = with_timeout(run_with(config, &generator, &fs, None)).await;

    assert_eq!(report.status("src/gql/"), Some(&OutputStatus::Generated));
    assert!(fs.writes().is_empty());
    assert_eq!(
        generator.requests()[0].preset.as_deref(),
        Some("near-operation-file")
    );
}

#[tokio::test]
async fn global_pointers_come_first_in_requests() {
    let config = ConfigFileBuilder::new()
        .with_schema("schema.graphql")
        .with_documents("src/**/*.graphql")
        .with_target(OutputTargetBuilder::new("types.ts").documents("extra.graphql"))
        .build();
    let generator = FakeGenerator::new();

    with_timeout(run_with(config, &generator, &MockFileSystem::new(), None)).await;

    let request = &generator.requests()[0];
    let documents: Vec<&str> = request.documents.iter().map(|p| p.as_str()).collect();
    assert_eq!(documents, vec!["src/**/*.graphql", "extra.graphql"]);
    assert_eq!(request.schema[0].as_str(), "schema.graphql");
    assert_eq!(request.output_path, abs("types.ts"));
}

#[tokio::test]
async fn unknown_selected_output_fails_the_run() {
    use std::sync::Arc;

    use gendag::engine::{run_generation, RunRequest};
    use gendag::exec::OutputWriter;

    let config = Arc::new(producer_chain().build());
    let err = run_generation(
        RunRequest::all(config, common::cwd()).with_selection(Some(vec!["nope.ts".to_string()])),
        Arc::new(FakeGenerator::new()),
        OutputWriter::new(Arc::new(MockFileSystem::new())),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CodegenError::UnknownOutput(name) if name == "nope.ts"));
}
