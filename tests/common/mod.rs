// tests/common/mod.rs

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gendag::config::{ConfigFile, OutputTarget};
use gendag::engine::{run_generation, RunReport, RunRequest};
use gendag::exec::{OutputGenerator, OutputWriter};
use gendag::fs::{FileSystem, MockFileSystem};
use gendag_test_utils::{ConfigFileBuilder, FakeGenerator, OutputTargetBuilder};

pub const PROJECT: &str = "/proj";

pub fn cwd() -> PathBuf {
    PathBuf::from(PROJECT)
}

pub fn abs(path: &str) -> PathBuf {
    Path::new(PROJECT).join(path)
}

pub fn targets(config: &ConfigFile) -> Vec<OutputTarget> {
    config.generates().to_vec()
}

/// A schema producer plus two consumers, declared consumers first.
///
/// - `a.ts` reads the generated schema by path.
/// - `b.ts` reads it through a glob.
pub fn producer_chain() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_target(OutputTargetBuilder::new("a.ts").schema("generated/schema.graphql"))
        .with_target(OutputTargetBuilder::new("b.ts").documents("generated/*.graphql"))
        .with_target(OutputTargetBuilder::new("generated/schema.graphql").schema("api.graphql"))
}

/// Run one generation against a mock filesystem rooted at [`PROJECT`].
pub async fn run_with(
    config: ConfigFile,
    generator: &FakeGenerator,
    fs: &MockFileSystem,
    selection: Option<Vec<String>>,
) -> RunReport {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let generator: Arc<dyn OutputGenerator> = Arc::new(generator.clone());
    run_generation(
        RunRequest::all(Arc::new(config), cwd()).with_selection(selection),
        generator,
        OutputWriter::new(fs),
    )
    .await
    .expect("run should not fail as a whole")
}

/// Poll `condition` until it holds; panics after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
