// src/dag/waiter.rs

use futures::future::try_join_all;
use tracing::trace;

use crate::dag::graph::DependencyGraph;
use crate::errors::{CodegenError, Result};

/// Wait until every (transitive) dependency of `output` has succeeded.
///
/// All dependencies are awaited concurrently. The first failure to arrive is
/// returned as [`CodegenError::DependencyFailed`].
pub async fn wait_for_dependencies(graph: &DependencyGraph, output: &str) -> Result<()> {
    let dependencies = graph.dependencies_of(output)?;
    let own_path = graph.node(output)?.path().to_path_buf();

    let mut waits = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        if dependency.is_empty() {
            continue;
        }
        let node = graph.node(&dependency)?;
        if node.path() == own_path {
            continue;
        }

        let running = node.running();
        let output = output.to_string();
        waits.push(async move {
            trace!(output = %output, dependency = %dependency, "waiting for dependency");
            running
                .await
                .map_err(|reason| CodegenError::DependencyFailed {
                    output,
                    dependency,
                    reason,
                })
        });
    }

    try_join_all(waits).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::OutputTarget;
    use crate::config::pointer::Pointer;
    use anyhow::anyhow;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn graph() -> Arc<DependencyGraph> {
        let mut consumer = OutputTarget::new("types.ts");
        consumer.schema = vec![Pointer::classify("schema.graphql")];
        let producer = OutputTarget::new("schema.graphql");
        Arc::new(DependencyGraph::build(&[consumer, producer], Path::new("/proj")).unwrap())
    }

    #[tokio::test]
    async fn resolves_immediately_without_dependencies() {
        let graph = graph();
        wait_for_dependencies(&graph, "schema.graphql").await.unwrap();
    }

    #[tokio::test]
    async fn waits_for_producer_success() {
        let graph = graph();
        let waiter = {
            let graph = Arc::clone(&graph);
            tokio::spawn(async move { wait_for_dependencies(&graph, "types.ts").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        graph.node("schema.graphql").unwrap().success();
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter did not resolve")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn producer_failure_fails_the_wait() {
        let graph = graph();
        graph
            .node("schema.graphql")
            .unwrap()
            .fail(anyhow!("introspection failed"));

        let err = wait_for_dependencies(&graph, "types.ts").await.unwrap_err();
        match err {
            CodegenError::DependencyFailed {
                output,
                dependency,
                reason,
            } => {
                assert_eq!(output, "types.ts");
                assert_eq!(dependency, "schema.graphql");
                assert_eq!(reason.to_string(), "introspection failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_output_is_an_error() {
        let graph = graph();
        assert!(matches!(
            wait_for_dependencies(&graph, "nope.ts").await,
            Err(CodegenError::UnknownOutput(_))
        ));
    }
}
