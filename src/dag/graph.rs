// src/dag/graph.rs

//! Dependency graph between output targets.
//!
//! Edge direction: dependency -> dependent. For
//!
//! ```toml
//! [[generates]]
//! output = "schema.graphql"
//!
//! [[generates]]
//! output = "types.ts"
//! schema = "schema.graphql"
//! ```
//!
//! we add the edge `schema.graphql -> types.ts`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::config::model::OutputTarget;
use crate::config::pointer::Pointer;
use crate::dag::signal::{CompletionSignal, SignalResult, SignalStatus};
use crate::errors::{CodegenError, Result};
use crate::watch::path_utils::{relative_to_cwd, resolve_against, to_slash};
use crate::watch::patterns::{compile_glob, normalize_pattern, scan_pattern};

/// One output target plus its completion signal.
#[derive(Debug)]
pub struct DependencyGraphNode {
    target: OutputTarget,
    path: PathBuf,
    signal: CompletionSignal,
}

impl DependencyGraphNode {
    pub fn output(&self) -> &str {
        &self.target.output
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Absolute, lexically normalized output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn success(&self) {
        self.signal.success();
    }

    pub fn fail(&self, error: anyhow::Error) {
        self.signal.fail(error);
    }

    pub fn running(&self) -> futures::future::BoxFuture<'static, SignalResult> {
        self.signal.running()
    }

    pub fn status(&self) -> SignalStatus {
        self.signal.status()
    }
}

/// Acyclic graph of output targets, keyed by normalized absolute path.
#[derive(Debug)]
pub struct DependencyGraph {
    cwd: PathBuf,
    nodes: Vec<DependencyGraphNode>,
    index: HashMap<PathBuf, NodeIndex>,
    graph: DiGraph<usize, ()>,
}

impl DependencyGraph {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            graph: DiGraph::new(),
        }
    }

    /// Build the graph for `targets`, in declaration order.
    ///
    /// A target depends on another when one of its schema or documents
    /// pointers names (or, as a glob, matches) the other's output path.
    pub fn build(targets: &[OutputTarget], cwd: &Path) -> Result<Self> {
        let mut graph = Self::new(cwd);
        for target in targets {
            graph.add_node(target.clone())?;
        }

        for producer in 0..graph.nodes.len() {
            for consumer in 0..graph.nodes.len() {
                if producer == consumer {
                    continue;
                }
                if graph.consumes(consumer, producer)? {
                    let dependent = graph.nodes[consumer].output().to_string();
                    let dependency = graph.nodes[producer].output().to_string();
                    graph.add_dependency(&dependent, &dependency)?;
                }
            }
        }

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.graph.edge_count(),
            "built output dependency graph"
        );
        Ok(graph)
    }

    pub fn add_node(&mut self, target: OutputTarget) -> Result<()> {
        let path = resolve_against(&self.cwd, Path::new(&target.output));
        if let Some(existing) = self.index.get(&path) {
            return Err(CodegenError::ConfigError(format!(
                "outputs '{}' and '{}' refer to the same path {:?}",
                self.nodes[self.graph[*existing]].output(),
                target.output,
                path
            )));
        }

        let idx = self.graph.add_node(self.nodes.len());
        self.index.insert(path.clone(), idx);
        self.nodes.push(DependencyGraphNode {
            target,
            path,
            signal: CompletionSignal::new(),
        });
        Ok(())
    }

    fn consumes(&self, consumer: usize, producer: usize) -> Result<bool> {
        let target = &self.nodes[consumer].target;
        let produced = &self.nodes[producer].path;

        for pointer in target.schema.iter().chain(target.documents.iter()) {
            let matched = match pointer {
                Pointer::FilePath(path) => resolve_against(&self.cwd, Path::new(path)) == *produced,
                Pointer::Glob(pattern) => self.glob_matches(pattern, produced)?,
                Pointer::Url(_) | Pointer::InlineSource(_) => false,
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn glob_matches(&self, pattern: &str, produced: &Path) -> Result<bool> {
        if scan_pattern(pattern).negated {
            return Ok(false);
        }
        let pattern = normalize_pattern(pattern, &self.cwd);
        let candidate = if Path::new(&pattern).is_absolute() {
            to_slash(produced)
        } else {
            relative_to_cwd(&self.cwd, produced)
        };
        Ok(compile_glob(&pattern)?.is_match(candidate))
    }

    fn index_of(&self, output: &str) -> Result<NodeIndex> {
        let path = resolve_against(&self.cwd, Path::new(output));
        self.index
            .get(&path)
            .copied()
            .ok_or_else(|| CodegenError::UnknownOutput(output.to_string()))
    }

    fn name(&self, idx: NodeIndex) -> &str {
        self.nodes[self.graph[idx]].output()
    }

    /// Record that `dependent` consumes the output of `dependency`.
    ///
    /// Fails with [`CodegenError::CircularDependency`] if the edge would close
    /// a cycle. Adding an existing edge again is a no-op.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let to = self.index_of(dependent)?;
        let from = self.index_of(dependency)?;

        if from == to {
            let name = self.name(to).to_string();
            return Err(CodegenError::CircularDependency {
                outputs: vec![name.clone(), name],
            });
        }
        if self.graph.contains_edge(from, to) {
            return Ok(());
        }
        if has_path_connecting(&self.graph, to, from, None) {
            let mut outputs: Vec<String> = self
                .path_between(to, from)
                .into_iter()
                .map(|idx| self.name(idx).to_string())
                .collect();
            outputs.push(self.name(to).to_string());
            return Err(CodegenError::CircularDependency { outputs });
        }

        self.graph.add_edge(from, to, ());
        debug!(dependent, dependency, "added output dependency");
        Ok(())
    }

    /// Shortest chain of nodes from `start` to `goal` along edge direction.
    fn path_between(&self, start: NodeIndex, goal: NodeIndex) -> Vec<NodeIndex> {
        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                break;
            }
            for next in self.neighbors(current, Direction::Outgoing) {
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        let mut chain = vec![goal];
        let mut current = goal;
        while let Some(&prev) = previous.get(&current) {
            chain.push(prev);
            current = prev;
        }
        chain.reverse();
        chain
    }

    /// Neighbours in the order their edges were added.
    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        out.reverse();
        out
    }

    fn visit(
        &self,
        idx: NodeIndex,
        direction: Direction,
        visited: &mut HashSet<NodeIndex>,
        out: &mut Vec<NodeIndex>,
    ) {
        if !visited.insert(idx) {
            return;
        }
        for next in self.neighbors(idx, direction) {
            self.visit(next, direction, visited, out);
        }
        out.push(idx);
    }

    fn names(&self, indices: Vec<NodeIndex>) -> Vec<String> {
        indices
            .into_iter()
            .map(|idx| self.name(idx).to_string())
            .collect()
    }

    /// All outputs in an order where every dependency precedes its
    /// dependents. Unrelated outputs keep declaration order.
    pub fn overall_order(&self) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut out = Vec::with_capacity(self.nodes.len());

        for idx in self.graph.node_indices() {
            let has_dependents = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_some();
            if !has_dependents {
                self.visit(idx, Direction::Incoming, &mut visited, &mut out);
            }
        }

        self.names(out)
    }

    /// Transitive dependencies of `output`, dependencies first.
    pub fn dependencies_of(&self, output: &str) -> Result<Vec<String>> {
        self.transitive(output, Direction::Incoming)
    }

    /// Transitive dependents of `output`.
    pub fn dependents_of(&self, output: &str) -> Result<Vec<String>> {
        self.transitive(output, Direction::Outgoing)
    }

    pub fn direct_dependencies_of(&self, output: &str) -> Result<Vec<String>> {
        let idx = self.index_of(output)?;
        Ok(self.names(self.neighbors(idx, Direction::Incoming)))
    }

    fn transitive(&self, output: &str, direction: Direction) -> Result<Vec<String>> {
        let start = self.index_of(output)?;
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.visit(start, direction, &mut visited, &mut out);
        out.retain(|idx| *idx != start);
        Ok(self.names(out))
    }

    pub fn node(&self, output: &str) -> Result<&DependencyGraphNode> {
        let idx = self.index_of(output)?;
        Ok(&self.nodes[self.graph[idx]])
    }

    pub fn contains(&self, output: &str) -> bool {
        self.index_of(output).is_ok()
    }

    /// Outputs in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(DependencyGraphNode::output)
    }

    pub fn nodes(&self) -> &[DependencyGraphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(output: &str, schema: &[&str], documents: &[&str]) -> OutputTarget {
        let mut t = OutputTarget::new(output);
        t.schema = schema.iter().map(|s| Pointer::classify(s)).collect();
        t.documents = documents.iter().map(|s| Pointer::classify(s)).collect();
        t
    }

    fn cwd() -> &'static Path {
        Path::new("/proj")
    }

    #[test]
    fn static_schema_pointer_orders_producer_first() {
        let targets = vec![
            target("types.ts", &["schema.graphql"], &[]),
            target("schema.graphql", &["https://example.com/graphql"], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(graph.overall_order(), vec!["schema.graphql", "types.ts"]);
        assert_eq!(graph.dependencies_of("types.ts").unwrap(), vec!["schema.graphql"]);
        assert_eq!(graph.dependents_of("schema.graphql").unwrap(), vec!["types.ts"]);
    }

    #[test]
    fn glob_documents_pointer_creates_edge() {
        let targets = vec![
            target("client.ts", &["schema.graphql"], &["generated/**/*.graphql"]),
            target("generated/ops/queries.graphql", &["schema.graphql"], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(
            graph.overall_order(),
            vec!["generated/ops/queries.graphql", "client.ts"]
        );
    }

    #[test]
    fn url_pointers_never_create_edges() {
        let targets = vec![
            target("b.ts", &["https://example.com/a.graphql"], &[]),
            target("https://example.com/a.graphql", &[], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(
            graph.overall_order(),
            vec!["b.ts", "https://example.com/a.graphql"]
        );
        assert!(graph.dependencies_of("b.ts").unwrap().is_empty());
    }

    #[test]
    fn absolute_and_relative_keys_resolve_to_same_node() {
        let targets = vec![
            target("/proj/consumer.ts", &["./out/schema.graphql"], &[]),
            target("out/schema.graphql", &[], &[]),
            target("other.ts", &["/proj/out/schema.graphql"], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(
            graph.overall_order(),
            vec!["out/schema.graphql", "/proj/consumer.ts", "other.ts"]
        );
        assert_eq!(graph.node("./consumer.ts").unwrap().output(), "/proj/consumer.ts");
    }

    #[test]
    fn negated_globs_do_not_create_edges() {
        let targets = vec![
            target("a.ts", &[], &["!gen.graphql"]),
            target("gen.graphql", &[], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert!(graph.dependencies_of("a.ts").unwrap().is_empty());
    }

    #[test]
    fn unrelated_outputs_keep_declaration_order() {
        let targets = vec![
            target("c.ts", &[], &[]),
            target("a.ts", &[], &[]),
            target("b.ts", &[], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(graph.overall_order(), vec!["c.ts", "a.ts", "b.ts"]);
    }

    #[test]
    fn dependencies_are_transitive() {
        let targets = vec![
            target("c.ts", &["b.graphql"], &[]),
            target("b.graphql", &["a.graphql"], &[]),
            target("a.graphql", &[], &[]),
        ];
        let graph = DependencyGraph::build(&targets, cwd()).unwrap();
        assert_eq!(
            graph.dependencies_of("c.ts").unwrap(),
            vec!["a.graphql", "b.graphql"]
        );
        assert_eq!(graph.direct_dependencies_of("c.ts").unwrap(), vec!["b.graphql"]);
        assert_eq!(
            graph.dependents_of("a.graphql").unwrap(),
            vec!["c.ts", "b.graphql"]
        );
    }

    #[test]
    fn cycles_are_rejected_with_the_chain() {
        let targets = vec![
            target("a.graphql", &["b.graphql"], &[]),
            target("b.graphql", &["a.graphql"], &[]),
        ];
        let err = DependencyGraph::build(&targets, cwd()).unwrap_err();
        match err {
            CodegenError::CircularDependency { outputs } => {
                assert_eq!(outputs.first(), outputs.last());
                assert!(outputs.contains(&"a.graphql".to_string()));
                assert!(outputs.contains(&"b.graphql".to_string()));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let targets = vec![
            target("b.ts", &["a.graphql"], &["a.graphql"]),
            target("a.graphql", &[], &[]),
        ];
        let mut graph = DependencyGraph::build(&targets, cwd()).unwrap();
        graph.add_dependency("b.ts", "a.graphql").unwrap();
        assert_eq!(graph.direct_dependencies_of("b.ts").unwrap(), vec!["a.graphql"]);
    }

    #[test]
    fn same_path_twice_is_a_config_error() {
        let targets = vec![target("a.ts", &[], &[]), target("./a.ts", &[], &[])];
        let err = DependencyGraph::build(&targets, cwd()).unwrap_err();
        assert!(matches!(err, CodegenError::ConfigError(_)));
    }

    #[test]
    fn unknown_outputs_are_reported() {
        let graph = DependencyGraph::build(&[target("a.ts", &[], &[])], cwd()).unwrap();
        assert!(matches!(
            graph.dependencies_of("missing.ts"),
            Err(CodegenError::UnknownOutput(name)) if name == "missing.ts"
        ));
    }
}
