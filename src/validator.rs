//! Structural validation of a workflow graph
//!
//! Checks run in a fixed order so the problem list is deterministic:
//! - Layer 1: Graph - at least one state
//! - Layer 2: Ids - present and unique
//! - Layer 3: Names - present and unique
//! - Layer 4: Edges - endpoints resolve, self-loops and repeats flagged
//! - Layer 5: Connectivity - no isolated states (warnings)
//!
//! Validation only inspects; it never compiles and never mutates.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::graph::WorkflowGraph;
use crate::problem::{Problem, ProblemKind, Severity, ValidationReport};
use crate::types::{EdgeId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report warnings with error severity
    pub warnings_as_errors: bool,
    /// Flag edges whose source and target are the same node
    pub report_self_loops: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            warnings_as_errors: false,
            report_self_loops: true,
        }
    }
}

/// Runs every validation layer under a configuration
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a graph through all layers
    pub fn validate(&self, graph: &WorkflowGraph) -> ValidationReport {
        let mut report = ValidationReport::new(graph.node_count(), graph.edge_count());

        for problem in run_layers(graph) {
            if problem.kind == ProblemKind::SelfLoop && !self.config.report_self_loops {
                continue;
            }
            if self.config.warnings_as_errors && problem.severity == Severity::Warning {
                report.add(problem.with_severity(Severity::Error));
            } else {
                report.add(problem);
            }
        }

        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validated workflow graph"
        );
        report
    }
}

/// Validate with default configuration, returning problems in check order
pub fn validate(graph: &WorkflowGraph) -> Vec<Problem> {
    run_layers(graph).collect()
}

fn run_layers(graph: &WorkflowGraph) -> impl Iterator<Item = Problem> {
    [
        check_graph(graph),
        check_ids(graph),
        check_names(graph),
        check_edges(graph),
        check_connectivity(graph),
    ]
    .into_iter()
    .flatten()
}

/// Layer 1: the workflow must have at least one state
pub fn check_graph(graph: &WorkflowGraph) -> Vec<Problem> {
    if graph.is_empty() {
        vec![Problem::empty_graph()]
    } else {
        Vec::new()
    }
}

/// Layer 2: ids present and unique
pub fn check_ids(graph: &WorkflowGraph) -> Vec<Problem> {
    let mut problems = Vec::new();

    let mut seen_nodes = HashSet::new();
    for (pos, node) in graph.nodes().iter().enumerate() {
        if node.id.is_blank() {
            problems.push(Problem::missing_node_id(pos));
        } else if !seen_nodes.insert(&node.id) {
            problems.push(Problem::duplicate_node_id(node));
        }
    }

    let mut seen_edges = HashSet::new();
    for (pos, edge) in graph.edges().iter().enumerate() {
        if edge.id.is_blank() {
            problems.push(Problem::missing_edge_id(pos));
        } else if !seen_edges.insert(&edge.id) {
            problems.push(Problem::duplicate_edge_id(edge));
        }
    }

    problems
}

/// Layer 3: every node named, no name used twice
pub fn check_names(graph: &WorkflowGraph) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut first_owner: HashMap<&str, &NodeId> = HashMap::new();

    for node in graph.nodes() {
        if !node.has_name() {
            problems.push(Problem::missing_node_name(node));
            continue;
        }
        match first_owner.get(node.name.as_str()) {
            Some(first) => problems.push(Problem::duplicate_node_name(node, first)),
            None => {
                first_owner.insert(node.name.as_str(), &node.id);
            }
        }
    }

    problems
}

/// Layer 4: endpoints resolve; self-loops and repeated connections are
/// reported as warnings
pub fn check_edges(graph: &WorkflowGraph) -> Vec<Problem> {
    let mut problems = Vec::new();
    let node_ids: HashSet<&NodeId> = graph.nodes().iter().map(|n| &n.id).collect();
    let mut first_edge: HashMap<(&NodeId, &NodeId), &EdgeId> = HashMap::new();

    for edge in graph.edges() {
        if !node_ids.contains(&edge.source_id) {
            problems.push(Problem::dangling_edge(edge, "source", &edge.source_id));
        }
        if !node_ids.contains(&edge.target_id) {
            problems.push(Problem::dangling_edge(edge, "target", &edge.target_id));
        }
        if edge.is_self_loop() {
            problems.push(Problem::self_loop(edge));
        }
        match first_edge.get(&(&edge.source_id, &edge.target_id)) {
            Some(first) => problems.push(Problem::duplicate_edge(edge, first)),
            None => {
                first_edge.insert((&edge.source_id, &edge.target_id), &edge.id);
            }
        }
    }

    problems
}

/// Layer 5: with more than one state, each must touch at least one edge
pub fn check_connectivity(graph: &WorkflowGraph) -> Vec<Problem> {
    if graph.node_count() <= 1 {
        return Vec::new();
    }

    let connected: HashSet<&NodeId> = graph
        .edges()
        .iter()
        .flat_map(|e| [&e.source_id, &e.target_id])
        .collect();

    graph
        .nodes()
        .iter()
        .filter(|n| !connected.contains(&n.id))
        .map(Problem::disconnected_node)
        .collect()
}
