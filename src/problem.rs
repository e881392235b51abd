//! Structural problems found in a workflow graph
//!
//! Problems are data, not errors: the compiler and the validator return them
//! and the caller decides whether an `Error`-severity problem blocks a save.

use std::fmt;

use serde::Serialize;

use crate::graph::{StateNode, TransitionEdge};
use crate::types::{EdgeId, NodeId};

/// Severity of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What kind of structural issue was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// The graph has no states at all
    EmptyGraph,
    /// A node or edge has a blank id
    MissingId,
    /// Two nodes or two edges share an id
    DuplicateId,
    MissingNodeName,
    DuplicateNodeName,
    /// An edge endpoint does not resolve to a named node
    DanglingEdge,
    /// Two edges join the same source and target
    DuplicateEdge,
    DisconnectedNode,
    SelfLoop,
}

impl ProblemKind {
    /// Severity a problem of this kind carries unless configuration says otherwise
    pub fn default_severity(self) -> Severity {
        match self {
            ProblemKind::DuplicateEdge | ProblemKind::DisconnectedNode | ProblemKind::SelfLoop => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProblemKind::EmptyGraph => "empty_graph",
            ProblemKind::MissingId => "missing_id",
            ProblemKind::DuplicateId => "duplicate_id",
            ProblemKind::MissingNodeName => "missing_node_name",
            ProblemKind::DuplicateNodeName => "duplicate_node_name",
            ProblemKind::DanglingEdge => "dangling_edge",
            ProblemKind::DuplicateEdge => "duplicate_edge",
            ProblemKind::DisconnectedNode => "disconnected_node",
            ProblemKind::SelfLoop => "self_loop",
        }
    }
}

/// The graph element a problem points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ProblemRef {
    Graph,
    Node(NodeId),
    Edge(EdgeId),
}

impl fmt::Display for ProblemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemRef::Graph => write!(f, "graph"),
            ProblemRef::Node(id) => write!(f, "node '{}'", id),
            ProblemRef::Edge(id) => write!(f, "edge '{}'", id),
        }
    }
}

/// A single structural problem with context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "ref")]
    pub subject: ProblemRef,
}

impl Problem {
    pub fn new(kind: ProblemKind, subject: ProblemRef, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            subject,
        }
    }

    pub fn empty_graph() -> Self {
        Self::new(
            ProblemKind::EmptyGraph,
            ProblemRef::Graph,
            "workflow must have at least one state",
        )
    }

    pub fn missing_node_id(position: usize) -> Self {
        Self::new(
            ProblemKind::MissingId,
            ProblemRef::Node(NodeId::new("")),
            format!("node at position {} has no id", position),
        )
    }

    pub fn missing_edge_id(position: usize) -> Self {
        Self::new(
            ProblemKind::MissingId,
            ProblemRef::Edge(EdgeId::new("")),
            format!("edge at position {} has no id", position),
        )
    }

    pub fn duplicate_node_id(node: &StateNode) -> Self {
        Self::new(
            ProblemKind::DuplicateId,
            ProblemRef::Node(node.id.clone()),
            format!("node id '{}' is used more than once", node.id),
        )
    }

    pub fn duplicate_edge_id(edge: &TransitionEdge) -> Self {
        Self::new(
            ProblemKind::DuplicateId,
            ProblemRef::Edge(edge.id.clone()),
            format!("edge id '{}' is used more than once", edge.id),
        )
    }

    pub fn missing_node_name(node: &StateNode) -> Self {
        Self::new(
            ProblemKind::MissingNodeName,
            ProblemRef::Node(node.id.clone()),
            format!("node '{}' is missing required name", node.id),
        )
    }

    pub fn duplicate_node_name(node: &StateNode, first: &NodeId) -> Self {
        Self::new(
            ProblemKind::DuplicateNodeName,
            ProblemRef::Node(node.id.clone()),
            format!(
                "state name '{}' on node '{}' is already used by node '{}'",
                node.name, node.id, first
            ),
        )
    }

    /// `end` is "source" or "target"
    pub fn dangling_edge(edge: &TransitionEdge, end: &str, missing: &NodeId) -> Self {
        Self::new(
            ProblemKind::DanglingEdge,
            ProblemRef::Edge(edge.id.clone()),
            format!(
                "edge '{}' {} '{}' does not exist",
                edge.id, end, missing
            ),
        )
    }

    pub fn unnamed_endpoint(edge: &TransitionEdge, end: &str, node: &NodeId) -> Self {
        Self::new(
            ProblemKind::DanglingEdge,
            ProblemRef::Edge(edge.id.clone()),
            format!(
                "edge '{}' {} '{}' has no state name",
                edge.id, end, node
            ),
        )
    }

    pub fn duplicate_edge(edge: &TransitionEdge, first: &EdgeId) -> Self {
        Self::new(
            ProblemKind::DuplicateEdge,
            ProblemRef::Edge(edge.id.clone()),
            format!(
                "edge '{}' repeats edge '{}' from '{}' to '{}'",
                edge.id, first, edge.source_id, edge.target_id
            ),
        )
    }

    pub fn disconnected_node(node: &StateNode) -> Self {
        Self::new(
            ProblemKind::DisconnectedNode,
            ProblemRef::Node(node.id.clone()),
            format!("state '{}' has no transitions in or out", node.name),
        )
    }

    pub fn self_loop(edge: &TransitionEdge) -> Self {
        Self::new(
            ProblemKind::SelfLoop,
            ProblemRef::Edge(edge.id.clone()),
            format!(
                "edge '{}' loops from node '{}' back to itself",
                edge.id, edge.source_id
            ),
        )
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Get suggestion for fixing this problem
    pub fn suggestion(&self) -> &'static str {
        match self.kind {
            ProblemKind::EmptyGraph => "Add at least one state",
            ProblemKind::MissingId => "Give every node and edge a unique id",
            ProblemKind::DuplicateId => "Re-create the element so the graph assigns a fresh id",
            ProblemKind::MissingNodeName => "Name the state; names are how entities refer to it",
            ProblemKind::DuplicateNodeName => "Rename one of the states so every name is unique",
            ProblemKind::DanglingEdge => "Delete the edge or reconnect it to an existing state",
            ProblemKind::DuplicateEdge => "Merge the actions and roles into one edge",
            ProblemKind::DisconnectedNode => "Connect the state or remove it",
            ProblemKind::SelfLoop => "Keep it only if the state should transition to itself",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind.as_str(), self.message)
    }
}

/// Result of validating a workflow graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub errors: Vec<Problem>,
    pub warnings: Vec<Problem>,
}

impl ValidationReport {
    pub fn new(node_count: usize, edge_count: usize) -> Self {
        Self {
            node_count,
            edge_count,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add(&mut self, problem: Problem) {
        match problem.severity {
            Severity::Error => self.errors.push(problem),
            Severity::Warning => self.warnings.push(problem),
        }
    }

    /// Errors first, then warnings
    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn into_problems(self) -> Vec<Problem> {
        let mut all = self.errors;
        all.extend(self.warnings);
        all
    }
}
