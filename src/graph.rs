//! Workflow graph: state nodes and transition edges
//!
//! The graph is the editing-time model. Nodes are addressed by [`NodeId`],
//! but at runtime a state is only ever addressed by its name, so renames
//! require a recompile (see [`crate::compiler`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{FlowgateError, Result};
use crate::types::{sequence_of, EdgeId, NodeId, MAX_SEQUENCE};

/// One workflow state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: NodeId,
    /// Runtime key of the state. Empty names are reported, never compiled.
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "label", skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Roles allowed to act while an entity sits in this state
    #[serde(default, rename = "roles")]
    pub allowed_roles: BTreeSet<String>,
}

impl StateNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_label: None,
            color: None,
            allowed_roles: BTreeSet::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Whitespace-only names count as missing
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// One directed transition between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub id: EdgeId,
    #[serde(rename = "source")]
    pub source_id: NodeId,
    #[serde(rename = "target")]
    pub target_id: NodeId,
    #[serde(default)]
    pub actions: Vec<String>,
    /// Empty means unrestricted
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl TransitionEdge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source_id: source.into(),
            target_id: target.into(),
            actions: Vec::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Graph as it appears in a document (raw)
#[derive(Debug, Deserialize)]
struct WorkflowGraphRaw {
    #[serde(default)]
    nodes: Vec<StateNode>,
    #[serde(default)]
    edges: Vec<TransitionEdge>,
    #[serde(default)]
    next_node: u64,
    #[serde(default)]
    next_edge: u64,
}

/// The authored workflow: ordered nodes and ordered edges
///
/// Order is display order only. The graph owns its nodes and edges
/// exclusively; removing a node removes every edge touching it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "WorkflowGraphRaw")]
pub struct WorkflowGraph {
    nodes: Vec<StateNode>,
    edges: Vec<TransitionEdge>,
    /// Highest sequence number handed out for generated node ids.
    /// Persisted so ids removed before a save stay retired after a load.
    #[serde(skip_serializing_if = "is_zero")]
    next_node: u64,
    #[serde(skip_serializing_if = "is_zero")]
    next_edge: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl From<WorkflowGraphRaw> for WorkflowGraph {
    fn from(raw: WorkflowGraphRaw) -> Self {
        let mut graph = WorkflowGraph::from_parts(raw.nodes, raw.edges);
        if raw.next_node <= MAX_SEQUENCE {
            graph.next_node = graph.next_node.max(raw.next_node);
        }
        if raw.next_edge <= MAX_SEQUENCE {
            graph.next_edge = graph.next_edge.max(raw.next_edge);
        }
        graph
    }
}

impl PartialEq for WorkflowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Eq for WorkflowGraph {}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from loaded parts without checking them
    ///
    /// Loaded documents may be malformed (dangling edges, duplicate ids);
    /// run the validator to find out. Id counters start past every
    /// generated-looking id already present; suffixes above
    /// [`MAX_SEQUENCE`] are treated as opaque ids.
    pub fn from_parts(nodes: Vec<StateNode>, edges: Vec<TransitionEdge>) -> Self {
        let next_node = nodes
            .iter()
            .filter_map(|n| sequence_of(&n.id, NodeId::PREFIX))
            .max()
            .unwrap_or(0);
        let next_edge = edges
            .iter()
            .filter_map(|e| sequence_of(&e.id, EdgeId::PREFIX))
            .max()
            .unwrap_or(0);

        Self {
            nodes,
            edges,
            next_node,
            next_edge,
        }
    }

    pub fn nodes(&self) -> &[StateNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TransitionEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&StateNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&TransitionEdge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// First node carrying `name` (exact, case-sensitive)
    pub fn node_by_name(&self, name: &str) -> Option<&StateNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Edges leaving `id`, in edge order
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a TransitionEdge> + 'a {
        self.edges.iter().filter(move |e| &e.source_id == id)
    }

    // ─────────────────────────────────────────────────────────────
    // Node operations
    // ─────────────────────────────────────────────────────────────

    /// Add a state with a freshly assigned id
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.fresh_node_id();
        self.nodes.push(StateNode::new(id.clone(), name));
        id
    }

    /// Add a fully described node under its own id
    pub fn insert_node(&mut self, node: StateNode) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(FlowgateError::DuplicateId {
                id: node.id.to_string(),
            });
        }
        if let Some(seq) = sequence_of(&node.id, NodeId::PREFIX) {
            self.next_node = self.next_node.max(seq);
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every edge that starts or ends at it
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(StateNode, Vec<TransitionEdge>)> {
        let pos = self.node_position(id)?;
        let node = self.nodes.remove(pos);

        let (cascaded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| &e.source_id == id || &e.target_id == id);
        self.edges = kept;

        Ok((node, cascaded))
    }

    /// Rename a node, returning the previous name
    ///
    /// Already compiled tables keep the old name until recompiled.
    pub fn rename_node(&mut self, id: &NodeId, name: impl Into<String>) -> Result<String> {
        let pos = self.node_position(id)?;
        Ok(std::mem::replace(&mut self.nodes[pos].name, name.into()))
    }

    pub fn set_node_roles<I, S>(&mut self, id: &NodeId, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pos = self.node_position(id)?;
        self.nodes[pos].allowed_roles = roles.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn set_node_label(&mut self, id: &NodeId, label: Option<String>) -> Result<()> {
        let pos = self.node_position(id)?;
        self.nodes[pos].display_label = label;
        Ok(())
    }

    pub fn set_node_color(&mut self, id: &NodeId, color: Option<String>) -> Result<()> {
        let pos = self.node_position(id)?;
        self.nodes[pos].color = color;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Edge operations
    // ─────────────────────────────────────────────────────────────

    /// Connect two existing nodes with a fresh edge
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Result<EdgeId> {
        self.node_position(source)?;
        self.node_position(target)?;

        let id = self.fresh_edge_id();
        self.edges
            .push(TransitionEdge::new(id.clone(), source.clone(), target.clone()));
        Ok(id)
    }

    /// Add a fully described edge; both endpoints must exist
    pub fn insert_edge(&mut self, edge: TransitionEdge) -> Result<()> {
        if self.edge(&edge.id).is_some() {
            return Err(FlowgateError::DuplicateId {
                id: edge.id.to_string(),
            });
        }
        self.node_position(&edge.source_id)?;
        self.node_position(&edge.target_id)?;

        if let Some(seq) = sequence_of(&edge.id, EdgeId::PREFIX) {
            self.next_edge = self.next_edge.max(seq);
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<TransitionEdge> {
        let pos = self.edge_position(id)?;
        Ok(self.edges.remove(pos))
    }

    pub fn set_edge_actions<I, S>(&mut self, id: &EdgeId, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pos = self.edge_position(id)?;
        self.edges[pos].actions = actions.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn set_edge_roles<I, S>(&mut self, id: &EdgeId, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pos = self.edge_position(id)?;
        self.edges[pos].roles = roles.into_iter().map(Into::into).collect();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────

    fn node_position(&self, id: &NodeId) -> Result<usize> {
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| FlowgateError::NodeNotFound { id: id.to_string() })
    }

    fn edge_position(&self, id: &EdgeId) -> Result<usize> {
        self.edges
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| FlowgateError::EdgeNotFound { id: id.to_string() })
    }

    // Counters only move forward, so removed ids are never handed out again.
    // They are seeded at most at MAX_SEQUENCE, far below u64::MAX.
    fn fresh_node_id(&mut self) -> NodeId {
        loop {
            self.next_node += 1;
            let id = NodeId::new(format!("{}{}", NodeId::PREFIX, self.next_node));
            if self.node(&id).is_none() {
                return id;
            }
        }
    }

    fn fresh_edge_id(&mut self) -> EdgeId {
        loop {
            self.next_edge += 1;
            let id = EdgeId::new(format!("{}{}", EdgeId::PREFIX, self.next_edge));
            if self.edge(&id).is_none() {
                return id;
            }
        }
    }
}
