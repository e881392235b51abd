//! Builder patterns for ergonomic graph construction
//!
//! States are referred to by name while building; ids are assigned by the
//! graph when [`GraphBuilder::build`] runs.

use std::collections::BTreeSet;

use crate::error::{FlowgateError, Result};
use crate::graph::WorkflowGraph;
use crate::types::NodeId;

// ============================================================================
// GRAPH BUILDER
// ============================================================================

/// Fluent builder for workflow graphs
#[derive(Debug, Default)]
pub struct GraphBuilder {
    states: Vec<StateBuilder>,
    transitions: Vec<TransitionBuilder>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain state
    pub fn state(self, name: impl Into<String>) -> Self {
        self.with_state(name, |s| s)
    }

    /// Add a state configured through a [`StateBuilder`]
    pub fn with_state<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(StateBuilder) -> StateBuilder,
    {
        self.states.push(f(StateBuilder::new(name)));
        self
    }

    /// Add an unrestricted transition with no actions
    pub fn transition(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.with_transition(from, to, |t| t)
    }

    /// Add a transition configured through a [`TransitionBuilder`]
    pub fn with_transition<F>(mut self, from: impl Into<String>, to: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(TransitionBuilder) -> TransitionBuilder,
    {
        self.transitions.push(f(TransitionBuilder::new(from, to)));
        self
    }

    /// Build the graph
    ///
    /// Transitions resolve to the first state declared under each name.
    pub fn build(self) -> Result<WorkflowGraph> {
        let mut graph = WorkflowGraph::new();
        let mut ids: Vec<(String, NodeId)> = Vec::with_capacity(self.states.len());

        for state in self.states {
            let id = graph.add_node(state.name.clone());
            graph.set_node_roles(&id, state.roles)?;
            graph.set_node_label(&id, state.label)?;
            graph.set_node_color(&id, state.color)?;
            ids.push((state.name, id));
        }

        let lookup = |name: &str| {
            ids.iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| id.clone())
                .ok_or_else(|| FlowgateError::UnknownState {
                    name: name.to_string(),
                })
        };

        for transition in self.transitions {
            let source = lookup(&transition.from)?;
            let target = lookup(&transition.to)?;
            let edge = graph.add_edge(&source, &target)?;
            graph.set_edge_actions(&edge, transition.actions)?;
            graph.set_edge_roles(&edge, transition.roles)?;
        }

        Ok(graph)
    }
}

// ============================================================================
// STATE BUILDER
// ============================================================================

#[derive(Debug)]
pub struct StateBuilder {
    name: String,
    label: Option<String>,
    color: Option<String>,
    roles: BTreeSet<String>,
}

impl StateBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            color: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

// ============================================================================
// TRANSITION BUILDER
// ============================================================================

#[derive(Debug)]
pub struct TransitionBuilder {
    from: String,
    to: String,
    actions: Vec<String>,
    roles: BTreeSet<String>,
}

impl TransitionBuilder {
    fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            actions: Vec::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}
