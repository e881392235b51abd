//! Persisted workflow documents and the versioned workflow envelope
//!
//! A document stores the authored graph next to its compiled transition
//! table. The table is a cache: it is regenerated whenever the graph
//! changes and is never meant to be edited by hand.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compiler::compile;
use crate::engine::TransitionEngine;
use crate::error::{FlowgateError, Result};
use crate::graph::WorkflowGraph;
use crate::problem::Problem;
use crate::table::TransitionTable;
use crate::validator;

/// `{ nodes, edges, transitions }` as stored by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(flatten)]
    pub graph: WorkflowGraph,
    /// Shared with every engine built from this document
    #[serde(default)]
    pub transitions: Arc<TransitionTable>,
}

impl WorkflowDocument {
    /// Build a document, compiling its transition cache
    pub fn from_graph(graph: WorkflowGraph) -> Self {
        let transitions = Arc::new(compile(&graph).table);
        Self { graph, transitions }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Err(FlowgateError::MissingInput {
                what: format!("workflow document in {}", path.display()),
            });
        }

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let document = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        debug!(
            path = %path.display(),
            nodes = document.graph.node_count(),
            edges = document.graph.edge_count(),
            "loaded workflow document"
        );
        Ok(document)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json_pretty()?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }

    /// True when the stored table differs from a fresh compile of the graph
    pub fn is_stale(&self) -> bool {
        compile(&self.graph).table != *self.transitions
    }

    /// Regenerate the transition cache; returns the compile problems
    pub fn refresh(&mut self) -> Vec<Problem> {
        let (table, problems) = compile(&self.graph).into_parts();
        self.transitions = Arc::new(table);
        problems
    }

    /// The table queries should use: always a fresh compile of the graph
    ///
    /// A stored table that disagrees with the graph is logged and ignored.
    pub fn effective_table(&self) -> TransitionTable {
        let fresh = compile(&self.graph).table;
        if self.transitions.is_empty() {
            debug!("document has no stored transitions; compiled from graph");
        } else if fresh != *self.transitions {
            warn!("stored transitions are out of date with the graph; using a fresh compile");
        }
        fresh
    }
}

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Inactive,
}

fn initial_version() -> u64 {
    1
}

/// A named, versioned workflow as the surrounding application persists it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Bumped by one on every accepted edit
    #[serde(default = "initial_version")]
    pub version: u64,
    #[serde(rename = "data")]
    pub document: WorkflowDocument,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, graph: WorkflowGraph) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: WorkflowStatus::Draft,
            version: initial_version(),
            document: WorkflowDocument::from_graph(graph),
        }
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.document.graph
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.document.transitions
    }

    /// Replace the graph if the caller saw the current version
    ///
    /// On success the transition cache is recompiled and the new version
    /// is returned. A stale `expected_version` changes nothing.
    pub fn update_graph(&mut self, expected_version: u64, graph: WorkflowGraph) -> Result<u64> {
        if expected_version != self.version {
            return Err(FlowgateError::VersionConflict {
                expected: expected_version,
                actual: self.version,
            });
        }

        self.document = WorkflowDocument::from_graph(graph);
        self.version += 1;
        debug!(id = %self.id, version = self.version, "workflow graph updated");
        Ok(self.version)
    }

    /// Mark active; refused for an unnamed workflow or while the graph
    /// has error-severity problems
    pub fn activate(&mut self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FlowgateError::UnnamedWorkflow {
                id: self.id.clone(),
            });
        }
        let errors = validator::validate(self.graph())
            .iter()
            .filter(|p| p.is_error())
            .count();
        if errors > 0 {
            return Err(FlowgateError::NotActivatable {
                id: self.id.clone(),
                errors,
            });
        }
        self.status = WorkflowStatus::Active;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.status = WorkflowStatus::Inactive;
    }

    /// Draft copy under a new id, named "Copy of <name>"
    pub fn duplicate(&self, new_id: impl Into<String>) -> Self {
        Self {
            id: new_id.into(),
            name: format!("Copy of {}", self.name),
            status: WorkflowStatus::Draft,
            version: initial_version(),
            document: self.document.clone(),
        }
    }

    /// Engine over the persisted transition table; the table is shared, not copied
    pub fn engine(&self) -> TransitionEngine {
        TransitionEngine::from_shared(Arc::clone(&self.document.transitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::GraphBuilder;

    fn review_graph() -> WorkflowGraph {
        GraphBuilder::new()
            .state("Draft")
            .state("InReview")
            .with_transition("Draft", "InReview", |t| t.action("submit"))
            .build()
            .unwrap()
    }

    #[test]
    fn document_json_shape() {
        let document = WorkflowDocument::from_graph(review_graph());
        let value: serde_json::Value =
            serde_json::from_str(&document.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["nodes"][0]["id"], "node_1");
        assert_eq!(value["nodes"][0]["name"], "Draft");
        assert_eq!(value["edges"][0]["source"], "node_1");
        assert_eq!(value["edges"][0]["target"], "node_2");
        assert_eq!(value["edges"][0]["actions"][0], "submit");
        assert_eq!(value["transitions"]["Draft"][0]["to"], "InReview");
        assert_eq!(value["transitions"]["InReview"], serde_json::json!([]));
    }

    #[test]
    fn document_round_trips() {
        let document = WorkflowDocument::from_graph(review_graph());
        let back = WorkflowDocument::from_json(&document.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, document);
        assert!(!back.is_stale());
    }

    #[test]
    fn hand_edited_cache_is_stale() {
        let json = r#"{
            "nodes": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}],
            "edges": [{"id": "e", "source": "a", "target": "b"}],
            "transitions": {"A": [{"to": "Z", "actions": [], "roles": []}]}
        }"#;
        let mut document = WorkflowDocument::from_json(json).unwrap();
        assert!(document.is_stale());
        assert_eq!(document.effective_table().get("A").unwrap()[0].to, "B");

        assert!(document.refresh().is_empty());
        assert!(!document.is_stale());
    }

    #[test]
    fn missing_transitions_block_defaults_to_empty() {
        let document = WorkflowDocument::from_yaml(
            r#"
nodes:
  - id: a
    name: A
edges: []
"#,
        )
        .unwrap();
        assert!(document.transitions.is_empty());
        assert!(document.is_stale());
    }

    #[test]
    fn update_graph_checks_version() {
        let mut workflow = Workflow::new("wf-1", "Audit", review_graph());
        assert_eq!(workflow.version, 1);

        let mut edited = workflow.graph().clone();
        edited.add_node("Approved");
        assert_eq!(workflow.update_graph(1, edited.clone()).unwrap(), 2);
        assert!(workflow.transitions().contains("Approved"));

        let err = workflow.update_graph(1, edited).unwrap_err();
        assert!(matches!(
            err,
            FlowgateError::VersionConflict {
                expected: 1,
                actual: 2
            }
        ));
        assert_eq!(workflow.version, 2);
    }

    #[test]
    fn activation_requires_no_errors() {
        let mut workflow = Workflow::new("wf-1", "Audit", WorkflowGraph::new());
        assert!(matches!(
            workflow.activate(),
            Err(FlowgateError::NotActivatable { errors: 1, .. })
        ));
        assert_eq!(workflow.status, WorkflowStatus::Draft);

        let mut workflow = Workflow::new("wf-2", "Audit", review_graph());
        workflow.activate().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Active);
        workflow.deactivate();
        assert_eq!(workflow.status, WorkflowStatus::Inactive);
    }

    #[test]
    fn activation_requires_a_name() {
        for name in ["", "   "] {
            let mut workflow = Workflow::new("wf-1", name, review_graph());
            assert!(matches!(
                workflow.activate(),
                Err(FlowgateError::UnnamedWorkflow { id }) if id == "wf-1"
            ));
            assert_eq!(workflow.status, WorkflowStatus::Draft);
        }
    }

    #[test]
    fn engines_share_the_persisted_table() {
        let workflow = Workflow::new("wf-1", "Audit", review_graph());
        let first = workflow.engine();
        let second = workflow.engine();
        assert!(std::ptr::eq(first.table(), second.table()));
        assert!(std::ptr::eq(first.table(), workflow.transitions()));
    }

    #[test]
    fn removed_ids_stay_retired_after_save() {
        let mut graph = review_graph();
        let approved = graph.add_node("Approved");
        graph.remove_node(&approved).unwrap();

        let json = WorkflowDocument::from_graph(graph).to_json_pretty().unwrap();
        let mut document = WorkflowDocument::from_json(&json).unwrap();
        let fresh = document.graph.add_node("Archived");
        assert_ne!(fresh, approved);
        assert_eq!(fresh.as_str(), "node_4");
    }

    #[test]
    fn duplicate_is_a_fresh_draft() {
        let mut workflow = Workflow::new("wf-1", "Audit", review_graph());
        workflow.update_graph(1, review_graph()).unwrap();
        workflow.activate().unwrap();

        let copy = workflow.duplicate("wf-2");
        assert_eq!(copy.name, "Copy of Audit");
        assert_eq!(copy.status, WorkflowStatus::Draft);
        assert_eq!(copy.version, 1);
        assert_eq!(copy.document, workflow.document);
    }

    #[test]
    fn envelope_json_uses_data_field() {
        let json = r#"{
            "id": "7",
            "name": "Audit",
            "data": {"nodes": [{"id": "a", "name": "A"}], "edges": []}
        }"#;
        let workflow: Workflow = serde_json::from_str(json).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Draft);
        assert_eq!(workflow.version, 1);
        assert_eq!(workflow.graph().node_count(), 1);
    }
}
