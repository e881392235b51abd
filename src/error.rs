//! Error types with fix suggestions
//!
//! Structural problems in a graph are never errors: they are collected as
//! [`Problem`] values. `FlowgateError` covers the rest: rejected edits,
//! refused transitions, version conflicts, and I/O at the edges.

use thiserror::Error;

use crate::problem::Problem;

pub type Result<T> = std::result::Result<T, FlowgateError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum FlowgateError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {reason}")]
    Config { reason: String },

    #[error("FLOW-001: no {what} was supplied")]
    MissingInput { what: String },

    // ─────────────────────────────────────────────────────────────
    // Graph editing (FLOW-010 to FLOW-013)
    // ─────────────────────────────────────────────────────────────
    #[error("FLOW-010: id '{id}' is already used in this graph")]
    DuplicateId { id: String },

    #[error("FLOW-011: node '{id}' not found")]
    NodeNotFound { id: String },

    #[error("FLOW-012: edge '{id}' not found")]
    EdgeNotFound { id: String },

    #[error("FLOW-013: state '{name}' is not declared")]
    UnknownState { name: String },

    // ─────────────────────────────────────────────────────────────
    // Compilation (FLOW-020)
    // ─────────────────────────────────────────────────────────────
    #[error("FLOW-020: compilation rejected with {} error(s)", .problems.len())]
    Rejected { problems: Vec<Problem> },

    // ─────────────────────────────────────────────────────────────
    // Runtime transitions (FLOW-030 to FLOW-032)
    // ─────────────────────────────────────────────────────────────
    #[error("FLOW-030: illegal status transition from '{from}' to '{to}'")]
    IllegalTransition { from: String, to: String },

    #[error("FLOW-031: transition from '{from}' to '{to}' requires one of the roles [{}]", .required.join(", "))]
    Unauthorized {
        from: String,
        to: String,
        required: Vec<String>,
    },

    #[error("FLOW-032: entity belongs to workflow '{expected}', not '{actual}'")]
    WorkflowMismatch { expected: String, actual: String },

    // ─────────────────────────────────────────────────────────────
    // Workflow envelope (FLOW-040 to FLOW-042)
    // ─────────────────────────────────────────────────────────────
    #[error("FLOW-040: version conflict: expected {expected}, current is {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("FLOW-041: workflow '{id}' cannot be activated with {errors} structural error(s)")]
    NotActivatable { id: String, errors: usize },

    #[error("FLOW-042: workflow '{id}' has no name")]
    UnnamedWorkflow { id: String },
}

impl FixSuggestion for FlowgateError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FlowgateError::Json(_) => Some("Check the document is valid JSON"),
            FlowgateError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            FlowgateError::Io(_) => Some("Check file path and permissions"),
            FlowgateError::Config { .. } => Some("Fix or remove the flowgate.yaml config file"),
            FlowgateError::MissingInput { .. } => Some("Pass a workflow document or transition table"),
            FlowgateError::DuplicateId { .. } => Some("Let the graph assign ids, or pick an unused id"),
            FlowgateError::NodeNotFound { .. } => Some("Verify the node id exists in the graph"),
            FlowgateError::EdgeNotFound { .. } => Some("Verify the edge id exists in the graph"),
            FlowgateError::UnknownState { .. } => {
                Some("Declare the state before adding transitions that use it")
            }
            FlowgateError::Rejected { .. } => {
                Some("Run `flowgate validate` and fix the reported errors")
            }
            FlowgateError::IllegalTransition { .. } => {
                Some("Use `flowgate next` to list the states reachable from the current one")
            }
            FlowgateError::Unauthorized { .. } => {
                Some("Request the transition as an actor holding one of the required roles")
            }
            FlowgateError::WorkflowMismatch { .. } => {
                Some("Load the workflow the entity references")
            }
            FlowgateError::VersionConflict { .. } => {
                Some("Reload the latest version of the workflow and retry the edit")
            }
            FlowgateError::NotActivatable { .. } => {
                Some("Fix the error-severity problems before activating the workflow")
            }
            FlowgateError::UnnamedWorkflow { .. } => Some("Give the workflow a name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_message() {
        let err = FlowgateError::IllegalTransition {
            from: "Draft".to_string(),
            to: "Approved".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("illegal status transition"));
        assert!(msg.contains("'Draft'"));
        assert!(msg.contains("'Approved'"));
    }

    #[test]
    fn unauthorized_lists_roles() {
        let err = FlowgateError::Unauthorized {
            from: "InReview".to_string(),
            to: "Approved".to_string(),
            required: vec!["lead".to_string(), "reviewer".to_string()],
        };
        assert!(err.to_string().contains("[lead, reviewer]"));
    }

    #[test]
    fn every_variant_suggests_a_fix() {
        let err = FlowgateError::VersionConflict {
            expected: 3,
            actual: 4,
        };
        assert!(err.fix_suggestion().is_some());
        assert!(err.to_string().contains("expected 3"));
    }
}
