//! Entities whose status is governed by a workflow

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Workflow;
use crate::error::{FlowgateError, Result};

/// A record bound to one workflow, currently in `state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub workflow_id: String,
    pub state: String,
}

impl Entity {
    pub fn new(workflow_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            state: state.into(),
        }
    }

    /// Move to `target` if the workflow allows it for these roles
    ///
    /// Checks the persisted transition table of `workflow`. The entity is
    /// only changed on success; the previous state is returned.
    pub fn request_transition<I, S>(
        &mut self,
        workflow: &Workflow,
        target: &str,
        actor_roles: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if workflow.id != self.workflow_id {
            return Err(FlowgateError::WorkflowMismatch {
                expected: self.workflow_id.clone(),
                actual: workflow.id.clone(),
            });
        }

        workflow
            .engine()
            .authorize(&self.state, target, actor_roles)?;

        let previous = std::mem::replace(&mut self.state, target.to_string());
        debug!(
            workflow = %self.workflow_id,
            from = %previous,
            to = %self.state,
            "entity transitioned"
        );
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::GraphBuilder;

    fn workflow() -> Workflow {
        let graph = GraphBuilder::new()
            .state("Draft")
            .state("InReview")
            .state("Approved")
            .transition("Draft", "InReview")
            .with_transition("InReview", "Approved", |t| t.role("reviewer"))
            .build()
            .unwrap();
        Workflow::new("wf-1", "Review", graph)
    }

    #[test]
    fn moves_along_legal_edge() {
        let workflow = workflow();
        let mut entity = Entity::new("wf-1", "Draft");
        let previous = entity
            .request_transition(&workflow, "InReview", ["author"])
            .unwrap();
        assert_eq!(previous, "Draft");
        assert_eq!(entity.state, "InReview");
    }

    #[test]
    fn illegal_move_leaves_state() {
        let workflow = workflow();
        let mut entity = Entity::new("wf-1", "Draft");
        let err = entity
            .request_transition(&workflow, "Approved", ["reviewer"])
            .unwrap_err();
        assert!(matches!(err, FlowgateError::IllegalTransition { .. }));
        assert_eq!(entity.state, "Draft");
    }

    #[test]
    fn role_gate_is_enforced() {
        let workflow = workflow();
        let mut entity = Entity::new("wf-1", "InReview");
        assert!(matches!(
            entity.request_transition(&workflow, "Approved", ["author"]),
            Err(FlowgateError::Unauthorized { .. })
        ));
        assert_eq!(entity.state, "InReview");

        entity
            .request_transition(&workflow, "Approved", ["author", "reviewer"])
            .unwrap();
        assert_eq!(entity.state, "Approved");
    }

    #[test]
    fn other_workflow_is_refused() {
        let workflow = workflow();
        let mut entity = Entity::new("wf-2", "Draft");
        assert!(matches!(
            entity.request_transition(&workflow, "InReview", ["author"]),
            Err(FlowgateError::WorkflowMismatch { .. })
        ));
    }
}
