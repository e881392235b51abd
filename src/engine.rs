//! Runtime transition queries over a compiled table
//!
//! The engine only ever sees a [`TransitionTable`], never the graph, so its
//! answers depend on what was compiled and persisted rather than on
//! editing-time state. Unknown states are not errors: they have no legal
//! transitions (fail-closed). Name comparison is exact and case-sensitive.

use std::sync::Arc;

use tracing::debug;

use crate::error::{FlowgateError, Result};
use crate::table::{Transition, TransitionTable};

/// Read-only query surface over a shared transition table
///
/// Cloning is O(1); clones share the same table.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    table: Arc<TransitionTable>,
}

impl TransitionEngine {
    pub fn new(table: TransitionTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn from_shared(table: Arc<TransitionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// True iff `name` is a state of the table
    pub fn has_state(&self, name: &str) -> bool {
        self.table.contains(name)
    }

    /// Every state name, in compile order
    pub fn all_states(&self) -> Vec<&str> {
        self.table.state_names().collect()
    }

    /// Full transitions leaving `state`; empty for unknown states
    pub fn transitions(&self, state: &str) -> &[Transition] {
        self.table.get(state).unwrap_or(&[])
    }

    /// Destination names reachable in one step, in table order
    ///
    /// Empty both for a state with no outgoing transitions and for an
    /// unknown state; use [`has_state`](Self::has_state) to tell them apart.
    pub fn next_states(&self, current_state: &str) -> Vec<&str> {
        self.transitions(current_state)
            .iter()
            .map(|t| t.to.as_str())
            .collect()
    }

    pub fn is_valid_transition(&self, from: &str, to: &str) -> bool {
        self.transitions(from).iter().any(|t| t.to == to)
    }

    /// Transitions out of `current_state` the actor may invoke
    ///
    /// A transition with no roles is open to everyone; otherwise the actor
    /// must hold at least one of its roles.
    pub fn available_transitions<I, S>(&self, current_state: &str, actor_roles: I) -> Vec<&Transition>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let actor: Vec<S> = actor_roles.into_iter().collect();
        self.transitions(current_state)
            .iter()
            .filter(|t| t.permits(&actor))
            .collect()
    }

    /// Action labels on every `from -> to` transition, first occurrence order
    pub fn actions_between(&self, from: &str, to: &str) -> Vec<&str> {
        let mut actions: Vec<&str> = Vec::new();
        for transition in self.transitions(from).iter().filter(|t| t.to == to) {
            for action in &transition.actions {
                if !actions.contains(&action.as_str()) {
                    actions.push(action);
                }
            }
        }
        actions
    }

    /// Decide whether an actor may move an entity from `from` to `to`
    ///
    /// Returns the first permitting transition. Fails with
    /// `IllegalTransition` when no such edge exists at all, and with
    /// `Unauthorized` when edges exist but none admits the actor.
    pub fn authorize<I, S>(&self, from: &str, to: &str, actor_roles: I) -> Result<&Transition>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let actor: Vec<S> = actor_roles.into_iter().collect();
        let candidates: Vec<&Transition> = self
            .transitions(from)
            .iter()
            .filter(|t| t.to == to)
            .collect();

        if candidates.is_empty() {
            debug!(from, to, "rejected: no such transition");
            return Err(FlowgateError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        if let Some(transition) = candidates.iter().copied().find(|t| t.permits(&actor)) {
            return Ok(transition);
        }

        let mut required: Vec<String> = candidates
            .iter()
            .flat_map(|t| t.roles.iter().cloned())
            .collect();
        required.sort();
        required.dedup();

        debug!(from, to, ?required, "rejected: actor lacks role");
        Err(FlowgateError::Unauthorized {
            from: from.to_string(),
            to: to.to_string(),
            required,
        })
    }
}

impl From<TransitionTable> for TransitionEngine {
    fn from(table: TransitionTable) -> Self {
        TransitionEngine::new(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gated(to: &str, roles: &[&str]) -> Transition {
        let mut t = Transition::new(to);
        t.roles = roles.iter().map(|r| r.to_string()).collect();
        t
    }

    fn engine() -> TransitionEngine {
        let mut table = TransitionTable::new();
        table.insert_state("A");
        table.insert_state("B");
        table.insert_state("C");
        table.push("A", gated("B", &["admin"]));
        table.push("A", gated("C", &[]));
        TransitionEngine::new(table)
    }

    #[test]
    fn next_states_in_table_order() {
        assert_eq!(engine().next_states("A"), vec!["B", "C"]);
    }

    #[test]
    fn unknown_state_fails_closed() {
        let engine = engine();
        assert!(engine.next_states("no-such-state").is_empty());
        assert!(!engine.is_valid_transition("no-such-state", "anything"));
        assert!(!engine.has_state("no-such-state"));
    }

    #[test]
    fn empty_list_is_not_missing_key() {
        let engine = engine();
        assert!(engine.has_state("B"));
        assert!(engine.next_states("B").is_empty());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let engine = engine();
        assert!(engine.is_valid_transition("A", "B"));
        assert!(!engine.is_valid_transition("a", "B"));
        assert!(!engine.is_valid_transition("A", "b"));
    }

    #[test]
    fn role_filtering() {
        let engine = engine();
        let editor: Vec<_> = engine
            .available_transitions("A", ["editor"])
            .into_iter()
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(editor, vec!["C"]);

        let admin = engine.available_transitions("A", vec!["admin".to_string()]);
        assert_eq!(admin.len(), 2);
    }

    #[test]
    fn authorize_distinguishes_illegal_from_unauthorized() {
        let engine = engine();
        assert!(matches!(
            engine.authorize("B", "A", ["admin"]),
            Err(FlowgateError::IllegalTransition { .. })
        ));
        match engine.authorize("A", "B", ["editor"]) {
            Err(FlowgateError::Unauthorized { required, .. }) => {
                assert_eq!(required, vec!["admin".to_string()])
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
        assert_eq!(engine.authorize("A", "B", ["admin"]).unwrap().to, "B");
        assert_eq!(engine.authorize::<_, &str>("A", "C", []).unwrap().to, "C");
    }

    #[test]
    fn parallel_edges_admit_any_permitting_one() {
        let mut table = TransitionTable::new();
        table.push("A", gated("B", &["admin"]));
        table.push("A", gated("B", &["owner"]));
        let engine = TransitionEngine::new(table);

        assert!(engine.authorize("A", "B", ["owner"]).is_ok());
        match engine.authorize("A", "B", ["guest"]) {
            Err(FlowgateError::Unauthorized { required, .. }) => {
                assert_eq!(required, vec!["admin".to_string(), "owner".to_string()])
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn actions_between_dedups() {
        let mut table = TransitionTable::new();
        let mut first = Transition::new("B");
        first.actions = vec!["submit".into(), "send".into()];
        let mut second = Transition::new("B");
        second.actions = vec!["send".into(), "push".into()];
        table.push("A", first);
        table.push("A", second);

        let engine = TransitionEngine::new(table);
        assert_eq!(engine.actions_between("A", "B"), vec!["submit", "send", "push"]);
        assert!(engine.actions_between("A", "Z").is_empty());
    }

    #[test]
    fn clones_share_the_table() {
        let engine = engine();
        let clone = engine.clone();
        assert!(std::ptr::eq(engine.table(), clone.table()));
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransitionEngine>();
    }
}
