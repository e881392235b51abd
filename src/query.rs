//! Query surface for callers holding either a graph or a compiled table
//!
//! A graph source is compiled on the fly (with the lenient default policy);
//! a table source is consulted directly.

use std::borrow::Cow;

use crate::compiler::compile;
use crate::graph::WorkflowGraph;
use crate::table::TransitionTable;

/// Something transitions can be read from
#[derive(Debug, Clone, Copy)]
pub enum WorkflowSource<'a> {
    Graph(&'a WorkflowGraph),
    Table(&'a TransitionTable),
}

impl<'a> WorkflowSource<'a> {
    /// The compiled table, borrowed when already compiled
    pub fn table(self) -> Cow<'a, TransitionTable> {
        match self {
            WorkflowSource::Graph(graph) => Cow::Owned(compile(graph).table),
            WorkflowSource::Table(table) => Cow::Borrowed(table),
        }
    }
}

impl<'a> From<&'a WorkflowGraph> for WorkflowSource<'a> {
    fn from(graph: &'a WorkflowGraph) -> Self {
        WorkflowSource::Graph(graph)
    }
}

impl<'a> From<&'a TransitionTable> for WorkflowSource<'a> {
    fn from(table: &'a TransitionTable) -> Self {
        WorkflowSource::Table(table)
    }
}

/// Names of the states reachable in one step from `state_name`
pub fn get_next_states<'a>(state_name: &str, source: impl Into<WorkflowSource<'a>>) -> Vec<String> {
    if state_name.is_empty() {
        return Vec::new();
    }
    let table = source.into().table();
    table
        .get(state_name)
        .unwrap_or(&[])
        .iter()
        .map(|t| t.to.clone())
        .collect()
}

/// True iff `to` is one step away from `from`; false when either is empty
pub fn is_valid_transition<'a>(from: &str, to: &str, source: impl Into<WorkflowSource<'a>>) -> bool {
    if from.is_empty() || to.is_empty() {
        return false;
    }
    get_next_states(from, source).iter().any(|s| s == to)
}

/// Every state name in compile order
pub fn get_all_states<'a>(source: impl Into<WorkflowSource<'a>>) -> Vec<String> {
    source
        .into()
        .table()
        .state_names()
        .map(str::to_string)
        .collect()
}
