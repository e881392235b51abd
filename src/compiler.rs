//! Graph -> transition table compiler
//!
//! Resolution is by node id, output is keyed by state name. The compiler is
//! lenient: anything it cannot resolve is skipped and recorded as a
//! [`Problem`], never raised. Output depends only on node and edge order,
//! so compiling an unchanged graph twice yields identical tables.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{FlowgateError, Result};
use crate::graph::{TransitionEdge, WorkflowGraph};
use crate::problem::{Problem, ProblemKind};
use crate::table::{Transition, TransitionTable};
use crate::types::NodeId;
use crate::validator;

/// What to do when two nodes share a state name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateNamePolicy {
    /// Keep one key at the first node's position and append the outgoing
    /// edges of every same-named node in edge order
    #[default]
    Merge,
    /// Refuse to produce a table
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub duplicate_names: DuplicateNamePolicy,
}

/// Output of a compile: the table plus every problem met on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    pub table: TransitionTable,
    pub problems: Vec<Problem>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Problem::is_error)
    }

    pub fn into_parts(self) -> (TransitionTable, Vec<Problem>) {
        (self.table, self.problems)
    }
}

/// Compile with the default (merging) policy
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn compile(graph: &WorkflowGraph) -> Compilation {
    // 1. id -> name, skipping unnamed nodes
    let mut names: HashMap<&NodeId, &str> = HashMap::with_capacity(graph.node_count());
    let mut problems = Vec::new();
    for node in graph.nodes() {
        if node.has_name() {
            names.insert(&node.id, node.name.as_str());
        } else {
            problems.push(Problem::missing_node_name(node));
        }
    }

    // 2. one (possibly empty) entry per named node
    let mut table = TransitionTable::new();
    let mut first_owner: HashMap<&str, &NodeId> = HashMap::new();
    for node in graph.nodes().iter().filter(|n| n.has_name()) {
        if table.insert_state(node.name.as_str()) {
            first_owner.insert(node.name.as_str(), &node.id);
        } else if let Some(first) = first_owner.get(node.name.as_str()) {
            problems.push(Problem::duplicate_node_name(node, first));
        }
    }

    // 3. edges in input order
    for edge in graph.edges() {
        let source = resolve(graph, &names, edge, "source", &edge.source_id);
        let target = resolve(graph, &names, edge, "target", &edge.target_id);

        match (source, target) {
            (Ok(from), Ok(to)) => table.push(
                from,
                Transition {
                    to: to.to_string(),
                    actions: edge.actions.clone(),
                    roles: edge.roles.clone(),
                },
            ),
            (source, target) => {
                problems.extend(source.err());
                problems.extend(target.err());
            }
        }
    }

    for problem in &problems {
        debug!(%problem, "compile problem");
    }
    debug!(
        states = table.len(),
        transitions = table.transition_count(),
        problems = problems.len(),
        "compiled workflow graph"
    );

    Compilation { table, problems }
}

fn resolve<'g>(
    graph: &WorkflowGraph,
    names: &HashMap<&NodeId, &'g str>,
    edge: &TransitionEdge,
    end: &str,
    id: &NodeId,
) -> std::result::Result<&'g str, Problem> {
    match names.get(id) {
        Some(name) => Ok(*name),
        None if graph.node(id).is_some() => Err(Problem::unnamed_endpoint(edge, end, id)),
        None => Err(Problem::dangling_edge(edge, end, id)),
    }
}

/// Compile under explicit options
pub fn compile_with(graph: &WorkflowGraph, options: &CompileOptions) -> Result<Compilation> {
    let compilation = compile(graph);

    if options.duplicate_names == DuplicateNamePolicy::Reject {
        let duplicates: Vec<Problem> = compilation
            .problems
            .iter()
            .filter(|p| p.kind == ProblemKind::DuplicateNodeName)
            .cloned()
            .collect();
        if !duplicates.is_empty() {
            return Err(FlowgateError::Rejected {
                problems: duplicates,
            });
        }
    }

    Ok(compilation)
}

/// Compile only a graph with no error-severity problem, compiler or validator
pub fn compile_strict(graph: &WorkflowGraph) -> Result<TransitionTable> {
    let (table, mut problems) = compile(graph).into_parts();
    for problem in validator::validate(graph) {
        if !problems.contains(&problem) {
            problems.push(problem);
        }
    }

    problems.retain(Problem::is_error);
    if problems.is_empty() {
        Ok(table)
    } else {
        Err(FlowgateError::Rejected { problems })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StateNode;

    fn review_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        let draft = graph.add_node("Draft");
        let review = graph.add_node("InReview");
        let approved = graph.add_node("Approved");
        let e = graph.add_edge(&draft, &review).unwrap();
        graph.set_edge_actions(&e, ["submit"]).unwrap();
        let e = graph.add_edge(&review, &approved).unwrap();
        graph.set_edge_roles(&e, ["reviewer"]).unwrap();
        graph
    }

    #[test]
    fn compiles_every_named_state() {
        let compilation = compile(&review_graph());
        assert!(compilation.problems.is_empty());

        let table = compilation.table;
        assert_eq!(
            table.state_names().collect::<Vec<_>>(),
            vec!["Draft", "InReview", "Approved"]
        );
        assert_eq!(table.get("Approved"), Some(&[][..]));

        let draft = table.get("Draft").unwrap();
        assert_eq!(draft[0].to, "InReview");
        assert_eq!(draft[0].actions, vec!["submit"]);
        assert!(table.get("InReview").unwrap()[0].roles.contains("reviewer"));
    }

    #[test]
    fn deterministic() {
        let graph = review_graph();
        assert_eq!(compile(&graph), compile(&graph));
    }

    #[test]
    fn unnamed_node_is_skipped_with_problem() {
        let graph = WorkflowGraph::from_parts(
            vec![StateNode::new("a", "A"), StateNode::new("b", "")],
            vec![TransitionEdge::new("e1", "a", "b")],
        );
        let compilation = compile(&graph);

        assert_eq!(compilation.table.len(), 1);
        assert_eq!(compilation.table.get("A"), Some(&[][..]));
        let kinds: Vec<_> = compilation.problems.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProblemKind::MissingNodeName, ProblemKind::DanglingEdge]);
        assert!(compilation.problems[1].message.contains("has no state name"));
    }

    #[test]
    fn dangling_edge_is_skipped() {
        let graph = WorkflowGraph::from_parts(
            vec![StateNode::new("a", "A")],
            vec![
                TransitionEdge::new("e1", "a", "ghost"),
                TransitionEdge::new("e2", "phantom", "ghost"),
            ],
        );
        let compilation = compile(&graph);

        assert_eq!(compilation.table.get("A"), Some(&[][..]));
        // One problem per unresolved end
        assert_eq!(compilation.problems.len(), 3);
        assert!(compilation
            .problems
            .iter()
            .all(|p| p.kind == ProblemKind::DanglingEdge));
    }

    #[test]
    fn duplicate_names_merge_by_default() {
        let graph = WorkflowGraph::from_parts(
            vec![
                StateNode::new("a1", "A"),
                StateNode::new("b", "B"),
                StateNode::new("a2", "A"),
                StateNode::new("c", "C"),
            ],
            vec![
                TransitionEdge::new("e1", "a2", "c"),
                TransitionEdge::new("e2", "a1", "b"),
            ],
        );
        let compilation = compile(&graph);

        assert_eq!(
            compilation.table.state_names().collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
        let targets: Vec<_> = compilation
            .table
            .get("A")
            .unwrap()
            .iter()
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(targets, vec!["C", "B"]);
        assert_eq!(compilation.problems.len(), 1);
        assert_eq!(compilation.problems[0].kind, ProblemKind::DuplicateNodeName);
        assert!(compilation.has_errors());
    }

    #[test]
    fn duplicate_names_rejected_on_request() {
        let graph = WorkflowGraph::from_parts(
            vec![StateNode::new("a1", "A"), StateNode::new("a2", "A")],
            vec![TransitionEdge::new("e1", "a1", "a2")],
        );
        let options = CompileOptions {
            duplicate_names: DuplicateNamePolicy::Reject,
        };
        let err = compile_with(&graph, &options).unwrap_err();
        assert!(matches!(err, FlowgateError::Rejected { ref problems } if problems.len() == 1));

        assert!(compile_with(&review_graph(), &options).is_ok());
    }

    #[test]
    fn self_loop_compiles() {
        let mut graph = WorkflowGraph::new();
        let draft = graph.add_node("Draft");
        graph.add_edge(&draft, &draft).unwrap();
        let table = compile(&graph).table;
        assert_eq!(table.get("Draft").unwrap()[0].to, "Draft");
    }

    #[test]
    fn strict_compile_ignores_warnings() {
        let mut graph = review_graph();
        let draft = graph.node_by_name("Draft").unwrap().id.clone();
        graph.add_edge(&draft, &draft).unwrap();
        assert!(compile_strict(&graph).is_ok());
    }

    #[test]
    fn strict_compile_rejects_errors_once() {
        let graph = WorkflowGraph::from_parts(
            vec![StateNode::new("a", "A"), StateNode::new("b", "")],
            vec![TransitionEdge::new("e1", "a", "b")],
        );
        match compile_strict(&graph) {
            Err(FlowgateError::Rejected { problems }) => {
                let missing = problems
                    .iter()
                    .filter(|p| p.kind == ProblemKind::MissingNodeName)
                    .count();
                assert_eq!(missing, 1);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn rename_requires_recompile() {
        let mut graph = review_graph();
        let before = compile(&graph).table;

        let draft = graph.node_by_name("Draft").unwrap().id.clone();
        graph.rename_node(&draft, "Drafting").unwrap();

        assert!(before.contains("Draft"));
        let after = compile(&graph).table;
        assert!(after.contains("Drafting"));
        assert!(!after.contains("Draft"));
    }
}
