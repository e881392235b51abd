//! Flowgate - workflow graphs compiled into transition tables
//!
//! Workflows are authored as graphs of named states joined by directed
//! transitions. The graph is validated, then compiled into a name-keyed
//! [`TransitionTable`] that the [`TransitionEngine`] answers runtime
//! questions from: which states come next, and whether a move is legal for
//! an actor holding some set of roles.

pub mod builders;
pub mod compiler;
pub mod config;
pub mod document;
pub mod engine;
pub mod entity;
pub mod error;
pub mod graph;
pub mod problem;
pub mod query;
pub mod table;
pub mod types;
pub mod validator;

pub use builders::GraphBuilder;
pub use compiler::{compile, compile_strict, compile_with, Compilation, CompileOptions, DuplicateNamePolicy};
pub use config::{FlowgateConfig, OutputFormat};
pub use document::{Workflow, WorkflowDocument, WorkflowStatus};
pub use engine::TransitionEngine;
pub use entity::Entity;
pub use error::{FixSuggestion, FlowgateError};
pub use graph::{StateNode, TransitionEdge, WorkflowGraph};
pub use problem::{Problem, ProblemKind, ProblemRef, Severity, ValidationReport};
pub use query::{get_all_states, get_next_states, is_valid_transition, WorkflowSource};
pub use table::{Transition, TransitionTable};
pub use types::{EdgeId, NodeId};
pub use validator::{validate, ValidationConfig, Validator};
