//! NewType wrappers for graph element identifiers
//!
//! Node and edge ids are opaque editing-time handles. They are kept apart at
//! the type level so an edge id can never be passed where a node id is
//! expected. Emptiness is not enforced here: documents coming from outside
//! may carry blank ids, and the validator reports them as problems.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

// ============================================================================
// NODE ID
// ============================================================================

/// Identifier of a [`StateNode`](crate::graph::StateNode)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Prefix used for ids assigned by the graph itself
    pub const PREFIX: &'static str = "node_";

    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

// ============================================================================
// EDGE ID
// ============================================================================

/// Identifier of a [`TransitionEdge`](crate::graph::TransitionEdge)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub const PREFIX: &'static str = "edge_";

    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for EdgeId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        EdgeId(s.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        EdgeId(s)
    }
}

/// Largest suffix recognised as a generated id sequence number
pub const MAX_SEQUENCE: u64 = u32::MAX as u64;

/// Parse the numeric suffix of a generated id (`node_12` -> 12)
///
/// Suffixes above [`MAX_SEQUENCE`] are not treated as generated.
pub(crate) fn sequence_of(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?
        .parse()
        .ok()
        .filter(|&seq| seq <= MAX_SEQUENCE)
}
