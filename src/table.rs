//! Compiled transition table
//!
//! Maps state name -> ordered transitions leaving that state. Key order is
//! compile order and survives a JSON round trip: the table serializes as a
//! plain object whose keys appear in that order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One permitted move out of a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub to: String,
    #[serde(default)]
    pub actions: Vec<String>,
    /// Empty means any actor may take this transition
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Transition {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            actions: Vec::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty()
    }

    /// True when unrestricted or when the actor holds at least one listed role
    pub fn permits<S: AsRef<str>>(&self, actor_roles: &[S]) -> bool {
        self.is_unrestricted() || actor_roles.iter().any(|r| self.roles.contains(r.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StateEntry {
    name: String,
    transitions: Vec<Transition>,
}

/// Name-keyed transition lookup, in compile order
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    states: Vec<StateEntry>,
    /// name -> position in `states`
    index: HashMap<String, usize>,
}

impl PartialEq for TransitionTable {
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
    }
}

impl Eq for TransitionTable {}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state with no transitions; returns false if it already existed
    pub fn insert_state(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.states.len());
        self.states.push(StateEntry {
            name,
            transitions: Vec::new(),
        });
        true
    }

    /// Append a transition to `from`, declaring it if needed
    pub fn push(&mut self, from: &str, transition: Transition) {
        self.insert_state(from);
        let pos = self.index[from];
        self.states[pos].transitions.push(transition);
    }

    /// Transitions leaving `state`, or `None` for an unknown state
    pub fn get(&self, state: &str) -> Option<&[Transition]> {
        self.index
            .get(state)
            .map(|&pos| self.states[pos].transitions.as_slice())
    }

    pub fn contains(&self, state: &str) -> bool {
        self.index.contains_key(state)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Transition])> {
        self.states
            .iter()
            .map(|s| (s.name.as_str(), s.transitions.as_slice()))
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }
}

impl Serialize for TransitionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.states.len()))?;
        for entry in &self.states {
            map.serialize_entry(&entry.name, &entry.transitions)?;
        }
        map.end()
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = TransitionTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of state name to transition list")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = TransitionTable::new();
        while let Some((name, transitions)) = access.next_entry::<String, Vec<Transition>>()? {
            // A repeated key extends the first occurrence.
            table.insert_state(name.as_str());
            for transition in transitions {
                table.push(&name, transition);
            }
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for TransitionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}
