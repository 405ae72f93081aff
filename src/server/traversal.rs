//! Collaborators the op processor drives but does not implement: the graph
//! and its transactions, traversal sources, traversals and script engines.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TraversalError;
use crate::io::{Bytecode, Value};

/// The transaction bound to the calling thread.
pub trait Transaction: Send + Sync {
    fn is_open(&self) -> bool;
    fn commit(&self) -> Result<(), TraversalError>;
    fn rollback(&self) -> Result<(), TraversalError>;
}

pub trait Graph: Send + Sync {
    fn supports_transactions(&self) -> bool;
    fn tx(&self) -> &dyn Transaction;
}

/// A configured entry point bound to one graph, referenced by clients
/// through an alias.
pub trait TraversalSource: Send + Sync {
    fn graph(&self) -> Arc<dyn Graph>;

    /// Compile bytecode into an executable traversal.
    fn translate(&self, bytecode: &Bytecode) -> Result<Box<dyn Traversal>, TraversalError>;
}

/// A compiled query: a lazy, finite, non-restartable sequence of results.
pub trait Traversal: Iterator<Item = Result<Value, TraversalError>> + Send {
    /// Run query-plan optimisation. Called once, before the first result.
    fn apply_strategies(&mut self) -> Result<(), TraversalError>;

    /// Side-effects accumulated so far.
    fn side_effects(&self) -> SideEffects;
}

/// Evaluates bytecode that embeds lambdas of its language.
pub trait ScriptEngine: Send + Sync {
    fn eval(
        &self,
        bytecode: &Bytecode,
        alias: &str,
        source: Arc<dyn TraversalSource>,
    ) -> Result<Box<dyn Traversal>, TraversalError>;
}

/// One named aggregate and the operator that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SideEffect {
    pub value: Value,
    pub aggregate_to: String,
}

/// Side-effects of one traversal, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideEffects {
    entries: BTreeMap<String, SideEffect>,
}

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value, aggregate_to: impl Into<String>) {
        self.entries.insert(
            key.into(),
            SideEffect { value, aggregate_to: aggregate_to.into() },
        );
    }

    pub fn get(&self, key: &str) -> Option<&SideEffect> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effects_keys_sorted() {
        let mut side_effects = SideEffects::new();
        side_effects.insert("b", Value::Long(2), "list");
        side_effects.insert("a", Value::List(vec![]), "bulkset");
        assert_eq!(side_effects.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(side_effects.get("a").unwrap().aggregate_to, "bulkset");
        assert!(side_effects.get("c").is_none());
        assert_eq!(side_effects.len(), 2);
    }
}
