//! GraphManager - registry of configured traversal sources
//!
//! Requests reference a traversal source through the `aliases` argument;
//! the aliased name is looked up here. Sources are registered at start-up
//! and may be added or removed while the server runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::ConfigError;
use super::traversal::TraversalSource;

/// Thread-safe map from source name to traversal source.
#[derive(Default)]
pub struct GraphManager {
    sources: RwLock<HashMap<String, Arc<dyn TraversalSource>>>,
}

impl GraphManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allowed characters: [a-zA-Z0-9_-], 1-128 long.
    fn validate_name(name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            key: name.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() || name.len() > 128 {
            return Err(invalid("Traversal source name must be 1-128 characters"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(invalid("Traversal source name can only contain a-z, A-Z, 0-9, _, -"));
        }
        Ok(())
    }

    /// Register a source. Fails if the name is taken.
    pub fn register(&self, name: &str, source: Arc<dyn TraversalSource>) -> Result<(), ConfigError> {
        Self::validate_name(name)?;
        let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
        if sources.contains_key(name) {
            return Err(ConfigError::Invalid {
                key: name.to_string(),
                reason: "Traversal source already registered".to_string(),
            });
        }
        sources.insert(name.to_string(), source);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TraversalSource>> {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn TraversalSource>> {
        self.sources.write().unwrap_or_else(|e| e.into_inner()).remove(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for GraphManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphManager").field("sources", &self.names()).finish()
    }
}

#[cfg(test)]
mod graph_manager_tests {
    use super::*;
    use crate::error::TraversalError;
    use crate::io::Bytecode;
    use crate::server::traversal::{Graph, Transaction, Traversal};

    struct NoTx;

    impl Transaction for NoTx {
        fn is_open(&self) -> bool { false }
        fn commit(&self) -> Result<(), TraversalError> { Ok(()) }
        fn rollback(&self) -> Result<(), TraversalError> { Ok(()) }
    }

    struct EmptyGraph;

    impl Graph for EmptyGraph {
        fn supports_transactions(&self) -> bool { false }
        fn tx(&self) -> &dyn Transaction { &NoTx }
    }

    struct EmptySource;

    impl TraversalSource for EmptySource {
        fn graph(&self) -> Arc<dyn Graph> {
            Arc::new(EmptyGraph)
        }

        fn translate(&self, _bytecode: &Bytecode) -> Result<Box<dyn Traversal>, TraversalError> {
            Err(TraversalError::new("empty source"))
        }
    }

    #[test]
    fn test_register_and_get() {
        let manager = GraphManager::new();
        manager.register("gmodern", Arc::new(EmptySource)).unwrap();

        assert!(manager.contains("gmodern"));
        assert!(manager.get("gmodern").is_some());
        assert!(manager.get("gcrew").is_none());
    }

    #[test]
    fn test_register_duplicate_fails() {
        let manager = GraphManager::new();
        manager.register("g", Arc::new(EmptySource)).unwrap();
        assert!(matches!(
            manager.register("g", Arc::new(EmptySource)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_validate_name() {
        assert!(GraphManager::validate_name("g").is_ok());
        assert!(GraphManager::validate_name("modern_graph-1").is_ok());
        assert!(GraphManager::validate_name("").is_err());
        assert!(GraphManager::validate_name("has space").is_err());
        assert!(GraphManager::validate_name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_remove_and_names() {
        let manager = GraphManager::new();
        manager.register("b", Arc::new(EmptySource)).unwrap();
        manager.register("a", Arc::new(EmptySource)).unwrap();
        assert_eq!(manager.names(), vec!["a".to_string(), "b".to_string()]);

        assert!(manager.remove("a").is_some());
        assert!(manager.remove("a").is_none());
        assert_eq!(manager.names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_concurrent_lookups() {
        let manager = Arc::new(GraphManager::new());
        manager.register("g", Arc::new(EmptySource)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || (0..1000).all(|_| manager.contains("g")))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
