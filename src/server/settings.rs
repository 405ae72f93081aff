//! Server settings, read from camelCase JSON.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level settings. Every field has a default so `{}` is a valid document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Per-request execution budget in milliseconds; 0 disables the timeout.
    #[serde(default = "default_evaluation_timeout")]
    pub evaluation_timeout: u64,

    #[serde(default = "default_batch_size")]
    pub result_iteration_batch_size: usize,

    /// Worker threads executing traversals.
    #[serde(default = "default_gremlin_pool")]
    pub gremlin_pool: usize,

    #[serde(default)]
    pub processors: Vec<ProcessorSettings>,
}

/// Configuration handed to one op processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSettings {
    pub class_name: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

fn default_evaluation_timeout() -> u64 { 30_000 }
fn default_batch_size() -> usize { 64 }
fn default_gremlin_pool() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            evaluation_timeout: default_evaluation_timeout(),
            result_iteration_batch_size: default_batch_size(),
            gremlin_pool: default_gremlin_pool(),
            processors: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.result_iteration_batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "resultIterationBatchSize".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.gremlin_pool == 0 {
            return Err(ConfigError::Invalid {
                key: "gremlinPool".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Entry for the processor whose class name is `name` or ends in `.name`.
    pub fn processor(&self, name: &str) -> Option<&ProcessorSettings> {
        self.processors.iter().find(|p| {
            p.class_name == name
                || p.class_name
                    .strip_suffix(name)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl ProcessorSettings {
    /// Read a non-negative integer entry that may be given as a number or a
    /// numeric string. `Ok(None)` when absent.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid { key: key.to_string(), reason };
        match self.config.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(format!("expected a non-negative integer, got {}", n))),
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| invalid(format!("'{}': {}", s, e))),
            Some(other) => Err(invalid(format!("expected a number, got {}", other))),
        }
    }
}
