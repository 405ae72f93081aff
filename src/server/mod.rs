//! Traversal op processor and the server plumbing around it.
//!
//! A request arrives on a connection, is validated by
//! [`TraversalOpProcessor::select`] and runs either inline (`keys`, `close`)
//! or on the worker pool (`bytecode`, `gather`). Side-effects of completed
//! traversals are kept in a [`SideEffectCache`] for later retrieval.

pub mod cache;
pub mod connection;
pub mod context;
mod execution;
pub mod graph_manager;
pub mod message;
pub mod processor;
pub mod settings;
pub mod timer;
pub mod tokens;
pub mod traversal;

pub use cache::{SideEffectCache, SideEffectCacheConfig, SideEffectId};
pub use connection::{FramedConnection, Server};
pub use context::{Connection, Context, ServerState, WorkerPool};
pub use graph_manager::GraphManager;
pub use message::{RequestMessage, ResponseMessage, ResponseStatusCode};
pub use processor::{SelectedOp, TraversalOpProcessor};
pub use settings::{ProcessorSettings, Settings};
pub use traversal::{Graph, ScriptEngine, SideEffect, SideEffects, Transaction, Traversal, TraversalSource};
