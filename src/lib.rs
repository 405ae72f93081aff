//! Server-side query execution for a graph traversal engine.
//!
//! - [`io`]: type-tagged binary codec for values and request/response envelopes
//! - [`server`]: the traversal op processor, side-effect cache and connection handling

pub mod error;
pub mod io;
pub mod server;

pub use error::{CodecError, ConfigError, OpProcessorError, TraversalError};
