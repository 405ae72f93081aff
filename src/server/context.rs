//! Per-request context and the server-wide state it carries.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, warn};

use crate::error::ConfigError;
use super::graph_manager::GraphManager;
use super::message::{RequestMessage, ResponseMessage, ResponseStatusCode};
use super::settings::Settings;
use super::timer::OpTimer;
use super::traversal::ScriptEngine;

/// Where responses for one client go.
pub trait Connection: Send + Sync {
    /// Write one response and flush it to the client.
    fn write_and_flush(&self, response: ResponseMessage) -> io::Result<()>;
}

/// Fixed-size pool executing traversals off the network path.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ConfigError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gremlin-worker-{}", i))
            .panic_handler(|_| error!("Worker task panicked outside of request handling"))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "gremlinPool".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Queue `task`; returns immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(task);
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// State shared by every request on the server.
pub struct ServerState {
    pub settings: Settings,
    pub graph_manager: GraphManager,
    pub pool: WorkerPool,
    pub timer: Arc<OpTimer>,
    script_engines: HashMap<String, Arc<dyn ScriptEngine>>,
}

impl ServerState {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        let pool = WorkerPool::new(settings.gremlin_pool)?;
        Ok(Self {
            settings,
            graph_manager: GraphManager::new(),
            pool,
            timer: Arc::new(OpTimer::new()),
            script_engines: HashMap::new(),
        })
    }

    pub fn with_script_engine(mut self, language: impl Into<String>, engine: Arc<dyn ScriptEngine>) -> Self {
        self.script_engines.insert(language.into(), engine);
        self
    }

    pub fn script_engine(&self, language: &str) -> Option<Arc<dyn ScriptEngine>> {
        self.script_engines.get(language).cloned()
    }
}

/// One request in flight: the message, the connection to answer on, and
/// the server state. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    request: Arc<RequestMessage>,
    connection: Arc<dyn Connection>,
    state: Arc<ServerState>,
}

impl Context {
    pub fn new(request: RequestMessage, connection: Arc<dyn Connection>, state: Arc<ServerState>) -> Self {
        Self { request: Arc::new(request), connection, state }
    }

    pub fn request(&self) -> &RequestMessage {
        &self.request
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn write(&self, response: ResponseMessage) -> io::Result<()> {
        self.connection.write_and_flush(response)
    }

    /// Write a status-only response; a failed write is logged.
    pub fn write_status(&self, code: ResponseStatusCode, message: impl Into<String>) {
        let response = ResponseMessage::build(&self.request)
            .code(code)
            .status_message(message)
            .create();
        if let Err(e) = self.write(response) {
            warn!(request_id = %self.request.request_id, error = %e, "Could not write response");
        }
    }
}
