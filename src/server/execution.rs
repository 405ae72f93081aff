//! Execution of selected ops.
//!
//! `bytecode` and `gather` run on the worker pool; `keys` and `close` answer
//! on the calling thread. Every worker task produces an `ExecutionOutcome`
//! and hands it to `complete`, the one place that commits or rolls back,
//! populates the cache and writes the terminal response.

use std::any::Any;
use std::collections::HashMap;
use std::iter;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::error::{OpProcessorError, TraversalError};
use crate::io::{graphson, Bytecode, Value};
use super::cache::{SideEffectCache, SideEffectId};
use super::context::Context;
use super::message::{ResponseMessage, ResponseStatusCode};
use super::tokens::{
    ALIAS_G, ARGS_AGGREGATE_TO, ARGS_BATCH_SIZE, ARGS_EVAL_TIMEOUT, ARGS_GREMLIN,
    ARGS_SIDE_EFFECT, ARGS_SIDE_EFFECT_KEY, OPS_BYTECODE, OPS_GATHER, OPS_KEYS,
};
use super::traversal::{Graph, Traversal, TraversalSource};

/// Result of one unit of work.
#[derive(Debug, PartialEq)]
pub(crate) enum ExecutionOutcome {
    /// Fully iterated; `tail` is the last batch, not yet written.
    Completed { tail: Vec<Value> },
    TimedOut(String),
    Failed(String),
}

/// Batching, deadline and response metadata for one iteration.
#[derive(Debug, Clone)]
pub(crate) struct IterationOptions {
    pub batch_size: usize,
    pub timeout: Option<Duration>,
    pub deadline: Option<Instant>,
    pub meta: HashMap<String, Value>,
}

impl IterationOptions {
    /// Options for `ctx`'s request; the deadline starts now.
    pub fn for_request(ctx: &Context) -> Self {
        let request = ctx.request();
        let settings = &ctx.state().settings;

        let batch_size = request
            .arg(ARGS_BATCH_SIZE)
            .and_then(Value::as_i64)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n > 0)
            .unwrap_or(settings.result_iteration_batch_size)
            .max(1);

        let timeout_ms = request
            .arg(ARGS_EVAL_TIMEOUT)
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(settings.evaluation_timeout);
        let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        Self {
            batch_size,
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            meta: HashMap::new(),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Drain `items`, writing a partial-content response for every full batch
/// that is not the last. The deadline is checked before each advance.
pub(crate) fn handle_iterator<I>(ctx: &Context, items: I, options: &IterationOptions) -> ExecutionOutcome
where
    I: Iterator<Item = Result<Value, TraversalError>>,
{
    let request = ctx.request();
    let mut items = items.peekable();
    let mut batch = Vec::with_capacity(options.batch_size.min(1024));

    loop {
        if options.expired() {
            return timed_out(ctx, options);
        }
        match items.next() {
            None => return ExecutionOutcome::Completed { tail: batch },
            Some(Err(e)) => return ExecutionOutcome::Failed(e.message),
            Some(Ok(value)) => batch.push(value),
        }

        if batch.len() >= options.batch_size {
            if options.expired() {
                return timed_out(ctx, options);
            }
            if items.peek().is_none() {
                return ExecutionOutcome::Completed { tail: batch };
            }
            let response = ResponseMessage::build(request)
                .code(ResponseStatusCode::PartialContent)
                .result(Value::List(mem::take(&mut batch)))
                .response_meta_data(options.meta.clone())
                .create();
            if let Err(e) = ctx.write(response) {
                return ExecutionOutcome::Failed(format!("Could not write partial response: {}", e));
            }
        }
    }
}

fn timed_out(ctx: &Context, options: &IterationOptions) -> ExecutionOutcome {
    let timeout_ms = options.timeout.map(|t| t.as_millis()).unwrap_or_default();
    ExecutionOutcome::TimedOut(format!(
        "Response iteration exceeded the configured threshold for request [{}] - Timed out after {} ms",
        ctx.request().request_id,
        timeout_ms
    ))
}

fn rollback_if_open(graph: &dyn Graph) -> Result<(), TraversalError> {
    if graph.supports_transactions() && graph.tx().is_open() {
        graph.tx().rollback()?;
    }
    Ok(())
}

fn commit_if_open(graph: &dyn Graph) -> Result<(), TraversalError> {
    if graph.supports_transactions() && graph.tx().is_open() {
        graph.tx().commit()?;
    }
    Ok(())
}

fn rollback_after_error(ctx: &Context, graph: Option<&dyn Graph>) {
    if let Some(graph) = graph {
        if let Err(e) = rollback_if_open(graph) {
            warn!(request_id = %ctx.request().request_id, error = %e, "Rollback failed");
        }
    }
}

/// Run `work`, turning a panic into a failure.
fn guarded<F>(ctx: &Context, work: F) -> ExecutionOutcome
where
    F: FnOnce() -> ExecutionOutcome,
{
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(request_id = %ctx.request().request_id, panic = %message, "Traversal panicked");
        ExecutionOutcome::Failed(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Traversal panicked".to_string()
    }
}

/// Act on an outcome. On completion `on_success` runs before the terminal
/// response is written; if it fails the client gets a server error instead.
fn complete<F>(
    ctx: &Context,
    graph: Option<&dyn Graph>,
    outcome: ExecutionOutcome,
    options: &IterationOptions,
    on_success: F,
) where
    F: FnOnce() -> Result<(), TraversalError>,
{
    let request_id = ctx.request().request_id;
    match outcome {
        ExecutionOutcome::Completed { tail } => {
            if let Err(e) = on_success() {
                warn!(request_id = %request_id, error = %e, "Could not complete request");
                ctx.write_status(ResponseStatusCode::ServerError, e.message);
                rollback_after_error(ctx, graph);
                return;
            }
            let response = if tail.is_empty() {
                ResponseMessage::build(ctx.request())
                    .code(ResponseStatusCode::NoContent)
                    .create()
            } else {
                ResponseMessage::build(ctx.request())
                    .code(ResponseStatusCode::Success)
                    .result(Value::List(tail))
                    .response_meta_data(options.meta.clone())
                    .create()
            };
            if let Err(e) = ctx.write(response) {
                warn!(request_id = %request_id, error = %e, "Could not write final response");
            }
        }
        ExecutionOutcome::TimedOut(message) => {
            warn!(request_id = %request_id, "{}", message);
            ctx.write_status(ResponseStatusCode::ServerErrorTimeout, message);
            rollback_after_error(ctx, graph);
        }
        ExecutionOutcome::Failed(message) => {
            warn!(request_id = %request_id, error = %message, "Request failed during iteration");
            ctx.write_status(ResponseStatusCode::ServerError, message);
            rollback_after_error(ctx, graph);
        }
    }
}

fn resolve_source(ctx: &Context, source_name: &str) -> Result<Arc<dyn TraversalSource>, OpProcessorError> {
    ctx.state().graph_manager.get(source_name).ok_or_else(|| {
        OpProcessorError::invalid_arguments(format!(
            "The traversal source [{}] for alias [{}] is not configured on the server.",
            source_name, ALIAS_G
        ))
    })
}

/// The `gremlin` argument: binary bytecode or its GraphSON text.
fn decode_bytecode(ctx: &Context) -> Result<Bytecode, OpProcessorError> {
    match ctx.request().arg(ARGS_GREMLIN) {
        Some(Value::Bytecode(bytecode)) => Ok(bytecode.clone()),
        Some(Value::String(text)) => graphson::parse_bytecode(text)
            .map_err(|e| OpProcessorError::serialization(e.to_string())),
        Some(other) => Err(OpProcessorError::serialization(format!(
            "Cannot read a traversal from a {:?} argument",
            other.data_type()
        ))),
        None => Err(OpProcessorError::invalid_arguments(format!(
            "A message with [{}] op code requires a [{}] argument.",
            OPS_BYTECODE, ARGS_GREMLIN
        ))),
    }
}

fn translate(
    ctx: &Context,
    bytecode: &Bytecode,
    source: Arc<dyn TraversalSource>,
) -> Result<Box<dyn Traversal>, OpProcessorError> {
    let translated = match bytecode.lambda_language() {
        None => source.translate(bytecode),
        Some(language) => match ctx.state().script_engine(language) {
            Some(engine) => engine.eval(bytecode, ALIAS_G, source),
            None => Err(TraversalError::new(format!(
                "No script engine is registered for language [{}]",
                language
            ))),
        },
    };
    translated.map_err(|e| {
        error!(request_id = %ctx.request().request_id, error = %e, "Could not deserialize the Traversal instance");
        OpProcessorError::serialization(e.message)
    })
}

/// Decode and translate on the calling thread, then iterate on the pool.
pub(crate) fn iterate_bytecode_traversal(
    ctx: Context,
    source_name: &str,
    cache: &SideEffectCache,
) -> Result<(), OpProcessorError> {
    debug!(request_id = %ctx.request().request_id, "Traversal request");
    let timer = ctx.state().timer.time(OPS_BYTECODE);

    let bytecode = decode_bytecode(&ctx)?;
    let source = resolve_source(&ctx, source_name)?;
    let mut traversal = translate(&ctx, &bytecode, Arc::clone(&source))?;
    let graph = source.graph();
    let cache = cache.clone();
    let state = Arc::clone(ctx.state());

    state.pool.submit(move || {
        let _timer = timer;
        let options = IterationOptions::for_request(&ctx);

        let outcome = guarded(&ctx, || {
            if let Err(e) = rollback_if_open(graph.as_ref()) {
                return ExecutionOutcome::Failed(e.message);
            }
            if let Err(e) = traversal.apply_strategies() {
                return ExecutionOutcome::Failed(e.message);
            }
            handle_iterator(&ctx, traversal.by_ref(), &options)
        });

        let id = SideEffectId::of_request(ctx.request());
        complete(&ctx, Some(graph.as_ref()), outcome, &options, || {
            commit_if_open(graph.as_ref())?;
            let side_effects = traversal.side_effects();
            if !side_effects.is_empty() {
                cache.put(id, side_effects);
            }
            Ok(())
        });
    });
    Ok(())
}

/// Stream one cached side-effect value on the pool.
pub(crate) fn gather_side_effect(
    ctx: Context,
    source_name: &str,
    side_effect: SideEffectId,
    key: String,
    cache: &SideEffectCache,
) -> Result<(), OpProcessorError> {
    debug!(request_id = %ctx.request().request_id, %side_effect, key = %key, "Side-effect request");
    let timer = ctx.state().timer.time(OPS_GATHER);

    let graph = resolve_source(&ctx, source_name)?.graph();
    let cache = cache.clone();
    let state = Arc::clone(ctx.state());

    state.pool.submit(move || {
        let _timer = timer;
        let mut options = IterationOptions::for_request(&ctx);

        let outcome = guarded(&ctx, || {
            if let Err(e) = rollback_if_open(graph.as_ref()) {
                return ExecutionOutcome::Failed(e.message);
            }
            let Some(side_effects) = cache.get(&side_effect) else {
                return ExecutionOutcome::Failed(format!(
                    "Could not find side-effects for {}.",
                    side_effect
                ));
            };
            let Some(entry) = side_effects.get(&key) else {
                return ExecutionOutcome::Failed(format!(
                    "Could not find side-effect key for {} in {}.",
                    key, side_effect
                ));
            };
            options.meta.insert(ARGS_SIDE_EFFECT_KEY.to_string(), Value::from(key.as_str()));
            options
                .meta
                .insert(ARGS_AGGREGATE_TO.to_string(), Value::from(entry.aggregate_to.as_str()));
            handle_iterator(&ctx, iter::once(Ok(entry.value.clone())), &options)
        });

        // read-only: a transaction opened while gathering is rolled back
        complete(&ctx, Some(graph.as_ref()), outcome, &options, || {
            rollback_if_open(graph.as_ref())
        });
    });
    Ok(())
}

/// Key names of a cached bag; an unknown id yields no content.
pub(crate) fn side_effect_keys(ctx: &Context, side_effect: SideEffectId, cache: &SideEffectCache) {
    let _timer = ctx.state().timer.time(OPS_KEYS);

    let keys: Vec<Value> = match cache.get(&side_effect) {
        Some(side_effects) => side_effects.keys().map(Value::from).collect(),
        None => {
            warn!(%side_effect, "Request for side-effect keys returned no side-effects in the cache");
            Vec::new()
        }
    };

    let mut options = IterationOptions::for_request(ctx);
    options.deadline = None;
    let outcome = handle_iterator(ctx, keys.into_iter().map(Ok), &options);
    complete(ctx, None, outcome, &options, || Ok(()));
}

/// Drop a cached bag and acknowledge with no content.
pub(crate) fn close_side_effects(ctx: &Context, side_effect: SideEffectId, cache: &SideEffectCache) {
    debug!(request_id = %ctx.request().request_id, %side_effect, "Close request");
    cache.invalidate(&side_effect);
    ctx.write_status(
        ResponseStatusCode::NoContent,
        format!("Successfully cleared side effect cache for [{}].", ARGS_SIDE_EFFECT),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::server::context::{Connection, ServerState};
    use crate::server::message::RequestMessage;
    use crate::server::settings::Settings;

    #[derive(Default)]
    struct Recording {
        responses: Mutex<Vec<ResponseMessage>>,
    }

    impl Connection for Recording {
        fn write_and_flush(&self, response: ResponseMessage) -> std::io::Result<()> {
            self.responses.lock().unwrap().push(response);
            Ok(())
        }
    }

    fn context(request: RequestMessage) -> (Context, Arc<Recording>) {
        let connection = Arc::new(Recording::default());
        let state = ServerState::new(Settings { gremlin_pool: 1, ..Settings::default() }).unwrap();
        let ctx = Context::new(request, connection.clone(), Arc::new(state));
        (ctx, connection)
    }

    fn values(n: i64) -> impl Iterator<Item = Result<Value, TraversalError>> {
        (0..n).map(|i| Ok(Value::Long(i)))
    }

    #[test]
    fn test_options_from_arguments() {
        let request = RequestMessage::build(OPS_BYTECODE)
            .add_arg(ARGS_BATCH_SIZE, 3)
            .add_arg(ARGS_EVAL_TIMEOUT, 0)
            .create();
        let (ctx, _) = context(request);
        let options = IterationOptions::for_request(&ctx);
        assert_eq!(options.batch_size, 3);
        assert!(options.deadline.is_none());

        let (ctx, _) = context(RequestMessage::build(OPS_BYTECODE).add_arg(ARGS_BATCH_SIZE, -2).create());
        let options = IterationOptions::for_request(&ctx);
        assert_eq!(options.batch_size, 64);
        assert_eq!(options.timeout, Some(Duration::from_millis(30_000)));
    }

    #[test]
    fn test_exact_multiple_of_batch_keeps_last_batch() {
        let (ctx, connection) = context(RequestMessage::build(OPS_BYTECODE).add_arg(ARGS_BATCH_SIZE, 2).create());
        let options = IterationOptions::for_request(&ctx);

        let outcome = handle_iterator(&ctx, values(4), &options);
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed { tail: vec![Value::Long(2), Value::Long(3)] }
        );
        let written = connection.responses.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].code(), ResponseStatusCode::PartialContent);
        assert_eq!(written[0].result.data, Value::List(vec![Value::Long(0), Value::Long(1)]));
    }

    #[test]
    fn test_empty_iterator_completes_without_writes() {
        let (ctx, connection) = context(RequestMessage::build(OPS_KEYS).create());
        let options = IterationOptions::for_request(&ctx);
        assert_eq!(
            handle_iterator(&ctx, values(0), &options),
            ExecutionOutcome::Completed { tail: vec![] }
        );
        assert!(connection.responses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_iteration_error_fails() {
        let (ctx, _) = context(RequestMessage::build(OPS_BYTECODE).create());
        let options = IterationOptions::for_request(&ctx);
        let items = values(2).chain(iter::once(Err(TraversalError::new("boom"))));
        assert_eq!(
            handle_iterator(&ctx, items, &options),
            ExecutionOutcome::Failed("boom".to_string())
        );
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let (ctx, _) = context(RequestMessage::build(OPS_BYTECODE).create());
        let mut options = IterationOptions::for_request(&ctx);
        options.deadline = Some(Instant::now());
        assert!(matches!(
            handle_iterator(&ctx, values(10), &options),
            ExecutionOutcome::TimedOut(message) if message.contains("exceeded the configured threshold")
        ));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let (ctx, _) = context(RequestMessage::build(OPS_BYTECODE).create());
        let outcome = guarded(&ctx, || panic!("traversal exploded"));
        assert_eq!(outcome, ExecutionOutcome::Failed("traversal exploded".to_string()));
    }

    #[test]
    fn test_complete_writes_no_content_for_empty_tail() {
        let (ctx, connection) = context(RequestMessage::build(OPS_KEYS).create());
        let options = IterationOptions::for_request(&ctx);
        complete(&ctx, None, ExecutionOutcome::Completed { tail: vec![] }, &options, || Ok(()));
        complete(
            &ctx,
            None,
            ExecutionOutcome::Completed { tail: vec![Value::Long(1)] },
            &options,
            || Err(TraversalError::new("commit failed")),
        );

        let written = connection.responses.lock().unwrap();
        assert_eq!(written[0].code(), ResponseStatusCode::NoContent);
        assert_eq!(written[1].code(), ResponseStatusCode::ServerError);
        assert_eq!(written[1].status_message(), Some("commit failed"));
    }
}
