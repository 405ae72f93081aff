//! The traversal op processor: validates requests and routes them by op.
//!
//! `select` performs every argument check up front, so a request that fails
//! validation never reaches the cache or the worker pool.

use tracing::debug;

use crate::error::{ConfigError, OpProcessorError};
use crate::io::Value;
use super::cache::{SideEffectCache, SideEffectCacheConfig, SideEffectId};
use super::context::Context;
use super::execution;
use super::message::RequestMessage;
use super::settings::Settings;
use super::tokens::{
    ALIAS_G, ARGS_ALIASES, ARGS_GREMLIN, ARGS_SIDE_EFFECT, ARGS_SIDE_EFFECT_KEY, OPS_BYTECODE,
    OPS_CLOSE, OPS_GATHER, OPS_INVALID, OPS_KEYS, PROCESSOR_TRAVERSAL,
};

/// A validated request, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedOp {
    Bytecode { source: String },
    Gather { source: String, side_effect: SideEffectId, key: String },
    Keys { side_effect: SideEffectId },
    Close { side_effect: SideEffectId },
}

pub struct TraversalOpProcessor {
    cache: SideEffectCache,
}

impl TraversalOpProcessor {
    pub const NAME: &'static str = PROCESSOR_TRAVERSAL;

    pub fn new(cache: SideEffectCache) -> Self {
        Self { cache }
    }

    /// Build the processor and its cache from the processor's settings entry.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let config = SideEffectCacheConfig::from_settings(settings)?;
        Ok(Self::new(SideEffectCache::new(config)))
    }

    pub fn cache(&self) -> &SideEffectCache {
        &self.cache
    }

    /// Validate the request and pick the op to run.
    pub fn select(&self, ctx: &Context) -> Result<SelectedOp, OpProcessorError> {
        let request = ctx.request();
        debug!(request_id = %request.request_id, op = %request.op, "Selecting op");

        match request.op.as_str() {
            OPS_BYTECODE => {
                require(request, ARGS_GREMLIN)?;
                let source = validate_traversal_source_alias(ctx, request)?;
                Ok(SelectedOp::Bytecode { source })
            }
            OPS_GATHER => {
                let side_effect = side_effect_arg(request)?;
                let key = match require(request, ARGS_SIDE_EFFECT_KEY)? {
                    Value::String(key) => key.clone(),
                    _ => {
                        return Err(OpProcessorError::invalid_arguments(format!(
                            "The [{}] argument must be a String.",
                            ARGS_SIDE_EFFECT_KEY
                        )))
                    }
                };
                let source = validate_traversal_source_alias(ctx, request)?;
                Ok(SelectedOp::Gather { source, side_effect, key })
            }
            OPS_KEYS => Ok(SelectedOp::Keys { side_effect: side_effect_arg(request)? }),
            OPS_CLOSE => Ok(SelectedOp::Close { side_effect: side_effect_arg(request)? }),
            OPS_INVALID => Err(OpProcessorError::malformed(format!(
                "Message could not be parsed.  Check the format of the request. [{:?}]",
                request
            ))),
            other => Err(OpProcessorError::malformed(format!(
                "Message with op code [{}] is not recognized.",
                other
            ))),
        }
    }

    /// Select and run. Validation failures are answered here; execution
    /// results are answered by the op itself.
    pub fn process(&self, ctx: Context) {
        let result = self.select(&ctx).and_then(|op| match op {
            SelectedOp::Bytecode { source } => {
                execution::iterate_bytecode_traversal(ctx.clone(), &source, &self.cache)
            }
            SelectedOp::Gather { source, side_effect, key } => {
                execution::gather_side_effect(ctx.clone(), &source, side_effect, key, &self.cache)
            }
            SelectedOp::Keys { side_effect } => {
                execution::side_effect_keys(&ctx, side_effect, &self.cache);
                Ok(())
            }
            SelectedOp::Close { side_effect } => {
                execution::close_side_effects(&ctx, side_effect, &self.cache);
                Ok(())
            }
        });

        if let Err(e) = result {
            debug!(request_id = %ctx.request().request_id, code = ?e.code, error = %e, "Request rejected");
            ctx.write_status(e.code, e.message);
        }
    }
}

fn require<'a>(request: &'a RequestMessage, key: &str) -> Result<&'a Value, OpProcessorError> {
    request.arg(key).ok_or_else(|| {
        OpProcessorError::invalid_arguments(format!(
            "A message with [{}] op code requires a [{}] argument.",
            request.op, key
        ))
    })
}

fn side_effect_arg(request: &RequestMessage) -> Result<SideEffectId, OpProcessorError> {
    SideEffectId::from_arg(require(request, ARGS_SIDE_EFFECT)?).ok_or_else(|| {
        OpProcessorError::invalid_arguments(format!(
            "The [{}] argument must be a UUID.",
            ARGS_SIDE_EFFECT
        ))
    })
}

/// `aliases` must map exactly `g` to the name of a configured source.
fn validate_traversal_source_alias(ctx: &Context, request: &RequestMessage) -> Result<String, OpProcessorError> {
    let aliases = require(request, ARGS_ALIASES)?;
    let source = match aliases.as_map() {
        Some([(Value::String(alias), Value::String(source))]) if alias == ALIAS_G => source,
        _ => {
            return Err(OpProcessorError::invalid_arguments(format!(
                "A message with [{}] op code requires the [{}] argument to be a Map containing one alias assignment named '{}'.",
                request.op, ARGS_ALIASES, ALIAS_G
            )))
        }
    };

    if !ctx.state().graph_manager.contains(source) {
        return Err(OpProcessorError::invalid_arguments(format!(
            "The traversal source [{}] for alias [{}] is not configured on the server.",
            source, ALIAS_G
        )));
    }
    Ok(source.clone())
}
