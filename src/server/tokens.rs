//! Operation codes, argument keys and other names shared with clients.

pub const OPS_BYTECODE: &str = "bytecode";
pub const OPS_GATHER: &str = "gather";
pub const OPS_KEYS: &str = "keys";
pub const OPS_CLOSE: &str = "close";
/// Assigned upstream to requests that failed to parse.
pub const OPS_INVALID: &str = "invalid";

pub const ARGS_GREMLIN: &str = "gremlin";
pub const ARGS_ALIASES: &str = "aliases";
pub const ARGS_SIDE_EFFECT: &str = "sideEffect";
pub const ARGS_SIDE_EFFECT_KEY: &str = "sideEffectKey";
pub const ARGS_AGGREGATE_TO: &str = "aggregateTo";
pub const ARGS_BATCH_SIZE: &str = "batchSize";
pub const ARGS_EVAL_TIMEOUT: &str = "evaluationTimeout";

/// The only alias a traversal request may carry.
pub const ALIAS_G: &str = "g";

pub const PROCESSOR_TRAVERSAL: &str = "traversal";
pub const TRAVERSAL_PROCESSOR_CLASS: &str = "TraversalOpProcessor";

pub const CONFIG_CACHE_EXPIRATION_TIME: &str = "cacheExpirationTime";
pub const CONFIG_CACHE_MAX_SIZE: &str = "cacheMaxSize";
pub const DEFAULT_CACHE_EXPIRATION_TIME_MS: u64 = 600_000;
pub const DEFAULT_CACHE_MAX_SIZE: u64 = 1000;
