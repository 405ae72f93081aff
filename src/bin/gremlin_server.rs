//! gremlin-server: hosts the traversal op processor on a Unix socket.
//!
//! Traversal sources are registered by embedding applications through
//! `ServerState::graph_manager`; this host starts with none, so it answers
//! side-effect ops and rejects bytecode for unconfigured aliases.

use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs, process, thread};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use gremlin_op::server::{Server, ServerState, Settings, TraversalOpProcessor};

const DEFAULT_SOCKET: &str = "/tmp/gremlin.sock";

fn usage() {
    println!("gremlin-server {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: gremlin-server [--socket <socket-path>] [--config <settings.json>]");
    println!();
    println!("Options:");
    println!("  --socket       Unix socket path (default: {})", DEFAULT_SOCKET);
    println!("  --config       JSON settings file (camelCase keys)");
    println!("  -V, --version  Print version information");
    println!("  -h, --help     Print this help message");
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gremlin_op=debug"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("gremlin-server {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return Ok(());
    }

    init_logging();

    let settings = match flag_value(&args, "--config") {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path))?,
        None => Settings::default(),
    };
    let socket_path = PathBuf::from(flag_value(&args, "--socket").unwrap_or(DEFAULT_SOCKET));

    // stale socket from a previous run
    let _ = fs::remove_file(&socket_path);

    let processor = Arc::new(TraversalOpProcessor::from_settings(&settings)?);
    let state = Arc::new(ServerState::new(settings)?);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        workers = state.pool.threads(),
        "Starting gremlin-server"
    );

    let server = Server::bind(&socket_path, processor, state)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    let socket_for_signal = socket_path.clone();
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "Received signal, exiting");
            let _ = fs::remove_file(&socket_for_signal);
            process::exit(0);
        }
    });

    server.run().context("Accept loop failed")?;
    Ok(())
}
