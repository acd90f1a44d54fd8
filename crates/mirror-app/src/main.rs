//! Mirror - conversational safety service for the Mirror chat app.
//!
//! Wires the safety pipeline together and serves the HTTP API:
//! - Local policy rules, then the external moderation classifier
//! - Response composer backed by the completion service
//! - Durable audit trail in SQLite (optional)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mirror_core::{
    AuditLogger, PolicyRuleSet, ResponseComposer, SafetyPipeline, TracingAuditLog,
};
use mirror_providers::{CompletionApi, ModerationApi, DEFAULT_API_BASE};
use mirror_server::{AppState, Server, ServerConfig};
use mirror_storage::AuditStore;

/// Mirror - conversational safety service
#[derive(Parser, Debug)]
#[command(name = "mirror", version, about)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = mirror_server::DEFAULT_HOST)]
    host: String,

    /// Port to bind to
    #[arg(long, default_value_t = mirror_server::DEFAULT_PORT)]
    port: u16,

    /// Audit database path (defaults to the app data directory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log guardrail events to tracing only, skip the SQLite audit trail
    #[arg(long)]
    no_audit_db: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "mirror", "mirror").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mirror={},warn", log_level)));

    // Try to set up file logging alongside the console
    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("mirror")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Resolve the completion/moderation API key from the environment.
fn api_key() -> Option<String> {
    std::env::var("MIRROR_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Resolve the API base URL from the environment.
fn api_base() -> String {
    std::env::var("MIRROR_API_BASE")
        .ok()
        .filter(|base| !base.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Build the audit sink: durable SQLite trail, or tracing-only.
fn build_audit_sink(args: &Args) -> Arc<dyn AuditLogger> {
    if args.no_audit_db {
        tracing::info!("Audit database disabled, guardrail events go to tracing only");
        return Arc::new(TracingAuditLog);
    }

    let store = match &args.db {
        Some(path) => AuditStore::with_path(path),
        None => AuditStore::new(),
    };

    match store {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Audit database unavailable ({}), falling back to tracing", e);
            Arc::new(TracingAuditLog)
        }
    }
}

/// Build the application state, wiring providers when credentials exist.
fn build_state(args: &Args) -> AppState {
    let Some(key) = api_key() else {
        tracing::warn!(
            "No API key found (MIRROR_API_KEY / OPENAI_API_KEY); chat endpoint will answer 503"
        );
        return AppState::unconfigured();
    };

    let base = api_base();
    tracing::info!("Using API base {}", base);

    let pipeline = SafetyPipeline::new(
        Arc::new(PolicyRuleSet::mirror_defaults()),
        Arc::new(ModerationApi::new(&base, &key)),
        build_audit_sink(args),
    );
    let composer = ResponseComposer::new(Arc::new(CompletionApi::new(&base, &key)));

    AppState::new(pipeline, composer)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (keep guard alive for the duration of the program)
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Mirror safety service...");

    let state = build_state(&args);

    let config = ServerConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port);

    let server = Server::new(config, state)?;
    tracing::info!("Listening on {}", server.addr());

    server.run().await?;

    tracing::info!("Mirror shutting down");
    Ok(())
}
