//! Tracing and logging setup shared by the service and the CLI.

/// Initialize process-wide observability for a long-running service.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env(tracing::LogFormat::Json));
}

/// Initialize observability for interactive tools (human-readable by default).
pub fn init_cli() {
    tracing::init(tracing::LogFormat::from_env(tracing::LogFormat::Text));
}

/// Tracing configuration (filters, layers).
pub mod tracing;
