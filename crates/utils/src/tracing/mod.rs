use grace_core::{DEFAULT_LOG_FILTER, GRACE_LOG_VAR};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing::{span, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `RUST_LOG`, then `GRACE_LOG`, then defaults to
/// `info`. Output goes to stderr in the compact format, with ANSI colours
/// only when stderr is a terminal.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with_filter(resolve_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var(GRACE_LOG_VAR).ok(),
    ))
}

/// Initialize the tracing system with an explicit filter directive
pub fn init_with_filter(
    directive: impl AsRef<str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_new(directive.as_ref())?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn resolve_filter(rust_log: Option<String>, grace_log: Option<String>) -> String {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .or_else(|| grace_log.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one worker's lifetime
pub fn worker_span(kind: &str, index: usize) -> Span {
    span!(Level::INFO, "worker", kind = %kind, index = %index)
}
