use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global console subscriber.
///
/// `RUST_LOG` wins over `directives`; `debug` raises the default level so the
/// dispatcher's diagnostics become visible.
pub(crate) fn init(directives: Option<&str>, debug: bool) -> anyhow::Result<()> {
    let fallback = directives.unwrap_or(if debug { "debug" } else { "info" });

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .with_context(|| format!("Invalid log filter: {fallback}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(layer().compact().with_ansi(true))
        .try_init()
        .context("Global subscriber already installed")
}
