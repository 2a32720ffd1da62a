use herald_events::DispatcherConfig;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_LISTENER_TIMEOUT_MS: u64 = 250;

/// Shell settings, read from `herald.*` and `HERALD__*` overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct ShellConfig {
    pub(crate) dispatcher: DispatcherConfig,
    /// Per-listener deadline for async emissions. Zero disables it.
    pub(crate) listener_timeout_ms: u64,
    /// `EnvFilter` directives applied when `RUST_LOG` is unset.
    pub(crate) log_filter: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            listener_timeout_ms: DEFAULT_LISTENER_TIMEOUT_MS,
            log_filter: None,
        }
    }
}

impl ShellConfig {
    pub(crate) const fn listener_timeout(&self) -> Duration {
        Duration::from_millis(self.listener_timeout_ms)
    }
}
