use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How [`Dispatcher::emit_async`](crate::Dispatcher::emit_async) drives listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitMode {
    /// One listener at a time, in snapshot order.
    #[default]
    Sequential,
    /// All listeners started in snapshot order, then awaited together.
    Concurrent,
}

impl fmt::Display for EmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Concurrent => f.write_str("concurrent"),
        }
    }
}

/// Per-call settings for [`Dispatcher::emit_async`](crate::Dispatcher::emit_async).
///
/// # Examples
/// ```rust
/// use herald_events::{EmitMode, EmitOptions};
/// use std::time::Duration;
///
/// let opts = EmitOptions::sequential().stop_on_error(true).timeout(Duration::from_millis(250));
/// assert_eq!(opts.mode, EmitMode::Sequential);
/// assert!(opts.stop_on_error);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub mode: EmitMode,
    /// Halt at the first failing listener and return its error. Sequential mode only.
    pub stop_on_error: bool,
    /// Deadline applied to each listener individually. Zero means none.
    pub timeout: Option<Duration>,
    /// External cancellation observed by each listener invocation.
    pub cancellation: Option<CancellationToken>,
}

impl EmitOptions {
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn concurrent() -> Self {
        Self { mode: EmitMode::Concurrent, ..Self::default() }
    }

    #[must_use]
    pub const fn mode(mut self, mode: EmitMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Settings {
        mode: EmitMode,
    }

    #[test]
    fn test_mode_setter_applies_configured_mode() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str("mode = \"concurrent\"", config::FileFormat::Toml))
            .build()
            .and_then(config::Config::try_deserialize)
            .unwrap();
        let opts = EmitOptions::sequential().stop_on_error(true).mode(settings.mode);

        assert_eq!(opts.mode, EmitMode::Concurrent);
        assert!(opts.stop_on_error);
        assert_eq!(opts.mode.to_string(), "concurrent");
    }

    #[test]
    fn test_defaults_are_sequential_without_deadline() {
        let opts = EmitOptions::default();
        assert_eq!(opts.mode, EmitMode::Sequential);
        assert!(!opts.stop_on_error);
        assert!(opts.timeout.is_none());
        assert!(opts.cancellation.is_none());
    }
}
