use std::any::Any;
use std::borrow::Cow;
use std::time::Duration;

/// Error type produced by a listener.
///
/// Any `std::error::Error` that is `Send + Sync` converts into it with `?` or `.into()`.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while registering listeners or dispatching events.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The listener returned an error, or its deferred completion failed.
    #[error("Listener failed{}: {source}", format_context(.context))]
    Listener { source: ListenerError, context: Option<Cow<'static, str>> },

    /// The listener panicked while being invoked or polled.
    #[error("Listener panicked{}: {message}", format_context(.context))]
    Panicked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The listener did not settle before its deadline.
    #[error("Listener timed out after {}ms{}", .timeout.as_millis(), format_context(.context))]
    TimedOut { timeout: Duration, context: Option<Cow<'static, str>> },

    /// The cancellation token fired before the listener settled.
    #[error("Listener aborted{}", format_context(.context))]
    Aborted { context: Option<Cow<'static, str>> },

    /// The event key was empty after trimming.
    #[error("Invalid event key{}: {message}", format_context(.context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DispatchError {
    /// Wraps a listener-provided error.
    #[must_use]
    pub fn listener(source: impl Into<ListenerError>) -> Self {
        Self::Listener { source: source.into(), context: None }
    }

    /// Builds a [`DispatchError::Panicked`] from a panic payload.
    #[must_use]
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        let message: Cow<'static, str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Cow::Borrowed(s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Cow::Owned(s.clone())
        } else {
            Cow::Borrowed("non-string panic payload")
        };
        Self::Panicked { message, context: None }
    }

    /// Attaches (or replaces) a human-readable context on the error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        match &mut self {
            Self::Listener { context: c, .. }
            | Self::Panicked { context: c, .. }
            | Self::TimedOut { context: c, .. }
            | Self::Aborted { context: c }
            | Self::InvalidKey { context: c, .. } => *c = Some(context.into()),
        }
        self
    }

    /// `true` if the listener lost the race against its deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// `true` if the listener lost the race against its cancellation token.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// `true` if the failure originated inside the listener itself (error or panic).
    #[must_use]
    pub const fn is_listener_failure(&self) -> bool {
        matches!(self, Self::Listener { .. } | Self::Panicked { .. })
    }
}

pub(crate) fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
