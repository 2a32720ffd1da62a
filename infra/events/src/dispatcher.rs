use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::event::Event;
use crate::key::EventKey;
use crate::listener::{Completion, ListenerRef};
use crate::options::{EmitMode, EmitOptions};
use crate::registry::{CapacityHook, Registration, Registry};
use crate::timeout::with_timeout;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Where a listener failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Key of the emitted event (not the key the listener was registered under).
    pub event: EventKey,
    /// Zero-based position in the dispatch order, counting specific listeners
    /// first and wildcard listeners after them.
    pub listener_index: usize,
}

/// The single error sink receiving every listener failure.
pub type ErrorSink = Arc<dyn Fn(&DispatchError, &ErrorContext) + Send + Sync>;

/// A listener invocation after its synchronous part has run.
enum Invocation {
    Settled(Result<(), DispatchError>),
    Pending(BoxFuture<'static, Result<(), DispatchError>>),
}

impl Invocation {
    fn into_pending(self) -> BoxFuture<'static, Result<(), DispatchError>> {
        match self {
            Self::Settled(outcome) => futures::future::ready(outcome).boxed(),
            Self::Pending(fut) => fut,
        }
    }
}

struct Inner<T> {
    registry: Registry<T>,
    config: DispatcherConfig,
    on_error: Option<ErrorSink>,
}

/// In-process publish/subscribe dispatcher.
///
/// Cloning yields another handle to the same registry; build one instance in
/// the composition root and hand clones to collaborators.
///
/// # Dispatch order
/// Listeners of the event's own key run first, in registration order, then the
/// wildcard (`*`) listeners, in registration order. Emitting `*` itself runs
/// the wildcard listeners exactly once.
///
/// # Failure isolation
/// A failing or panicking listener never prevents the others from running.
/// Failures are routed to the error sink configured with
/// [`DispatcherBuilder::on_error`]. Without a sink they are dropped, except that
/// a sequential [`emit_async`](Self::emit_async) with `stop_on_error` returns
/// the first one.
///
/// # Example
/// ```rust
/// use herald_events::{Dispatcher, EmitOptions, Event, EventKey, ListenerFn};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), herald_events::DispatchError> {
/// let dispatcher = Dispatcher::<String>::new();
/// let key = EventKey::new("user:login")?;
/// dispatcher.register(key.clone(), ListenerFn::arc(|e: Arc<Event<String>>| {
///     assert_eq!(e.payload(), "alice");
///     Ok(())
/// }));
///
/// dispatcher.emit(Event::new(key.clone(), "alice".to_owned()));
/// dispatcher.emit_async(Event::new(key, "alice".to_owned()), EmitOptions::sequential()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .field("on_error", &self.inner.on_error.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Dispatcher<T> {
    /// Creates a dispatcher with default configuration and no error sink.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> DispatcherBuilder<T> {
        DispatcherBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry<T> {
        &self.inner.registry
    }

    /// Registers `listener` under `key`. Safe to call from inside a listener;
    /// the dispatch in progress is not affected.
    pub fn register(&self, key: EventKey, listener: ListenerRef<T>) -> Registration {
        let outcome = self.inner.registry.register(key.clone(), listener);
        if self.inner.config.debug {
            debug!(event = %key, ?outcome, "Listener registered");
        } else {
            trace!(event = %key, ?outcome, "Listener registered");
        }
        outcome
    }

    /// Snapshot of the listeners registered under `key`.
    #[must_use]
    pub fn listeners_for(&self, key: &EventKey) -> Vec<ListenerRef<T>> {
        self.inner.registry.listeners_for(key)
    }

    /// Emits `event` synchronously and never fails.
    ///
    /// Deferred completions are not awaited. Inside a tokio runtime they are
    /// spawned detached and a later failure still reaches the error sink with
    /// the listener's index; outside a runtime they are dropped unpolled.
    pub fn emit(&self, event: Event<T>) {
        let event = Arc::new(event);
        let key = event.name().clone();
        let snapshot = self.snapshot(&key);

        self.log_emit(&key, "sync", snapshot.len());

        for (index, listener) in snapshot.iter().enumerate() {
            match invoke(listener, &event) {
                Invocation::Settled(Ok(())) => {},
                Invocation::Settled(Err(err)) => self.report(&err, &key, index),
                Invocation::Pending(fut) => self.detach(fut, &key, index),
            }
        }
    }

    /// Emits `event` and drives listeners per `options`.
    ///
    /// Each listener outcome is wrapped with `options.timeout` and
    /// `options.cancellation`; they never cancel a sibling listener.
    ///
    /// # Errors
    /// Only in [`EmitMode::Sequential`] with `stop_on_error` set: the first
    /// listener failure (including [`DispatchError::TimedOut`] and
    /// [`DispatchError::Aborted`]) stops the dispatch and is returned. In every
    /// other case failures go to the error sink and the call succeeds.
    pub async fn emit_async(&self, event: Event<T>, options: EmitOptions) -> Result<(), DispatchError> {
        let event = Arc::new(event);
        let key = event.name().clone();
        let snapshot = self.snapshot(&key);

        self.log_emit(&key, &options.mode.to_string(), snapshot.len());

        match options.mode {
            EmitMode::Sequential => self.run_sequential(&snapshot, &event, &options).await,
            EmitMode::Concurrent => {
                self.run_concurrent(&snapshot, &event, &options).await;
                Ok(())
            },
        }
    }

    /// Specific listeners followed by wildcard listeners; the wildcard set alone for `*`.
    fn snapshot(&self, key: &EventKey) -> Vec<ListenerRef<T>> {
        if key.is_wildcard() {
            return self.inner.registry.listeners_for(key);
        }
        let mut listeners = self.inner.registry.listeners_for(key);
        listeners.extend(self.inner.registry.listeners_for(&EventKey::wildcard()));
        listeners
    }

    async fn run_sequential(
        &self,
        snapshot: &[ListenerRef<T>],
        event: &Arc<Event<T>>,
        options: &EmitOptions,
    ) -> Result<(), DispatchError> {
        let key = event.name();
        for (index, listener) in snapshot.iter().enumerate() {
            let pending = invoke(listener, event).into_pending();
            if let Err(err) = with_timeout(pending, options.timeout, options.cancellation.as_ref()).await {
                self.report(&err, key, index);
                if options.stop_on_error {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn run_concurrent(
        &self,
        snapshot: &[ListenerRef<T>],
        event: &Arc<Event<T>>,
        options: &EmitOptions,
    ) {
        let key = event.name();
        // Every listener is invoked here, in order, before any outcome is awaited.
        let started: Vec<_> = snapshot
            .iter()
            .enumerate()
            .map(|(index, listener)| {
                let pending = invoke(listener, event).into_pending();
                async move {
                    if let Err(err) =
                        with_timeout(pending, options.timeout, options.cancellation.as_ref()).await
                    {
                        self.report(&err, key, index);
                    }
                }
            })
            .collect();

        join_all(started).await;
    }

    fn detach(&self, fut: BoxFuture<'static, Result<(), DispatchError>>, key: &EventKey, index: usize) {
        match Handle::try_current() {
            Ok(handle) => {
                let sink = self.inner.on_error.clone();
                let debug = self.inner.config.debug;
                let key = key.clone();
                handle.spawn(async move {
                    if let Err(err) = fut.await {
                        deliver(sink.as_ref(), debug, &err, &key, index);
                    }
                });
            },
            Err(_) => {
                warn!(
                    event = %key,
                    listener_index = index,
                    "Deferred listener completion dropped: no tokio runtime available"
                );
            },
        }
    }

    fn report(&self, err: &DispatchError, key: &EventKey, index: usize) {
        deliver(self.inner.on_error.as_ref(), self.inner.config.debug, err, key, index);
    }

    fn log_emit(&self, key: &EventKey, mode: &str, listeners: usize) {
        if self.inner.config.debug {
            debug!(event = %key, mode, listeners, "Dispatching event");
        } else {
            trace!(event = %key, mode, listeners, "Dispatching event");
        }
    }
}

/// Runs the synchronous part of a listener, isolating panics.
fn invoke<T: 'static>(listener: &ListenerRef<T>, event: &Arc<Event<T>>) -> Invocation {
    match panic::catch_unwind(AssertUnwindSafe(|| listener.handle(Arc::clone(event)))) {
        Ok(Completion::Ready(result)) => Invocation::Settled(result.map_err(DispatchError::listener)),
        Ok(Completion::Deferred(fut)) => Invocation::Pending(
            AssertUnwindSafe(fut)
                .catch_unwind()
                .map(|caught| match caught {
                    Ok(result) => result.map_err(DispatchError::listener),
                    Err(payload) => Err(DispatchError::panicked(&*payload)),
                })
                .boxed(),
        ),
        Err(payload) => Invocation::Settled(Err(DispatchError::panicked(&*payload))),
    }
}

fn deliver(sink: Option<&ErrorSink>, debug: bool, err: &DispatchError, key: &EventKey, index: usize) {
    if debug {
        debug!(event = %key, listener_index = index, error = %err, "Listener failed");
    } else {
        trace!(event = %key, listener_index = index, error = %err, "Listener failed");
    }

    if let Some(sink) = sink {
        sink(err, &ErrorContext { event: key.clone(), listener_index: index });
    }
}

/// A fluent builder for a [`Dispatcher`].
#[must_use = "builders do nothing unless you call .build()"]
pub struct DispatcherBuilder<T> {
    config: DispatcherConfig,
    on_error: Option<ErrorSink>,
    on_capacity_exceeded: Option<CapacityHook>,
    _payload: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for DispatcherBuilder<T> {
    fn default() -> Self {
        Self {
            config: DispatcherConfig::default(),
            on_error: None,
            on_capacity_exceeded: None,
            _payload: std::marker::PhantomData,
        }
    }
}

impl<T> fmt::Debug for DispatcherBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("on_error", &self.on_error.is_some())
            .field("on_capacity_exceeded", &self.on_capacity_exceeded.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> DispatcherBuilder<T> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the advisory listener count per key.
    pub const fn max_listeners(mut self, max: usize) -> Self {
        self.config.max_listeners = Some(max);
        self
    }

    /// Installs the error sink.
    pub fn on_error<F>(mut self, sink: F) -> Self
    where
        F: Fn(&DispatchError, &ErrorContext) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(sink));
        self
    }

    /// Installs the diagnostic hook for advisory capacity overflow.
    pub fn on_capacity_exceeded<F>(mut self, hook: F) -> Self
    where
        F: Fn(&EventKey, usize, usize) + Send + Sync + 'static,
    {
        self.on_capacity_exceeded = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher<T> {
        let registry = Registry::new(self.config.max_listeners, self.on_capacity_exceeded);
        Dispatcher { inner: Arc::new(Inner { registry, config: self.config, on_error: self.on_error }) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{AsyncListenerFn, ListenerFn};

    fn event() -> Arc<Event<String>> {
        Arc::new(Event::new(EventKey::new("invoke:kind").unwrap(), "payload".to_owned()))
    }

    #[tokio::test]
    async fn test_invoke_classifies_outcomes_for_owned_payloads() {
        let ok: ListenerRef<String> = ListenerFn::arc(|_: Arc<Event<String>>| Ok(()));
        assert!(matches!(invoke(&ok, &event()), Invocation::Settled(Ok(()))));

        let failing: ListenerRef<String> = ListenerFn::arc(|_: Arc<Event<String>>| Err("nope".into()));
        let Invocation::Settled(Err(err)) = invoke(&failing, &event()) else {
            panic!("sync failure should settle immediately");
        };
        assert!(matches!(err, DispatchError::Listener { .. }));

        let deferred: ListenerRef<String> =
            AsyncListenerFn::arc(|e: Arc<Event<String>>| async move {
                if e.payload() == "payload" { Err("late".into()) } else { Ok(()) }
            });
        let Invocation::Pending(fut) = invoke(&deferred, &event()) else {
            panic!("async listener should stay pending");
        };
        assert!(fut.await.unwrap_err().is_listener_failure());
    }

    #[test]
    fn test_invoke_turns_panic_into_error() {
        let exploding: ListenerRef<String> =
            ListenerFn::arc(|_: Arc<Event<String>>| -> crate::listener::ListenerResult { panic!("kaboom") });

        let Invocation::Settled(Err(err)) = invoke(&exploding, &event()) else {
            panic!("panic should settle as a failure");
        };
        assert!(matches!(&err, DispatchError::Panicked { message, .. } if message == "kaboom"));
    }
}
