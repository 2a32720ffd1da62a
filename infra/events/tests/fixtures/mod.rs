#![allow(dead_code, unreachable_pub)]

use herald_events::{
    AsyncListenerFn, DispatchError, Dispatcher, ErrorContext, Event, EventKey, ListenerFn,
    ListenerRef,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub type Payload = u64;

pub fn key(name: &str) -> EventKey {
    EventKey::new(name).expect("fixture keys are valid")
}

pub fn event(name: &str) -> Event<Payload> {
    Event::new(key(name), 1)
}

/// Records listener labels in invocation order.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<&'static str>>>);

impl Recorder {
    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }

    /// Sync listener that records `label` and succeeds.
    pub fn ok(&self, label: &'static str) -> ListenerRef<Payload> {
        let log = Arc::clone(&self.0);
        ListenerFn::arc(move |_: Arc<Event<Payload>>| {
            log.lock().push(label);
            Ok(())
        })
    }

    /// Sync listener that records `label` and fails.
    pub fn failing(&self, label: &'static str) -> ListenerRef<Payload> {
        let log = Arc::clone(&self.0);
        ListenerFn::arc(move |_: Arc<Event<Payload>>| {
            log.lock().push(label);
            Err(format!("{label} failed").into())
        })
    }

    /// Deferred listener that records `label` on invocation and settles after `delay`.
    pub fn delayed(&self, label: &'static str, delay: Duration) -> ListenerRef<Payload> {
        let log = Arc::clone(&self.0);
        AsyncListenerFn::arc(move |_: Arc<Event<Payload>>| {
            log.lock().push(label);
            async move {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        })
    }

    /// Deferred listener that records `label` on invocation and never settles.
    pub fn never(&self, label: &'static str) -> ListenerRef<Payload> {
        let log = Arc::clone(&self.0);
        AsyncListenerFn::arc(move |_: Arc<Event<Payload>>| {
            log.lock().push(label);
            std::future::pending()
        })
    }
}

/// One reported failure as seen by the error sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reported {
    pub event: String,
    pub listener_index: usize,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorLog(Arc<Mutex<Vec<Reported>>>);

impl ErrorLog {
    pub fn reports(&self) -> Vec<Reported> {
        self.0.lock().clone()
    }

    pub fn indexes(&self) -> Vec<usize> {
        self.0.lock().iter().map(|r| r.listener_index).collect()
    }

    pub fn sink(&self) -> impl Fn(&DispatchError, &ErrorContext) + Send + Sync + 'static {
        let log = Arc::clone(&self.0);
        move |err: &DispatchError, ctx: &ErrorContext| {
            log.lock().push(Reported {
                event: ctx.event.to_string(),
                listener_index: ctx.listener_index,
                kind: kind_of(err),
            });
        }
    }
}

pub fn kind_of(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::Listener { .. } => "listener",
        DispatchError::Panicked { .. } => "panicked",
        DispatchError::TimedOut { .. } => "timeout",
        DispatchError::Aborted { .. } => "aborted",
        DispatchError::InvalidKey { .. } => "invalid_key",
    }
}

/// A dispatcher whose failures land in the returned [`ErrorLog`].
pub fn dispatcher_with_sink() -> (Dispatcher<Payload>, ErrorLog) {
    let errors = ErrorLog::default();
    let dispatcher = Dispatcher::builder().on_error(errors.sink()).build();
    (dispatcher, errors)
}
