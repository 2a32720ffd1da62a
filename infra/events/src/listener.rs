//! # Listeners
//!
//! A [`Listener`] is the capability registered against an [`EventKey`](crate::EventKey).
//! Invoking it yields a [`Completion`]: either already settled, or a deferred
//! future the dispatcher may (or, for [`Dispatcher::emit`](crate::Dispatcher::emit),
//! may not) wait on.
//!
//! Listeners are compared by identity: two [`ListenerRef`]s are the same
//! listener iff they point to the same allocation.
//!
//! ## Example
//! ```rust
//! use herald_events::{AsyncListenerFn, Event, ListenerFn, ListenerRef};
//! use std::sync::Arc;
//!
//! let sync: ListenerRef<u64> = ListenerFn::arc(|event: Arc<Event<u64>>| {
//!     assert!(*event.payload() > 0);
//!     Ok(())
//! });
//!
//! let deferred: ListenerRef<u64> = AsyncListenerFn::arc(|event: Arc<Event<u64>>| async move {
//!     let _ = event.payload();
//!     Ok(())
//! });
//! # let _ = (sync, deferred);
//! ```

use crate::error::ListenerError;
use crate::event::Event;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Outcome of a single listener body.
pub type ListenerResult = Result<(), ListenerError>;

/// Shared, identity-compared handle to a registered listener.
pub type ListenerRef<T> = Arc<dyn Listener<T>>;

/// What a listener hands back when invoked.
pub enum Completion {
    /// The listener finished during the call.
    Ready(ListenerResult),
    /// The listener finishes later.
    Deferred(BoxFuture<'static, ListenerResult>),
}

impl Completion {
    /// A successful, already settled completion.
    #[must_use]
    pub const fn done() -> Self {
        Self::Ready(Ok(()))
    }

    /// Boxes `fut` into a deferred completion.
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = ListenerResult> + Send + 'static,
    {
        Self::Deferred(Box::pin(fut))
    }
}

impl From<ListenerResult> for Completion {
    fn from(result: ListenerResult) -> Self {
        Self::Ready(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A handler invoked for matching events.
///
/// `handle` is called synchronously by the dispatcher. Long-running work
/// belongs in a [`Completion::Deferred`] future.
pub trait Listener<T>: Send + Sync + 'static {
    fn handle(&self, event: Arc<Event<T>>) -> Completion;
}

/// `true` if both handles refer to the same listener instance.
///
/// Only the data pointer is compared; vtable pointers of the same type may
/// differ across codegen units.
#[must_use]
pub fn same_listener<T>(a: &ListenerRef<T>, b: &ListenerRef<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Listener backed by a synchronous closure.
pub struct ListenerFn<F> {
    f: F,
}

impl<F> ListenerFn<F> {
    pub const fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the listener as a shared handle, ready for registration.
    pub fn arc<T>(f: F) -> Arc<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<Event<T>>) -> ListenerResult + Send + Sync + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for ListenerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerFn").finish_non_exhaustive()
    }
}

impl<T, F> Listener<T> for ListenerFn<F>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<Event<T>>) -> ListenerResult + Send + Sync + 'static,
{
    fn handle(&self, event: Arc<Event<T>>) -> Completion {
        Completion::Ready((self.f)(event))
    }
}

/// Listener backed by a closure that returns a future.
///
/// The closure runs synchronously when the listener is invoked; the returned
/// future is the deferred completion.
pub struct AsyncListenerFn<F> {
    f: F,
}

impl<F> AsyncListenerFn<F> {
    pub const fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the listener as a shared handle, ready for registration.
    pub fn arc<T, Fut>(f: F) -> Arc<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<Event<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for AsyncListenerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncListenerFn").finish_non_exhaustive()
    }
}

impl<T, F, Fut> Listener<T> for AsyncListenerFn<F>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<Event<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListenerResult> + Send + 'static,
{
    fn handle(&self, event: Arc<Event<T>>) -> Completion {
        Completion::deferred((self.f)(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::EventKey;

    fn event() -> Arc<Event<u8>> {
        Arc::new(Event::new(EventKey::new("tick").unwrap(), 1))
    }

    #[test]
    fn test_identity_comparison() {
        let a: ListenerRef<u8> = ListenerFn::arc(|_: Arc<Event<u8>>| Ok(()));
        let b: ListenerRef<u8> = ListenerFn::arc(|_: Arc<Event<u8>>| Ok(()));
        let a2 = Arc::clone(&a);

        assert!(same_listener(&a, &a2));
        assert!(!same_listener(&a, &b));
    }

    /// Hand-written listener that settles synchronously.
    struct Threshold(u8);

    impl Listener<u8> for Threshold {
        fn handle(&self, event: Arc<Event<u8>>) -> Completion {
            if *event.payload() >= self.0 {
                Completion::done()
            } else {
                Completion::from(Err::<(), ListenerError>(
                    format!("{} below {}", event.payload(), self.0).into(),
                ))
            }
        }
    }

    #[test]
    fn test_trait_impl_settles_through_completion_helpers() {
        let pass: ListenerRef<u8> = Arc::new(Threshold(1));
        assert!(matches!(pass.handle(event()), Completion::Ready(Ok(()))));

        let fail: ListenerRef<u8> = Arc::new(Threshold(5));
        let Completion::Ready(Err(err)) = fail.handle(event()) else {
            panic!("threshold listener should settle with an error");
        };
        assert_eq!(err.to_string(), "1 below 5");
    }

    #[test]
    fn test_sync_listener_completes_immediately() {
        let l: ListenerRef<u8> = ListenerFn::arc(|_: Arc<Event<u8>>| Err("nope".into()));
        assert!(matches!(l.handle(event()), Completion::Ready(Err(_))));
    }

    #[tokio::test]
    async fn test_async_listener_defers() {
        let l: ListenerRef<u8> = AsyncListenerFn::arc(|e: Arc<Event<u8>>| async move {
            if *e.payload() == 1 { Ok(()) } else { Err("bad".into()) }
        });

        let Completion::Deferred(fut) = l.handle(event()) else {
            panic!("async listener should defer");
        };
        assert!(fut.await.is_ok());
    }
}
