//! # Herald Events
//!
//! An in-process publish/subscribe dispatcher: components register listeners
//! against named event keys, other components emit named events with a payload,
//! synchronously or asynchronously.
//!
//! ## Overview
//!
//! * **Registry**: insertion-ordered, identity-deduplicated listener sets per
//!   [`EventKey`], read through snapshots so registration during dispatch is safe.
//! * **Dispatcher**: fans an [`Event`] out to the listeners of its key, then to the
//!   wildcard (`*`) listeners. [`Dispatcher::emit`] never waits and never fails;
//!   [`Dispatcher::emit_async`] runs listeners [sequentially](EmitMode::Sequential)
//!   or [concurrently](EmitMode::Concurrent).
//! * **Cancellation wrapper**: [`with_timeout`] races each listener against an
//!   optional deadline and [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## Failure policy
//!
//! A failing listener never stops its siblings. Every failure is reported to the
//! single error sink, when one is configured, with the emitted key and the
//! listener's zero-based index. Without a sink, failures are dropped; the only
//! failure a caller ever observes directly is the first one of a sequential
//! `emit_async` with `stop_on_error` set.
//!
//! ## Payload typing
//!
//! A [`Dispatcher`] carries one payload type `T`. Use an enum when several event
//! families share one dispatcher.
//!
//! # Example
//!
//! ```rust
//! use herald_events::{Dispatcher, EmitOptions, Event, EventKey, ListenerFn};
//! use std::sync::{Arc, Mutex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), herald_events::DispatchError> {
//!     let seen = Arc::new(Mutex::new(Vec::new()));
//!     let dispatcher = Dispatcher::<u64>::builder()
//!         .on_error(|err, ctx| eprintln!("{} #{}: {err}", ctx.event, ctx.listener_index))
//!         .build();
//!
//!     let log = Arc::clone(&seen);
//!     dispatcher.register(
//!         EventKey::wildcard(),
//!         ListenerFn::arc(move |e: Arc<Event<u64>>| {
//!             log.lock().unwrap().push(e.name().to_string());
//!             Ok(())
//!         }),
//!     );
//!
//!     dispatcher.emit(Event::new(EventKey::new("user:created")?, 42));
//!     dispatcher
//!         .emit_async(Event::new(EventKey::new("user:deleted")?, 42), EmitOptions::concurrent())
//!         .await?;
//!
//!     assert_eq!(*seen.lock().unwrap(), ["user:created", "user:deleted"]);
//!     Ok(())
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod event;
mod key;
mod listener;
mod options;
mod registry;
mod timeout;

pub use config::{ConfigError, DispatcherConfig, ENV_PREFIX, load_config};
pub use dispatcher::{Dispatcher, DispatcherBuilder, ErrorContext, ErrorSink};
pub use error::{DispatchError, ListenerError};
pub use event::Event;
pub use key::{EventKey, WILDCARD};
pub use listener::{
    AsyncListenerFn, Completion, Listener, ListenerFn, ListenerRef, ListenerResult, same_listener,
};
pub use options::{EmitMode, EmitOptions};
pub use registry::{CapacityHook, Registration, Registry};
pub use timeout::with_timeout;
