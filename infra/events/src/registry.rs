use crate::key::EventKey;
use crate::listener::{ListenerRef, same_listener};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Diagnostic hook invoked when a key's listener count exceeds the advisory
/// maximum: `(key, listener_count, max_listeners)`.
pub type CapacityHook = Arc<dyn Fn(&EventKey, usize, usize) + Send + Sync>;

/// Result of a [`Registry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The listener was appended; `listeners` is the key's new listener count.
    Added { listeners: usize },
    /// The same listener instance was already registered under this key.
    AlreadyRegistered,
}

/// Append-only mapping from [`EventKey`] to an insertion-ordered listener set.
///
/// Reads hand out snapshots: a listener registered while a dispatch is in
/// flight is seen by the next dispatch, not the current one.
pub struct Registry<T> {
    listeners: RwLock<FxHashMap<EventKey, Vec<ListenerRef<T>>>>,
    max_listeners: Option<usize>,
    on_capacity_exceeded: Option<CapacityHook>,
}

impl<T> Registry<T> {
    /// Creates an empty registry with an optional advisory capacity.
    #[must_use]
    pub fn new(max_listeners: Option<usize>, on_capacity_exceeded: Option<CapacityHook>) -> Self {
        Self { listeners: RwLock::new(FxHashMap::default()), max_listeners, on_capacity_exceeded }
    }

    /// Adds `listener` under `key`, unless that instance is already there.
    ///
    /// Never fails. Crossing the advisory maximum only logs a warning and
    /// invokes the capacity hook.
    pub fn register(&self, key: EventKey, listener: ListenerRef<T>) -> Registration {
        let count = {
            let mut map = self.listeners.write();
            let set = map.entry(key.clone()).or_default();
            if set.iter().any(|existing| same_listener(existing, &listener)) {
                return Registration::AlreadyRegistered;
            }
            set.push(listener);
            set.len()
        };

        if let Some(max) = self.max_listeners
            && count > max
        {
            warn!(
                event = %key,
                listeners = count,
                max_listeners = max,
                "Listener count exceeds advisory maximum"
            );
            if let Some(hook) = &self.on_capacity_exceeded {
                hook(&key, count, max);
            }
        }

        Registration::Added { listeners: count }
    }

    /// Snapshot of the listeners under `key`, in registration order.
    #[must_use]
    pub fn listeners_for(&self, key: &EventKey) -> Vec<ListenerRef<T>> {
        self.listeners.read().get(key).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn listener_count(&self, key: &EventKey) -> usize {
        self.listeners.read().get(key).map_or(0, Vec::len)
    }

    /// Sorted snapshot of every key with at least one listener.
    #[must_use]
    pub fn keys(&self) -> Vec<EventKey> {
        let mut keys: Vec<EventKey> = self.listeners.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    #[must_use]
    pub const fn max_listeners(&self) -> Option<usize> {
        self.max_listeners
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.listeners.read();
        let mut counts: Vec<(&str, usize)> = map.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        counts.sort_unstable();
        f.debug_struct("Registry")
            .field("listeners", &counts)
            .field("max_listeners", &self.max_listeners)
            .finish_non_exhaustive()
    }
}
