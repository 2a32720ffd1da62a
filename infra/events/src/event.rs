use crate::key::EventKey;

/// An emitted event: a channel name and an opaque payload.
///
/// The dispatcher never inspects the payload. Listeners receive the event
/// behind an `Arc`, so the payload is shared, not cloned, across the fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    name: EventKey,
    payload: T,
}

impl<T> Event<T> {
    pub const fn new(name: EventKey, payload: T) -> Self {
        Self { name, payload }
    }

    #[must_use]
    pub const fn name(&self) -> &EventKey {
        &self.name
    }

    #[must_use]
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// Splits the event into its parts.
    #[must_use]
    pub fn into_parts(self) -> (EventKey, T) {
        (self.name, self.payload)
    }
}
