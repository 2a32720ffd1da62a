use crate::error::DispatchError;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

/// The reserved key that receives every emitted event.
pub const WILDCARD: &str = "*";

/// A trimmed, non-empty event channel name.
///
/// Two keys are equal iff their trimmed forms are equal. The literal `*` is the
/// wildcard channel: its listeners are invoked for every event, after the
/// listeners of the event's own key.
///
/// Cloning is cheap (`Arc<str>`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey(Arc<str>);

impl EventKey {
    /// Creates a key from `name`, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidKey`] if `name` is empty after trimming.
    ///
    /// # Examples
    /// ```rust
    /// use herald_events::EventKey;
    ///
    /// let key = EventKey::new("  user:login ")?;
    /// assert_eq!(key.as_str(), "user:login");
    /// assert!(EventKey::new("   ").is_err());
    /// # Ok::<(), herald_events::DispatchError>(())
    /// ```
    pub fn new(name: impl AsRef<str>) -> Result<Self, DispatchError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DispatchError::InvalidKey {
                message: "event key must not be empty".into(),
                context: Some(format!("{:?}", name.as_ref()).into()),
            });
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// The wildcard key (`*`).
    #[must_use]
    pub fn wildcard() -> Self {
        Self(Arc::from(WILDCARD))
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        &*self.0 == WILDCARD
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for EventKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for EventKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKey").field(&&*self.0).finish()
    }
}

impl FromStr for EventKey {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for EventKey {
    type Error = DispatchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for EventKey {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_forms_are_equal() {
        let a = EventKey::new("user:login").unwrap();
        let b = EventKey::new("\t user:login  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "user:login");
    }

    #[test]
    fn test_blank_key_rejected() {
        for raw in ["", "   ", "\n\t"] {
            let err = EventKey::new(raw).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidKey { .. }), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(EventKey::wildcard().is_wildcard());
        assert!(" * ".parse::<EventKey>().unwrap().is_wildcard());
        assert!(!EventKey::new("**").unwrap().is_wildcard());
    }
}
