//! Names for effect connections.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// The name an effect connection is registered under.
///
/// Effect output reaching the router is tagged with it, and every
/// [`RouterEvent`](crate::RouterEvent) about an effect carries it.
/// [`EffectList`](crate::EffectList) refuses a second connection under an id
/// that is already registered.
///
/// ```
/// use dsp_router::{EffectConnection, EffectId};
///
/// let conn = EffectConnection::new("eq", "Equalizer");
/// assert_eq!(conn.id(), &EffectId::from("eq"));
/// assert_eq!(conn.id().to_string(), "eq");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(Arc<str>);

impl EffectId {
    /// Wraps an effect name.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The effect name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EffectId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for EffectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `EffectId` be queried with a plain `&str`.
impl Borrow<str> for EffectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_effect_id_clones_share_name() {
        let id = EffectId::new("reverb");
        let tagged = id.clone();
        assert!(std::ptr::eq(id.as_str(), tagged.as_str()));
    }

    #[test]
    fn test_effect_id_lookup_by_str() {
        let mut gains = HashMap::new();
        gains.insert(EffectId::from("eq"), 3);
        gains.insert(EffectId::from(String::from("comp")), -2);

        assert_eq!(gains.get("eq"), Some(&3));
        assert_eq!(gains.get("comp"), Some(&-2));
        assert!(!gains.contains_key("reverb"));
    }

    #[test]
    fn test_effect_id_in_messages() {
        let id = EffectId::new("bass-boost");
        assert_eq!(format!("effect {id} failed"), "effect bass-boost failed");
    }
}
