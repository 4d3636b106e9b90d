//! Enumeration of the effects audio should be sent through.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::effect::{EffectConnection, EffectId};
use crate::RouterError;

/// Supplies the live list of effect connections.
///
/// The router asks for the list on every provider buffer, so implementations
/// should answer from memory. The order of the returned connections is the
/// order audio is written in; it carries no priority.
pub trait EffectRegistry: Send + Sync {
    /// Returns the currently available effects.
    fn effect_connections(&self) -> Vec<Arc<EffectConnection>>;
}

/// In-memory [`EffectRegistry`] with registration order preserved.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dsp_router::{EffectConnection, EffectList, EffectRegistry};
///
/// let effects = EffectList::new();
/// effects.add(Arc::new(EffectConnection::new("eq", "Equalizer"))).unwrap();
/// effects.add(Arc::new(EffectConnection::new("comp", "Compressor"))).unwrap();
///
/// let ids: Vec<_> = effects
///     .effect_connections()
///     .iter()
///     .map(|c| c.id().to_string())
///     .collect();
/// assert_eq!(ids, ["eq", "comp"]);
/// ```
#[derive(Debug, Default)]
pub struct EffectList {
    effects: RwLock<Vec<Arc<EffectConnection>>>,
}

impl EffectList {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an effect at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateEffectId`] if the ID is already registered.
    pub fn add(&self, connection: Arc<EffectConnection>) -> Result<(), RouterError> {
        let mut effects = self.effects.write();
        if effects.iter().any(|c| c.id() == connection.id()) {
            return Err(RouterError::DuplicateEffectId {
                effect_id: connection.id().to_string(),
            });
        }
        tracing::debug!("EffectList: registered {}", connection.id());
        effects.push(connection);
        Ok(())
    }

    /// Removes an effect and tears its connection down.
    pub fn remove(&self, id: &EffectId) -> Option<Arc<EffectConnection>> {
        let mut effects = self.effects.write();
        let index = effects.iter().position(|c| c.id() == id)?;
        let connection = effects.remove(index);
        drop(effects);

        connection.tear_down();
        Some(connection)
    }

    /// Looks up an effect by ID.
    pub fn get(&self, id: &EffectId) -> Option<Arc<EffectConnection>> {
        self.effects.read().iter().find(|c| c.id() == id).cloned()
    }

    /// Returns the number of registered effects.
    pub fn len(&self) -> usize {
        self.effects.read().len()
    }

    /// Returns `true` if no effects are registered.
    pub fn is_empty(&self) -> bool {
        self.effects.read().is_empty()
    }
}

impl EffectRegistry for EffectList {
    fn effect_connections(&self) -> Vec<Arc<EffectConnection>> {
        self.effects.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EffectState;

    #[test]
    fn test_rejects_duplicate_ids() {
        let list = EffectList::new();
        list.add(Arc::new(EffectConnection::new("eq", "EQ"))).unwrap();

        let result = list.add(Arc::new(EffectConnection::new("eq", "Other EQ")));
        assert!(matches!(
            result,
            Err(RouterError::DuplicateEffectId { .. })
        ));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_tears_down() {
        let list = EffectList::new();
        let conn = Arc::new(EffectConnection::new("eq", "EQ"));
        list.add(conn.clone()).unwrap();

        let removed = list.remove(&EffectId::new("eq")).unwrap();
        assert!(Arc::ptr_eq(&removed, &conn));
        assert_eq!(conn.state(), EffectState::TornDown);
        assert!(list.is_empty());
        assert!(list.remove(&EffectId::new("eq")).is_none());
    }

    #[test]
    fn test_get() {
        let list = EffectList::new();
        list.add(Arc::new(EffectConnection::new("eq", "EQ"))).unwrap();

        assert_eq!(list.get(&EffectId::new("eq")).unwrap().name(), "EQ");
        assert!(list.get(&EffectId::new("reverb")).is_none());
    }
}
