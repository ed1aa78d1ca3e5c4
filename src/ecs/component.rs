//! Component storage: one hash map per component type

use std::any::{self, Any};
use std::collections::HashMap;

use super::EntityId;

/// Trait for components
pub trait Component: Send + Sync + 'static {}

/// Type-erased component storage
pub trait ComponentStorage: Send + Sync {
    fn remove(&mut self, entity_id: EntityId) -> bool;
    fn has(&self, entity_id: EntityId) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn entity_ids(&self) -> Box<dyn Iterator<Item = EntityId> + '_>;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete storage for a specific component type
pub struct TypedComponentStorage<T: Component> {
    pub(crate) data: HashMap<EntityId, T>,
}

impl<T: Component> TypedComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Returns the previous value, if any.
    pub fn insert(&mut self, entity_id: EntityId, component: T) -> Option<T> {
        self.data.insert(entity_id, component)
    }

    pub fn take(&mut self, entity_id: EntityId) -> Option<T> {
        self.data.remove(&entity_id)
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&T> {
        self.data.get(&entity_id)
    }

    pub fn get_mut(&mut self, entity_id: EntityId) -> Option<&mut T> {
        self.data.get_mut(&entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.data.iter().map(|(id, comp)| (*id, comp))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.data.iter_mut().map(|(id, comp)| (*id, comp))
    }

    pub fn view(&self) -> ComponentView<'_, T> {
        ComponentView {
            data: Some(&self.data),
        }
    }
}

impl<T: Component> Default for TypedComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage for TypedComponentStorage<T> {
    fn remove(&mut self, entity_id: EntityId) -> bool {
        self.data.remove(&entity_id).is_some()
    }

    fn has(&self, entity_id: EntityId) -> bool {
        self.data.contains_key(&entity_id)
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn entity_ids(&self) -> Box<dyn Iterator<Item = EntityId> + '_> {
        Box::new(self.data.keys().copied())
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Read-only view over every component of one type.
///
/// A type that was never added yields an empty view rather than an error.
/// The view borrows the store, so it cannot outlive the next mutating call.
pub struct ComponentView<'a, T: Component> {
    data: Option<&'a HashMap<EntityId, T>>,
}

impl<'a, T: Component> ComponentView<'a, T> {
    pub(crate) fn empty() -> Self {
        Self { data: None }
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&'a T> {
        self.data.and_then(|data| data.get(&entity_id))
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.data.is_some_and(|data| data.contains_key(&entity_id))
    }

    pub fn len(&self) -> usize {
        self.data.map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unordered iteration, like the backing map.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &'a T)> + 'a {
        self.data
            .into_iter()
            .flat_map(|data| data.iter().map(|(id, comp)| (*id, comp)))
    }

    /// Entity IDs in ascending order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.iter().map(|(id, _)| id).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[test]
    fn test_take_hands_back_ownership() {
        let mut storage = TypedComponentStorage::<Position>::new();
        storage.insert(4, Position { x: 1.0, y: 2.0 });
        storage.insert(8, Position { x: 3.0, y: 4.0 });

        assert_eq!(storage.take(4), Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(storage.take(4), None);
        assert!(!storage.has(4));
        assert_eq!(storage.view().entity_ids(), vec![8]);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut storage = TypedComponentStorage::<Position>::new();

        assert!(storage.insert(1, Position { x: 1.0, y: 2.0 }).is_none());
        let previous = storage.insert(1, Position { x: 5.0, y: 6.0 });

        assert_eq!(previous, Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(storage.get(1), Some(&Position { x: 5.0, y: 6.0 }));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_erased_storage_sees_typed_writes() {
        let mut storage = TypedComponentStorage::<Position>::new();
        storage.insert(2, Position { x: 0.0, y: 0.0 });
        storage.insert(5, Position { x: 0.0, y: 0.0 });
        for (id, pos) in storage.iter_mut() {
            pos.x = id as f32;
        }

        let erased: &mut dyn ComponentStorage = &mut storage;
        assert!(erased.remove(2));
        assert!(!erased.remove(2));
        assert_eq!(erased.entity_ids().collect::<Vec<_>>(), vec![5]);
        assert!(erased.type_name().ends_with("Position"));

        let typed = erased
            .as_any()
            .downcast_ref::<TypedComponentStorage<Position>>()
            .unwrap();
        assert_eq!(typed.view().get(5), Some(&Position { x: 5.0, y: 0.0 }));
    }

    #[test]
    fn test_views() {
        let empty = ComponentView::<Position>::empty();
        assert!(empty.is_empty());
        assert!(empty.get(0).is_none());
        assert_eq!(empty.iter().count(), 0);

        let mut storage = TypedComponentStorage::<Position>::new();
        storage.insert(9, Position { x: 0.0, y: 0.0 });
        storage.insert(3, Position { x: 1.0, y: 1.0 });

        let view = storage.view();
        assert_eq!(view.len(), 2);
        assert!(view.contains(9));
        assert_eq!(view.entity_ids(), vec![3, 9]);
    }
}
