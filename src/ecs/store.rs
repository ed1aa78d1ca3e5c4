//! Store - owner of entity identity and component data

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{ComponentStorage, ComponentView, TypedComponentStorage};
use super::entity::{EntityAllocator, MAX_FREE_IDS};
use super::query::Query;
use super::{Component, EntityId};
use crate::error::{HiveError, Result};

/// Entity and component storage.
///
/// Components live in one map per component type, keyed by entity ID. An
/// entity missing from a type's map simply does not have that component.
///
/// `add_component` does not check that the ID was created by this store.
/// Attaching to an arbitrary ID is accepted; use [`Store::try_add_component`]
/// where that should be rejected.
pub struct Store {
    entities: EntityAllocator,
    components: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_max_free_ids(MAX_FREE_IDS)
    }

    pub fn with_max_free_ids(max_free_ids: usize) -> Self {
        Self {
            entities: EntityAllocator::with_max_free(max_free_ids),
            components: HashMap::new(),
        }
    }

    /// Create a new entity, reusing a destroyed ID when one is available
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Destroy an entity and remove all its components.
    ///
    /// Unknown or already destroyed IDs are a no-op. Returns whether anything
    /// was removed.
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        let mut removed = false;
        for storage in self.components.values_mut() {
            removed |= storage.remove(entity);
        }
        self.entities.deallocate(entity) || removed
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Get number of alive entities
    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Live entity IDs in ascending order
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.alive_ids()
    }

    /// The ID the next fresh (non-recycled) creation will issue
    pub fn next_id(&self) -> EntityId {
        self.entities.next_id()
    }

    pub fn free_id_count(&self) -> usize {
        self.entities.free_count()
    }

    pub fn max_free_ids(&self) -> usize {
        self.entities.max_free()
    }

    /// Add a component to an entity, overwriting any previous value of the
    /// same type.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        self.get_components_mut::<T>().insert(entity, component);
    }

    /// Like `add_component`, but rejects IDs that are not alive.
    pub fn try_add_component<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> Result<()> {
        if !self.entities.is_alive(entity) {
            return Err(HiveError::DeadEntity(entity));
        }
        self.add_component(entity, component);
        Ok(())
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// All components of one type. Unknown types give an empty view.
    pub fn get_components<T: Component>(&self) -> ComponentView<'_, T> {
        match self.storage::<T>() {
            Some(storage) => storage.view(),
            None => ComponentView::empty(),
        }
    }

    /// Mutable storage for a component type, created on first use.
    pub fn get_components_mut<T: Component>(&mut self) -> &mut TypedComponentStorage<T> {
        let storage = self
            .components
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedComponentStorage::<T>::new()));
        downcast_mut(&mut **storage)
    }

    /// Get storage for a component type, if it was ever used
    pub fn storage<T: Component>(&self) -> Option<&TypedComponentStorage<T>> {
        self.components
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<TypedComponentStorage<T>>()
    }

    pub fn storage_mut<T: Component>(&mut self) -> Option<&mut TypedComponentStorage<T>> {
        self.components
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<TypedComponentStorage<T>>()
    }

    /// Check if entity has a component
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.has_component_by(entity, TypeId::of::<T>())
    }

    pub fn has_component_by(&self, entity: EntityId, type_id: TypeId) -> bool {
        self.components
            .get(&type_id)
            .is_some_and(|storage| storage.has(entity))
    }

    /// Returns whether a component was present and removed.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        self.take_component::<T>(entity).is_some()
    }

    pub fn take_component<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.storage_mut::<T>()?.take(entity)
    }

    /// IDs holding every component type in `Q`, ascending.
    pub fn query_entities<Q: Query>(&self) -> Vec<EntityId> {
        self.query_entities_by(&Q::type_ids())
    }

    /// IDs holding every listed component type, ascending.
    ///
    /// No types gives an empty result, as does any type with no holders.
    /// Candidates start from the smallest storage and narrow through the rest.
    pub fn query_entities_by(&self, types: &[TypeId]) -> Vec<EntityId> {
        let mut storages: Vec<&dyn ComponentStorage> = Vec::with_capacity(types.len());
        for type_id in types {
            match self.components.get(type_id) {
                Some(storage) if !storage.is_empty() => storages.push(&**storage),
                _ => return Vec::new(),
            }
        }
        storages.sort_by_key(|storage| storage.len());

        let Some((smallest, rest)) = storages.split_first() else {
            return Vec::new();
        };
        let mut candidates: Vec<EntityId> = smallest.entity_ids().collect();
        for storage in rest {
            candidates.retain(|id| storage.has(*id));
            if candidates.is_empty() {
                break;
            }
        }
        candidates.sort_unstable();
        candidates
    }

    /// Join over `Q`, yielding `(id, &A, &B, ...)` in ascending ID order.
    ///
    /// ```ignore
    /// for (id, pos, vel) in store.query::<(Position, Velocity)>() {
    ///     println!("{id} at {},{}", pos.x, pos.y);
    /// }
    /// ```
    pub fn query<Q: Query>(&self) -> Vec<Q::Item<'_>> {
        self.query_entities::<Q>()
            .into_iter()
            .filter_map(|entity| Q::fetch(self, entity))
            .collect()
    }

    /// Names of component types that currently have storage
    pub fn component_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .components
            .values()
            .map(|storage| storage.type_name())
            .collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn claim_entity(&mut self, entity: EntityId) {
        self.entities.claim(entity);
    }

    pub(crate) fn resume_from(&mut self, next_id: EntityId) {
        self.entities.resume_from(next_id);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast_mut<T: Component>(storage: &mut dyn ComponentStorage) -> &mut TypedComponentStorage<T> {
    match storage.as_any_mut().downcast_mut::<TypedComponentStorage<T>>() {
        Some(typed) => typed,
        None => unreachable!("component storage keyed by a foreign TypeId"),
    }
}
