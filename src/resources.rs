//! Singleton-per-type storage for shared state

use std::any::{self, Any, TypeId};
use std::collections::HashMap;

use crate::error::{HiveError, Result};

/// Marker for values stored in a [`ResourceRegistry`].
pub trait Resource: Send + Sync + 'static {}

struct ResourceEntry {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// One slot per type. Hosts needing several values of the same shape must
/// wrap them in distinct types.
#[derive(Default)]
pub struct ResourceRegistry {
    data: HashMap<TypeId, ResourceEntry>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resource` under its own type, returning the value it replaced.
    pub fn register<R: Resource>(&mut self, resource: R) -> Option<R> {
        let previous = self.data.insert(
            TypeId::of::<R>(),
            ResourceEntry {
                type_name: any::type_name::<R>(),
                value: Box::new(resource),
            },
        );
        previous
            .and_then(|entry| entry.value.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    pub fn get<R: Resource>(&self) -> Result<&R> {
        self.try_get::<R>()
            .ok_or(HiveError::ResourceNotFound(any::type_name::<R>()))
    }

    pub fn get_mut<R: Resource>(&mut self) -> Result<&mut R> {
        self.data
            .get_mut(&TypeId::of::<R>())
            .and_then(|entry| entry.value.downcast_mut::<R>())
            .ok_or(HiveError::ResourceNotFound(any::type_name::<R>()))
    }

    pub fn get_or<'a, R: Resource>(&'a self, default: &'a R) -> &'a R {
        self.try_get::<R>().unwrap_or(default)
    }

    pub fn has<R: Resource>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<R>())
    }

    pub fn remove<R: Resource>(&mut self) -> Option<R> {
        self.data
            .remove(&TypeId::of::<R>())
            .and_then(|entry| entry.value.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> =
            self.data.values().map(|entry| entry.type_name).collect();
        names.sort_unstable();
        names
    }

    fn try_get<R: Resource>(&self) -> Option<&R> {
        self.data
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.value.downcast_ref::<R>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct GridSize {
        rows: u32,
        cols: u32,
    }
    impl Resource for GridSize {}

    #[derive(Debug, PartialEq)]
    struct Seed(u64);
    impl Resource for Seed {}

    #[test]
    fn test_register_and_get() {
        let mut resources = ResourceRegistry::new();
        assert!(resources.register(GridSize { rows: 4, cols: 8 }).is_none());

        assert!(resources.has::<GridSize>());
        assert_eq!(resources.get::<GridSize>().unwrap().cols, 8);

        resources.get_mut::<GridSize>().unwrap().rows = 5;
        assert_eq!(resources.get::<GridSize>().unwrap(), &GridSize { rows: 5, cols: 8 });
    }

    #[test]
    fn test_register_overwrites_same_type() {
        let mut resources = ResourceRegistry::new();
        resources.register(Seed(1));
        let previous = resources.register(Seed(2));

        assert_eq!(previous, Some(Seed(1)));
        assert_eq!(resources.get::<Seed>().unwrap(), &Seed(2));
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn test_missing_resource() {
        let resources = ResourceRegistry::new();

        let err = resources.get::<Seed>().unwrap_err();
        assert!(matches!(err, HiveError::ResourceNotFound(name) if name.ends_with("Seed")));
        assert!(!resources.has::<Seed>());

        let fallback = Seed(9);
        assert_eq!(resources.get_or(&fallback), &Seed(9));
    }

    #[test]
    fn test_remove_and_names() {
        let mut resources = ResourceRegistry::new();
        resources.register(Seed(3));
        resources.register(GridSize { rows: 1, cols: 1 });
        assert_eq!(resources.type_names().len(), 2);

        assert_eq!(resources.remove::<Seed>(), Some(Seed(3)));
        assert!(resources.remove::<Seed>().is_none());
        assert!(!resources.is_empty());
    }
}
