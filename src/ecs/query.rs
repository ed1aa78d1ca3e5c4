//! Typed multi-component queries

use std::any::TypeId;

use super::{Component, EntityId, Store};

/// A set of component types joined by [`Store::query`].
///
/// Implemented for tuples of one to four component types. `Item` pairs the
/// entity ID with borrowed components in the requested order.
pub trait Query {
    type Item<'a>;

    fn type_ids() -> Vec<TypeId>;

    fn fetch(store: &Store, entity: EntityId) -> Option<Self::Item<'_>>;
}

macro_rules! impl_query {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> Query for ($($ty,)+) {
            type Item<'a> = (EntityId, $(&'a $ty,)+);

            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$ty>()),+]
            }

            fn fetch(store: &Store, entity: EntityId) -> Option<Self::Item<'_>> {
                Some((entity, $(store.get_component::<$ty>(entity)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
