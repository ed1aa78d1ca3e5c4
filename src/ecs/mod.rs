//! Entity Component System core
//!
//! Per-type hash map storage with ID recycling, typed queries and
//! priority-ordered systems.

pub mod component;
pub mod entity;
pub mod query;
pub mod store;
pub mod world;

pub use component::{Component, ComponentStorage, ComponentView, TypedComponentStorage};
pub use entity::{EntityAllocator, EntityId, MAX_FREE_IDS};
pub use query::Query;
pub use store::Store;
pub use world::{system_fn, FnSystem, System, SystemRunReport, World};
