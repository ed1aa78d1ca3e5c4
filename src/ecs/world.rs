//! World - owns the store, the ordered systems and the shared utilities

use std::any::TypeId;
use std::time::{Duration, Instant};

use tracing::trace;

use super::component::{ComponentView, TypedComponentStorage};
use super::query::Query;
use super::{Component, EntityId, Store};
use crate::command::CommandDispatcher;
use crate::error::{HiveError, Result};
use crate::events::{Emission, Event, EventBus};
use crate::resources::ResourceRegistry;

/// A unit of per-step logic.
///
/// Systems receive the world and the dispatcher; commands they dispatch are
/// routed only after every system of the step has run.
pub trait System: Send {
    fn name(&self) -> &str;
    fn update(
        &mut self,
        world: &mut World,
        dispatcher: &mut CommandDispatcher,
    ) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`System`].
pub struct FnSystem<F> {
    name: String,
    func: F,
}

pub fn system_fn<F>(name: impl Into<String>, func: F) -> FnSystem<F>
where
    F: FnMut(&mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send,
{
    FnSystem {
        name: name.into(),
        func,
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(
        &mut self,
        world: &mut World,
        dispatcher: &mut CommandDispatcher,
    ) -> anyhow::Result<()> {
        (self.func)(world, dispatcher)
    }
}

#[derive(Clone, Debug)]
pub struct SystemRunReport {
    pub name: String,
    pub priority: i32,
    pub duration: Duration,
}

struct SystemEntry {
    priority: i32,
    system: Box<dyn System>,
}

/// Simulation container.
///
/// Entity cleanup is never done here; register a system for it (see
/// [`crate::systems::CleanupSystem`]).
pub struct World {
    store: Store,
    systems: Vec<SystemEntry>,
    /// Priority and name of the systems moved out by a step in progress
    running: Vec<(i32, String)>,
    events: EventBus,
    resources: ResourceRegistry,
    step_count: u64,
}

impl World {
    pub fn new() -> Self {
        Self::with_store(Store::new())
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store,
            systems: Vec::new(),
            running: Vec::new(),
            events: EventBus::new(),
            resources: ResourceRegistry::new(),
            step_count: 0,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    pub fn create_entity(&mut self) -> EntityId {
        self.store.create_entity()
    }

    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        self.store.destroy_entity(entity)
    }

    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        self.store.add_component(entity, component);
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.store.get_component(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.store.get_component_mut(entity)
    }

    pub fn get_components<T: Component>(&self) -> ComponentView<'_, T> {
        self.store.get_components()
    }

    pub fn get_components_mut<T: Component>(&mut self) -> &mut TypedComponentStorage<T> {
        self.store.get_components_mut()
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.store.has_component::<T>(entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        self.store.remove_component::<T>(entity)
    }

    pub fn query_entities<Q: Query>(&self) -> Vec<EntityId> {
        self.store.query_entities::<Q>()
    }

    pub fn query_entities_by(&self, types: &[TypeId]) -> Vec<EntityId> {
        self.store.query_entities_by(types)
    }

    pub fn query<Q: Query>(&self) -> Vec<Q::Item<'_>> {
        self.store.query::<Q>()
    }

    /// Register a system. Lower priorities run first; equal priorities keep
    /// registration order.
    pub fn register(&mut self, system: impl System + 'static, priority: i32) {
        self.register_boxed(Box::new(system), priority);
    }

    pub fn register_boxed(&mut self, system: Box<dyn System>, priority: i32) {
        self.systems.push(SystemEntry { priority, system });
        self.sort_systems();
    }

    /// System names in execution order.
    ///
    /// Inside a running step this includes the systems of that step plus any
    /// registered during it, in the order the next step will use.
    pub fn system_names(&self) -> Vec<&str> {
        let mut entries: Vec<(i32, &str)> = self
            .running
            .iter()
            .map(|(priority, name)| (*priority, name.as_str()))
            .collect();
        entries.extend(self.systems.iter().map(|entry| (entry.priority, entry.system.name())));
        entries.sort_by_key(|(priority, _)| *priority);
        entries.into_iter().map(|(_, name)| name).collect()
    }

    pub fn system_count(&self) -> usize {
        self.running.len() + self.systems.len()
    }

    /// Run every registered system once, in priority order.
    ///
    /// The first failing system aborts the step. Systems registered from
    /// inside an update join the list afterwards and first run next step.
    pub fn step(&mut self, dispatcher: &mut CommandDispatcher) -> Result<Vec<SystemRunReport>> {
        let mut systems = std::mem::take(&mut self.systems);
        self.running = systems
            .iter()
            .map(|entry| (entry.priority, entry.system.name().to_string()))
            .collect();
        let mut reports = Vec::with_capacity(systems.len());
        let mut outcome = Ok(());

        for entry in systems.iter_mut() {
            let start = Instant::now();
            let result = entry.system.update(self, dispatcher);
            let duration = start.elapsed();
            let name = entry.system.name().to_string();
            trace!(system = %name, priority = entry.priority, ?duration, "system ran");

            if let Err(source) = result {
                outcome = Err(HiveError::System { name, source });
                break;
            }
            reports.push(SystemRunReport {
                name,
                priority: entry.priority,
                duration,
            });
        }

        self.running.clear();
        let added = std::mem::replace(&mut self.systems, systems);
        if !added.is_empty() {
            self.systems.extend(added);
            self.sort_systems();
        }
        outcome.map(|()| reports)
    }

    /// Deliver `event` to every current subscriber of its type.
    pub fn emit<E: Event>(&mut self, event: &E, dispatcher: &mut CommandDispatcher) -> Emission {
        let handlers = self.events.handlers_for::<E>();
        crate::events::deliver(handlers, event, self, dispatcher)
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn advance_step(&mut self) {
        self.step_count += 1;
    }

    fn sort_systems(&mut self) {
        // stable: equal priorities keep registration order
        self.systems.sort_by_key(|entry| entry.priority);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
