//! Synchronous publish/subscribe, decoupled from component data

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::command::CommandDispatcher;
use crate::ecs::World;

/// Marker for values that can be emitted on an [`EventBus`].
pub trait Event: Send + Sync + 'static {}

type ErasedHandler =
    Arc<dyn Fn(&dyn Any, &mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one subscription; pass it to [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    event: TypeId,
    id: u64,
}

impl SubscriptionToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Outcome of one emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Emission {
    pub delivered: usize,
    pub failed: usize,
}

struct Subscription {
    token: SubscriptionToken,
    handler: ErasedHandler,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<TypeId, Vec<Subscription>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type `E`. Handlers run in subscription order.
    pub fn on<E, F>(&mut self, handler: F) -> SubscriptionToken
    where
        E: Event,
        F: Fn(&E, &mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let token = SubscriptionToken {
            event: TypeId::of::<E>(),
            id: self.next_id,
        };
        self.next_id += 1;

        let handler: ErasedHandler = Arc::new(
            move |event: &dyn Any, world: &mut World, dispatcher: &mut CommandDispatcher| {
                match event.downcast_ref::<E>() {
                    Some(event) => handler(event, world, dispatcher),
                    None => Ok(()),
                }
            },
        );
        self.subscribers
            .entry(token.event)
            .or_default()
            .push(Subscription { token, handler });
        token
    }

    /// Remove exactly the subscription behind `token`.
    pub fn off(&mut self, token: SubscriptionToken) -> bool {
        let Some(subs) = self.subscribers.get_mut(&token.event) else {
            return false;
        };
        match subs.iter().position(|sub| sub.token == token) {
            Some(index) => {
                subs.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers.get(&TypeId::of::<E>()).map_or(0, Vec::len)
    }

    /// Emit on a bus that is not owned by `world`. For the world's own bus use
    /// [`World::emit`].
    pub fn emit<E: Event>(
        &self,
        event: &E,
        world: &mut World,
        dispatcher: &mut CommandDispatcher,
    ) -> Emission {
        deliver(self.handlers_for::<E>(), event, world, dispatcher)
    }

    /// Current subscribers of `E`, detached from the bus so handlers may
    /// subscribe or unsubscribe while an emission is in progress.
    pub(crate) fn handlers_for<E: Event>(&self) -> Vec<(SubscriptionToken, ErasedHandler)> {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map(|subs| {
                subs.iter()
                    .map(|sub| (sub.token, Arc::clone(&sub.handler)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Run each handler; a failing handler is logged and the rest still run.
pub(crate) fn deliver<E: Event>(
    handlers: Vec<(SubscriptionToken, ErasedHandler)>,
    event: &E,
    world: &mut World,
    dispatcher: &mut CommandDispatcher,
) -> Emission {
    let mut emission = Emission::default();
    for (token, handler) in handlers {
        match handler(event as &dyn Any, world, dispatcher) {
            Ok(()) => emission.delivered += 1,
            Err(err) => {
                emission.failed += 1;
                error!(
                    event = any::type_name::<E>(),
                    subscription = token.id,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }
    emission
}
