//! Maps a command's runtime type to exactly one handler

use std::collections::HashMap;

use tracing::debug;

use super::{Command, CommandDispatcher, CommandEnvelope, CommandKind, CommandStats};
use crate::ecs::World;
use crate::error::{HiveError, Result};

type ErasedRoute = Box<
    dyn FnMut(CommandEnvelope, &mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send,
>;

/// Type-to-handler binding table.
///
/// ```ignore
/// let mut router = CommandRouter::new();
/// router.register(|cmd: &Move, world: &mut World, _: &mut CommandDispatcher| {
///     if let Some(pos) = world.get_component_mut::<Position>(cmd.entity) {
///         pos.x += cmd.dx;
///     }
///     Ok(())
/// })?;
/// ```
#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<CommandKind, ErasedRoute>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the handler for commands of type `C`.
    ///
    /// Fails if `C` already has a handler; the existing one stays active.
    pub fn register<C, F>(&mut self, mut handler: F) -> Result<()>
    where
        C: Command,
        F: FnMut(&C, &mut World, &mut CommandDispatcher) -> anyhow::Result<()> + Send + 'static,
    {
        let kind = CommandKind::of::<C>();
        if self.handlers.contains_key(&kind) {
            return Err(HiveError::DuplicateHandler(kind.name()));
        }
        let route: ErasedRoute = Box::new(
            move |envelope: CommandEnvelope, world: &mut World, queue: &mut CommandDispatcher| {
                match envelope.downcast_ref::<C>() {
                    Some(command) => handler(command, world, queue),
                    None => Ok(()),
                }
            },
        );
        self.handlers.insert(kind, route);
        Ok(())
    }

    pub fn unregister<C: Command>(&mut self) -> bool {
        self.handlers.remove(&CommandKind::of::<C>()).is_some()
    }

    pub fn has_handler<C: Command>(&self) -> bool {
        self.handlers.contains_key(&CommandKind::of::<C>())
    }

    pub fn has_handler_for(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered command kinds, sorted by name
    pub fn registered_types(&self) -> Vec<CommandKind> {
        let mut kinds: Vec<CommandKind> = self.handlers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Hand `command` to its handler.
    ///
    /// Returns `Ok(false)` without error when no handler is bound. Handler
    /// failures come back as [`HiveError::Handler`].
    pub fn route(
        &mut self,
        command: CommandEnvelope,
        world: &mut World,
        dispatcher: &mut CommandDispatcher,
    ) -> Result<bool> {
        let kind = command.kind();
        let Some(handler) = self.handlers.get_mut(&kind) else {
            debug!(command = %kind, "no handler registered, command dropped");
            return Ok(false);
        };
        handler(command, world, dispatcher).map_err(|source| HiveError::Handler {
            command: kind.name(),
            source,
        })?;
        Ok(true)
    }

    /// Route a batch, counting routed commands per type.
    ///
    /// Unrouted commands count for nothing; the first handler failure is
    /// returned and the rest of the batch is not routed.
    pub fn handle_all<I>(
        &mut self,
        commands: I,
        world: &mut World,
        dispatcher: &mut CommandDispatcher,
    ) -> Result<CommandStats>
    where
        I: IntoIterator<Item = CommandEnvelope>,
    {
        let mut stats = CommandStats::new();
        for command in commands {
            let kind = command.kind();
            if self.route(command, world, dispatcher)? {
                *stats.entry(kind).or_insert(0) += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Component;

    #[derive(Debug)]
    struct Position {
        x: i32,
    }
    impl Component for Position {}

    struct Move {
        entity: u64,
        dx: i32,
    }
    impl Command for Move {}

    struct Attack;
    impl Command for Attack {}

    fn move_handler(
        cmd: &Move,
        world: &mut World,
        _: &mut CommandDispatcher,
    ) -> anyhow::Result<()> {
        if let Some(pos) = world.get_component_mut::<Position>(cmd.entity) {
            pos.x += cmd.dx;
        }
        Ok(())
    }

    #[test]
    fn test_route_to_registered_handler() {
        let mut router = CommandRouter::new();
        router.register(move_handler).unwrap();

        let mut world = World::new();
        let mut dispatcher = CommandDispatcher::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 0 });

        let routed = router
            .route(CommandEnvelope::new(Move { entity: e, dx: 4 }), &mut world, &mut dispatcher)
            .unwrap();
        assert!(routed);
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 4);
    }

    #[test]
    fn test_unrouted_command_is_not_an_error() {
        let mut router = CommandRouter::new();
        let mut world = World::new();
        let mut dispatcher = CommandDispatcher::new();

        let routed = router
            .route(CommandEnvelope::new(Attack), &mut world, &mut dispatcher)
            .unwrap();
        assert!(!routed);
    }

    #[test]
    fn test_duplicate_registration_fails_and_keeps_first() {
        let mut router = CommandRouter::new();
        router.register(move_handler).unwrap();

        let err = router
            .register(|_: &Move, _: &mut World, _: &mut CommandDispatcher| anyhow::bail!("second"))
            .unwrap_err();
        assert!(matches!(err, HiveError::DuplicateHandler(name) if name.ends_with("Move")));

        let mut world = World::new();
        let mut dispatcher = CommandDispatcher::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 1 });
        router
            .route(CommandEnvelope::new(Move { entity: e, dx: 1 }), &mut world, &mut dispatcher)
            .unwrap();
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 2);
    }

    #[test]
    fn test_unregister() {
        let mut router = CommandRouter::new();
        router.register(move_handler).unwrap();

        assert!(router.has_handler::<Move>());
        assert!(router.unregister::<Move>());
        assert!(!router.unregister::<Move>());
        assert!(!router.has_handler::<Move>());
        assert!(router.register(move_handler).is_ok());
    }

    #[test]
    fn test_handle_all_counts_per_type() {
        let mut router = CommandRouter::new();
        router.register(move_handler).unwrap();

        let mut world = World::new();
        let mut dispatcher = CommandDispatcher::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 0 });

        let batch = vec![
            CommandEnvelope::new(Move { entity: e, dx: 1 }),
            CommandEnvelope::new(Attack),
            CommandEnvelope::new(Move { entity: e, dx: 2 }),
        ];
        let stats = router.handle_all(batch, &mut world, &mut dispatcher).unwrap();

        assert_eq!(stats.get(&CommandKind::of::<Move>()), Some(&2));
        assert_eq!(stats.get(&CommandKind::of::<Attack>()), None);
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 3);
    }

    #[test]
    fn test_handler_failure_propagates() {
        let mut router = CommandRouter::new();
        router
            .register(|_: &Attack, _: &mut World, _: &mut CommandDispatcher| {
                anyhow::bail!("no target")
            })
            .unwrap();

        let mut world = World::new();
        let mut dispatcher = CommandDispatcher::new();
        let err = router
            .handle_all(vec![CommandEnvelope::new(Attack)], &mut world, &mut dispatcher)
            .unwrap_err();
        assert!(matches!(err, HiveError::Handler { command, .. } if command.ends_with("Attack")));
    }
}
