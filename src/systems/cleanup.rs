use anyhow::Result;
use tracing::trace;

use crate::{
    command::CommandDispatcher,
    components::Destroyed,
    ecs::{System, World},
};

/// Destroys every entity carrying [`Destroyed`].
///
/// Hosts opt in by registering it, usually with a high priority so it runs
/// after the systems that mark entities.
pub struct CleanupSystem;

impl CleanupSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CleanupSystem {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn update(&mut self, world: &mut World, _dispatcher: &mut CommandDispatcher) -> Result<()> {
        let doomed = world.query_entities::<(Destroyed,)>();
        for entity in &doomed {
            world.destroy_entity(*entity);
        }
        if !doomed.is_empty() {
            trace!(count = doomed.len(), "destroyed marked entities");
        }
        Ok(())
    }
}
