//! Framework-provided components. Domain components belong to the host.

use serde::{Deserialize, Serialize};

use crate::ecs::Component;

/// Marks an entity for removal by [`crate::systems::CleanupSystem`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destroyed;

impl Component for Destroyed {}
