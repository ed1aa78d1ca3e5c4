pub mod command;
pub mod components;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod life;
pub mod logging;
pub mod resources;
pub mod runtime;
pub mod snapshot;
pub mod systems;

pub use command::{Command, CommandDispatcher, CommandEnvelope, CommandKind, CommandRouter};
pub use config::{LoggingConfig, RuntimeConfig, UnroutedPolicy};
pub use ecs::{Component, EntityId, Store, System, World};
pub use error::{HiveError, Result};
pub use events::{Event, EventBus};
pub use resources::{Resource, ResourceRegistry};
pub use runtime::{Runtime, StepReport};
pub use snapshot::{Snapshot, SnapshotRegistry};
