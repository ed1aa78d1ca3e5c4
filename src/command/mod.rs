//! Commands: typed intents queued by systems and routed after each step

pub mod dispatcher;
pub mod router;

use std::any::{self, Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;

pub use dispatcher::CommandDispatcher;
pub use router::CommandRouter;

/// Marker for command values. The core only needs the runtime type.
pub trait Command: Send + Sync + 'static {}

/// Runtime identity of a command type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKind {
    name: &'static str,
    id: TypeId,
}

impl CommandKind {
    pub fn of<C: Command>() -> Self {
        Self {
            name: any::type_name::<C>(),
            id: TypeId::of::<C>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl fmt::Debug for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Per-type counts of routed commands.
pub type CommandStats = BTreeMap<CommandKind, usize>;

/// An opaque, type-tagged command as it sits in the queue.
pub struct CommandEnvelope {
    kind: CommandKind,
    payload: Box<dyn Any + Send + Sync>,
}

impl CommandEnvelope {
    pub fn new<C: Command>(command: C) -> Self {
        Self {
            kind: CommandKind::of::<C>(),
            payload: Box::new(command),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn is<C: Command>(&self) -> bool {
        self.kind.id == TypeId::of::<C>()
    }

    pub fn downcast_ref<C: Command>(&self) -> Option<&C> {
        self.payload.downcast_ref::<C>()
    }

    /// Unwrap the command, giving the envelope back on a type mismatch.
    pub fn into_inner<C: Command>(self) -> Result<C, Self> {
        let kind = self.kind;
        match self.payload.downcast::<C>() {
            Ok(command) => Ok(*command),
            Err(payload) => Err(Self { kind, payload }),
        }
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
