//! Error types shared by the runtime core.

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::EntityId;

pub type Result<T, E = HiveError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HiveError {
    #[error("resource {0} not found")]
    ResourceNotFound(&'static str),

    #[error("command queue is empty")]
    EmptyQueue,

    #[error("handler already registered for command {0}")]
    DuplicateHandler(&'static str),

    #[error("snapshot codec already registered for {0}")]
    DuplicateCodec(String),

    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    #[error("no handler registered for command {0}")]
    Unrouted(&'static str),

    #[error("system '{name}' failed")]
    System {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("handler for command {command} failed")]
    Handler {
        command: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid entity key '{0}' in snapshot")]
    InvalidEntityKey(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}
