mod cleanup;

pub use cleanup::CleanupSystem;
