//! This module is separated into its own crate to keep the public facade of `celforge` thin, and should not be used directly.

/// `use celforge::prelude::*;` to import commonly used items.
pub mod prelude;

// Re-export celforge_types for convenience
pub use celforge_types;

// Re-export commonly used types at crate root
pub use celforge_types::{
	config::EngineConfig,
	error::CelError,
	store::{AnimationStore, StoreEvent},
};
