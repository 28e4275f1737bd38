//! Prelude module for `celforge_internal`.
//!
//! This module provides a convenient way to import commonly used types and traits.
//!
//! # Examples
//!
//! ```rust
//! use celforge_internal::prelude::*;
//!
//! // Now you can use all common types directly
//! let mut store = AnimationStore::new(EngineConfig::with_canvas(16, 16));
//! let layer = store.add_layer("Ink", true);
//! let frame = store.add_frame(None);
//! assert!(store.cel(layer, frame).unwrap().link_type() == Some(LinkType::Hard));
//! ```

// Re-export everything from celforge_types::prelude
#[doc(inline)]
pub use celforge_types::prelude::*;

// Re-export the entire celforge_types module for advanced usage
#[doc(inline)]
pub use celforge_types;
