#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `celforge` is an animation cel engine: frames and layers of palette-indexed
//! pixel cels, copy-on-write links between cels, palette edits that keep every
//! index buffer consistent, and timed playback bounded by frame tags.
//!
//! ```
//! use celforge::prelude::*;
//!
//! let mut store = AnimationStore::new(EngineConfig::with_canvas(32, 32));
//! let walk = store.add_frame(Some(120));
//! store.add_tag("walk", Color::rgb(0, 128, 255), 0, 1);
//! assert_eq!(store.frame_index(walk), Some(1));
//! ```
pub use celforge_internal::*;
