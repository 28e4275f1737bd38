//! This crate provides the core data types of the `celforge` animation cel engine.
//!
//! # Modules
//!
//! - **codec**: Conversion between palette-index buffers and RGBA pixels
//! - **link**: Copy-on-write aliasing of cel surfaces (soft and hard links)
//! - **sync**: Index-buffer remapping after structural palette edits
//! - **tag**: Named, non-overlapping frame ranges
//! - **playback**: Timed frame advance, optionally bounded by a tag
//! - **store**: The orchestrator owning the whole project state
//!
//! # Examples
//!
//! Using the prelude (recommended):
//!
//! ```
//! use celforge_types::prelude::*;
//!
//! let palette = Palette::from_hex(&["#000000", "#ffffff"]).unwrap();
//! let mut store = AnimationStore::with_palette(EngineConfig::with_canvas(4, 4), palette);
//!
//! let layer = store.layers()[0].id;
//! let frame = store.current_frame();
//! store.update_cel_index_buffer(layer, frame, vec![2; 16]);
//!
//! let cel = store.cel(layer, frame).unwrap();
//! assert_eq!(cel.surface().pixels.get_pixel(0, 0), Some([255, 255, 255, 255]));
//! ```
//!
//! Or use explicit paths:
//!
//! ```
//! use celforge_types::{codec, palette::Palette};
//!
//! let palette = Palette::from_hex(&["#ff0000"]).unwrap();
//! assert_eq!(codec::decode(&[0, 1], &palette), vec![0, 0, 0, 0, 255, 0, 0, 255]);
//! ```

pub mod cel;
pub mod codec;
pub mod config;
pub mod error;
pub mod ids;
pub mod link;
pub mod palette;
pub mod playback;
pub mod store;
pub mod surface;
pub mod sync;
pub mod tag;
pub mod timeline;

/// `use celforge_types::prelude::*;` to import commonly used items.
pub mod prelude;
