//! Prelude module for `celforge_types`.
//!
//! This module provides a convenient way to import commonly used types.
//!
//! # Examples
//!
//! ```
//! use celforge_types::prelude::*;
//!
//! let mut store = AnimationStore::new(EngineConfig::default());
//! let frame = store.add_frame(Some(80));
//! assert_eq!(store.frame(frame).map(|f| f.duration_ms), Some(80));
//! ```

// Store
#[doc(inline)]
pub use crate::store::{AnimationStore, CelRecord, ObserverId, ProjectSnapshot, StoreEvent, SurfaceRecord};

// Configuration and errors
#[doc(inline)]
pub use crate::{config::EngineConfig, error::CelError};

// Identifiers
#[doc(inline)]
pub use crate::ids::{CelKey, FrameId, LayerId, LinkId, TagId};

// Cels and surfaces
#[doc(inline)]
pub use crate::{
	cel::{Cel, CelMap},
	surface::{CelStorage, LinkType, PixelBuffer, Surface},
};

// Palette
#[doc(inline)]
pub use crate::{
	codec::MissingColor,
	palette::{Color, Palette},
	sync::{PaletteChange, SyncReport},
};

// Timeline, tags and playback
#[doc(inline)]
pub use crate::{
	playback::{PlaybackMode, PlaybackState},
	tag::{FrameTag, TagUpdate},
	timeline::{Frame, Layer},
};
