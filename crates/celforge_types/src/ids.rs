//! Typed identifiers for frames, layers, tags, link groups and cels.
//!
//! Identifiers are random 64-bit values rendered as 16 hex digits. A cel is
//! addressed by its [`CelKey`], printed as `layer:frame`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CelError;

macro_rules! define_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(u64);

		impl $name {
			/// Generates a fresh random identifier.
			pub fn generate() -> Self {
				Self(rand::random())
			}

			/// Wraps a raw value.
			pub const fn from_raw(raw: u64) -> Self {
				Self(raw)
			}

			/// Returns the raw value.
			pub const fn raw(self) -> u64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{:016x}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = std::num::ParseIntError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				u64::from_str_radix(s, 16).map(Self)
			}
		}
	};
}

define_id!(
	/// Identifier of a frame
	FrameId
);
define_id!(
	/// Identifier of a layer
	LayerId
);
define_id!(
	/// Identifier of a frame tag
	TagId
);

/// Identifier of a link group.
///
/// `Empty` is the reserved group of cels that still alias the shared
/// transparent surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkId {
	/// Reserved group of still-empty cels
	Empty,
	/// Regular link group
	Group(u64),
}

impl LinkId {
	/// Generates a fresh regular group id.
	pub fn generate() -> Self {
		Self::Group(rand::random())
	}

	/// Returns true for the reserved empty group.
	pub const fn is_empty_sentinel(self) -> bool {
		matches!(self, Self::Empty)
	}
}

impl fmt::Display for LinkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Empty => write!(f, "empty"),
			Self::Group(raw) => write!(f, "{raw:016x}"),
		}
	}
}

/// Key of a cel: the (layer, frame) pair it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CelKey {
	/// Owning layer
	pub layer: LayerId,
	/// Owning frame
	pub frame: FrameId,
}

impl CelKey {
	/// Creates a new cel key.
	pub const fn new(layer: LayerId, frame: FrameId) -> Self {
		Self {
			layer,
			frame,
		}
	}
}

impl fmt::Display for CelKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.layer, self.frame)
	}
}

impl FromStr for CelKey {
	type Err = CelError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || CelError::InvalidCelKey(s.to_string());
		let (layer, frame) = s.split_once(':').ok_or_else(invalid)?;
		Ok(Self {
			layer: layer.parse().map_err(|_| invalid())?,
			frame: frame.parse().map_err(|_| invalid())?,
		})
	}
}
