//! Cels: the pixel content of one layer at one frame.

use std::{collections::BTreeMap, fmt};

use crate::{
	ids::{CelKey, FrameId, LayerId, LinkId},
	surface::{CelStorage, LinkType, Surface, SurfaceMut, SurfaceRef},
};

/// All cels of a project, keyed by `(layer, frame)`.
pub type CelMap = BTreeMap<CelKey, Cel>;

/// Maximum cel opacity
pub const MAX_OPACITY: u8 = 100;

/// Pixel content of one (layer, frame) pair.
#[derive(Debug, Clone)]
pub struct Cel {
	key: CelKey,
	pub(crate) storage: CelStorage,
	opacity: u8,
	text: Option<String>,
}

impl Cel {
	/// Creates a cel that owns `surface`.
	pub fn owned(key: CelKey, surface: Surface) -> Self {
		Self::with_storage(key, CelStorage::Owned(surface))
	}

	/// Creates a cel with the given storage.
	pub fn with_storage(key: CelKey, storage: CelStorage) -> Self {
		Self {
			key,
			storage,
			opacity: MAX_OPACITY,
			text: None,
		}
	}

	/// Key of this cel.
	pub fn key(&self) -> CelKey {
		self.key
	}

	/// Owning layer.
	pub fn layer(&self) -> LayerId {
		self.key.layer
	}

	/// Owning frame.
	pub fn frame(&self) -> FrameId {
		self.key.frame
	}

	/// Storage of the surface.
	pub fn storage(&self) -> &CelStorage {
		&self.storage
	}

	/// Link group, if any.
	pub fn link(&self) -> Option<LinkId> {
		self.storage.link()
	}

	/// Link type, if linked.
	pub fn link_type(&self) -> Option<LinkType> {
		self.storage.link_type()
	}

	/// Returns true if the cel belongs to a link group (including the empty sentinel).
	pub fn is_linked(&self) -> bool {
		self.link().is_some()
	}

	/// Returns true if the cel still aliases the shared empty surface.
	pub fn is_empty_sentinel(&self) -> bool {
		self.link() == Some(LinkId::Empty)
	}

	/// Per-cel opacity, 0..=100.
	pub fn opacity(&self) -> u8 {
		self.opacity
	}

	/// Sets the opacity, clamped to 0..=100.
	pub fn set_opacity(&mut self, value: i32) {
		self.opacity = value.clamp(0, MAX_OPACITY as i32) as u8;
	}

	/// Text content of a text cel.
	pub fn text(&self) -> Option<&str> {
		self.text.as_deref()
	}

	pub(crate) fn set_text(&mut self, text: Option<String>) {
		self.text = text;
	}

	/// Returns true if the surface carries an index buffer.
	pub fn has_indices(&self) -> bool {
		self.surface().indices.is_some()
	}

	/// Read access to the surface.
	pub fn surface(&self) -> SurfaceRef<'_> {
		self.storage.surface()
	}

	/// Write access to the surface.
	///
	/// Callers outside the copy-on-write gate must not write to soft-linked
	/// surfaces.
	pub(crate) fn surface_mut(&mut self) -> SurfaceMut<'_> {
		self.storage.surface_mut()
	}

	/// Returns true if both cels alias the same surface object.
	pub fn shares_surface_with(&self, other: &Self) -> bool {
		self.storage.aliases(&other.storage)
	}
}

impl fmt::Display for Cel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Cel {}", self.key)?;
		match self.storage.link() {
			Some(link) => write!(f, " [{link}, {:?}]", self.link_type().unwrap_or_default()),
			None => write!(f, " [owned]"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key() -> CelKey {
		CelKey::new(LayerId::from_raw(1), FrameId::from_raw(2))
	}

	#[test]
	fn test_opacity_clamped() {
		let mut cel = Cel::owned(key(), Surface::blank(1, 1));
		assert_eq!(cel.opacity(), 100);
		cel.set_opacity(-5);
		assert_eq!(cel.opacity(), 0);
		cel.set_opacity(250);
		assert_eq!(cel.opacity(), 100);
		cel.set_opacity(42);
		assert_eq!(cel.opacity(), 42);
	}

	#[test]
	fn test_display() {
		let cel = Cel::owned(key(), Surface::blank(1, 1));
		assert_eq!(cel.to_string(), "Cel 0000000000000001:0000000000000002 [owned]");

		let linked = Cel::with_storage(key(), CelStorage::share(LinkId::Empty, LinkType::Soft, Surface::blank(1, 1)));
		assert!(linked.is_empty_sentinel());
		assert_eq!(linked.to_string(), "Cel 0000000000000001:0000000000000002 [empty, Soft]");
	}
}
