//! Pixel surfaces and cel storage.
//!
//! A [`Surface`] pairs the renderable RGBA buffer with the optional
//! palette-index buffer of the same dimensions. Cels hold their surface
//! through [`CelStorage`], which makes ownership explicit:
//!
//! - `Owned`: the cel is the only holder and may mutate freely.
//! - `Shared`: the surface is aliased by every member of a link group
//!   (`Rc` identity). Mutation goes through the `RefCell` and is visible to
//!   the whole group, so writers must pass the copy-on-write gate first.

use std::{
	cell::{Ref, RefCell, RefMut},
	fmt,
	ops::{Deref, DerefMut},
	rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::{error::CelError, ids::LinkId};

/// Surface aliased by a link group.
pub type SharedSurface = Rc<RefCell<Surface>>;

/// Row-major RGBA8 pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
	width: u32,
	height: u32,
	data: Vec<u8>,
}

impl PixelBuffer {
	/// Bytes per pixel
	pub const CHANNELS: usize = 4;

	/// Creates a fully transparent buffer.
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			data: vec![0; width as usize * height as usize * Self::CHANNELS],
		}
	}

	/// Wraps existing RGBA data, checking its length against the dimensions.
	pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CelError> {
		let expected = width as usize * height as usize;
		if data.len() != expected * Self::CHANNELS {
			return Err(CelError::DimensionMismatch {
				expected,
				actual: data.len() / Self::CHANNELS,
			});
		}
		Ok(Self {
			width,
			height,
			data,
		})
	}

	/// Width in pixels.
	pub fn width(&self) -> u32 {
		self.width
	}

	/// Height in pixels.
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Number of pixels.
	pub fn pixel_count(&self) -> usize {
		self.width as usize * self.height as usize
	}

	/// Raw RGBA bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.data
	}

	/// Mutable raw RGBA bytes.
	pub fn as_bytes_mut(&mut self) -> &mut [u8] {
		&mut self.data
	}

	/// Reads the pixel at `(x, y)`.
	pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
		let offset = self.offset(x, y)?;
		let px = &self.data[offset..offset + Self::CHANNELS];
		Some([px[0], px[1], px[2], px[3]])
	}

	/// Writes the pixel at `(x, y)`. Returns false when out of bounds.
	pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> bool {
		match self.offset(x, y) {
			Some(offset) => {
				self.data[offset..offset + Self::CHANNELS].copy_from_slice(&rgba);
				true
			}
			None => false,
		}
	}

	fn offset(&self, x: u32, y: u32) -> Option<usize> {
		if x >= self.width || y >= self.height {
			return None;
		}
		Some((y as usize * self.width as usize + x as usize) * Self::CHANNELS)
	}

	/// Returns a copy cropped or padded (transparent) to the new size, anchored top-left.
	pub fn resized(&self, width: u32, height: u32) -> Self {
		let mut out = Self::new(width, height);
		let copy_w = self.width.min(width) as usize * Self::CHANNELS;
		for y in 0..self.height.min(height) as usize {
			let src = y * self.width as usize * Self::CHANNELS;
			let dst = y * width as usize * Self::CHANNELS;
			out.data[dst..dst + copy_w].copy_from_slice(&self.data[src..src + copy_w]);
		}
		out
	}
}

impl fmt::Debug for PixelBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PixelBuffer({}x{})", self.width, self.height)
	}
}

/// RGBA buffer plus its palette-index representation.
///
/// `indices` is absent for cels holding non-pixel content (text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
	/// Renderable RGBA pixels
	pub pixels: PixelBuffer,
	/// One palette index per pixel; 0 means transparent
	pub indices: Option<Vec<u8>>,
}

impl Surface {
	/// Creates a transparent surface with an all-zero index buffer.
	pub fn blank(width: u32, height: u32) -> Self {
		let pixels = PixelBuffer::new(width, height);
		let indices = Some(vec![0; pixels.pixel_count()]);
		Self {
			pixels,
			indices,
		}
	}

	/// Creates a transparent surface without an index buffer.
	pub fn without_indices(width: u32, height: u32) -> Self {
		Self {
			pixels: PixelBuffer::new(width, height),
			indices: None,
		}
	}

	/// Width in pixels.
	pub fn width(&self) -> u32 {
		self.pixels.width()
	}

	/// Height in pixels.
	pub fn height(&self) -> u32 {
		self.pixels.height()
	}

	/// Reads the palette index at `(x, y)`.
	pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
		if x >= self.width() || y >= self.height() {
			return None;
		}
		let i = y as usize * self.width() as usize + x as usize;
		self.indices.as_ref()?.get(i).copied()
	}

	/// Writes the palette index at `(x, y)`. The RGBA buffer is not touched.
	pub fn set_index(&mut self, x: u32, y: u32, index: u8) -> bool {
		if x >= self.width() || y >= self.height() {
			return false;
		}
		let i = y as usize * self.width() as usize + x as usize;
		match self.indices.as_mut().and_then(|buf| buf.get_mut(i)) {
			Some(slot) => {
				*slot = index;
				true
			}
			None => false,
		}
	}

	/// Returns a copy cropped or padded to the new size.
	pub fn resized(&self, width: u32, height: u32) -> Self {
		let indices = self.indices.as_ref().map(|buf| {
			let mut out = vec![0; width as usize * height as usize];
			let copy_w = self.width().min(width) as usize;
			for y in 0..self.height().min(height) as usize {
				let src = y * self.width() as usize;
				let dst = y * width as usize;
				if let Some(row) = buf.get(src..src + copy_w) {
					out[dst..dst + copy_w].copy_from_slice(row);
				}
			}
			out
		});
		Self {
			pixels: self.pixels.resized(width, height),
			indices,
		}
	}
}

/// How a link group behaves on edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
	/// Aliasing that forks on first edit
	#[default]
	Soft,
	/// Aliasing that persists through edits
	Hard,
}

/// Storage of a cel's surface.
#[derive(Debug, Clone)]
pub enum CelStorage {
	/// Privately owned surface
	Owned(Surface),
	/// Surface aliased by a link group
	Shared {
		/// Group identifier
		link: LinkId,
		/// Edit behaviour of the group
		kind: LinkType,
		/// The aliased surface
		surface: SharedSurface,
	},
}

impl CelStorage {
	/// Wraps a surface into a new shared handle.
	pub fn share(link: LinkId, kind: LinkType, surface: Surface) -> Self {
		Self::Shared {
			link,
			kind,
			surface: Rc::new(RefCell::new(surface)),
		}
	}

	/// Link group, if shared.
	pub fn link(&self) -> Option<LinkId> {
		match self {
			Self::Owned(_) => None,
			Self::Shared {
				link,
				..
			} => Some(*link),
		}
	}

	/// Link type, if shared.
	pub fn link_type(&self) -> Option<LinkType> {
		match self {
			Self::Owned(_) => None,
			Self::Shared {
				kind,
				..
			} => Some(*kind),
		}
	}

	/// Read access to the surface.
	pub fn surface(&self) -> SurfaceRef<'_> {
		match self {
			Self::Owned(surface) => SurfaceRef::Owned(surface),
			Self::Shared {
				surface,
				..
			} => SurfaceRef::Shared(surface.borrow()),
		}
	}

	/// Write access to the surface. Writes to a shared surface reach every
	/// member of the group.
	pub fn surface_mut(&mut self) -> SurfaceMut<'_> {
		match self {
			Self::Owned(surface) => SurfaceMut::Owned(surface),
			Self::Shared {
				surface,
				..
			} => SurfaceMut::Shared(surface.borrow_mut()),
		}
	}

	/// Deep copy of the current surface content.
	pub fn clone_surface(&self) -> Surface {
		Surface::clone(&self.surface())
	}

	/// Shared handle, if any.
	pub fn shared_handle(&self) -> Option<&SharedSurface> {
		match self {
			Self::Owned(_) => None,
			Self::Shared {
				surface,
				..
			} => Some(surface),
		}
	}

	/// Returns true if both storages alias the same surface object.
	pub fn aliases(&self, other: &Self) -> bool {
		match (self.shared_handle(), other.shared_handle()) {
			(Some(a), Some(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

/// Borrowed view of a surface.
pub enum SurfaceRef<'a> {
	/// Owned surface
	Owned(&'a Surface),
	/// Borrow of a shared surface
	Shared(Ref<'a, Surface>),
}

impl Deref for SurfaceRef<'_> {
	type Target = Surface;

	fn deref(&self) -> &Surface {
		match self {
			Self::Owned(surface) => surface,
			Self::Shared(surface) => surface,
		}
	}
}

/// Mutable view of a surface.
pub enum SurfaceMut<'a> {
	/// Owned surface
	Owned(&'a mut Surface),
	/// Mutable borrow of a shared surface
	Shared(RefMut<'a, Surface>),
}

impl Deref for SurfaceMut<'_> {
	type Target = Surface;

	fn deref(&self) -> &Surface {
		match self {
			Self::Owned(surface) => surface,
			Self::Shared(surface) => surface,
		}
	}
}

impl DerefMut for SurfaceMut<'_> {
	fn deref_mut(&mut self) -> &mut Surface {
		match self {
			Self::Owned(surface) => surface,
			Self::Shared(surface) => surface,
		}
	}
}
