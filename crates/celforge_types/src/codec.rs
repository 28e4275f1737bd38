//! Palette index codec.
//!
//! Converts between a palette-index buffer (one byte per pixel) and an RGBA
//! buffer. Index 0 is always transparent; index `n >= 1` resolves through
//! [`Palette::color_at`], which covers both the main and the ephemeral region.
//!
//! ## Encoding rules
//!
//! | Pixel                          | Result                                  |
//! |--------------------------------|-----------------------------------------|
//! | alpha < 128                    | 0                                       |
//! | RGB present in palette         | lowest matching index                   |
//! | RGB missing, [`MissingColor::Append`]  | appended, new index (nearest if full) |
//! | RGB missing, [`MissingColor::Nearest`] | nearest by squared RGB distance   |
//!
//! Colours present verbatim in the palette round-trip exactly.

use std::collections::HashMap;

use crate::{
	error::CelError,
	palette::{Color, Palette},
	surface::{PixelBuffer, Surface},
};

/// Pixels with alpha below this value encode as transparent
pub const ALPHA_THRESHOLD: u8 = 128;

/// What to do with an opaque colour that is not in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingColor {
	/// Use the nearest existing colour
	#[default]
	Nearest,
	/// Append the colour to the palette
	Append,
}

impl MissingColor {
	/// Maps the `add_missing` flag to a policy.
	pub fn from_add_missing(add_missing: bool) -> Self {
		if add_missing {
			Self::Append
		} else {
			Self::Nearest
		}
	}
}

/// Builds a lookup table from index to RGBA bytes.
fn build_lut(palette: &Palette) -> [[u8; 4]; 256] {
	let mut lut = [[0u8; 4]; 256];
	for (index, color) in palette.iter_indexed() {
		lut[index as usize] = [color.r, color.g, color.b, 255];
	}
	lut
}

/// Decodes an index buffer into freshly allocated RGBA bytes.
///
/// Indices the palette cannot resolve decode as transparent.
pub fn decode(indices: &[u8], palette: &Palette) -> Vec<u8> {
	let lut = build_lut(palette);
	let mut rgba = Vec::with_capacity(indices.len() * PixelBuffer::CHANNELS);
	for &index in indices {
		rgba.extend_from_slice(&lut[index as usize]);
	}
	rgba
}

/// Decodes an index buffer into an existing pixel buffer.
///
/// # Errors
///
/// Returns [`CelError::DimensionMismatch`] if `indices` does not hold exactly
/// one entry per pixel. The buffer is left untouched in that case.
pub fn decode_into(indices: &[u8], palette: &Palette, pixels: &mut PixelBuffer) -> Result<(), CelError> {
	if indices.len() != pixels.pixel_count() {
		return Err(CelError::DimensionMismatch {
			expected: pixels.pixel_count(),
			actual: indices.len(),
		});
	}

	let lut = build_lut(palette);
	for (px, &index) in pixels.as_bytes_mut().chunks_exact_mut(PixelBuffer::CHANNELS).zip(indices) {
		px.copy_from_slice(&lut[index as usize]);
	}
	Ok(())
}

/// Encodes RGBA bytes into an index buffer.
///
/// With [`MissingColor::Append`] unseen colours are added to `palette`.
/// Trailing bytes that do not form a whole pixel are ignored.
pub fn encode(rgba: &[u8], palette: &mut Palette, missing: MissingColor) -> Vec<u8> {
	let mut resolved: HashMap<[u8; 3], u8> = HashMap::new();
	let mut indices = Vec::with_capacity(rgba.len() / PixelBuffer::CHANNELS);

	for px in rgba.chunks_exact(PixelBuffer::CHANNELS) {
		if px[3] < ALPHA_THRESHOLD {
			indices.push(0);
			continue;
		}

		let key = [px[0], px[1], px[2]];
		let index = match resolved.get(&key) {
			Some(&index) => index,
			None => {
				let index = resolve_color(palette, Color::rgb(px[0], px[1], px[2]), missing);
				resolved.insert(key, index);
				index
			}
		};
		indices.push(index);
	}

	indices
}

/// Encodes a pixel buffer into an index buffer.
pub fn encode_buffer(pixels: &PixelBuffer, palette: &mut Palette, missing: MissingColor) -> Vec<u8> {
	encode(pixels.as_bytes(), palette, missing)
}

fn resolve_color(palette: &mut Palette, color: Color, missing: MissingColor) -> u8 {
	if let Some(index) = palette.index_of(color) {
		return index;
	}

	let appended = match missing {
		MissingColor::Append => palette.push(color),
		MissingColor::Nearest => None,
	};

	// an empty palette has nothing to offer, keep the pixel transparent
	appended.or_else(|| palette.nearest(color)).unwrap_or(0)
}

/// Rebuilds a surface's RGBA buffer from its index buffer.
///
/// Returns `Ok(false)` for surfaces without an index buffer (text cels).
pub fn rebuild_surface(surface: &mut Surface, palette: &Palette) -> Result<bool, CelError> {
	let Surface {
		pixels,
		indices,
	} = surface;

	match indices {
		Some(indices) => decode_into(indices, palette, pixels).map(|()| true),
		None => Ok(false),
	}
}
