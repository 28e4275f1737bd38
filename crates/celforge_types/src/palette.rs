//! Colour and palette support.
//!
//! A [`Palette`] is an ordered list of main colours followed by an ephemeral
//! overflow region holding colours that are addressable but not yet committed
//! to the main list. Both regions are resolved through one lookup:
//!
//! ```text
//! index 0      -> transparent (reserved)
//! index n >= 1 -> (main ++ ephemeral)[n - 1]
//! ```
//!
//! Index buffers store one byte per pixel, so a palette resolves at most
//! [`Palette::MAX_COLORS`] colours.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::CelError, sync::PaletteChange};

/// RGBA color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
	/// Red component (0-255)
	pub r: u8,
	/// Green component (0-255)
	pub g: u8,
	/// Blue component (0-255)
	pub b: u8,
	/// Alpha component (0-255)
	pub a: u8,
}

impl Color {
	/// Creates a new RGBA color.
	pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
		Self {
			r,
			g,
			b,
			a,
		}
	}

	/// Creates a new RGB color with full opacity.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self::new(r, g, b, 255)
	}

	/// Creates a transparent black color.
	pub const fn transparent() -> Self {
		Self::new(0, 0, 0, 0)
	}

	/// Parses `#rgb` or `#rrggbb` (leading `#` optional). The result is opaque.
	pub fn from_hex(text: &str) -> Result<Self, CelError> {
		let digits = text.trim().trim_start_matches('#');
		let expanded: String = match digits.len() {
			3 => digits.chars().flat_map(|c| [c, c]).collect(),
			6 => digits.to_string(),
			_ => return Err(CelError::InvalidColor(text.to_string())),
		};

		let bytes = hex::decode(&expanded).map_err(|_| CelError::InvalidColor(text.to_string()))?;
		Ok(Self::rgb(bytes[0], bytes[1], bytes[2]))
	}

	/// Formats the RGB channels as `#rrggbb`. Alpha is dropped.
	pub fn to_hex(&self) -> String {
		format!("#{}", hex::encode([self.r, self.g, self.b]))
	}

	/// Returns true if the RGB channels match, ignoring alpha.
	#[inline]
	pub fn same_rgb(&self, other: &Self) -> bool {
		self.r == other.r && self.g == other.g && self.b == other.b
	}

	/// Squared euclidean distance between the RGB channels.
	#[inline]
	pub fn distance_sq(&self, other: &Self) -> u32 {
		let dr = self.r as i32 - other.r as i32;
		let dg = self.g as i32 - other.g as i32;
		let db = self.b as i32 - other.b as i32;
		(dr * dr + dg * dg + db * db) as u32
	}
}

impl Default for Color {
	fn default() -> Self {
		Self::transparent()
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RGBA({}, {}, {}, {})", self.r, self.g, self.b, self.a)
	}
}

/// Palette with a main colour list and an ephemeral overflow region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
	main: Vec<Color>,
	ephemeral: Vec<Color>,
}

impl Palette {
	/// Maximum number of colours addressable by a byte index (index 0 is reserved)
	pub const MAX_COLORS: usize = 255;

	/// Creates an empty palette.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a palette from main colours, truncated to [`Self::MAX_COLORS`].
	pub fn from_colors(mut main: Vec<Color>) -> Self {
		main.truncate(Self::MAX_COLORS);
		Self {
			main,
			ephemeral: Vec::new(),
		}
	}

	/// Creates a palette from hex strings such as `"#fff"` or `"#ff8800"`.
	pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, CelError> {
		let main = colors.iter().map(|c| Color::from_hex(c.as_ref())).collect::<Result<Vec<_>, _>>()?;
		Ok(Self::from_colors(main))
	}

	/// Main colours.
	pub fn main(&self) -> &[Color] {
		&self.main
	}

	/// Ephemeral overflow colours.
	pub fn ephemeral(&self) -> &[Color] {
		&self.ephemeral
	}

	/// Total number of resolvable colours.
	pub fn len(&self) -> usize {
		self.main.len() + self.ephemeral.len()
	}

	/// Returns true if the palette holds no colours at all.
	pub fn is_empty(&self) -> bool {
		self.main.is_empty() && self.ephemeral.is_empty()
	}

	/// Returns true if no more colours can be addressed.
	pub fn is_full(&self) -> bool {
		self.len() >= Self::MAX_COLORS
	}

	/// Iterates over `(index, colour)` pairs of both regions, 1-based.
	pub fn iter_indexed(&self) -> impl Iterator<Item = (u8, &Color)> {
		self.main.iter().chain(self.ephemeral.iter()).enumerate().map(|(i, c)| ((i + 1) as u8, c))
	}

	/// Resolves an index to a colour. Index 0 and unknown indices yield `None`.
	pub fn color_at(&self, index: u8) -> Option<Color> {
		let slot = (index as usize).checked_sub(1)?;
		match slot.checked_sub(self.main.len()) {
			None => self.main.get(slot).copied(),
			Some(overflow) => self.ephemeral.get(overflow).copied(),
		}
	}

	/// Exact RGB match, lowest index first.
	pub fn index_of(&self, color: Color) -> Option<u8> {
		self.iter_indexed().find(|(_, c)| c.same_rgb(&color)).map(|(i, _)| i)
	}

	/// Nearest colour by squared RGB distance; ties resolve to the lowest index.
	pub fn nearest(&self, color: Color) -> Option<u8> {
		self.iter_indexed().min_by_key(|(i, c)| (c.distance_sq(&color), *i)).map(|(i, _)| i)
	}

	/// Appends a colour and returns its index, or `None` if the palette is full.
	///
	/// The colour lands in the main list while the ephemeral region is empty,
	/// otherwise at the end of the ephemeral region so that no existing index
	/// moves.
	pub fn push(&mut self, color: Color) -> Option<u8> {
		if self.is_full() {
			return None;
		}
		let color = Color::rgb(color.r, color.g, color.b);
		if self.ephemeral.is_empty() {
			self.main.push(color);
		} else {
			self.ephemeral.push(color);
		}
		Some(self.len() as u8)
	}

	fn main_index_valid(&self, index: u8) -> bool {
		index >= 1 && (index as usize) <= self.main.len()
	}

	/// Moves the main colour at `from` to position `to` (both 1-based).
	pub fn move_color(&mut self, from: u8, to: u8) -> Option<PaletteChange> {
		if from == to || !self.main_index_valid(from) || !self.main_index_valid(to) {
			return None;
		}
		let color = self.main.remove(from as usize - 1);
		self.main.insert(to as usize - 1, color);
		Some(PaletteChange::Reorder {
			from,
			to,
		})
	}

	/// Removes the main colour at `index`.
	pub fn remove_color(&mut self, index: u8) -> Option<PaletteChange> {
		if !self.main_index_valid(index) {
			return None;
		}
		self.main.remove(index as usize - 1);
		Some(PaletteChange::Remove {
			index,
		})
	}

	/// Moves the main colour at `index` to the end of the ephemeral region.
	pub fn move_to_ephemeral(&mut self, index: u8) -> Option<PaletteChange> {
		if !self.main_index_valid(index) {
			return None;
		}
		let color = self.main.remove(index as usize - 1);
		self.ephemeral.push(color);
		Some(PaletteChange::MoveToEphemeral {
			index,
			new_index: self.len() as u8,
		})
	}

	/// Inserts a colour into the main list at `index` (1-based, up to `len + 1`).
	pub fn insert_color(&mut self, index: u8, color: Color) -> Option<PaletteChange> {
		if self.is_full() || index == 0 || index as usize > self.main.len() + 1 {
			return None;
		}
		self.main.insert(index as usize - 1, Color::rgb(color.r, color.g, color.b));
		Some(PaletteChange::Insert {
			index,
		})
	}

	/// Replaces both regions, returning the change that carries the old lists.
	pub fn replace(&mut self, main: Vec<Color>, ephemeral: Vec<Color>) -> Option<PaletteChange> {
		if main.len() + ephemeral.len() > Self::MAX_COLORS {
			return None;
		}
		let old_main = std::mem::replace(&mut self.main, main);
		let old_ephemeral = std::mem::replace(&mut self.ephemeral, ephemeral);
		Some(PaletteChange::Replace {
			old_main,
			old_ephemeral,
		})
	}
}

impl fmt::Display for Palette {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Palette: {} main + {} ephemeral colors", self.main.len(), self.ephemeral.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Palette {
		Palette::from_hex(&["#fff", "#000", "#f00"]).unwrap()
	}

	#[test]
	fn test_color_hex() {
		assert_eq!(Color::from_hex("#fff").unwrap(), Color::rgb(255, 255, 255));
		assert_eq!(Color::from_hex("00ff80").unwrap(), Color::rgb(0, 255, 128));
		assert_eq!(Color::rgb(255, 0, 16).to_hex(), "#ff0010");
		assert!(Color::from_hex("#12").is_err());
		assert!(Color::from_hex("#gggggg").is_err());
	}

	#[test]
	fn test_one_based_lookup() {
		let palette = sample();
		assert_eq!(palette.color_at(0), None);
		assert_eq!(palette.color_at(1), Some(Color::rgb(255, 255, 255)));
		assert_eq!(palette.color_at(3), Some(Color::rgb(255, 0, 0)));
		assert_eq!(palette.color_at(4), None);
	}

	#[test]
	fn test_ephemeral_lookup_continues_main() {
		let mut palette = sample();
		palette.move_to_ephemeral(1).unwrap();
		assert_eq!(palette.main().len(), 2);
		assert_eq!(palette.color_at(3), Some(Color::rgb(255, 255, 255)));
		assert_eq!(palette.index_of(Color::rgb(255, 255, 255)), Some(3));
	}

	#[test]
	fn test_nearest_prefers_lowest_index_on_tie() {
		let palette = Palette::from_colors(vec![Color::rgb(10, 0, 0), Color::rgb(0, 0, 0), Color::rgb(10, 0, 0)]);
		assert_eq!(palette.nearest(Color::rgb(9, 0, 0)), Some(1));
		assert_eq!(palette.nearest(Color::rgb(1, 0, 0)), Some(2));
		assert_eq!(Palette::new().nearest(Color::rgb(1, 2, 3)), None);
	}

	#[test]
	fn test_push_keeps_existing_indices() {
		let mut palette = sample();
		palette.move_to_ephemeral(3).unwrap();
		let red = palette.index_of(Color::rgb(255, 0, 0));
		assert_eq!(palette.push(Color::rgb(0, 0, 255)), Some(4));
		assert_eq!(palette.index_of(Color::rgb(255, 0, 0)), red);
	}

	#[test]
	fn test_push_full() {
		let mut palette = Palette::from_colors(vec![Color::rgb(1, 1, 1); 300]);
		assert_eq!(palette.len(), Palette::MAX_COLORS);
		assert_eq!(palette.push(Color::rgb(2, 2, 2)), None);
	}

	#[test]
	fn test_structural_edits_report_changes() {
		let mut palette = sample();
		assert_eq!(
			palette.move_color(1, 3),
			Some(PaletteChange::Reorder {
				from: 1,
				to: 3
			})
		);
		assert_eq!(palette.color_at(3), Some(Color::rgb(255, 255, 255)));
		assert_eq!(palette.move_color(2, 2), None);
		assert_eq!(palette.remove_color(9), None);
		assert_eq!(
			palette.insert_color(4, Color::rgb(0, 0, 255)),
			Some(PaletteChange::Insert {
				index: 4
			})
		);
		assert_eq!(palette.len(), 4);
	}
}
