//! Palette sync.
//!
//! Keeps every index buffer consistent with the palette after a structural
//! palette mutation, then rebuilds the RGBA buffers from the remapped
//! indices. Each change is expressed as a 256-entry index map applied to
//! every surface that carries an index buffer.
//!
//! | Change            | Remap                                                    |
//! |-------------------|----------------------------------------------------------|
//! | `Reorder`         | `from -> to`, the span between shifts by one toward `from` |
//! | `Remove`          | `index -> 1`, `> index` shift down                       |
//! | `MoveToEphemeral` | `index -> new_index`, `> index` shift down               |
//! | `Insert`          | `>= index` shift up                                      |
//! | `Replace`         | old index -> old colour -> new index, unmatched kept     |
//! | `Rebuild`         | none                                                     |
//!
//! Index 0 is never touched. Surfaces aliased by several cels are processed
//! once.

use std::{collections::HashSet, rc::Rc};

use log::{debug, warn};

use crate::{
	cel::CelMap,
	codec,
	palette::{Color, Palette},
	surface::{CelStorage, Surface},
};

/// Structural palette mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteChange {
	/// Colour moved from `from` to `to`
	Reorder {
		/// Original index
		from: u8,
		/// Destination index
		to: u8,
	},
	/// Main colour removed
	Remove {
		/// Removed index
		index: u8,
	},
	/// Main colour moved into the ephemeral region
	MoveToEphemeral {
		/// Removed main index
		index: u8,
		/// Index of the colour in the ephemeral region after the move
		new_index: u8,
	},
	/// Colour inserted
	Insert {
		/// Inserted index
		index: u8,
	},
	/// Both regions replaced
	Replace {
		/// Main colours before the replacement
		old_main: Vec<Color>,
		/// Ephemeral colours before the replacement
		old_ephemeral: Vec<Color>,
	},
	/// Palette replaced without remapping; RGBA is rebuilt blindly
	Rebuild,
}

impl PaletteChange {
	/// Builds the index map for this change.
	///
	/// `palette` is the palette after the change; only `Replace` consults it.
	/// `Rebuild` has no map.
	pub fn index_map(&self, palette: &Palette) -> Option<[u8; 256]> {
		let mut map: [u8; 256] = std::array::from_fn(|i| i as u8);

		match self {
			Self::Reorder {
				from,
				to,
			} => {
				let (from, to) = (*from as usize, *to as usize);
				if from == 0 || to == 0 {
					return Some(map);
				}
				if from < to {
					for i in from + 1..=to {
						map[i] = (i - 1) as u8;
					}
				} else {
					for i in to..from {
						map[i] = (i + 1) as u8;
					}
				}
				map[from] = to as u8;
			}
			Self::Remove {
				index: 0,
			}
			| Self::MoveToEphemeral {
				index: 0,
				..
			} => {}
			Self::Remove {
				index,
			} => {
				shift_down_above(&mut map, *index);
				map[*index as usize] = 1;
			}
			Self::MoveToEphemeral {
				index,
				new_index,
			} => {
				shift_down_above(&mut map, *index);
				map[*index as usize] = *new_index;
			}
			Self::Insert {
				index,
			} => {
				for i in (*index).max(1) as usize..255 {
					map[i] = (i + 1) as u8;
				}
			}
			Self::Replace {
				old_main,
				old_ephemeral,
			} => {
				for (slot, color) in old_main.iter().chain(old_ephemeral).enumerate().take(Palette::MAX_COLORS) {
					let old_index = slot + 1;
					if let Some(new_index) = palette.index_of(*color) {
						map[old_index] = new_index;
					}
				}
			}
			Self::Rebuild => return None,
		}

		Some(map)
	}

	/// Remaps a single index buffer in place.
	pub fn remap(&self, indices: &mut [u8], palette: &Palette) {
		if let Some(map) = self.index_map(palette) {
			apply_map(indices, &map);
		}
	}
}

fn shift_down_above(map: &mut [u8; 256], index: u8) {
	for i in index as usize + 1..256 {
		map[i] = (i - 1) as u8;
	}
}

fn apply_map(indices: &mut [u8], map: &[u8; 256]) {
	for index in indices {
		*index = map[*index as usize];
	}
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
	/// Distinct surfaces whose index buffer was remapped
	pub remapped: usize,
	/// Distinct surfaces whose RGBA buffer was rebuilt
	pub rebuilt: usize,
	/// Surfaces skipped because of a dimension mismatch
	pub mismatched: usize,
}

/// Applies `change` to every cel and rebuilds RGBA with `palette`.
///
/// `palette` must already reflect the change.
pub fn apply(cels: &mut CelMap, change: &PaletteChange, palette: &Palette) -> SyncReport {
	let map = change.index_map(palette);
	let mut report = SyncReport::default();
	let mut visited = HashSet::new();

	for cel in cels.values_mut() {
		if let CelStorage::Shared {
			surface,
			..
		} = &cel.storage
			&& !visited.insert(Rc::as_ptr(surface))
		{
			continue;
		}

		let key = cel.key();
		let mut surface = cel.surface_mut();
		sync_surface(&mut surface, map.as_ref(), palette, &mut report, || key.to_string());
	}

	debug!("palette sync {change:?}: {report:?}");
	report
}

/// Applies `change` to a single surface outside of any cel map.
pub fn apply_to_surface(surface: &mut Surface, change: &PaletteChange, palette: &Palette) -> SyncReport {
	let mut report = SyncReport::default();
	sync_surface(surface, change.index_map(palette).as_ref(), palette, &mut report, || "surface".to_string());
	report
}

fn sync_surface<F>(surface: &mut Surface, map: Option<&[u8; 256]>, palette: &Palette, report: &mut SyncReport, describe: F)
where
	F: FnOnce() -> String,
{
	let Some(indices) = surface.indices.as_mut() else {
		return;
	};

	if let Some(map) = map {
		apply_map(indices, map);
		report.remapped += 1;
	}

	match codec::rebuild_surface(surface, palette) {
		Ok(_) => report.rebuilt += 1,
		Err(err) => {
			warn!("skipping RGBA rebuild of {}: {err}", describe());
			report.mismatched += 1;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn remapped(change: &PaletteChange, buffer: &[u8]) -> Vec<u8> {
		let mut out = buffer.to_vec();
		change.remap(&mut out, &Palette::new());
		out
	}

	#[test]
	fn test_reorder_forward() {
		let change = PaletteChange::Reorder {
			from: 1,
			to: 3,
		};
		assert_eq!(remapped(&change, &[0, 1, 3, 2]), vec![0, 3, 2, 1]);
	}

	#[test]
	fn test_reorder_backward() {
		let change = PaletteChange::Reorder {
			from: 4,
			to: 2,
		};
		assert_eq!(remapped(&change, &[0, 1, 2, 3, 4, 5]), vec![0, 1, 3, 4, 2, 5]);
	}

	#[test]
	fn test_reorder_idempotence() {
		let original: Vec<u8> = (0..=255).collect();
		for (a, b) in [(1u8, 3u8), (7, 2), (1, 255), (200, 13)] {
			let forward = remapped(&PaletteChange::Reorder { from: a, to: b }, &original);
			let back = remapped(&PaletteChange::Reorder { from: b, to: a }, &forward);
			assert_eq!(back, original, "reorder({a},{b}) then reorder({b},{a})");
		}
	}

	#[test]
	fn test_remove() {
		let change = PaletteChange::Remove {
			index: 2,
		};
		assert_eq!(remapped(&change, &[0, 1, 2, 3]), vec![0, 1, 1, 2]);
	}

	#[test]
	fn test_move_to_ephemeral() {
		let change = PaletteChange::MoveToEphemeral {
			index: 2,
			new_index: 5,
		};
		assert_eq!(remapped(&change, &[0, 1, 2, 3, 6]), vec![0, 1, 5, 2, 5]);
	}

	#[test]
	fn test_insert_saturates() {
		let change = PaletteChange::Insert {
			index: 2,
		};
		assert_eq!(remapped(&change, &[0, 1, 2, 3, 255]), vec![0, 1, 3, 4, 255]);
	}

	#[test]
	fn test_replace_maps_by_color() {
		let old = Palette::from_hex(&["#fff", "#000", "#f00"]).unwrap();
		let mut palette = old.clone();
		let change = palette.replace(Palette::from_hex(&["#f00", "#fff"]).unwrap().main().to_vec(), Vec::new()).unwrap();

		let mut indices = vec![0, 1, 2, 3];
		change.remap(&mut indices, &palette);
		// known edge case: black has no counterpart and keeps its numeric index,
		// which now resolves to white
		assert_eq!(indices, vec![0, 2, 2, 1]);
	}

	#[test]
	fn test_rebuild_has_no_map() {
		assert!(PaletteChange::Rebuild.index_map(&Palette::new()).is_none());
		assert_eq!(remapped(&PaletteChange::Rebuild, &[3, 2, 1]), vec![3, 2, 1]);
	}

	#[test]
	fn test_apply_to_surface_rebuilds_rgba() {
		let mut palette = Palette::from_hex(&["#fff", "#000", "#f00"]).unwrap();
		let mut surface = Surface::blank(2, 1);
		surface.set_index(0, 0, 3);
		codec::rebuild_surface(&mut surface, &palette).unwrap();

		let change = palette.remove_color(1).unwrap();
		let report = apply_to_surface(&mut surface, &change, &palette);

		assert_eq!(surface.index_at(0, 0), Some(2));
		assert_eq!(surface.pixels.get_pixel(0, 0), Some([255, 0, 0, 255]));
		assert_eq!(
			report,
			SyncReport {
				remapped: 1,
				rebuilt: 1,
				mismatched: 0
			}
		);
	}

	#[test]
	fn test_mismatched_surface_is_left_untouched() {
		let palette = Palette::from_hex(&["#fff"]).unwrap();
		let mut surface = Surface::blank(2, 2);
		surface.indices = Some(vec![1, 1, 1]);
		let report = apply_to_surface(&mut surface, &PaletteChange::Rebuild, &palette);
		assert_eq!(report.mismatched, 1);
		assert_eq!(surface.pixels.get_pixel(0, 0), Some([0, 0, 0, 0]));
	}
}
