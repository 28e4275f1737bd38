//! Benchmark helper utilities for celforge
//!
//! This module provides synthetic projects and buffers for the benchmark
//! suite: seeded random index buffers, palettes of a given size and stores
//! with many cels, part of them aliased through link groups.

use celforge_types::prelude::*;
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Seed used by every generator so runs are comparable
pub const SEED: u64 = 0x00C3_1F09;

/// Generates a palette of `count` distinct opaque colours.
pub fn generate_palette(count: usize) -> Palette {
	let colors = (0..count.min(Palette::MAX_COLORS))
		.map(|i| {
			let i = i as u8;
			Color::rgb(i, i.wrapping_mul(3), i.wrapping_mul(7))
		})
		.collect();
	Palette::from_colors(colors)
}

/// Generates a random index buffer of `width * height` entries in `0..=colors`.
///
/// Roughly a quarter of the pixels are transparent, as in typical sprite art.
pub fn generate_indices(width: u32, height: u32, colors: u8, rng: &mut SmallRng) -> Vec<u8> {
	(0..width as usize * height as usize)
		.map(|_| {
			if rng.random_bool(0.25) {
				0
			} else {
				rng.random_range(1..=colors.max(1))
			}
		})
		.collect()
}

/// Builds a project with `layers * frames` painted cels.
///
/// Every `link_every`-th frame on each layer is hard-linked to the previous
/// one, so palette sync has shared surfaces to deduplicate.
pub fn generate_store(size: (u32, u32), layers: usize, frames: usize, link_every: usize) -> AnimationStore {
	let palette = generate_palette(Palette::MAX_COLORS);
	let colors = palette.len() as u8;
	let mut store = AnimationStore::with_palette(EngineConfig::with_canvas(size.0, size.1), palette);
	let mut rng = SmallRng::seed_from_u64(SEED);

	for i in 1..layers {
		store.add_layer(format!("Layer {}", i + 1), false);
	}
	for _ in 1..frames {
		store.add_frame(None);
	}

	let layer_ids: Vec<LayerId> = store.layers().iter().map(|layer| layer.id).collect();
	let frame_ids: Vec<FrameId> = store.frames().iter().map(|frame| frame.id).collect();
	for &layer in &layer_ids {
		for (i, &frame) in frame_ids.iter().enumerate() {
			let indices = generate_indices(size.0, size.1, colors, &mut rng);
			store.update_cel_index_buffer(layer, frame, indices);
			if link_every > 0 && i > 0 && i % link_every == 0 {
				let previous = frame_ids[i - 1];
				store.link_cels(&[CelKey::new(layer, previous), CelKey::new(layer, frame)], LinkType::Hard);
			}
		}
	}

	store
}

/// Common benchmark sizes for synthetic test data
pub mod sizes {
	/// Icon: 16x16 (256 pixels)
	pub const ICON: (u32, u32) = (16, 16);
	/// Sprite: 64x64 (4,096 pixels)
	pub const SPRITE: (u32, u32) = (64, 64);
	/// Scene: 320x240 (76,800 pixels)
	pub const SCENE: (u32, u32) = (320, 240);
	/// Large canvas: 1024x768 (786,432 pixels)
	pub const LARGE: (u32, u32) = (1024, 768);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generate_palette() {
		assert_eq!(generate_palette(16).len(), 16);
		assert_eq!(generate_palette(1000).len(), Palette::MAX_COLORS);
	}

	#[test]
	fn test_generate_indices_in_range() {
		let mut rng = SmallRng::seed_from_u64(SEED);
		let indices = generate_indices(32, 8, 12, &mut rng);
		assert_eq!(indices.len(), 256);
		assert!(indices.iter().all(|&i| i <= 12));
		assert!(indices.contains(&0));
	}

	#[test]
	fn test_generate_store() {
		let store = generate_store(sizes::ICON, 2, 4, 2);
		assert_eq!(store.layers().len(), 2);
		assert_eq!(store.frames().len(), 4);
		assert!(store.cels().all(|cel| cel.has_indices() && !cel.is_empty_sentinel()));
		assert_eq!(store.cels().filter(|cel| cel.is_linked()).count(), 4);
	}
}
