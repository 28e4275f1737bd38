//! Frames and layers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{FrameId, LayerId};

/// Default display duration of a frame in milliseconds
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// Animation frame.
///
/// `order` is the frame's position in the timeline; the store keeps it dense
/// (`0..n`) after every structural edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
	/// Frame identifier
	pub id: FrameId,
	/// Position in the timeline
	pub order: usize,
	/// Display duration in milliseconds
	pub duration_ms: u32,
}

impl Frame {
	/// Creates a frame with a fresh id.
	pub fn new(order: usize, duration_ms: u32) -> Self {
		Self {
			id: FrameId::generate(),
			order,
			duration_ms,
		}
	}
}

impl fmt::Display for Frame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Frame #{} ({} ms)", self.order, self.duration_ms)
	}
}

/// Renumbers `order` to match slice positions.
pub fn reorder(frames: &mut [Frame]) {
	for (order, frame) in frames.iter_mut().enumerate() {
		frame.order = order;
	}
}

/// Layer summary.
///
/// A `continuous` layer links the cels of newly inserted frames to their
/// neighbour with a hard link, so the layer looks the same across frames
/// until explicitly unlinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
	/// Layer identifier
	pub id: LayerId,
	/// Display name
	pub name: String,
	/// Whether new frames hard-link to their neighbour
	pub continuous: bool,
}

impl Layer {
	/// Creates a layer with a fresh id.
	pub fn new(name: impl Into<String>, continuous: bool) -> Self {
		Self {
			id: LayerId::generate(),
			name: name.into(),
			continuous,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_reorder_is_dense() {
		let mut frames = vec![Frame::new(4, 100), Frame::new(9, 50), Frame::new(2, 10)];
		reorder(&mut frames);
		assert_eq!(frames.iter().map(|f| f.order).collect::<Vec<_>>(), vec![0, 1, 2]);
		assert_eq!(frames[1].duration_ms, 50);
	}
}
