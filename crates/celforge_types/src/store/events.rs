//! Store notifications.
//!
//! Observers are plain callbacks registered on the store; there is no global
//! event bus. Callbacks run synchronously right after the mutation that
//! triggered them and must not re-enter the store.

use std::fmt;

use crate::{
	ids::{CelKey, FrameId},
	playback::PlaybackState,
	sync::SyncReport,
};

/// Something observable changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
	/// Current-frame pointer moved
	CurrentFrameChanged {
		/// New current frame
		frame: FrameId,
		/// Its index in the timeline
		index: usize,
	},
	/// Frames were inserted, deleted, moved or retimed
	FramesChanged,
	/// Layers were added or removed
	LayersChanged,
	/// Cel content, links or opacity changed
	CelsChanged(Vec<CelKey>),
	/// Tags changed
	TagsChanged,
	/// Palette changed and index buffers were synced
	PaletteSynced(SyncReport),
	/// Playback started, stopped or changed mode
	PlaybackChanged(PlaybackState),
	/// Whole project replaced from a snapshot
	Restored,
	/// Canvas dimensions changed
	CanvasResized {
		/// New width
		width: u32,
		/// New height
		height: u32,
	},
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) usize);

/// Boxed observer callback.
pub type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Ordered list of observers.
#[derive(Default)]
pub(crate) struct Observers {
	next_id: usize,
	entries: Vec<(ObserverId, Observer)>,
}

impl Observers {
	pub(crate) fn subscribe(&mut self, observer: Observer) -> ObserverId {
		let id = ObserverId(self.next_id);
		self.next_id += 1;
		self.entries.push((id, observer));
		id
	}

	pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
		let before = self.entries.len();
		self.entries.retain(|(entry, _)| *entry != id);
		self.entries.len() != before
	}

	pub(crate) fn emit(&mut self, event: &StoreEvent) {
		for (_, observer) in &mut self.entries {
			observer(event);
		}
	}
}

impl fmt::Debug for Observers {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Observers({})", self.entries.len())
	}
}
