//! Playback engine.
//!
//! A two-state machine (`Stopped`, `Playing`) that advances the current frame
//! according to each frame's own duration. The host drives it cooperatively:
//! it calls [`PlaybackEngine::tick`] whenever it gets control back, and may
//! use [`PlaybackEngine::next_deadline`] to re-arm its timer. Time is passed
//! in, so `stop()` takes effect immediately: a stopped engine never advances.
//!
//! The advance window is the whole timeline in [`PlaybackMode::All`], or the
//! active tag's range in [`PlaybackMode::Tag`] (the whole timeline again if
//! the tag no longer exists). Advancing past the window's end wraps to its
//! start.

use std::{
	fmt,
	time::{Duration, Instant},
};

use log::trace;

use crate::{
	ids::{FrameId, TagId},
	tag::{self, FrameTag},
	timeline::Frame,
};

/// Range constraint for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
	/// Loop over every frame
	#[default]
	All,
	/// Loop inside one tag
	Tag(TagId),
}

impl PlaybackMode {
	/// Active tag, if any.
	pub fn tag(self) -> Option<TagId> {
		match self {
			Self::All => None,
			Self::Tag(id) => Some(id),
		}
	}
}

/// Snapshot of the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
	/// Whether the engine is playing
	pub is_playing: bool,
	/// Active range constraint
	pub mode: PlaybackMode,
}

impl fmt::Display for PlaybackState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = if self.is_playing {
			"playing"
		} else {
			"stopped"
		};
		match self.mode {
			PlaybackMode::All => write!(f, "{state} (all frames)"),
			PlaybackMode::Tag(id) => write!(f, "{state} (tag {id})"),
		}
	}
}

/// Result of a tick that moved the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
	/// New current frame index
	pub index: usize,
	/// New current frame id
	pub frame: FrameId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Stopped,
	Playing {
		last_tick: Instant,
	},
}

/// Timed frame-advance state machine.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
	phase: Phase,
	mode: PlaybackMode,
}

impl Default for PlaybackEngine {
	fn default() -> Self {
		Self::new()
	}
}

impl PlaybackEngine {
	/// Creates a stopped engine in [`PlaybackMode::All`].
	pub fn new() -> Self {
		Self {
			phase: Phase::Stopped,
			mode: PlaybackMode::All,
		}
	}

	/// Starts playing, timing from `now`. No-op while already playing.
	pub fn start(&mut self, now: Instant) {
		if matches!(self.phase, Phase::Stopped) {
			self.phase = Phase::Playing {
				last_tick: now,
			};
		}
	}

	/// Stops playing. No further tick advances until the next start.
	pub fn stop(&mut self) {
		self.phase = Phase::Stopped;
	}

	/// Flips between playing and stopped.
	pub fn toggle(&mut self, now: Instant) {
		match self.phase {
			Phase::Stopped => self.start(now),
			Phase::Playing {
				..
			} => self.stop(),
		}
	}

	/// Returns true while playing.
	pub fn is_playing(&self) -> bool {
		matches!(self.phase, Phase::Playing { .. })
	}

	/// Active range constraint.
	pub fn mode(&self) -> PlaybackMode {
		self.mode
	}

	/// Sets the range constraint.
	pub fn set_mode(&mut self, mode: PlaybackMode) {
		self.mode = mode;
	}

	/// Current state.
	pub fn state(&self) -> PlaybackState {
		PlaybackState {
			is_playing: self.is_playing(),
			mode: self.mode,
		}
	}

	/// Inclusive frame-index window for the current mode.
	///
	/// `None` only when there are no frames.
	pub fn window(&self, frame_count: usize, tags: &[FrameTag]) -> Option<(usize, usize)> {
		let last = frame_count.checked_sub(1)?;
		let ranged = self
			.mode
			.tag()
			.and_then(|id| tag::find(tags, id))
			.filter(|tag| tag.start <= last)
			.map(|tag| (tag.start, tag.end.min(last)));
		Some(ranged.unwrap_or((0, last)))
	}

	/// Advances when the current frame's duration has elapsed since the last
	/// advance (or since `start`).
	pub fn tick(&mut self, now: Instant, frames: &[Frame], tags: &[FrameTag], current: usize) -> Option<Advance> {
		let Phase::Playing {
			last_tick,
		} = self.phase
		else {
			return None;
		};
		let (start, end) = self.window(frames.len(), tags)?;
		let current = current.min(frames.len() - 1);

		let elapsed = now.saturating_duration_since(last_tick);
		let due = Duration::from_millis(frames[current].duration_ms as u64);
		if elapsed < due {
			trace!("tick: {elapsed:?} of {due:?} elapsed on frame {current}");
			return None;
		}

		let next = current + 1;
		let index = if next > end || next < start {
			start
		} else {
			next
		};
		self.phase = Phase::Playing {
			last_tick: now,
		};
		trace!("tick: frame {current} -> {index} within [{start}, {end}]");

		Some(Advance {
			index,
			frame: frames[index].id,
		})
	}

	/// When the next advance is due, or `None` while stopped.
	pub fn next_deadline(&self, frames: &[Frame], current: usize) -> Option<Instant> {
		let Phase::Playing {
			last_tick,
		} = self.phase
		else {
			return None;
		};
		let frame = frames.get(current).or_else(|| frames.last())?;
		Some(last_tick + Duration::from_millis(frame.duration_ms as u64))
	}
}
