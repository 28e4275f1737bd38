//! Frame tags: named, non-overlapping ranges of frame indices.
//!
//! Tags organize the timeline and bound loop playback. All functions here are
//! plain operations over a tag list; the store owns the list.
//!
//! Invariants kept by every function:
//! - `start <= end` for each tag,
//! - no two tags overlap.
//!
//! Structural edits shift ranges:
//!
//! ```text
//! insert at i:  start >= i         -> start+1, end+1
//!               start < i <= end   -> end+1
//! delete at k:  start > k          -> start-1, end-1
//!               start <= k <= end  -> end-1 (dropped if end < start)
//! ```

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{ids::TagId, palette::Color};

/// Named frame range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTag {
	/// Tag identifier
	pub id: TagId,
	/// Display name
	pub name: String,
	/// Display colour
	pub color: Color,
	/// First frame index (inclusive)
	pub start: usize,
	/// Last frame index (inclusive)
	pub end: usize,
	/// Collapsed in the timeline
	pub collapsed: bool,
}

impl FrameTag {
	/// Returns true if the tag's range contains `frame_index`.
	pub fn contains(&self, frame_index: usize) -> bool {
		self.start <= frame_index && frame_index <= self.end
	}

	/// Number of frames covered.
	pub fn len(&self) -> usize {
		self.end - self.start + 1
	}

	/// Always false; a tag covers at least one frame.
	pub fn is_empty(&self) -> bool {
		false
	}
}

impl fmt::Display for FrameTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} [{}..={}]", self.name, self.start, self.end)
	}
}

/// Partial update of a tag; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
	/// New name
	pub name: Option<String>,
	/// New colour
	pub color: Option<Color>,
	/// New start index
	pub start: Option<usize>,
	/// New end index
	pub end: Option<usize>,
	/// New collapsed flag
	pub collapsed: Option<bool>,
}

impl TagUpdate {
	/// Update that only moves the range.
	pub fn range(start: usize, end: usize) -> Self {
		Self {
			start: Some(start),
			end: Some(end),
			..Self::default()
		}
	}
}

/// Returns true if `[start, end]` overlaps any tag other than `exclude`.
pub fn has_overlap(tags: &[FrameTag], start: usize, end: usize, exclude: Option<TagId>) -> bool {
	tags.iter().filter(|tag| Some(tag.id) != exclude).any(|tag| start <= tag.end && end >= tag.start)
}

/// Looks up a tag by id.
pub fn find(tags: &[FrameTag], id: TagId) -> Option<&FrameTag> {
	tags.iter().find(|tag| tag.id == id)
}

/// Looks up a tag by id for modification.
pub fn find_mut(tags: &mut [FrameTag], id: TagId) -> Option<&mut FrameTag> {
	tags.iter_mut().find(|tag| tag.id == id)
}

/// Adds a tag.
///
/// Rejected with `None` (list unchanged) if the range is inverted or overlaps
/// an existing tag.
pub fn add(tags: &mut Vec<FrameTag>, name: impl Into<String>, color: Color, start: usize, end: usize) -> Option<TagId> {
	if start > end || has_overlap(tags, start, end, None) {
		debug!("tag add rejected: [{start}, {end}]");
		return None;
	}

	let id = TagId::generate();
	tags.push(FrameTag {
		id,
		name: name.into(),
		color,
		start,
		end,
		collapsed: false,
	});
	Some(id)
}

/// Applies a partial update.
///
/// Returns false if the tag is unknown or the merged range is inverted or
/// overlaps another tag; the list is unchanged in that case.
pub fn update(tags: &mut [FrameTag], id: TagId, changes: TagUpdate) -> bool {
	let Some(current) = find(tags, id) else {
		return false;
	};
	let start = changes.start.unwrap_or(current.start);
	let end = changes.end.unwrap_or(current.end);
	if start > end || has_overlap(tags, start, end, Some(id)) {
		debug!("tag update rejected: {id} -> [{start}, {end}]");
		return false;
	}

	let Some(tag) = find_mut(tags, id) else {
		return false;
	};
	tag.start = start;
	tag.end = end;
	if let Some(name) = changes.name {
		tag.name = name;
	}
	if let Some(color) = changes.color {
		tag.color = color;
	}
	if let Some(collapsed) = changes.collapsed {
		tag.collapsed = collapsed;
	}
	true
}

/// Flips the collapsed flag. Returns false for an unknown id.
pub fn toggle_collapsed(tags: &mut [FrameTag], id: TagId) -> bool {
	match find_mut(tags, id) {
		Some(tag) => {
			tag.collapsed = !tag.collapsed;
			true
		}
		None => false,
	}
}

/// Removes a tag. Returns false for an unknown id.
pub fn remove(tags: &mut Vec<FrameTag>, id: TagId) -> bool {
	let before = tags.len();
	tags.retain(|tag| tag.id != id);
	tags.len() != before
}

/// Shifts tags for a frame inserted at `insert_index`.
pub fn adjust_for_insert(tags: &mut [FrameTag], insert_index: usize) {
	for tag in tags {
		if tag.start >= insert_index {
			tag.start += 1;
			tag.end += 1;
		} else if insert_index <= tag.end {
			tag.end += 1;
		}
	}
}

/// Shifts tags for the frame deleted at `delete_index`, dropping tags that no
/// longer cover any frame.
pub fn adjust_for_delete(tags: &mut Vec<FrameTag>, delete_index: usize) {
	tags.retain_mut(|tag| {
		if tag.start > delete_index {
			tag.start -= 1;
			tag.end -= 1;
			return true;
		}
		if tag.end < delete_index {
			return true;
		}

		match tag.end.checked_sub(1) {
			Some(end) if end >= tag.start => {
				tag.end = end;
				true
			}
			_ => {
				debug!("tag {} dropped with frame {delete_index}", tag.name);
				false
			}
		}
	});
}

/// All tags containing `frame_index`.
pub fn tags_for_frame(tags: &[FrameTag], frame_index: usize) -> Vec<&FrameTag> {
	tags.iter().filter(|tag| tag.contains(frame_index)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn red() -> Color {
		Color::rgb(255, 0, 0)
	}

	fn ranges(tags: &[FrameTag]) -> Vec<(usize, usize)> {
		tags.iter().map(|t| (t.start, t.end)).collect()
	}

	fn no_overlaps(tags: &[FrameTag]) -> bool {
		tags.iter().enumerate().all(|(i, a)| tags.iter().skip(i + 1).all(|b| a.end < b.start || b.end < a.start))
	}

	#[test]
	fn test_overlap_detection() {
		let mut tags = Vec::new();
		let id = add(&mut tags, "walk", red(), 2, 4).unwrap();

		assert!(has_overlap(&tags, 4, 6, None));
		assert!(has_overlap(&tags, 0, 2, None));
		assert!(!has_overlap(&tags, 5, 6, None));
		assert!(!has_overlap(&tags, 3, 3, Some(id)));
	}

	#[test]
	fn test_add_rejects_overlap_and_inversion() {
		let mut tags = Vec::new();
		add(&mut tags, "a", red(), 0, 3).unwrap();
		assert_eq!(add(&mut tags, "b", red(), 3, 5), None);
		assert_eq!(add(&mut tags, "c", red(), 6, 5), None);
		assert!(add(&mut tags, "d", red(), 4, 5).is_some());
		assert_eq!(tags.len(), 2);
	}

	#[test]
	fn test_update_merges_partial_fields() {
		let mut tags = Vec::new();
		let a = add(&mut tags, "a", red(), 0, 1).unwrap();
		let b = add(&mut tags, "b", red(), 4, 6).unwrap();

		assert!(!update(&mut tags, a, TagUpdate::range(0, 4)));
		assert!(!update(
			&mut tags,
			b,
			TagUpdate {
				start: Some(7),
				..TagUpdate::default()
			}
		));
		assert!(update(
			&mut tags,
			a,
			TagUpdate {
				end: Some(3),
				name: Some("run".into()),
				..TagUpdate::default()
			}
		));

		let tag = find(&tags, a).unwrap();
		assert_eq!((tag.start, tag.end, tag.name.as_str()), (0, 3, "run"));
		assert!(!update(&mut tags, TagId::from_raw(0), TagUpdate::default()));
	}

	#[test]
	fn test_non_overlap_invariant_under_sequences() {
		let mut tags = Vec::new();
		let mut ids = Vec::new();
		for i in 0..40usize {
			let start = (i * 7) % 23;
			let end = start + (i % 4);
			if let Some(id) = add(&mut tags, format!("t{i}"), red(), start, end) {
				ids.push(id);
			}
			if let Some(&id) = ids.get(i % ids.len().max(1)) {
				update(&mut tags, id, TagUpdate::range((i * 5) % 19, (i * 5) % 19 + i % 3));
			}
			assert!(no_overlaps(&tags), "overlap after step {i}: {:?}", ranges(&tags));
		}
	}

	#[test]
	fn test_toggle_and_remove() {
		let mut tags = Vec::new();
		let id = add(&mut tags, "a", red(), 0, 0).unwrap();
		assert!(toggle_collapsed(&mut tags, id));
		assert!(tags[0].collapsed);
		assert!(remove(&mut tags, id));
		assert!(!remove(&mut tags, id));
		assert!(!toggle_collapsed(&mut tags, id));
	}

	#[test]
	fn test_adjust_for_insert() {
		let mut tags = Vec::new();
		add(&mut tags, "before", red(), 0, 1).unwrap();
		add(&mut tags, "straddle", red(), 2, 4).unwrap();
		add(&mut tags, "after", red(), 5, 6).unwrap();

		adjust_for_insert(&mut tags, 3);
		assert_eq!(ranges(&tags), vec![(0, 1), (2, 5), (6, 7)]);

		adjust_for_insert(&mut tags, 2);
		assert_eq!(ranges(&tags), vec![(0, 1), (3, 6), (7, 8)]);
	}

	#[test]
	fn test_adjust_for_delete() {
		let mut tags = Vec::new();
		add(&mut tags, "before", red(), 0, 1).unwrap();
		add(&mut tags, "straddle", red(), 2, 4).unwrap();
		add(&mut tags, "after", red(), 5, 6).unwrap();

		adjust_for_delete(&mut tags, 3);
		assert_eq!(ranges(&tags), vec![(0, 1), (2, 3), (4, 5)]);

		adjust_for_delete(&mut tags, 2);
		assert_eq!(ranges(&tags), vec![(0, 1), (2, 2), (3, 4)]);
	}

	#[test]
	fn test_single_frame_tag_dropped_on_delete() {
		let mut tags = Vec::new();
		add(&mut tags, "blink", red(), 2, 2).unwrap();
		add(&mut tags, "first", red(), 0, 0).unwrap();

		adjust_for_delete(&mut tags, 2);
		assert_eq!(ranges(&tags), vec![(0, 0)]);

		adjust_for_delete(&mut tags, 0);
		assert!(tags.is_empty());
	}

	#[test]
	fn test_tags_for_frame() {
		let mut tags = Vec::new();
		add(&mut tags, "a", red(), 0, 2).unwrap();
		add(&mut tags, "b", red(), 3, 3).unwrap();
		assert_eq!(tags_for_frame(&tags, 2).len(), 1);
		assert_eq!(tags_for_frame(&tags, 3)[0].name, "b");
		assert!(tags_for_frame(&tags, 9).is_empty());
	}
}
