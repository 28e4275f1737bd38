//! Animation store.
//!
//! [`AnimationStore`] is the single owner of a project: frames, layers, cels,
//! tags, the palette, playback state, the current frame, the cel selection
//! and the shared empty surface. Every structural edit goes through it so
//! that the cross-cutting invariants hold after each call:
//!
//! - every (layer, frame) pair has exactly one cel,
//! - frame orders are dense,
//! - link groups with a single member are dissolved,
//! - tags stay inside the timeline and never overlap,
//! - index buffers agree with the palette.
//!
//! Drawing goes through the copy-on-write gate ([`AnimationStore::edit_cel`]
//! or [`AnimationStore::ensure_unlinked_for_edit`]); there is no other path
//! to a mutable surface.
//!
//! # Examples
//!
//! ```
//! use celforge_types::prelude::*;
//!
//! let mut store = AnimationStore::new(EngineConfig::with_canvas(8, 8));
//! let layer = store.layers()[0].id;
//! let first = store.current_frame();
//! let second = store.add_frame(None);
//!
//! store.link_cels(&[CelKey::new(layer, first), CelKey::new(layer, second)], LinkType::Soft);
//! store.edit_cel(layer, first, |surface| surface.set_index(0, 0, 1));
//!
//! // the soft link forked, the second frame is untouched
//! assert_eq!(store.cel(layer, second).unwrap().surface().index_at(0, 0), Some(0));
//! ```

mod events;
mod snapshot;


use std::{
	cell::RefCell,
	collections::{BTreeSet, HashSet},
	rc::Rc,
	time::Instant,
};

use log::{debug, warn};

pub use events::{Observer, ObserverId, StoreEvent};
pub use snapshot::{CelRecord, ProjectSnapshot, SurfaceRecord};

use crate::{
	cel::{Cel, CelMap},
	codec::{self, MissingColor},
	config::EngineConfig,
	error::CelError,
	ids::{CelKey, FrameId, LayerId, LinkId, TagId},
	link,
	palette::{Color, Palette},
	playback::{PlaybackEngine, PlaybackMode, PlaybackState},
	surface::{CelStorage, LinkType, SharedSurface, Surface},
	sync::{self, PaletteChange, SyncReport},
	tag::{self, FrameTag, TagUpdate},
	timeline::{self, Frame, Layer},
};

use events::Observers;

/// Owner of all project state.
#[derive(Debug)]
pub struct AnimationStore {
	config: EngineConfig,
	width: u32,
	height: u32,
	frames: Vec<Frame>,
	layers: Vec<Layer>,
	cels: CelMap,
	tags: Vec<FrameTag>,
	palette: Palette,
	playback: PlaybackEngine,
	current: FrameId,
	selection: BTreeSet<CelKey>,
	empty: SharedSurface,
	observers: Observers,
}

impl Default for AnimationStore {
	fn default() -> Self {
		Self::new(EngineConfig::default())
	}
}

impl AnimationStore {
	/// Creates a project with one frame, one layer and an empty palette.
	pub fn new(config: EngineConfig) -> Self {
		Self::with_palette(config, Palette::new())
	}

	/// Creates a project with one frame, one layer and the given palette.
	pub fn with_palette(config: EngineConfig, palette: Palette) -> Self {
		let width = config.canvas_width.max(1);
		let height = config.canvas_height.max(1);
		let frame = Frame::new(0, config.default_frame_duration_ms.max(1));
		let layer = Layer::new("Layer 1", false);
		let key = CelKey::new(layer.id, frame.id);

		let mut store = Self {
			config,
			width,
			height,
			frames: vec![frame],
			layers: vec![layer],
			cels: CelMap::new(),
			tags: Vec::new(),
			palette,
			playback: PlaybackEngine::new(),
			current: frame.id,
			selection: BTreeSet::new(),
			empty: Rc::new(RefCell::new(Surface::blank(width, height))),
			observers: Observers::default(),
		};
		let cel = store.empty_cel(key);
		store.cels.insert(key, cel);
		store
	}

	/// Settings the store was created with.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Canvas width in pixels.
	pub fn width(&self) -> u32 {
		self.width
	}

	/// Canvas height in pixels.
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Frames in timeline order.
	pub fn frames(&self) -> &[Frame] {
		&self.frames
	}

	/// Layers, bottom first.
	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}

	/// Tags in insertion order.
	pub fn tags(&self) -> &[FrameTag] {
		&self.tags
	}

	/// Current palette.
	pub fn palette(&self) -> &Palette {
		&self.palette
	}

	/// All cels in key order.
	pub fn cels(&self) -> impl Iterator<Item = &Cel> {
		self.cels.values()
	}

	/// Looks up a frame by id.
	pub fn frame(&self, id: FrameId) -> Option<&Frame> {
		self.frames.iter().find(|frame| frame.id == id)
	}

	/// Timeline index of a frame.
	pub fn frame_index(&self, id: FrameId) -> Option<usize> {
		self.frames.iter().position(|frame| frame.id == id)
	}

	/// Looks up a layer by id.
	pub fn layer(&self, id: LayerId) -> Option<&Layer> {
		self.layers.iter().find(|layer| layer.id == id)
	}

	/// Registers an observer. Observers are called in subscription order.
	pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
	where
		F: FnMut(&StoreEvent) + 'static,
	{
		self.observers.subscribe(Box::new(observer))
	}

	/// Removes an observer. Returns false for an unknown id.
	pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
		self.observers.unsubscribe(id)
	}

	fn emit(&mut self, event: StoreEvent) {
		self.observers.emit(&event);
	}

	fn sentinel_storage(&self) -> CelStorage {
		CelStorage::Shared {
			link: LinkId::Empty,
			kind: LinkType::Soft,
			surface: Rc::clone(&self.empty),
		}
	}

	fn empty_cel(&self, key: CelKey) -> Cel {
		Cel::with_storage(key, self.sentinel_storage())
	}

	fn layer_flags(&self) -> Vec<(LayerId, bool)> {
		self.layers.iter().map(|layer| (layer.id, layer.continuous)).collect()
	}

	/// Removes the matching cels and dissolves groups they leave behind.
	fn remove_cels<F>(&mut self, doomed: F)
	where
		F: Fn(&CelKey) -> bool,
	{
		let mut links = HashSet::new();
		self.cels.retain(|key, cel| {
			if !doomed(key) {
				return true;
			}
			if let Some(link) = cel.link() {
				links.insert(link);
			}
			false
		});
		self.selection.retain(|key| !doomed(key));

		for link in links {
			link::normalize_group(&mut self.cels, link);
		}
	}

	/// Keys reached by an edit of `key`: the whole group for hard links.
	fn affected_keys(&self, key: CelKey) -> Vec<CelKey> {
		match self.cels.get(&key).and_then(|cel| cel.link()) {
			Some(link) if !link.is_empty_sentinel() => link::group_members(&self.cels, link),
			_ => vec![key],
		}
	}

	// Text lives beside the surface, so every cel aliasing it must agree.
	fn set_group_text(&mut self, key: CelKey, text: Option<String>) -> Vec<CelKey> {
		let keys = self.affected_keys(key);
		for member in &keys {
			if let Some(cel) = self.cels.get_mut(member) {
				cel.set_text(text.clone());
			}
		}
		keys
	}

	// ------------------------------------------------------------------
	// Layers
	// ------------------------------------------------------------------

	/// Adds a layer on top of the stack.
	///
	/// Cels of a regular layer start out as empty-sentinel members. A
	/// continuous layer starts with one blank surface hard-linked across all
	/// frames.
	pub fn add_layer(&mut self, name: impl Into<String>, continuous: bool) -> LayerId {
		let layer = Layer::new(name, continuous);
		let id = layer.id;
		let keys: Vec<CelKey> = self.frames.iter().map(|frame| CelKey::new(id, frame.id)).collect();

		if continuous {
			let blank = Surface::blank(self.width, self.height);
			let storage = if keys.len() > 1 {
				CelStorage::share(LinkId::generate(), LinkType::Hard, blank)
			} else {
				CelStorage::Owned(blank)
			};
			for key in keys {
				self.cels.insert(key, Cel::with_storage(key, storage.clone()));
			}
		} else {
			for key in keys {
				let cel = self.empty_cel(key);
				self.cels.insert(key, cel);
			}
		}

		debug!("added layer {id} ({}), continuous: {continuous}", layer.name);
		self.layers.push(layer);
		self.emit(StoreEvent::LayersChanged);
		id
	}

	/// Removes a layer and its cels. The last layer cannot be removed.
	pub fn remove_layer(&mut self, id: LayerId) -> bool {
		if self.layers.len() <= 1 {
			debug!("refusing to remove the last layer");
			return false;
		}
		let Some(position) = self.layers.iter().position(|layer| layer.id == id) else {
			debug!("remove_layer: unknown layer {id}");
			return false;
		};

		self.layers.remove(position);
		self.remove_cels(|key| key.layer == id);
		debug!("removed layer {id}");
		self.emit(StoreEvent::LayersChanged);
		true
	}

	// ------------------------------------------------------------------
	// Frames
	// ------------------------------------------------------------------

	/// Inserts a frame record and shifts tags; cels are left to the caller.
	fn insert_frame_record(&mut self, index: usize, duration_ms: u32) -> (usize, FrameId) {
		let index = index.min(self.frames.len());
		let frame = Frame::new(index, duration_ms.max(1));
		self.frames.insert(index, frame);
		timeline::reorder(&mut self.frames);
		tag::adjust_for_insert(&mut self.tags, index);
		(index, frame.id)
	}

	/// Inserts a blank frame at `index` (clamped to the end of the timeline).
	///
	/// Cels of continuous layers join their neighbour's group with a hard
	/// link; other layers get empty-sentinel cels. `duration_ms` defaults to
	/// the configured frame duration.
	pub fn insert_frame(&mut self, index: usize, duration_ms: Option<u32>) -> FrameId {
		let duration = duration_ms.unwrap_or(self.config.default_frame_duration_ms);
		let (index, id) = self.insert_frame_record(index, duration);
		let neighbour = index.checked_sub(1).unwrap_or(index + 1);
		let neighbour = self.frames.get(neighbour).map(|frame| frame.id);

		for (layer, continuous) in self.layer_flags() {
			let key = CelKey::new(layer, id);
			let joined = continuous
				&& neighbour
					.and_then(|neighbour| link::join_group(&mut self.cels, CelKey::new(layer, neighbour), key, LinkType::Hard))
					.is_some();
			if !joined {
				let cel = self.empty_cel(key);
				self.cels.insert(key, cel);
			}
		}

		debug!("inserted frame {id} at {index}");
		self.emit(StoreEvent::FramesChanged);
		id
	}

	/// Appends a blank frame at the end of the timeline.
	pub fn add_frame(&mut self, duration_ms: Option<u32>) -> FrameId {
		self.insert_frame(self.frames.len(), duration_ms)
	}

	/// Inserts a copy of `id` right after it.
	///
	/// With `linked` every new cel joins its source's group (a new soft group
	/// for owned sources); otherwise the content is deep-copied. Opacity and
	/// text are carried over either way.
	pub fn duplicate_frame(&mut self, id: FrameId, linked: bool) -> Option<FrameId> {
		let Some(source_index) = self.frame_index(id) else {
			debug!("duplicate_frame: unknown frame {id}");
			return None;
		};
		let duration = self.frames[source_index].duration_ms;
		let (_, copy) = self.insert_frame_record(source_index + 1, duration);

		for (layer, _) in self.layer_flags() {
			let source = CelKey::new(layer, id);
			let key = CelKey::new(layer, copy);
			let Some(cel) = self.cels.get(&source) else {
				let cel = self.empty_cel(key);
				self.cels.insert(key, cel);
				continue;
			};

			let opacity = cel.opacity();
			let text = cel.text().map(str::to_owned);
			let sentinel = cel.is_empty_sentinel();
			let copied = (!linked && !sentinel).then(|| cel.storage.clone_surface());

			if sentinel {
				let cel = self.empty_cel(key);
				self.cels.insert(key, cel);
			} else if let Some(surface) = copied {
				self.cels.insert(key, Cel::owned(key, surface));
			} else {
				link::join_group(&mut self.cels, source, key, LinkType::Soft);
			}

			if let Some(duplicate) = self.cels.get_mut(&key) {
				duplicate.set_opacity(opacity as i32);
				duplicate.set_text(text);
			}
		}

		debug!("duplicated frame {id} as {copy} (linked: {linked})");
		self.emit(StoreEvent::FramesChanged);
		Some(copy)
	}

	/// Deletes a frame and its cels. The last frame cannot be deleted.
	///
	/// Tags shift down (tags left without frames are dropped), groups that
	/// shrink to one member are dissolved and the current frame moves to the
	/// frame now at the deleted position.
	pub fn delete_frame(&mut self, id: FrameId) -> bool {
		if self.frames.len() <= 1 {
			debug!("refusing to delete the last frame");
			return false;
		}
		let Some(index) = self.frame_index(id) else {
			debug!("delete_frame: unknown frame {id}");
			return false;
		};

		self.frames.remove(index);
		timeline::reorder(&mut self.frames);
		self.remove_cels(|key| key.frame == id);
		tag::adjust_for_delete(&mut self.tags, index);

		if let PlaybackMode::Tag(active) = self.playback.mode()
			&& tag::find(&self.tags, active).is_none()
		{
			self.playback.set_mode(PlaybackMode::All);
		}

		debug!("deleted frame {id} at {index}");
		self.emit(StoreEvent::FramesChanged);

		if self.current == id {
			let index = index.min(self.frames.len() - 1);
			self.current = self.frames[index].id;
			self.emit(StoreEvent::CurrentFrameChanged {
				frame: self.current,
				index,
			});
		}
		true
	}

	/// Moves a frame to `to_index` (clamped). Tags keep their ranges.
	pub fn move_frame(&mut self, id: FrameId, to_index: usize) -> bool {
		let Some(from) = self.frame_index(id) else {
			debug!("move_frame: unknown frame {id}");
			return false;
		};
		let to = to_index.min(self.frames.len() - 1);
		if from != to {
			let frame = self.frames.remove(from);
			self.frames.insert(to, frame);
			timeline::reorder(&mut self.frames);
			debug!("moved frame {id} from {from} to {to}");
			self.emit(StoreEvent::FramesChanged);
		}
		true
	}

	/// Sets a frame's display duration (at least 1 ms).
	pub fn set_frame_duration(&mut self, id: FrameId, duration_ms: u32) -> bool {
		let Some(frame) = self.frames.iter_mut().find(|frame| frame.id == id) else {
			debug!("set_frame_duration: unknown frame {id}");
			return false;
		};
		frame.duration_ms = duration_ms.max(1);
		self.emit(StoreEvent::FramesChanged);
		true
	}

	// ------------------------------------------------------------------
	// Cels
	// ------------------------------------------------------------------

	/// Looks up a cel.
	pub fn cel(&self, layer: LayerId, frame: FrameId) -> Option<&Cel> {
		self.cels.get(&CelKey::new(layer, frame))
	}

	/// Keys of all members of a link group.
	pub fn link_group(&self, link: LinkId) -> Vec<CelKey> {
		link::group_members(&self.cels, link)
	}

	/// Copy-on-write gate; see [`link::ensure_unlinked_for_edit`].
	///
	/// `None` when the layer or frame does not exist.
	pub fn ensure_unlinked_for_edit(&mut self, layer: LayerId, frame: FrameId) -> Option<bool> {
		if self.layer(layer).is_none() || self.frame_index(frame).is_none() {
			debug!("edit gate: no cel at {layer}:{frame}");
			return None;
		}
		let (width, height) = (self.width, self.height);
		link::ensure_unlinked_for_edit(&mut self.cels, CelKey::new(layer, frame), |key| {
			Some(Cel::owned(key, Surface::blank(width, height)))
		})
	}

	/// Passes the gate, then runs `edit` on the cel's surface.
	///
	/// Edits of a hard-linked cel reach every member of its group.
	pub fn edit_cel<R, F>(&mut self, layer: LayerId, frame: FrameId, edit: F) -> Option<R>
	where
		F: FnOnce(&mut Surface) -> R,
	{
		self.ensure_unlinked_for_edit(layer, frame)?;
		let key = CelKey::new(layer, frame);
		let result = {
			let cel = self.cels.get_mut(&key)?;
			let mut surface = cel.surface_mut();
			edit(&mut *surface)
		};
		let keys = self.affected_keys(key);
		self.emit(StoreEvent::CelsChanged(keys));
		Some(result)
	}

	/// Replaces a cel's index buffer and rebuilds its RGBA from the palette.
	///
	/// The buffer must hold exactly `width * height` entries; a mismatch is
	/// logged and leaves every cel untouched.
	pub fn update_cel_index_buffer(&mut self, layer: LayerId, frame: FrameId, indices: Vec<u8>) -> bool {
		let expected = self.width as usize * self.height as usize;
		if indices.len() != expected {
			let err = CelError::DimensionMismatch {
				expected,
				actual: indices.len(),
			};
			warn!("index buffer for {layer}:{frame} rejected: {err}");
			return false;
		}
		if self.ensure_unlinked_for_edit(layer, frame).is_none() {
			return false;
		}

		let key = CelKey::new(layer, frame);
		let Some(cel) = self.cels.get_mut(&key) else {
			return false;
		};
		{
			let mut surface = cel.surface_mut();
			if let Err(err) = codec::decode_into(&indices, &self.palette, &mut surface.pixels) {
				warn!("index buffer for {key} rejected: {err}");
				return false;
			}
			surface.indices = Some(indices);
		}
		let keys = self.set_group_text(key, None);
		self.emit(StoreEvent::CelsChanged(keys));
		true
	}

	/// Re-derives a cel's index buffer from its RGBA pixels.
	///
	/// Unseen colours are appended to the palette when
	/// `append_missing_colors` is set, otherwise mapped to the nearest colour.
	/// The RGBA buffer is then rebuilt so both representations agree.
	pub fn encode_cel_pixels(&mut self, layer: LayerId, frame: FrameId) -> bool {
		if self.ensure_unlinked_for_edit(layer, frame).is_none() {
			return false;
		}

		let missing = MissingColor::from_add_missing(self.config.append_missing_colors);
		let colors_before = self.palette.len();
		let key = CelKey::new(layer, frame);
		let Some(cel) = self.cels.get_mut(&key) else {
			return false;
		};
		{
			let mut surface = cel.surface_mut();
			let indices = codec::encode_buffer(&surface.pixels, &mut self.palette, missing);
			if let Err(err) = codec::decode_into(&indices, &self.palette, &mut surface.pixels) {
				warn!("encoding {key} failed: {err}");
				return false;
			}
			surface.indices = Some(indices);
		}
		if self.palette.len() != colors_before {
			debug!("encoding {key} appended {} colours", self.palette.len() - colors_before);
		}
		let keys = self.set_group_text(key, None);
		self.emit(StoreEvent::CelsChanged(keys));
		true
	}

	/// Turns a cel into a text cel, or back into a blank pixel cel with `None`.
	///
	/// Text cels carry no index buffer and are skipped by palette sync.
	pub fn set_cel_text(&mut self, layer: LayerId, frame: FrameId, text: Option<String>) -> bool {
		if self.ensure_unlinked_for_edit(layer, frame).is_none() {
			return false;
		}

		let key = CelKey::new(layer, frame);
		let Some(cel) = self.cels.get_mut(&key) else {
			return false;
		};
		{
			let mut surface = cel.surface_mut();
			match text {
				Some(_) => surface.indices = None,
				None if surface.indices.is_none() => {
					let (width, height) = (surface.width(), surface.height());
					*surface = Surface::blank(width, height);
				}
				None => {}
			}
		}
		let keys = self.set_group_text(key, text);
		self.emit(StoreEvent::CelsChanged(keys));
		true
	}

	/// Links cels into a new group; see [`link::link`].
	pub fn link_cels(&mut self, keys: &[CelKey], kind: LinkType) -> Option<LinkId> {
		let link = link::link(&mut self.cels, keys, kind)?;
		let members = link::group_members(&self.cels, link);
		self.emit(StoreEvent::CelsChanged(members));
		Some(link)
	}

	/// Gives each named linked cel a private copy; see [`link::unlink`].
	pub fn unlink_cels(&mut self, keys: &[CelKey]) -> usize {
		let count = link::unlink(&mut self.cels, keys);
		if count > 0 {
			self.emit(StoreEvent::CelsChanged(keys.to_vec()));
		}
		count
	}

	/// Sets the opacity of the named cels, clamped to 0..=100.
	pub fn set_cel_opacity(&mut self, keys: &[CelKey], opacity: i32) -> usize {
		let count = link::set_opacity(&mut self.cels, keys, opacity);
		if count > 0 {
			self.emit(StoreEvent::CelsChanged(keys.to_vec()));
		}
		count
	}

	// ------------------------------------------------------------------
	// Selection
	// ------------------------------------------------------------------

	/// Current frame.
	pub fn current_frame(&self) -> FrameId {
		self.current
	}

	/// Timeline index of the current frame.
	pub fn current_index(&self) -> usize {
		self.frame_index(self.current).unwrap_or(0)
	}

	/// Makes `id` the current frame.
	pub fn select_frame(&mut self, id: FrameId) -> bool {
		let Some(index) = self.frame_index(id) else {
			debug!("select_frame: unknown frame {id}");
			return false;
		};
		if self.current != id {
			self.current = id;
			self.emit(StoreEvent::CurrentFrameChanged {
				frame: id,
				index,
			});
		}
		true
	}

	/// Replaces the cel selection. Keys without a cel are ignored; returns
	/// the number of selected cels.
	pub fn select_cels<I>(&mut self, keys: I) -> usize
	where
		I: IntoIterator<Item = CelKey>,
	{
		self.selection = keys.into_iter().filter(|key| self.cels.contains_key(key)).collect();
		self.selection.len()
	}

	/// Selected cels in key order.
	pub fn selected_cels(&self) -> impl Iterator<Item = CelKey> + '_ {
		self.selection.iter().copied()
	}

	// ------------------------------------------------------------------
	// Tags
	// ------------------------------------------------------------------

	/// Adds a tag over `[start, end]`.
	///
	/// Rejected when the range is inverted, leaves the timeline or overlaps
	/// another tag.
	pub fn add_tag(&mut self, name: impl Into<String>, color: Color, start: usize, end: usize) -> Option<TagId> {
		if end >= self.frames.len() {
			debug!("tag [{start}, {end}] outside {} frames", self.frames.len());
			return None;
		}
		let id = tag::add(&mut self.tags, name, color, start, end)?;
		self.emit(StoreEvent::TagsChanged);
		Some(id)
	}

	/// Applies a partial tag update under the same rules as [`Self::add_tag`].
	pub fn update_tag(&mut self, id: TagId, changes: TagUpdate) -> bool {
		let Some(current) = tag::find(&self.tags, id) else {
			debug!("update_tag: unknown tag {id}");
			return false;
		};
		let end = changes.end.unwrap_or(current.end);
		if end >= self.frames.len() {
			debug!("tag {id} end {end} outside {} frames", self.frames.len());
			return false;
		}
		if !tag::update(&mut self.tags, id, changes) {
			return false;
		}
		self.emit(StoreEvent::TagsChanged);
		true
	}

	/// Removes a tag. Playback constrained to it falls back to all frames.
	pub fn remove_tag(&mut self, id: TagId) -> bool {
		if !tag::remove(&mut self.tags, id) {
			debug!("remove_tag: unknown tag {id}");
			return false;
		}
		self.emit(StoreEvent::TagsChanged);
		if self.playback.mode() == PlaybackMode::Tag(id) {
			self.playback.set_mode(PlaybackMode::All);
			self.emit(StoreEvent::PlaybackChanged(self.playback.state()));
		}
		true
	}

	/// Flips a tag's collapsed flag.
	pub fn toggle_tag_collapsed(&mut self, id: TagId) -> bool {
		if !tag::toggle_collapsed(&mut self.tags, id) {
			return false;
		}
		self.emit(StoreEvent::TagsChanged);
		true
	}

	/// Tags containing the frame at `frame_index`.
	pub fn tags_for_frame(&self, frame_index: usize) -> Vec<&FrameTag> {
		tag::tags_for_frame(&self.tags, frame_index)
	}

	// ------------------------------------------------------------------
	// Palette
	// ------------------------------------------------------------------

	fn apply_palette_change(&mut self, change: Option<PaletteChange>) -> Option<SyncReport> {
		let Some(change) = change else {
			debug!("palette change rejected");
			return None;
		};
		Some(self.sync_cels(&change))
	}

	fn sync_cels(&mut self, change: &PaletteChange) -> SyncReport {
		let report = sync::apply(&mut self.cels, change, &self.palette);
		self.emit(StoreEvent::PaletteSynced(report));
		report
	}

	/// Moves a main colour and remaps every index buffer.
	pub fn reorder_palette(&mut self, from: u8, to: u8) -> Option<SyncReport> {
		let change = self.palette.move_color(from, to);
		self.apply_palette_change(change)
	}

	/// Removes a main colour; pixels that used it fall back to index 1.
	pub fn remove_palette_color(&mut self, index: u8) -> Option<SyncReport> {
		let change = self.palette.remove_color(index);
		self.apply_palette_change(change)
	}

	/// Moves a main colour to the ephemeral region, keeping its pixels.
	pub fn move_palette_color_to_ephemeral(&mut self, index: u8) -> Option<SyncReport> {
		let change = self.palette.move_to_ephemeral(index);
		self.apply_palette_change(change)
	}

	/// Inserts a main colour at `index`.
	pub fn insert_palette_color(&mut self, index: u8, color: Color) -> Option<SyncReport> {
		let change = self.palette.insert_color(index, color);
		self.apply_palette_change(change)
	}

	/// Replaces the palette.
	///
	/// With `remap` each old index is re-pointed at the new index of the same
	/// colour (unmatched indices are kept as they are); without it the RGBA
	/// buffers are simply rebuilt from the unchanged indices.
	pub fn replace_palette(&mut self, main: Vec<Color>, ephemeral: Vec<Color>, remap: bool) -> Option<SyncReport> {
		let change = self.palette.replace(main, ephemeral).map(|change| {
			if remap {
				change
			} else {
				PaletteChange::Rebuild
			}
		});
		self.apply_palette_change(change)
	}

	/// Adopts a palette that was already mutated elsewhere and syncs every
	/// cel for `change`.
	pub fn sync_palette(&mut self, palette: Palette, change: &PaletteChange) -> SyncReport {
		self.palette = palette;
		self.sync_cels(change)
	}

	// ------------------------------------------------------------------
	// Playback
	// ------------------------------------------------------------------

	/// Starts playback, timing from `now`.
	pub fn play(&mut self, now: Instant) {
		if !self.playback.is_playing() {
			self.playback.start(now);
			self.emit(StoreEvent::PlaybackChanged(self.playback.state()));
		}
	}

	/// Stops playback immediately.
	pub fn stop(&mut self) {
		if self.playback.is_playing() {
			self.playback.stop();
			self.emit(StoreEvent::PlaybackChanged(self.playback.state()));
		}
	}

	/// Flips between playing and stopped.
	pub fn toggle_playback(&mut self, now: Instant) {
		self.playback.toggle(now);
		self.emit(StoreEvent::PlaybackChanged(self.playback.state()));
	}

	/// Sets the playback range. A tag mode naming an unknown tag is rejected.
	pub fn set_playback_mode(&mut self, mode: PlaybackMode) -> bool {
		if let PlaybackMode::Tag(id) = mode
			&& tag::find(&self.tags, id).is_none()
		{
			debug!("playback mode rejected: unknown tag {id}");
			return false;
		}
		self.playback.set_mode(mode);
		self.emit(StoreEvent::PlaybackChanged(self.playback.state()));
		true
	}

	/// Current playback state.
	pub fn playback_state(&self) -> PlaybackState {
		self.playback.state()
	}

	/// Advances the current frame if its duration has elapsed.
	///
	/// Returns the new current frame when it moved.
	pub fn tick(&mut self, now: Instant) -> Option<FrameId> {
		let current = self.current_index();
		let advance = self.playback.tick(now, &self.frames, &self.tags, current)?;
		self.current = advance.frame;
		self.emit(StoreEvent::CurrentFrameChanged {
			frame: advance.frame,
			index: advance.index,
		});
		Some(advance.frame)
	}

	/// When the next tick is due, or `None` while stopped.
	pub fn next_deadline(&self) -> Option<Instant> {
		self.playback.next_deadline(&self.frames, self.current_index())
	}

	// ------------------------------------------------------------------
	// Canvas
	// ------------------------------------------------------------------

	/// Crops or pads every surface to the new canvas size, anchored top-left.
	///
	/// Shared surfaces are resized once; empty-sentinel cels move to a new
	/// sentinel of the new size.
	pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
		if width == 0 || height == 0 {
			debug!("resize_canvas: empty size {width}x{height}");
			return false;
		}
		if (width, height) == (self.width, self.height) {
			return true;
		}

		let mut visited = HashSet::new();
		for cel in self.cels.values_mut() {
			match &mut cel.storage {
				CelStorage::Owned(surface) => *surface = surface.resized(width, height),
				CelStorage::Shared {
					link,
					..
				} if link.is_empty_sentinel() => {}
				CelStorage::Shared {
					surface,
					..
				} => {
					if visited.insert(Rc::as_ptr(surface)) {
						let resized = surface.borrow().resized(width, height);
						*surface.borrow_mut() = resized;
					}
				}
			}
		}

		self.empty = Rc::new(RefCell::new(Surface::blank(width, height)));
		let sentinel = self.sentinel_storage();
		for cel in self.cels.values_mut().filter(|cel| cel.is_empty_sentinel()) {
			cel.storage = sentinel.clone();
		}

		debug!("canvas resized from {}x{} to {width}x{height}", self.width, self.height);
		self.width = width;
		self.height = height;
		self.emit(StoreEvent::CanvasResized {
			width,
			height,
		});
		true
	}
}
