//! Serializable project snapshot.
//!
//! Surfaces are stored once per link group, so aliasing survives a round
//! trip: every cel of a group points at the same [`SurfaceRecord`] and
//! restoring builds a single shared surface for it. Cels still in the empty
//! sentinel carry no surface at all.

use std::{
	cell::RefCell,
	collections::{BTreeSet, HashMap},
	rc::Rc,
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{AnimationStore, StoreEvent, events::Observers};
use crate::{
	cel::{Cel, CelMap},
	codec,
	config::EngineConfig,
	error::CelError,
	ids::{CelKey, FrameId, LayerId, LinkId, TagId},
	link,
	palette::Palette,
	playback::PlaybackEngine,
	surface::{CelStorage, LinkType, PixelBuffer, SharedSurface, Surface},
	tag::{self, FrameTag},
	timeline::{self, Frame, Layer},
};

/// Pixel content of one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRecord {
	/// Flat index buffer, `width * height` entries
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub indices: Option<Vec<u8>>,
	/// RGBA bytes, only for surfaces without an index buffer
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rgba: Option<Vec<u8>>,
}

impl SurfaceRecord {
	fn capture(surface: &Surface) -> Self {
		match &surface.indices {
			Some(indices) => Self {
				indices: Some(indices.clone()),
				rgba: None,
			},
			None => Self {
				indices: None,
				rgba: Some(surface.pixels.as_bytes().to_vec()),
			},
		}
	}

	fn into_surface(self, width: u32, height: u32, palette: &Palette) -> Result<Surface, CelError> {
		match (self.indices, self.rgba) {
			(Some(indices), _) => {
				let mut pixels = PixelBuffer::new(width, height);
				codec::decode_into(&indices, palette, &mut pixels)?;
				Ok(Surface {
					pixels,
					indices: Some(indices),
				})
			}
			(None, Some(rgba)) => Ok(Surface {
				pixels: PixelBuffer::from_rgba(width, height, rgba)?,
				indices: None,
			}),
			(None, None) => Ok(Surface::without_indices(width, height)),
		}
	}
}

/// One cel of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelRecord {
	/// Owning layer
	pub layer: LayerId,
	/// Owning frame
	pub frame: FrameId,
	/// Index into [`ProjectSnapshot::surfaces`]; `None` for empty-sentinel cels
	pub surface: Option<usize>,
	/// Link group
	pub link: Option<LinkId>,
	/// Link type of the group
	pub link_type: Option<LinkType>,
	/// Opacity, 0..=100
	pub opacity: u8,
	/// Text content of a text cel
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

/// Complete project state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
	/// Canvas width in pixels
	pub canvas_width: u32,
	/// Canvas height in pixels
	pub canvas_height: u32,
	/// Frames in timeline order
	pub frames: Vec<Frame>,
	/// Layers, bottom first
	pub layers: Vec<Layer>,
	/// Distinct surfaces
	pub surfaces: Vec<SurfaceRecord>,
	/// Cels
	pub cels: Vec<CelRecord>,
	/// Tags
	pub tags: Vec<FrameTag>,
	/// Palette
	pub palette: Palette,
	/// Current frame
	pub current_frame: FrameId,
}

fn invalid(message: impl Into<String>) -> CelError {
	CelError::InvalidSnapshot(message.into())
}

impl ProjectSnapshot {
	/// Largest canvas, in pixels, a snapshot may describe
	pub const MAX_CANVAS_PIXELS: u64 = 4096 * 4096;

	/// Checks the structural consistency of the snapshot.
	///
	/// # Errors
	///
	/// Returns [`CelError::InvalidSnapshot`] naming the first problem found.
	pub fn validate(&self) -> Result<(), CelError> {
		if self.canvas_width == 0 || self.canvas_height == 0 {
			return Err(invalid(format!("empty canvas {}x{}", self.canvas_width, self.canvas_height)));
		}
		if self.canvas_width as u64 * self.canvas_height as u64 > Self::MAX_CANVAS_PIXELS {
			return Err(invalid(format!("canvas {}x{} is too large", self.canvas_width, self.canvas_height)));
		}
		if self.frames.is_empty() || self.layers.is_empty() {
			return Err(invalid("a project needs at least one frame and one layer"));
		}
		if self.palette.len() > Palette::MAX_COLORS {
			return Err(invalid(format!("{} palette colours", self.palette.len())));
		}

		let frames: BTreeSet<FrameId> = self.frames.iter().map(|frame| frame.id).collect();
		let layers: BTreeSet<LayerId> = self.layers.iter().map(|layer| layer.id).collect();
		if frames.len() != self.frames.len() || layers.len() != self.layers.len() {
			return Err(invalid("duplicate frame or layer id"));
		}

		let mut seen = BTreeSet::new();
		let mut group_surfaces: HashMap<LinkId, (usize, Option<LinkType>)> = HashMap::new();
		let mut surface_owners: HashMap<usize, Option<LinkId>> = HashMap::new();
		for record in &self.cels {
			let key = CelKey::new(record.layer, record.frame);
			if !frames.contains(&record.frame) || !layers.contains(&record.layer) {
				return Err(invalid(format!("cel {key} references a missing layer or frame")));
			}
			if !seen.insert(key) {
				return Err(invalid(format!("duplicate cel {key}")));
			}

			match (record.link, record.surface) {
				(Some(LinkId::Empty), None) => {}
				(Some(LinkId::Empty), Some(_)) | (_, None) => {
					return Err(invalid(format!("cel {key}: surface must be absent exactly for empty cels")));
				}
				(_, Some(index)) if index >= self.surfaces.len() => {
					return Err(invalid(format!("cel {key}: surface {index} out of range")));
				}
				(None, Some(index)) => {
					if surface_owners.insert(index, None).is_some() {
						return Err(invalid(format!("cel {key}: owned surface {index} is referenced elsewhere")));
					}
				}
				(Some(link), Some(index)) => {
					if *surface_owners.entry(index).or_insert(Some(link)) != Some(link) {
						return Err(invalid(format!("cel {key}: surface {index} is shared outside group {link}")));
					}
					let (surface, kind) = *group_surfaces.entry(link).or_insert((index, record.link_type));
					if surface != index {
						return Err(invalid(format!("group {link} spans several surfaces")));
					}
					if kind != record.link_type {
						return Err(invalid(format!("group {link} mixes link types")));
					}
				}
			}
		}

		let tag_ids: BTreeSet<TagId> = self.tags.iter().map(|tag| tag.id).collect();
		if tag_ids.len() != self.tags.len() {
			return Err(invalid("duplicate tag id"));
		}

		let last = self.frames.len() - 1;
		for tag in &self.tags {
			if tag.start > tag.end || tag.end > last {
				return Err(invalid(format!("tag {tag} outside the timeline")));
			}
			if tag::has_overlap(&self.tags, tag.start, tag.end, Some(tag.id)) {
				return Err(invalid(format!("tag {tag} overlaps another tag")));
			}
		}

		Ok(())
	}
}

impl AnimationStore {
	/// Captures the whole project.
	pub fn snapshot(&self) -> ProjectSnapshot {
		let mut surfaces = Vec::new();
		let mut shared: HashMap<*const RefCell<Surface>, usize> = HashMap::new();
		let mut cels = Vec::with_capacity(self.cels.len());

		for cel in self.cels.values() {
			let surface = match &cel.storage {
				CelStorage::Shared {
					link,
					..
				} if link.is_empty_sentinel() => None,
				CelStorage::Shared {
					surface,
					..
				} => {
					let index = *shared.entry(Rc::as_ptr(surface)).or_insert_with(|| {
						surfaces.push(SurfaceRecord::capture(&surface.borrow()));
						surfaces.len() - 1
					});
					Some(index)
				}
				CelStorage::Owned(surface) => {
					surfaces.push(SurfaceRecord::capture(surface));
					Some(surfaces.len() - 1)
				}
			};

			cels.push(CelRecord {
				layer: cel.layer(),
				frame: cel.frame(),
				surface,
				link: cel.link(),
				link_type: cel.link_type(),
				opacity: cel.opacity(),
				text: cel.text().map(str::to_owned),
			});
		}

		ProjectSnapshot {
			canvas_width: self.width,
			canvas_height: self.height,
			frames: self.frames.clone(),
			layers: self.layers.clone(),
			surfaces,
			cels,
			tags: self.tags.clone(),
			palette: self.palette.clone(),
			current_frame: self.current,
		}
	}

	/// Builds a store from a snapshot.
	///
	/// Cels missing from the snapshot are filled in as empty-sentinel cels
	/// and groups left with a single member are dissolved. Playback starts
	/// stopped.
	///
	/// # Errors
	///
	/// Returns [`CelError::InvalidSnapshot`] if the snapshot is inconsistent.
	pub fn from_snapshot(config: EngineConfig, snapshot: ProjectSnapshot) -> Result<Self, CelError> {
		snapshot.validate()?;

		let ProjectSnapshot {
			canvas_width: width,
			canvas_height: height,
			mut frames,
			layers,
			surfaces,
			cels: records,
			tags,
			palette,
			current_frame,
		} = snapshot;

		let surfaces = surfaces
			.into_iter()
			.enumerate()
			.map(|(i, record)| record.into_surface(width, height, &palette).map_err(|err| invalid(format!("surface {i}: {err}"))))
			.collect::<Result<Vec<_>, _>>()?;

		let empty: SharedSurface = Rc::new(RefCell::new(Surface::blank(width, height)));
		let mut shared: HashMap<usize, SharedSurface> = HashMap::new();
		let mut groups = BTreeSet::new();
		let mut cels = CelMap::new();

		for record in records {
			let key = CelKey::new(record.layer, record.frame);
			let storage = match (record.link, record.surface) {
				(Some(LinkId::Empty), _) | (_, None) => CelStorage::Shared {
					link: LinkId::Empty,
					kind: LinkType::Soft,
					surface: Rc::clone(&empty),
				},
				(Some(link), Some(index)) => {
					if let LinkId::Group(raw) = link {
						groups.insert(raw);
					}
					let surface = shared.entry(index).or_insert_with(|| Rc::new(RefCell::new(surfaces[index].clone())));
					CelStorage::Shared {
						link,
						kind: record.link_type.unwrap_or_default(),
						surface: Rc::clone(surface),
					}
				}
				(None, Some(index)) => CelStorage::Owned(surfaces[index].clone()),
			};

			let mut cel = Cel::with_storage(key, storage);
			cel.set_opacity(record.opacity as i32);
			cel.set_text(record.text);
			cels.insert(key, cel);
		}

		for layer in &layers {
			for frame in &frames {
				let key = CelKey::new(layer.id, frame.id);
				cels.entry(key).or_insert_with(|| {
					debug!("snapshot has no cel {key}, using the empty surface");
					Cel::with_storage(
						key,
						CelStorage::Shared {
							link: LinkId::Empty,
							kind: LinkType::Soft,
							surface: Rc::clone(&empty),
						},
					)
				});
			}
		}

		for raw in groups {
			link::normalize_group(&mut cels, LinkId::Group(raw));
		}

		timeline::reorder(&mut frames);
		let current = frames.iter().find(|frame| frame.id == current_frame).unwrap_or(&frames[0]).id;

		debug!("restored {} frames, {} layers, {} cels", frames.len(), layers.len(), cels.len());
		Ok(Self {
			config,
			width,
			height,
			frames,
			layers,
			cels,
			tags,
			palette,
			playback: PlaybackEngine::new(),
			current,
			selection: BTreeSet::new(),
			empty,
			observers: Observers::default(),
		})
	}

	/// Replaces the project with a snapshot, keeping the configuration and
	/// the registered observers.
	///
	/// # Errors
	///
	/// Returns [`CelError::InvalidSnapshot`] if the snapshot is inconsistent;
	/// the store is unchanged in that case.
	pub fn restore(&mut self, snapshot: ProjectSnapshot) -> Result<(), CelError> {
		let mut restored = Self::from_snapshot(self.config.clone(), snapshot)?;
		restored.observers = std::mem::take(&mut self.observers);
		*self = restored;
		self.emit(StoreEvent::Restored);
		Ok(())
	}
}
