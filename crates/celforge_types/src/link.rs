//! Cel link manager.
//!
//! Implements the copy-on-write aliasing scheme between cels:
//!
//! - **Hard** links keep cels identical across frames: all members alias one
//!   surface and every edit reaches the whole group.
//! - **Soft** links start out shared but fork on the first edit through
//!   [`ensure_unlinked_for_edit`].
//! - The reserved [`LinkId::Empty`] group aliases the store's transparent
//!   sentinel surface. It is never written to.
//!
//! A group that shrinks to a single member is dissolved and its last member
//! owns the surface again.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use log::debug;

use crate::{
	cel::{Cel, CelMap},
	ids::{CelKey, LinkId},
	surface::{CelStorage, LinkType, Surface},
};

/// Keys of all cels in a link group, in key order.
pub fn group_members(cels: &CelMap, link: LinkId) -> Vec<CelKey> {
	cels.values().filter(|cel| cel.link() == Some(link)).map(Cel::key).collect()
}

/// Links the named cels into a fresh group.
///
/// Keys that do not name a cel are ignored. Fewer than two remaining keys is a
/// structural rejection: nothing changes and `None` is returned. Every member
/// adopts the first cel's surface by reference.
pub fn link(cels: &mut CelMap, keys: &[CelKey], kind: LinkType) -> Option<LinkId> {
	let mut seen = BTreeSet::new();
	let members: Vec<CelKey> = keys.iter().copied().filter(|key| cels.contains_key(key) && seen.insert(*key)).collect();
	if members.len() < 2 {
		debug!("link rejected: {} usable keys", members.len());
		return None;
	}

	let source = cels.get_mut(&members[0])?;
	let surface = match &mut source.storage {
		CelStorage::Owned(surface) => std::mem::replace(surface, Surface::without_indices(0, 0)),
		shared => shared.clone_surface(),
	};
	let surface = Rc::new(RefCell::new(surface));
	let link = LinkId::generate();

	let mut previous = BTreeSet::new();
	for key in &members {
		if let Some(cel) = cels.get_mut(key) {
			if let Some(LinkId::Group(old)) = cel.link() {
				previous.insert(old);
			}
			cel.storage = CelStorage::Shared {
				link,
				kind,
				surface: Rc::clone(&surface),
			};
		}
	}

	for old in previous {
		normalize_group(cels, LinkId::Group(old));
	}

	debug!("linked {} cels into group {link} ({kind:?})", members.len());
	Some(link)
}

/// Gives every named linked cel a private deep copy of its surface.
///
/// Returns the number of cels that were unlinked.
pub fn unlink(cels: &mut CelMap, keys: &[CelKey]) -> usize {
	let mut previous = BTreeSet::new();
	let mut count = 0;

	for key in keys {
		let Some(cel) = cels.get_mut(key) else {
			continue;
		};
		let Some(link) = cel.link() else {
			continue;
		};
		cel.storage = CelStorage::Owned(cel.storage.clone_surface());
		previous.insert(link);
		count += 1;
	}

	for link in previous {
		normalize_group(cels, link);
	}

	count
}

/// Dissolves a group that has shrunk to a single member.
///
/// The empty sentinel group is left alone.
pub fn normalize_group(cels: &mut CelMap, link: LinkId) {
	if link.is_empty_sentinel() {
		return;
	}

	let members = group_members(cels, link);
	let [last] = members.as_slice() else {
		return;
	};
	let Some(cel) = cels.get_mut(last) else {
		return;
	};

	let previous = std::mem::replace(&mut cel.storage, CelStorage::Owned(Surface::without_indices(0, 0)));
	cel.storage = match previous {
		CelStorage::Shared {
			surface,
			..
		} => CelStorage::Owned(Rc::try_unwrap(surface).map_or_else(|rc| rc.borrow().clone(), RefCell::into_inner)),
		owned => owned,
	};
	debug!("group {link} dissolved, {last} owns its surface again");
}

/// Copy-on-write gate every drawing edit must pass before mutating a cel.
///
/// Returns `Some(true)` when new private storage was created, `Some(false)`
/// when the cel can be written as is, and `None` when the cel is missing and
/// `synthesize` cannot create it.
///
/// 1. Missing cel: synthesized, `true`.
/// 2. Owned: `false`.
/// 3. Empty sentinel: fresh private blank surface, `true`.
/// 4. Hard link: `false`, the edit reaches the group through aliasing.
/// 5. Soft link: private copy when at least one other member is alive, `true`;
///    sole member, `false`.
pub fn ensure_unlinked_for_edit<F>(cels: &mut CelMap, key: CelKey, synthesize: F) -> Option<bool>
where
	F: FnOnce(CelKey) -> Option<Cel>,
{
	let Some(cel) = cels.get_mut(&key) else {
		let cel = synthesize(key)?;
		debug!("synthesized {key} for edit");
		cels.insert(key, cel);
		return Some(true);
	};

	let (link, kind) = match &cel.storage {
		CelStorage::Owned(_) => return Some(false),
		CelStorage::Shared {
			link,
			kind,
			..
		} => (*link, *kind),
	};

	if link.is_empty_sentinel() {
		let (width, height) = {
			let surface = cel.surface();
			(surface.width(), surface.height())
		};
		cel.storage = CelStorage::Owned(Surface::blank(width, height));
		debug!("{key} left the empty sentinel");
		return Some(true);
	}

	match kind {
		LinkType::Hard => Some(false),
		LinkType::Soft => {
			if group_members(cels, link).len() < 2 {
				return Some(false);
			}
			unlink(cels, &[key]);
			debug!("{key} forked from soft group {link}");
			Some(true)
		}
	}
}

/// Makes `key` a member of `anchor`'s link group.
///
/// An owned anchor first becomes the founding member of a new group of the
/// given kind. An anchor in the empty sentinel passes the sentinel on. The
/// cel at `key` is created if it does not exist; otherwise its storage is
/// replaced and any group it leaves is normalized.
pub fn join_group(cels: &mut CelMap, anchor: CelKey, key: CelKey, kind: LinkType) -> Option<LinkId> {
	if anchor == key {
		return None;
	}

	let anchor_cel = cels.get_mut(&anchor)?;
	if let CelStorage::Owned(surface) = &mut anchor_cel.storage {
		let surface = std::mem::replace(surface, Surface::without_indices(0, 0));
		anchor_cel.storage = CelStorage::share(LinkId::generate(), kind, surface);
	}
	let storage = anchor_cel.storage.clone();
	let link = storage.link()?;

	let left = match cels.get_mut(&key) {
		Some(cel) => std::mem::replace(&mut cel.storage, storage).link(),
		None => {
			cels.insert(key, Cel::with_storage(key, storage));
			None
		}
	};

	if let Some(left) = left.filter(|left| *left != link) {
		normalize_group(cels, left);
	}

	Some(link)
}

/// Sets the opacity of the named cels, clamped to 0..=100.
///
/// Returns the number of cels updated.
pub fn set_opacity(cels: &mut CelMap, keys: &[CelKey], value: i32) -> usize {
	let mut count = 0;
	for key in keys {
		if let Some(cel) = cels.get_mut(key) {
			cel.set_opacity(value);
			count += 1;
		}
	}
	count
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ids::{FrameId, LayerId};

	fn key(frame: u64) -> CelKey {
		CelKey::new(LayerId::from_raw(1), FrameId::from_raw(frame))
	}

	fn owned_cels(count: u64) -> CelMap {
		(0..count)
			.map(|i| {
				let mut surface = Surface::blank(8, 8);
				surface.set_index(0, 0, i as u8 + 1);
				(key(i), Cel::owned(key(i), surface))
			})
			.collect()
	}

	fn index_at(cels: &CelMap, k: CelKey, x: u32, y: u32) -> Option<u8> {
		cels[&k].surface().index_at(x, y)
	}

	#[test]
	fn test_link_requires_two_cels() {
		let mut cels = owned_cels(2);
		assert_eq!(link(&mut cels, &[key(0)], LinkType::Hard), None);
		assert_eq!(link(&mut cels, &[key(0), key(0)], LinkType::Hard), None);
		assert_eq!(link(&mut cels, &[key(0), key(9)], LinkType::Hard), None);
		assert!(!cels[&key(0)].is_linked());
	}

	#[test]
	fn test_link_adopts_first_surface() {
		let mut cels = owned_cels(3);
		let group = link(&mut cels, &[key(1), key(0), key(2)], LinkType::Soft).unwrap();

		assert_eq!(group_members(&cels, group), vec![key(0), key(1), key(2)]);
		assert!(cels[&key(0)].shares_surface_with(&cels[&key(2)]));
		assert_eq!(index_at(&cels, key(0), 0, 0), Some(2));
		assert_eq!(cels[&key(0)].link_type(), Some(LinkType::Soft));
	}

	#[test]
	fn test_hard_link_propagates_edits() {
		let mut cels = owned_cels(2);
		link(&mut cels, &[key(0), key(1)], LinkType::Hard).unwrap();

		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |_| None), Some(false));
		cels.get_mut(&key(0)).unwrap().surface_mut().set_index(5, 5, 9);

		assert_eq!(index_at(&cels, key(1), 5, 5), Some(9));
		assert!(cels[&key(0)].shares_surface_with(&cels[&key(1)]));
	}

	#[test]
	fn test_soft_link_forks_on_edit() {
		let mut cels = owned_cels(3);
		let group = link(&mut cels, &[key(0), key(1), key(2)], LinkType::Soft).unwrap();
		let before = cels[&key(1)].surface().clone();

		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |_| None), Some(true));
		cels.get_mut(&key(0)).unwrap().surface_mut().set_index(3, 3, 7);

		assert!(!cels[&key(0)].is_linked());
		assert_eq!(*cels[&key(1)].surface(), before);
		assert_eq!(*cels[&key(2)].surface(), before);
		assert_eq!(group_members(&cels, group), vec![key(1), key(2)]);
	}

	#[test]
	fn test_soft_group_dissolves_when_last_member_remains() {
		let mut cels = owned_cels(2);
		link(&mut cels, &[key(0), key(1)], LinkType::Soft).unwrap();

		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |_| None), Some(true));
		assert!(!cels[&key(1)].is_linked());
		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(1), |_| None), Some(false));
	}

	#[test]
	fn test_empty_sentinel_gets_private_surface() {
		let sentinel = Rc::new(RefCell::new(Surface::blank(4, 4)));
		let mut cels = CelMap::new();
		for i in 0..2 {
			let storage = CelStorage::Shared {
				link: LinkId::Empty,
				kind: LinkType::Soft,
				surface: Rc::clone(&sentinel),
			};
			cels.insert(key(i), Cel::with_storage(key(i), storage));
		}

		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |_| None), Some(true));
		cels.get_mut(&key(0)).unwrap().surface_mut().set_index(1, 1, 4);

		assert_eq!(sentinel.borrow().index_at(1, 1), Some(0));
		assert!(cels[&key(1)].is_empty_sentinel());
		assert_eq!(cels[&key(0)].surface().width(), 4);
	}

	#[test]
	fn test_missing_cel_is_synthesized() {
		let mut cels = CelMap::new();
		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |_| None), None);
		assert_eq!(ensure_unlinked_for_edit(&mut cels, key(0), |k| Some(Cel::owned(k, Surface::blank(2, 2)))), Some(true));
		assert!(cels.contains_key(&key(0)));
	}

	#[test]
	fn test_unlink_deep_copies() {
		let mut cels = owned_cels(3);
		let group = link(&mut cels, &[key(0), key(1), key(2)], LinkType::Hard).unwrap();

		assert_eq!(unlink(&mut cels, &[key(0), key(1)]), 2);
		assert!(!cels[&key(0)].shares_surface_with(&cels[&key(1)]));
		// key(2) is the sole survivor and owns its surface again
		assert!(group_members(&cels, group).is_empty());
		assert!(!cels[&key(2)].is_linked());
		assert_eq!(unlink(&mut cels, &[key(0)]), 0);
	}

	#[test]
	fn test_unlink_across_groups() {
		let mut cels = owned_cels(5);
		let first = link(&mut cels, &[key(0), key(1)], LinkType::Hard).unwrap();
		let second = link(&mut cels, &[key(2), key(3), key(4)], LinkType::Soft).unwrap();

		assert_eq!(unlink(&mut cels, &[key(0), key(2)]), 2);
		assert!(group_members(&cels, first).is_empty());
		assert!(!cels[&key(1)].is_linked());
		assert_eq!(group_members(&cels, second), vec![key(3), key(4)]);
		assert!(cels[&key(3)].shares_surface_with(&cels[&key(4)]));
	}

	#[test]
	fn test_relinking_normalizes_previous_group() {
		let mut cels = owned_cels(4);
		let first = link(&mut cels, &[key(0), key(1)], LinkType::Hard).unwrap();
		let second = link(&mut cels, &[key(1), key(2)], LinkType::Hard).unwrap();

		assert!(group_members(&cels, first).is_empty());
		assert!(!cels[&key(0)].is_linked());
		assert_eq!(group_members(&cels, second), vec![key(1), key(2)]);
		// the new group starts from a copy, so key(0) stays independent
		assert!(!cels[&key(0)].shares_surface_with(&cels[&key(1)]));
	}

	#[test]
	fn test_join_group() {
		let mut cels = owned_cels(1);
		let group = join_group(&mut cels, key(0), key(1), LinkType::Hard).unwrap();
		assert_eq!(group_members(&cels, group), vec![key(0), key(1)]);
		assert_eq!(join_group(&mut cels, key(1), key(2), LinkType::Soft), Some(group));
		assert_eq!(cels[&key(2)].link_type(), Some(LinkType::Hard));
		assert_eq!(join_group(&mut cels, key(7), key(3), LinkType::Soft), None);
	}

	#[test]
	fn test_set_opacity() {
		let mut cels = owned_cels(2);
		assert_eq!(set_opacity(&mut cels, &[key(0), key(1), key(5)], 150), 2);
		assert_eq!(cels[&key(1)].opacity(), 100);
		set_opacity(&mut cels, &[key(0)], 30);
		assert_eq!(cels[&key(0)].opacity(), 30);
	}
}
