//! Named holder sets.
//!
//! A [`TagSet`] keeps its identity across reloads; only its member list is
//! replaced. Readers take a [`TagMembers`] snapshot and never observe a
//! partially bound list.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use lodestone_primitives::TagKey;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::holder::{Holder, HolderOwner, OwnerId};

/// Tag sets of one registry, in first-seen order.
pub type TagMap<T> = IndexMap<TagKey<T>, Arc<TagSet<T>>, FxBuildHasher>;

struct Contents<T> {
	members: Vec<Holder<T>>,
	index: FxHashSet<Holder<T>>,
}

impl<T> Contents<T> {
	fn new(members: Vec<Holder<T>>) -> Self {
		let index = members.iter().cloned().collect();
		Self { members, index }
	}
}

/// A named, reloadable set of holders belonging to one registry.
pub struct TagSet<T> {
	key: TagKey<T>,
	owner: OwnerId,
	contents: ArcSwap<Contents<T>>,
}

impl<T> TagSet<T> {
	pub(crate) fn new(key: TagKey<T>, owner: OwnerId) -> Self {
		Self {
			key,
			owner,
			contents: ArcSwap::from_pointee(Contents::new(Vec::new())),
		}
	}

	pub fn key(&self) -> &TagKey<T> {
		&self.key
	}

	/// Atomically replaces the member list.
	pub(crate) fn bind(&self, members: Vec<Holder<T>>) {
		self.contents.store(Arc::new(Contents::new(members)));
	}

	/// True if `holder` (by identity) is a current member.
	pub fn contains(&self, holder: &Holder<T>) -> bool {
		self.contents.load().index.contains(holder)
	}

	pub fn len(&self) -> usize {
		self.contents.load().members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the current member list. Later reloads do not affect it.
	pub fn members(&self) -> TagMembers<T> {
		TagMembers {
			contents: self.contents.load_full(),
		}
	}

	pub fn is_valid_in(&self, owner: &impl HolderOwner) -> bool {
		self.owner == owner.owner_id()
	}
}

impl<T> HolderOwner for TagSet<T> {
	fn owner_id(&self) -> OwnerId {
		self.owner
	}
}

impl<T> fmt::Debug for TagSet<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TagSet")
			.field("key", &self.key)
			.field("len", &self.len())
			.finish()
	}
}

/// Snapshot of a tag's members at one point in time.
pub struct TagMembers<T> {
	contents: Arc<Contents<T>>,
}

impl<T> TagMembers<T> {
	pub fn iter(&self) -> std::slice::Iter<'_, Holder<T>> {
		self.contents.members.iter()
	}

	pub fn len(&self) -> usize {
		self.contents.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.contents.members.is_empty()
	}

	pub fn contains(&self, holder: &Holder<T>) -> bool {
		self.contents.index.contains(holder)
	}
}

impl<'a, T> IntoIterator for &'a TagMembers<T> {
	type Item = &'a Holder<T>;
	type IntoIter = std::slice::Iter<'a, Holder<T>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
