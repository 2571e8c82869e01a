//! The plain registry implementation.
//!
//! # Mental Model
//!
//! A [`SimpleRegistry`] has two phases. While building, its identity tables
//! sit behind an `RwLock` and `register` writes into them. [`freeze`] checks
//! that every handed-out reference was bound and then moves the tables into a
//! `OnceLock`, after which every read is lock-free and no write succeeds.
//!
//! Tags are kept apart from identity. The tag map is an `ArcSwap` published
//! in one store per reload, so readers see either the old or the new map.
//!
//! # Invariants
//!
//! - One reference per key for the lifetime of the registry.
//! - The id, location, key and value tables agree after every `register`;
//!   a failed `register` leaves them untouched.
//! - Frozen registries reject `register`, `get_or_create_holder` for new keys
//!   and `create_intrusive_holder`.
//! - `freeze` fails while a keyed reference is unbound or an intrusive
//!   reference was never registered.
//! - Ids stay below [`MAX_ID`].
//!
//! [`freeze`]: WritableRegistry::freeze

use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use lodestone_primitives::{Key, ResourceKey, TagKey};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::error::{RegistryError, ValidationIssue};
use crate::holder::{Holder, HolderOwner, OwnerId, Reference, ReferenceKind, TagKeys, ValuePtr};
use crate::settings::{DuplicatePolicy, RegistrySettings};
use crate::tag::{TagMap, TagSet};
use crate::traits::{Registry, TagBindings, WritableRegistry};

struct Tables<T> {
	by_id: Vec<Option<Arc<Reference<T>>>>,
	ids: FxHashMap<Key, u32>,
	by_value: FxHashMap<ValuePtr, Arc<Reference<T>>>,
	by_location: FxHashMap<Key, Arc<Reference<T>>>,
	/// Every keyed reference, registered or only looked up.
	by_key: FxHashMap<Key, Arc<Reference<T>>>,
	pending_intrusive: FxHashMap<ValuePtr, Arc<Reference<T>>>,
	next_id: u32,
	in_order: OnceLock<Arc<[Arc<Reference<T>>]>>,
}

impl<T> Default for Tables<T> {
	fn default() -> Self {
		Self {
			by_id: Vec::new(),
			ids: FxHashMap::default(),
			by_value: FxHashMap::default(),
			by_location: FxHashMap::default(),
			by_key: FxHashMap::default(),
			pending_intrusive: FxHashMap::default(),
			next_id: 0,
			in_order: OnceLock::new(),
		}
	}
}

impl<T> Tables<T> {
	fn in_order(&self) -> Arc<[Arc<Reference<T>>]> {
		Arc::clone(
			self.in_order
				.get_or_init(|| self.by_id.iter().flatten().cloned().collect()),
		)
	}

	/// Removes every table entry that points at `holder`.
	fn detach(&mut self, holder: &Arc<Reference<T>>) {
		let Some(location) = holder.key().map(|key| key.location().clone()) else {
			return;
		};
		if self
			.by_key
			.get(&location)
			.is_some_and(|current| Arc::ptr_eq(current, holder))
		{
			self.by_key.remove(&location);
		}
		if self
			.by_location
			.get(&location)
			.is_some_and(|current| Arc::ptr_eq(current, holder))
		{
			self.by_location.remove(&location);
			if let Some(id) = self.ids.remove(&location)
				&& let Some(slot) = self.by_id.get_mut(id as usize)
				&& slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, holder))
			{
				*slot = None;
			}
		}
		if let Ok(value) = holder.try_value() {
			let ptr = ValuePtr::of(&value);
			if self
				.by_value
				.get(&ptr)
				.is_some_and(|current| Arc::ptr_eq(current, holder))
			{
				self.by_value.remove(&ptr);
			}
		}
	}

	/// True if `reference` is the live holder for its key here.
	fn holds(&self, reference: &Arc<Reference<T>>) -> bool {
		reference
			.key()
			.and_then(|key| self.by_key.get(key.location()))
			.is_some_and(|current| Arc::ptr_eq(current, reference))
	}

	fn unbound_keys(&self) -> Vec<Key> {
		let mut unbound: Vec<Key> = self
			.by_key
			.iter()
			.filter(|(_, holder)| !holder.is_bound())
			.map(|(location, _)| location.clone())
			.collect();
		unbound.sort();
		unbound
	}
}

enum TablesView<'a, T> {
	Frozen(&'a Tables<T>),
	Live(RwLockReadGuard<'a, Tables<T>>),
}

impl<T> Deref for TablesView<'_, T> {
	type Target = Tables<T>;

	fn deref(&self) -> &Tables<T> {
		match self {
			Self::Frozen(tables) => tables,
			Self::Live(guard) => guard,
		}
	}
}

/// Exclusive upper bound for numeric ids.
pub const MAX_ID: u32 = 1 << 20;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
	Register,
	Override,
}

/// A registry of `T` values with numeric ids, forward references and tags.
pub struct SimpleRegistry<T> {
	key: Key,
	owner: OwnerId,
	intrusive: bool,
	policy: DuplicatePolicy,
	live: RwLock<Tables<T>>,
	frozen: OnceLock<Tables<T>>,
	tags: ArcSwap<TagMap<T>>,
	reload: Mutex<()>,
}

impl<T> SimpleRegistry<T> {
	/// Creates an empty registry whose holders are created from keys.
	pub fn new(key: Key) -> Self {
		Self {
			key,
			owner: OwnerId::next(),
			intrusive: false,
			policy: DuplicatePolicy::default(),
			live: RwLock::new(Tables::default()),
			frozen: OnceLock::new(),
			tags: ArcSwap::from_pointee(TagMap::default()),
			reload: Mutex::new(()),
		}
	}

	/// Creates an empty registry whose holders are created from values via
	/// [`WritableRegistry::create_intrusive_holder`].
	pub fn intrusive(key: Key) -> Self {
		Self {
			intrusive: true,
			..Self::new(key)
		}
	}

	/// Sets the duplicate handling policy.
	pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Applies the policy that `settings` selects for this registry.
	pub fn with_settings(self, settings: &RegistrySettings) -> Self {
		let policy = settings.policy_for(&self.key);
		self.with_policy(policy)
	}

	pub fn policy(&self) -> DuplicatePolicy {
		self.policy
	}

	/// Returns the current tag map. Later reloads publish a new map.
	pub fn tags(&self) -> Arc<TagMap<T>> {
		self.tags.load_full()
	}

	fn tables(&self) -> TablesView<'_, T> {
		if let Some(tables) = self.frozen.get() {
			return TablesView::Frozen(tables);
		}
		let guard = self.live.read();
		match self.frozen.get() {
			Some(tables) => TablesView::Frozen(tables),
			None => TablesView::Live(guard),
		}
	}

	fn frozen_error(&self, key: impl ToString) -> RegistryError {
		RegistryError::Frozen {
			registry: self.key.clone(),
			key: key.to_string(),
		}
	}

	fn check_duplicates(
		&self,
		tables: &Tables<T>,
		id: u32,
		location: &Key,
		ptr: ValuePtr,
		check_key: bool,
	) -> Result<(), RegistryError> {
		let reject = self.policy == DuplicatePolicy::Reject;
		if check_key && tables.by_location.contains_key(location) {
			if reject {
				return Err(RegistryError::DuplicateKey {
					registry: self.key.clone(),
					key: location.clone(),
				});
			}
			tracing::warn!(registry = %self.key, key = %location, "duplicate key, later registration wins");
		}
		if let Some(existing) = tables.by_value.get(&ptr).and_then(|holder| holder.key())
			&& existing.location() != location
		{
			if reject {
				return Err(RegistryError::DuplicateValue {
					registry: self.key.clone(),
					key: location.clone(),
					existing: existing.location().clone(),
				});
			}
			tracing::warn!(
				registry = %self.key,
				key = %location,
				existing = %existing.location(),
				"duplicate value, later registration wins"
			);
		}
		if let Some(Some(holder)) = tables.by_id.get(id as usize)
			&& let Some(existing) = holder.key()
			&& existing.location() != location
		{
			if reject {
				return Err(RegistryError::DuplicateId {
					registry: self.key.clone(),
					id,
					key: location.clone(),
					existing: existing.location().clone(),
				});
			}
			tracing::warn!(
				registry = %self.key,
				id,
				key = %location,
				existing = %existing.location(),
				"duplicate id, later registration wins"
			);
		}
		Ok(())
	}

	fn resolve_holder(
		&self,
		tables: &Tables<T>,
		key: &ResourceKey<T>,
		ptr: ValuePtr,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		let location = key.location();
		if !self.intrusive {
			return Ok(match tables.by_key.get(location) {
				Some(holder) => Arc::clone(holder),
				None => Arc::new(Reference::standalone(self.owner, self.key.clone(), key.clone())),
			});
		}

		let holder = tables
			.pending_intrusive
			.get(&ptr)
			.or_else(|| {
				tables
					.by_value
					.get(&ptr)
					.filter(|holder| holder.kind() == ReferenceKind::Intrusive)
			})
			.cloned()
			.ok_or_else(|| RegistryError::MissingIntrusiveHolder {
				registry: self.key.clone(),
				key: location.clone(),
			})?;

		// Another value's holder already carries this key and cannot give it up.
		if let Some(existing) = tables.by_key.get(location)
			&& !Arc::ptr_eq(existing, &holder)
		{
			return Err(RegistryError::DuplicateKey {
				registry: self.key.clone(),
				key: location.clone(),
			});
		}
		Ok(holder)
	}

	fn register_entry(
		&self,
		mode: Mode,
		id: Option<u32>,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		let location = key.location().clone();
		if !key.is_for(&self.key) {
			return Err(RegistryError::ForeignKey {
				registry: self.key.clone(),
				key: key.to_string(),
			});
		}

		let mut live = self.live.write();
		if self.frozen.get().is_some() {
			return Err(self.frozen_error(&location));
		}
		let tables = &mut *live;

		let existing_id = tables.ids.get(&location).copied();
		let overriding = mode == Mode::Override && existing_id.is_some();
		let id = match (mode, id, existing_id) {
			(Mode::Override, Some(provided), Some(expected)) if provided != expected => {
				return Err(RegistryError::IdMismatch {
					registry: self.key.clone(),
					key: location,
					provided,
					expected,
				});
			}
			(Mode::Override, _, Some(expected)) => expected,
			(_, Some(provided), _) => provided,
			(_, None, _) => tables.next_id,
		};
		if id >= MAX_ID {
			return Err(RegistryError::IdOutOfRange {
				registry: self.key.clone(),
				key: location,
				id,
				max: MAX_ID,
			});
		}

		let ptr = ValuePtr::of(&value);
		self.check_duplicates(tables, id, &location, ptr, !overriding)?;
		let holder = self.resolve_holder(tables, &key, ptr)?;
		holder.check_bind(&key, &value)?;

		// Validation is done; from here on the tables are only mutated.
		let losers = [
			tables.by_location.get(&location).cloned(),
			tables.by_id.get(id as usize).cloned().flatten(),
		];
		for previous in losers.into_iter().flatten() {
			tables.detach(&previous);
			if !Arc::ptr_eq(&previous, &holder) {
				previous.bind_tags(TagKeys::default());
			}
		}
		tables.detach(&holder);
		holder.bind(key, value)?;

		tables.pending_intrusive.remove(&ptr);
		tables.by_key.insert(location.clone(), Arc::clone(&holder));
		tables.by_location.insert(location.clone(), Arc::clone(&holder));
		tables.by_value.insert(ptr, Arc::clone(&holder));
		tables.ids.insert(location.clone(), id);
		let slot = id as usize;
		if tables.by_id.len() <= slot {
			tables.by_id.resize_with(slot + 1, || None);
		}
		tables.by_id[slot] = Some(Arc::clone(&holder));
		tables.next_id = tables.next_id.max(id + 1);
		tables.in_order = OnceLock::new();

		tracing::trace!(registry = %self.key, key = %location, id, "registered");
		Ok(holder)
	}

	/// Problems that make this registry unusable after bootstrap.
	pub fn validation_issues(&self) -> Vec<ValidationIssue> {
		let tables = self.tables();
		let mut issues: Vec<ValidationIssue> = tables
			.unbound_keys()
			.into_iter()
			.map(|key| ValidationIssue::UnboundHolder {
				registry: self.key.clone(),
				key,
			})
			.collect();

		for (tag, set) in self.tags.load().iter() {
			let members = set.members();
			let foreign = members.iter().any(|holder| match holder {
				Holder::Direct(_) => true,
				Holder::Reference(reference) => !reference.is_valid_in(self) || !tables.holds(reference),
			});
			if foreign {
				issues.push(ValidationIssue::ForeignTagMember {
					registry: self.key.clone(),
					tag: tag.location().clone(),
				});
			}
			if !members.iter().all(Holder::is_bound) {
				issues.push(ValidationIssue::UnboundTagMember {
					registry: self.key.clone(),
					tag: tag.location().clone(),
				});
			}
		}
		issues
	}
}

impl<T> HolderOwner for SimpleRegistry<T> {
	fn owner_id(&self) -> OwnerId {
		self.owner
	}
}

impl<T: Send + Sync> Registry<T> for SimpleRegistry<T> {
	fn key(&self) -> &Key {
		&self.key
	}

	fn is_frozen(&self) -> bool {
		self.frozen.get().is_some()
	}

	fn len(&self) -> usize {
		self.tables().by_location.len()
	}

	fn contains(&self, location: &Key) -> bool {
		self.tables().by_location.contains_key(location)
	}

	fn contains_key(&self, key: &ResourceKey<T>) -> bool {
		key.is_for(&self.key) && self.contains(key.location())
	}

	fn get(&self, location: &Key) -> Option<Arc<T>> {
		self.tables()
			.by_location
			.get(location)
			.and_then(|holder| holder.try_value().ok())
	}

	fn get_by_key(&self, key: &ResourceKey<T>) -> Option<Arc<T>> {
		if !key.is_for(&self.key) {
			return None;
		}
		self.get(key.location())
	}

	fn get_by_id(&self, id: u32) -> Option<Arc<T>> {
		self.holder_by_id(id)
			.and_then(|holder| holder.try_value().ok())
	}

	fn key_of(&self, value: &Arc<T>) -> Option<Key> {
		self.resource_key_of(value)
			.map(|key| key.location().clone())
	}

	fn resource_key_of(&self, value: &Arc<T>) -> Option<ResourceKey<T>> {
		self.tables()
			.by_value
			.get(&ValuePtr::of(value))
			.and_then(|holder| holder.key().cloned())
	}

	fn id_of(&self, value: &Arc<T>) -> Option<u32> {
		let tables = self.tables();
		let holder = tables.by_value.get(&ValuePtr::of(value))?;
		let location = holder.key()?.location();
		tables.ids.get(location).copied()
	}

	fn holder(&self, key: &ResourceKey<T>) -> Option<Arc<Reference<T>>> {
		if !key.is_for(&self.key) {
			return None;
		}
		self.tables().by_key.get(key.location()).cloned()
	}

	fn holder_by_id(&self, id: u32) -> Option<Arc<Reference<T>>> {
		self.tables().by_id.get(id as usize).cloned().flatten()
	}

	fn holders(&self) -> Arc<[Arc<Reference<T>>]> {
		self.tables().in_order()
	}

	fn keys(&self) -> Vec<Key> {
		self.tables().by_location.keys().cloned().collect()
	}

	fn tag(&self, key: &TagKey<T>) -> Option<Arc<TagSet<T>>> {
		self.tags.load().get(key).cloned()
	}

	fn tag_keys(&self) -> Vec<TagKey<T>> {
		self.tags.load().keys().cloned().collect()
	}

	fn is_known_tag(&self, key: &TagKey<T>) -> bool {
		self.tags.load().contains_key(key)
	}
}

impl<T: Send + Sync> WritableRegistry<T> for SimpleRegistry<T> {
	fn register(&self, key: ResourceKey<T>, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		self.register_entry(Mode::Register, None, key, value)
	}

	fn register_with_id(
		&self,
		id: u32,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		self.register_entry(Mode::Register, Some(id), key, value)
	}

	fn register_or_override(
		&self,
		id: Option<u32>,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		self.register_entry(Mode::Override, id, key, value)
	}

	fn get_or_create_holder(&self, key: &ResourceKey<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		if !key.is_for(&self.key) {
			return Err(RegistryError::ForeignKey {
				registry: self.key.clone(),
				key: key.to_string(),
			});
		}
		if let Some(holder) = self.tables().by_key.get(key.location()) {
			return Ok(Arc::clone(holder));
		}
		if self.intrusive {
			return Err(RegistryError::IntrusiveOnly {
				registry: self.key.clone(),
				key: key.location().clone(),
			});
		}

		let mut live = self.live.write();
		if let Some(tables) = self.frozen.get() {
			return tables
				.by_key
				.get(key.location())
				.cloned()
				.ok_or_else(|| self.frozen_error(key.location()));
		}
		let holder = live
			.by_key
			.entry(key.location().clone())
			.or_insert_with(|| Arc::new(Reference::standalone(self.owner, self.key.clone(), key.clone())));
		Ok(Arc::clone(holder))
	}

	fn create_intrusive_holder(&self, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		if !self.intrusive {
			return Err(RegistryError::NotIntrusive {
				registry: self.key.clone(),
			});
		}
		let mut live = self.live.write();
		if self.frozen.get().is_some() {
			return Err(self.frozen_error("<intrusive value>"));
		}
		let ptr = ValuePtr::of(&value);
		if let Some(holder) = live.by_value.get(&ptr) {
			return Ok(Arc::clone(holder));
		}
		let holder = live
			.pending_intrusive
			.entry(ptr)
			.or_insert_with(|| Arc::new(Reference::intrusive(self.owner, self.key.clone(), value)));
		Ok(Arc::clone(holder))
	}

	fn supports_intrusive(&self) -> bool {
		self.intrusive
	}

	fn freeze(&self) -> Result<(), RegistryError> {
		if self.is_frozen() {
			return Ok(());
		}
		let mut live = self.live.write();
		if self.is_frozen() {
			return Ok(());
		}

		let unbound = live.unbound_keys();
		let leftover_intrusive = live.pending_intrusive.len();
		if !unbound.is_empty() || leftover_intrusive > 0 {
			return Err(RegistryError::Freeze {
				registry: self.key.clone(),
				unbound,
				leftover_intrusive,
			});
		}

		let tables = std::mem::take(&mut *live);
		let entries = tables.by_location.len();
		// Only reachable once: the write lock is held and `frozen` was empty.
		let _ = self.frozen.set(tables);
		tracing::debug!(registry = %self.key, entries, "registry frozen");
		Ok(())
	}

	fn get_or_create_tag(&self, key: TagKey<T>) -> Arc<TagSet<T>> {
		if let Some(set) = self.tags.load().get(&key) {
			return Arc::clone(set);
		}
		let _reload = self.reload.lock();
		let current = self.tags.load_full();
		if let Some(set) = current.get(&key) {
			return Arc::clone(set);
		}
		let set = Arc::new(TagSet::new(key.clone(), self.owner));
		let mut next = (*current).clone();
		next.insert(key, Arc::clone(&set));
		self.tags.store(Arc::new(next));
		set
	}

	fn bind_tags(&self, tags: TagBindings<T>) -> Result<(), RegistryError> {
		let _reload = self.reload.lock();
		let tables = self.tables();

		for (tag, members) in &tags {
			if !tag.is_for(&self.key) {
				return Err(RegistryError::ForeignKey {
					registry: self.key.clone(),
					key: format!("{tag:?}"),
				});
			}
			for member in members {
				let reference = match member {
					Holder::Direct(_) => {
						return Err(RegistryError::DirectHolderInTag {
							registry: self.key.clone(),
							tag: tag.location().clone(),
						});
					}
					Holder::Reference(reference) => reference,
				};
				let known = reference.is_valid_in(self) && tables.holds(reference);
				if !known {
					return Err(RegistryError::ForeignHolder {
						registry: self.key.clone(),
						tag: tag.location().clone(),
						holder: reference.describe(),
					});
				}
			}
		}

		let current = self.tags.load_full();
		let missing: Vec<&Arc<TagSet<T>>> = current
			.iter()
			.filter(|(tag, _)| !tags.contains_key(*tag))
			.map(|(_, set)| set)
			.collect();
		if !missing.is_empty() {
			let mut names: Vec<String> = missing.iter().map(|set| set.key().location().to_string()).collect();
			names.sort();
			tracing::warn!(
				registry = %self.key,
				missing = %names.join(", "),
				"not all previously defined tags are present in the new tag data"
			);
		}

		let mut reverse: FxHashMap<Key, TagKeys<T>> = FxHashMap::default();
		for (tag, members) in &tags {
			for member in members {
				if let Some(key) = member.unwrap_key() {
					reverse
						.entry(key.location().clone())
						.or_default()
						.insert(tag.clone());
				}
			}
		}

		for set in missing {
			set.bind(Vec::new());
		}
		let mut next = (*current).clone();
		for (tag, members) in tags {
			let set = next
				.entry(tag.clone())
				.or_insert_with(|| Arc::new(TagSet::new(tag, self.owner)));
			set.bind(members);
		}

		for (location, holder) in &tables.by_key {
			holder.bind_tags(reverse.remove(location).unwrap_or_default());
		}
		let count = next.len();
		self.tags.store(Arc::new(next));
		tracing::debug!(registry = %self.key, tags = count, "bound tags");
		Ok(())
	}

	fn reset_tags(&self) {
		let _reload = self.reload.lock();
		for set in self.tags.load().values() {
			set.bind(Vec::new());
		}
		for holder in self.tables().by_key.values() {
			holder.bind_tags(TagKeys::default());
		}
	}
}
