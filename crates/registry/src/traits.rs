//! Read and write contracts shared by every registry.

use std::sync::Arc;

use indexmap::IndexMap;
use lodestone_primitives::{Key, ResourceKey, TagKey};
use rustc_hash::FxBuildHasher;

use crate::error::RegistryError;
use crate::holder::{Holder, HolderOwner, Reference};
use crate::tag::TagSet;

/// Fully resolved tag contents handed to [`WritableRegistry::bind_tags`].
pub type TagBindings<T> = IndexMap<TagKey<T>, Vec<Holder<T>>, FxBuildHasher>;

/// Read access to a catalog of `T` values.
///
/// Lookups return owned handles (`Arc`) so callers never borrow registry
/// internals across a tag reload. Absence is reported as `None`; see
/// [`crate::RegistryLookup`] for the failing variants used by codecs.
pub trait Registry<T>: HolderOwner + Send + Sync {
	/// Name of this registry, e.g. `minecraft:block`.
	fn key(&self) -> &Key;

	fn is_frozen(&self) -> bool;

	/// Number of registered entries.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn contains(&self, location: &Key) -> bool;

	fn contains_key(&self, key: &ResourceKey<T>) -> bool;

	fn get(&self, location: &Key) -> Option<Arc<T>>;

	fn get_by_key(&self, key: &ResourceKey<T>) -> Option<Arc<T>>;

	fn get_by_id(&self, id: u32) -> Option<Arc<T>>;

	/// Location under which `value` (by identity) is registered.
	fn key_of(&self, value: &Arc<T>) -> Option<Key>;

	fn resource_key_of(&self, value: &Arc<T>) -> Option<ResourceKey<T>>;

	fn id_of(&self, value: &Arc<T>) -> Option<u32>;

	/// The single reference for `key`, bound or not.
	fn holder(&self, key: &ResourceKey<T>) -> Option<Arc<Reference<T>>>;

	fn holder_by_id(&self, id: u32) -> Option<Arc<Reference<T>>>;

	/// Registered references in id order.
	fn holders(&self) -> Arc<[Arc<Reference<T>>]>;

	/// Registered locations, in no particular order.
	fn keys(&self) -> Vec<Key>;

	fn tag(&self, key: &TagKey<T>) -> Option<Arc<TagSet<T>>>;

	fn tag_keys(&self) -> Vec<TagKey<T>>;

	fn is_known_tag(&self, key: &TagKey<T>) -> bool;

	/// Scopes `location` to this registry.
	fn resource_key(&self, location: Key) -> ResourceKey<T> {
		ResourceKey::new(self.key().clone(), location)
	}

	fn tag_key(&self, location: Key) -> TagKey<T> {
		TagKey::new(self.key().clone(), location)
	}

	fn holder_by_location(&self, location: &Key) -> Option<Arc<Reference<T>>> {
		self.holder(&self.resource_key(location.clone()))
	}
}

/// Bootstrap-time write access.
///
/// Writes happen on a single thread before [`WritableRegistry::freeze`]; the
/// tag methods are the only ones allowed afterwards.
pub trait WritableRegistry<T>: Registry<T> {
	/// Registers `value` under `key` with the next free id.
	fn register(&self, key: ResourceKey<T>, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError>;

	/// Registers `value` under `key` with an explicit id.
	fn register_with_id(
		&self,
		id: u32,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError>;

	/// Replaces the value bound to `key`, keeping its id.
	fn register_or_override(
		&self,
		id: Option<u32>,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError>;

	/// Returns the reference for `key`, creating an unbound one if needed.
	fn get_or_create_holder(&self, key: &ResourceKey<T>) -> Result<Arc<Reference<T>>, RegistryError>;

	/// Creates (or returns the pending) intrusive reference for `value`.
	fn create_intrusive_holder(&self, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError>;

	fn supports_intrusive(&self) -> bool;

	/// Validates holders and makes the identity tables read-only. Idempotent.
	fn freeze(&self) -> Result<(), RegistryError>;

	/// Returns the tag set for `key`, creating an empty one on first use.
	fn get_or_create_tag(&self, key: TagKey<T>) -> Arc<TagSet<T>>;

	/// Replaces all tag memberships with `tags`.
	fn bind_tags(&self, tags: TagBindings<T>) -> Result<(), RegistryError>;

	/// Empties every tag and every holder's reverse tag set.
	fn reset_tags(&self);

	/// Registers `value` under `location` in this registry.
	fn register_as(&self, location: Key, value: T) -> Result<Arc<Reference<T>>, RegistryError> {
		self.register(self.resource_key(location), Arc::new(value))
	}

	/// Forward-reference lookup used while other entries are still loading.
	fn registration_lookup(&self) -> RegistrationLookup<'_, T>
	where
		Self: Sized,
	{
		RegistrationLookup { registry: self }
	}
}

/// Hands out (possibly unbound) references for keys that are registered later.
pub struct RegistrationLookup<'a, T> {
	registry: &'a dyn WritableRegistry<T>,
}

impl<T> RegistrationLookup<'_, T> {
	pub fn get(&self, key: &ResourceKey<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		self.registry.get_or_create_holder(key)
	}

	/// Like [`RegistrationLookup::get`], scoped to the registry's name.
	pub fn get_location(&self, location: &Key) -> Result<Arc<Reference<T>>, RegistryError> {
		self.get(&self.registry.resource_key(location.clone()))
	}

	/// Returns a [`Holder`] wrapping the reference for `key`.
	pub fn holder(&self, key: &ResourceKey<T>) -> Result<Holder<T>, RegistryError> {
		self.get(key).map(Holder::Reference)
	}
}
