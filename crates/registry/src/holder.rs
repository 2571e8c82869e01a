//! Holders: indirection cells around registry values.
//!
//! # Mental Model
//!
//! A [`Holder`] is either [`Holder::Direct`], an inline value with no identity,
//! or [`Holder::Reference`], an identity-bearing cell owned by one registry.
//! References are allocated before their payload is known and bound later:
//!
//! - **Standalone** references start with a key and no value. They are handed
//!   out by forward lookups so code can hold an entry that is registered later.
//! - **Intrusive** references start with a value and no key. They are created
//!   for values that need to carry their own holder before being filed.
//!
//! Binding fills in the missing half exactly once. Rebinding with the same key
//! (or, for intrusive references, the same value object) is a no-op; anything
//! else is a [`RegistryError`].
//!
//! # Invariants
//!
//! - A reference never changes its key once set.
//! - An intrusive reference never changes its value object.
//! - Equality and hashing use pointer identity, never structural equality.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::{ArcSwap, ArcSwapOption};
use lodestone_primitives::{Key, ResourceKey, TagKey};
use rustc_hash::FxHashSet;

use crate::error::RegistryError;

/// Identity of the registry instance that owns a reference holder.
///
/// Two registries with equal names still get distinct ids, so holders can
/// never be mixed up between registry instances that share a value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// Anything that owns reference holders.
pub trait HolderOwner {
	fn owner_id(&self) -> OwnerId;
}

impl HolderOwner for OwnerId {
	fn owner_id(&self) -> OwnerId {
		*self
	}
}

/// Which variant a [`Holder`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderKind {
	Direct,
	Reference,
}

/// How a [`Reference`] was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
	/// Created from a key; the value arrives at registration.
	Standalone,
	/// Created from a value; the key arrives at registration.
	Intrusive,
}

/// Reverse tag index stored on each reference.
pub type TagKeys<T> = FxHashSet<TagKey<T>>;

/// Pointer identity of a registered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ValuePtr(usize);

impl ValuePtr {
	pub(crate) fn of<T>(value: &Arc<T>) -> Self {
		Self(Arc::as_ptr(value) as usize)
	}
}

/// Identity-bearing holder owned by one registry.
pub struct Reference<T> {
	kind: ReferenceKind,
	owner: OwnerId,
	registry: Key,
	key: OnceLock<ResourceKey<T>>,
	value: ArcSwapOption<T>,
	tags: ArcSwap<TagKeys<T>>,
}

impl<T> Reference<T> {
	pub(crate) fn standalone(owner: OwnerId, registry: Key, key: ResourceKey<T>) -> Self {
		Self {
			kind: ReferenceKind::Standalone,
			owner,
			registry,
			key: OnceLock::from(key),
			value: ArcSwapOption::empty(),
			tags: ArcSwap::from_pointee(TagKeys::default()),
		}
	}

	pub(crate) fn intrusive(owner: OwnerId, registry: Key, value: Arc<T>) -> Self {
		Self {
			kind: ReferenceKind::Intrusive,
			owner,
			registry,
			key: OnceLock::new(),
			value: ArcSwapOption::new(Some(value)),
			tags: ArcSwap::from_pointee(TagKeys::default()),
		}
	}

	pub fn kind(&self) -> ReferenceKind {
		self.kind
	}

	/// Name of the owning registry.
	pub fn registry(&self) -> &Key {
		&self.registry
	}

	/// True once both the key and the value are present.
	pub fn is_bound(&self) -> bool {
		self.key.get().is_some() && self.value.load().is_some()
	}

	/// Returns the key, if bound.
	pub fn key(&self) -> Option<&ResourceKey<T>> {
		self.key.get()
	}

	pub fn try_key(&self) -> Result<&ResourceKey<T>, RegistryError> {
		self.key.get().ok_or_else(|| self.unbound_error())
	}

	pub fn try_value(&self) -> Result<Arc<T>, RegistryError> {
		self.value.load_full().ok_or_else(|| self.unbound_error())
	}

	/// Returns the bound value.
	///
	/// # Panics
	///
	/// Panics if the reference has not been bound yet. Every reference is bound
	/// once its registry has been frozen.
	pub fn value(&self) -> Arc<T> {
		match self.try_value() {
			Ok(value) => value,
			Err(e) => panic!("{e}"),
		}
	}

	/// Returns a snapshot of the tags this reference currently belongs to.
	pub fn tags(&self) -> Arc<TagKeys<T>> {
		self.tags.load_full()
	}

	pub fn has_tag(&self, tag: &TagKey<T>) -> bool {
		self.tags.load().contains(tag)
	}

	/// True if this reference belongs to `owner` (identity, not name).
	pub fn is_valid_in(&self, owner: &impl HolderOwner) -> bool {
		self.owner == owner.owner_id()
	}

	/// True if the bound key's location is `location`.
	pub fn is(&self, location: &Key) -> bool {
		self.key().is_some_and(|key| key.location() == location)
	}

	/// Checks whether `bind(key, value)` would succeed without changing anything.
	pub(crate) fn check_bind(&self, key: &ResourceKey<T>, value: &Arc<T>) -> Result<(), RegistryError> {
		if let Some(existing) = self.key.get()
			&& existing != key
		{
			return Err(RegistryError::HolderKeyConflict {
				registry: self.registry.clone(),
				existing: existing.location().clone(),
				new: key.location().clone(),
			});
		}
		if self.kind == ReferenceKind::Intrusive {
			let current = self.value.load();
			if let Some(existing) = current.as_ref()
				&& !Arc::ptr_eq(existing, value)
			{
				return Err(RegistryError::IntrusiveValueConflict {
					registry: self.registry.clone(),
					key: key.location().clone(),
				});
			}
		}
		Ok(())
	}

	pub(crate) fn bind(&self, key: ResourceKey<T>, value: Arc<T>) -> Result<(), RegistryError> {
		self.check_bind(&key, &value)?;
		// The key is either unset or equal, so a lost race on `set` is harmless.
		let _ = self.key.set(key);
		self.value.store(Some(value));
		Ok(())
	}

	pub(crate) fn bind_tags(&self, tags: TagKeys<T>) {
		self.tags.store(Arc::new(tags));
	}

	fn unbound_error(&self) -> RegistryError {
		RegistryError::UnboundHolder {
			registry: self.registry.clone(),
			holder: self.describe(),
		}
	}

	/// Human-readable name used in diagnostics.
	pub(crate) fn describe(&self) -> String {
		match (self.key.get(), self.kind) {
			(Some(key), _) => key.location().to_string(),
			(None, ReferenceKind::Intrusive) => "<intrusive value>".to_string(),
			(None, ReferenceKind::Standalone) => "<unkeyed>".to_string(),
		}
	}
}

impl<T> fmt::Debug for Reference<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reference")
			.field("kind", &self.kind)
			.field("registry", &self.registry)
			.field("key", &self.key.get().map(|key| key.location()))
			.field("bound", &self.is_bound())
			.finish()
	}
}

/// Indirection cell around a registry value.
pub enum Holder<T> {
	/// Inline value with no registry identity.
	Direct(Arc<T>),
	/// Identity-bearing reference owned by one registry.
	Reference(Arc<Reference<T>>),
}

impl<T> Holder<T> {
	/// Wraps an ad-hoc value.
	pub fn direct(value: T) -> Self {
		Self::Direct(Arc::new(value))
	}

	pub fn kind(&self) -> HolderKind {
		match self {
			Self::Direct(_) => HolderKind::Direct,
			Self::Reference(_) => HolderKind::Reference,
		}
	}

	pub fn is_bound(&self) -> bool {
		match self {
			Self::Direct(_) => true,
			Self::Reference(reference) => reference.is_bound(),
		}
	}

	/// Returns the value.
	///
	/// # Panics
	///
	/// Panics on an unbound reference; see [`Reference::value`].
	pub fn value(&self) -> Arc<T> {
		match self {
			Self::Direct(value) => Arc::clone(value),
			Self::Reference(reference) => reference.value(),
		}
	}

	pub fn try_value(&self) -> Result<Arc<T>, RegistryError> {
		match self {
			Self::Direct(value) => Ok(Arc::clone(value)),
			Self::Reference(reference) => reference.try_value(),
		}
	}

	/// Returns the tags this holder belongs to; always empty for direct holders.
	pub fn tags(&self) -> Vec<TagKey<T>> {
		match self {
			Self::Direct(_) => Vec::new(),
			Self::Reference(reference) => reference.tags().iter().cloned().collect(),
		}
	}

	pub fn has_tag(&self, tag: &TagKey<T>) -> bool {
		match self {
			Self::Direct(_) => false,
			Self::Reference(reference) => reference.has_tag(tag),
		}
	}

	/// Direct holders are valid anywhere; references only in their owner.
	pub fn is_valid_in(&self, owner: &impl HolderOwner) -> bool {
		match self {
			Self::Direct(_) => true,
			Self::Reference(reference) => reference.is_valid_in(owner),
		}
	}

	/// Returns the key of a bound reference.
	pub fn unwrap_key(&self) -> Option<ResourceKey<T>> {
		match self {
			Self::Direct(_) => None,
			Self::Reference(reference) => reference.key().cloned(),
		}
	}

	/// True if this is a reference whose location is `location`.
	pub fn is(&self, location: &Key) -> bool {
		match self {
			Self::Direct(_) => false,
			Self::Reference(reference) => reference.is(location),
		}
	}

	pub fn is_key(&self, key: &ResourceKey<T>) -> bool {
		match self {
			Self::Direct(_) => false,
			Self::Reference(reference) => reference.key() == Some(key),
		}
	}

	/// True if this is a keyed reference whose key satisfies `predicate`.
	pub fn matches(&self, predicate: impl FnOnce(&ResourceKey<T>) -> bool) -> bool {
		match self {
			Self::Direct(_) => false,
			Self::Reference(reference) => reference.key().is_some_and(predicate),
		}
	}

	pub fn as_reference(&self) -> Option<&Arc<Reference<T>>> {
		match self {
			Self::Direct(_) => None,
			Self::Reference(reference) => Some(reference),
		}
	}

	fn identity(&self) -> usize {
		match self {
			Self::Direct(value) => Arc::as_ptr(value) as usize,
			Self::Reference(reference) => Arc::as_ptr(reference) as usize,
		}
	}
}

impl<T> From<Arc<Reference<T>>> for Holder<T> {
	fn from(reference: Arc<Reference<T>>) -> Self {
		Self::Reference(reference)
	}
}

impl<T> Clone for Holder<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Direct(value) => Self::Direct(Arc::clone(value)),
			Self::Reference(reference) => Self::Reference(Arc::clone(reference)),
		}
	}
}

impl<T> PartialEq for Holder<T> {
	fn eq(&self, other: &Self) -> bool {
		self.kind() == other.kind() && self.identity() == other.identity()
	}
}

impl<T> Eq for Holder<T> {}

impl<T> Hash for Holder<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.identity().hash(state);
	}
}

impl<T> fmt::Debug for Holder<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Direct(_) => f.write_str("Direct(..)"),
			Self::Reference(reference) => fmt::Debug::fmt(reference, f),
		}
	}
}

#[cfg(test)]
mod tests;
