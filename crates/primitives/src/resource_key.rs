//! Registry-scoped identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::key::Key;

/// Identifies one entry in one specific registry.
///
/// The same `location` may appear in several registries; the `registry` half
/// keeps those identities apart. `T` only tags the key at the type level, so
/// no trait bounds are placed on it.
pub struct ResourceKey<T: ?Sized> {
	registry: Key,
	location: Key,
	_marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> ResourceKey<T> {
	pub fn new(registry: Key, location: Key) -> Self {
		Self {
			registry,
			location,
			_marker: PhantomData,
		}
	}

	/// Name of the registry this key belongs to.
	pub fn registry(&self) -> &Key {
		&self.registry
	}

	/// Name of the entry inside its registry.
	pub fn location(&self) -> &Key {
		&self.location
	}

	/// Returns true if this key belongs to the registry named `registry`.
	pub fn is_for(&self, registry: &Key) -> bool {
		&self.registry == registry
	}

	/// Re-types the same identity, e.g. to file a registry under the root registry.
	pub fn cast<U: ?Sized>(&self) -> ResourceKey<U> {
		ResourceKey::new(self.registry.clone(), self.location.clone())
	}
}

impl<T: ?Sized> Clone for ResourceKey<T> {
	fn clone(&self) -> Self {
		Self::new(self.registry.clone(), self.location.clone())
	}
}

impl<T: ?Sized> PartialEq for ResourceKey<T> {
	fn eq(&self, other: &Self) -> bool {
		self.registry == other.registry && self.location == other.location
	}
}

impl<T: ?Sized> Eq for ResourceKey<T> {}

impl<T: ?Sized> Hash for ResourceKey<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.registry.hash(state);
		self.location.hash(state);
	}
}

impl<T: ?Sized> PartialOrd for ResourceKey<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T: ?Sized> Ord for ResourceKey<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.registry
			.cmp(&other.registry)
			.then_with(|| self.location.cmp(&other.location))
	}
}

impl<T: ?Sized> fmt::Display for ResourceKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ResourceKey[{} / {}]", self.registry, self.location)
	}
}

impl<T: ?Sized> fmt::Debug for ResourceKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}
