//! Tag identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::key::Key;

/// Names a holder set inside one registry.
///
/// Shaped like [`crate::ResourceKey`] but a distinct type, so tag names and
/// entry names never collide even when their locations are equal.
pub struct TagKey<T: ?Sized> {
	registry: Key,
	location: Key,
	_marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> TagKey<T> {
	pub fn new(registry: Key, location: Key) -> Self {
		Self {
			registry,
			location,
			_marker: PhantomData,
		}
	}

	pub fn registry(&self) -> &Key {
		&self.registry
	}

	pub fn location(&self) -> &Key {
		&self.location
	}

	/// Returns true if this tag belongs to the registry named `registry`.
	pub fn is_for(&self, registry: &Key) -> bool {
		&self.registry == registry
	}
}

impl<T: ?Sized> Clone for TagKey<T> {
	fn clone(&self) -> Self {
		Self::new(self.registry.clone(), self.location.clone())
	}
}

impl<T: ?Sized> PartialEq for TagKey<T> {
	fn eq(&self, other: &Self) -> bool {
		self.registry == other.registry && self.location == other.location
	}
}

impl<T: ?Sized> Eq for TagKey<T> {}

impl<T: ?Sized> Hash for TagKey<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.registry.hash(state);
		self.location.hash(state);
	}
}

impl<T: ?Sized> fmt::Display for TagKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.location)
	}
}

impl<T: ?Sized> fmt::Debug for TagKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TagKey[{} / {}]", self.registry, self.location)
	}
}
