//! Ordered bootstrap tables.
//!
//! A [`RegistryLoader`] lists the entries of one registry as `(location,
//! factory)` pairs. Entries are registered in the order they were added, so
//! implicit ids follow declaration order. Factories receive their own
//! location, which lets one constructor serve many entries:
//!
//! ```ignore
//! let loader = RegistryLoader::new()
//! 	.add(Key::minecraft("keep_inventory")?, |_| GameRule::flag(false))
//! 	.add(Key::minecraft("random_tick_speed")?, |_| GameRule::int(3));
//! loader.load_into(&rules)?;
//! ```

use std::fmt;
use std::sync::Arc;

use lodestone_primitives::Key;

use crate::error::RegistryError;
use crate::traits::{Registry, WritableRegistry};

type Factory<T> = Box<dyn FnOnce(&Key) -> T + Send>;

pub struct RegistryLoader<T> {
	entries: Vec<(Key, Factory<T>)>,
}

impl<T> Default for RegistryLoader<T> {
	fn default() -> Self {
		Self { entries: Vec::new() }
	}
}

impl<T> RegistryLoader<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an entry.
	pub fn add(mut self, location: Key, factory: impl FnOnce(&Key) -> T + Send + 'static) -> Self {
		self.entries.push((location, Box::new(factory)));
		self
	}

	/// Appends an entry whose value is already built.
	pub fn add_value(self, location: Key, value: T) -> Self
	where
		T: Send + 'static,
	{
		self.add(location, move |_| value)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Locations in registration order.
	pub fn locations(&self) -> impl Iterator<Item = &Key> {
		self.entries.iter().map(|(location, _)| location)
	}

	/// Builds and registers every entry, in order. Intrusive registries get
	/// their holder created right before each registration.
	///
	/// Stops at the first failure; entries registered before it stay.
	pub fn load_into(self, registry: &dyn WritableRegistry<T>) -> Result<usize, RegistryError> {
		let count = self.entries.len();
		for (location, factory) in self.entries {
			let value = Arc::new(factory(&location));
			if registry.supports_intrusive() {
				registry.create_intrusive_holder(Arc::clone(&value))?;
			}
			registry.register(registry.resource_key(location), value)?;
		}
		Ok(count)
	}
}

impl<T> fmt::Debug for RegistryLoader<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.locations()).finish()
	}
}
