//! Registries that resolve unknown lookups to a default entry.

use std::sync::{Arc, OnceLock};

use lodestone_primitives::{Key, ResourceKey, TagKey};

use crate::error::{RegistryError, ValidationIssue};
use crate::holder::{HolderOwner, OwnerId, Reference};
use crate::settings::{DuplicatePolicy, RegistrySettings};
use crate::simple::SimpleRegistry;
use crate::tag::TagSet;
use crate::traits::{Registry, TagBindings, WritableRegistry};

/// A [`SimpleRegistry`] with a designated default entry.
///
/// `get`, `get_by_key`, `get_by_id`, `key_of`, `resource_key_of` and `id_of`
/// never report a miss: unknown lookups answer with the entry registered under
/// [`DefaultedRegistry::default_key`].
///
/// # Panics
///
/// Those lookups panic on a miss while the default entry is not registered
/// yet. The `*_or_default` methods are the fallible versions and return
/// [`RegistryError::MissingDefault`] instead.
pub struct DefaultedRegistry<T> {
	inner: SimpleRegistry<T>,
	default_key: Key,
	default: OnceLock<Arc<Reference<T>>>,
}

impl<T> DefaultedRegistry<T> {
	pub fn new(key: Key, default_key: Key) -> Self {
		Self::wrap(SimpleRegistry::new(key), default_key)
	}

	pub fn intrusive(key: Key, default_key: Key) -> Self {
		Self::wrap(SimpleRegistry::intrusive(key), default_key)
	}

	fn wrap(inner: SimpleRegistry<T>, default_key: Key) -> Self {
		Self {
			inner,
			default_key,
			default: OnceLock::new(),
		}
	}

	pub fn with_policy(self, policy: DuplicatePolicy) -> Self {
		Self {
			inner: self.inner.with_policy(policy),
			..self
		}
	}

	pub fn with_settings(self, settings: &RegistrySettings) -> Self {
		Self {
			inner: self.inner.with_settings(settings),
			..self
		}
	}

	/// The wrapped registry, without fallback behavior.
	pub fn inner(&self) -> &SimpleRegistry<T> {
		&self.inner
	}

	pub fn default_key(&self) -> &Key {
		&self.default_key
	}

	fn remember(&self, holder: &Arc<Reference<T>>) {
		if holder.is(&self.default_key) {
			let _ = self.default.set(Arc::clone(holder));
		}
	}
}

impl<T: Send + Sync> DefaultedRegistry<T> {
	fn missing_default(&self) -> RegistryError {
		RegistryError::MissingDefault {
			registry: self.inner.key().clone(),
			default: self.default_key.clone(),
		}
	}

	pub fn default_holder(&self) -> Result<Arc<Reference<T>>, RegistryError> {
		self.default
			.get()
			.cloned()
			.ok_or_else(|| self.missing_default())
	}

	pub fn default_value(&self) -> Result<Arc<T>, RegistryError> {
		self.default_holder()?.try_value()
	}

	/// Default entry for a lookup that missed.
	fn fallback(&self) -> Arc<Reference<T>> {
		match self.default_holder() {
			Ok(holder) => holder,
			Err(e) => panic!("{e}"),
		}
	}

	/// Problems that make this registry unusable after bootstrap.
	pub fn validation_issues(&self) -> Vec<ValidationIssue> {
		let mut issues = self.inner.validation_issues();
		if self.default.get().is_none() {
			issues.push(ValidationIssue::MissingDefault {
				registry: self.inner.key().clone(),
				default: self.default_key.clone(),
			});
		}
		issues
	}

	/// Value for `location`, or the default value.
	pub fn value_or_default(&self, location: &Key) -> Result<Arc<T>, RegistryError> {
		match self.inner.get(location) {
			Some(value) => Ok(value),
			None => self.default_value(),
		}
	}

	pub fn value_by_id_or_default(&self, id: u32) -> Result<Arc<T>, RegistryError> {
		match self.inner.get_by_id(id) {
			Some(value) => Ok(value),
			None => self.default_value(),
		}
	}

	/// Location of `value`, or the default key.
	pub fn key_of_or_default(&self, value: &Arc<T>) -> Result<Key, RegistryError> {
		match self.inner.key_of(value) {
			Some(key) => Ok(key),
			None => Ok(self.default_holder()?.try_key()?.location().clone()),
		}
	}
}

impl<T> HolderOwner for DefaultedRegistry<T> {
	fn owner_id(&self) -> OwnerId {
		self.inner.owner_id()
	}
}

impl<T: Send + Sync> Registry<T> for DefaultedRegistry<T> {
	fn key(&self) -> &Key {
		self.inner.key()
	}

	fn is_frozen(&self) -> bool {
		self.inner.is_frozen()
	}

	fn len(&self) -> usize {
		self.inner.len()
	}

	fn contains(&self, location: &Key) -> bool {
		self.inner.contains(location)
	}

	fn contains_key(&self, key: &ResourceKey<T>) -> bool {
		self.inner.contains_key(key)
	}

	fn get(&self, location: &Key) -> Option<Arc<T>> {
		self.inner
			.get(location)
			.or_else(|| Some(self.fallback().value()))
	}

	fn get_by_key(&self, key: &ResourceKey<T>) -> Option<Arc<T>> {
		self.inner
			.get_by_key(key)
			.or_else(|| Some(self.fallback().value()))
	}

	fn get_by_id(&self, id: u32) -> Option<Arc<T>> {
		self.inner
			.get_by_id(id)
			.or_else(|| Some(self.fallback().value()))
	}

	fn key_of(&self, value: &Arc<T>) -> Option<Key> {
		self.resource_key_of(value)
			.map(|key| key.location().clone())
	}

	fn resource_key_of(&self, value: &Arc<T>) -> Option<ResourceKey<T>> {
		self.inner
			.resource_key_of(value)
			.or_else(|| self.fallback().key().cloned())
	}

	fn id_of(&self, value: &Arc<T>) -> Option<u32> {
		self.inner
			.id_of(value)
			.or_else(|| self.inner.id_of(&self.fallback().value()))
	}

	fn holder(&self, key: &ResourceKey<T>) -> Option<Arc<Reference<T>>> {
		self.inner.holder(key)
	}

	fn holder_by_id(&self, id: u32) -> Option<Arc<Reference<T>>> {
		self.inner.holder_by_id(id)
	}

	fn holders(&self) -> Arc<[Arc<Reference<T>>]> {
		self.inner.holders()
	}

	fn keys(&self) -> Vec<Key> {
		self.inner.keys()
	}

	fn tag(&self, key: &TagKey<T>) -> Option<Arc<TagSet<T>>> {
		self.inner.tag(key)
	}

	fn tag_keys(&self) -> Vec<TagKey<T>> {
		self.inner.tag_keys()
	}

	fn is_known_tag(&self, key: &TagKey<T>) -> bool {
		self.inner.is_known_tag(key)
	}
}

impl<T: Send + Sync> WritableRegistry<T> for DefaultedRegistry<T> {
	fn register(&self, key: ResourceKey<T>, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		let holder = self.inner.register(key, value)?;
		self.remember(&holder);
		Ok(holder)
	}

	fn register_with_id(
		&self,
		id: u32,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		let holder = self.inner.register_with_id(id, key, value)?;
		self.remember(&holder);
		Ok(holder)
	}

	fn register_or_override(
		&self,
		id: Option<u32>,
		key: ResourceKey<T>,
		value: Arc<T>,
	) -> Result<Arc<Reference<T>>, RegistryError> {
		let holder = self.inner.register_or_override(id, key, value)?;
		self.remember(&holder);
		Ok(holder)
	}

	fn get_or_create_holder(&self, key: &ResourceKey<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		self.inner.get_or_create_holder(key)
	}

	fn create_intrusive_holder(&self, value: Arc<T>) -> Result<Arc<Reference<T>>, RegistryError> {
		self.inner.create_intrusive_holder(value)
	}

	fn supports_intrusive(&self) -> bool {
		self.inner.supports_intrusive()
	}

	fn freeze(&self) -> Result<(), RegistryError> {
		self.inner.freeze()
	}

	fn get_or_create_tag(&self, key: TagKey<T>) -> Arc<TagSet<T>> {
		self.inner.get_or_create_tag(key)
	}

	fn bind_tags(&self, tags: TagBindings<T>) -> Result<(), RegistryError> {
		self.inner.bind_tags(tags)
	}

	fn reset_tags(&self) {
		self.inner.reset_tags();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Fluid(&'static str);

	fn loc(path: &str) -> Key {
		Key::minecraft(path).unwrap()
	}

	fn fluids() -> DefaultedRegistry<Fluid> {
		DefaultedRegistry::new(loc("fluid"), loc("empty"))
	}

	#[test]
	fn test_falls_back_to_default() {
		let registry = fluids();
		let empty = Arc::new(Fluid("empty"));
		let water = Arc::new(Fluid("water"));
		registry.register(registry.resource_key(loc("water")), Arc::clone(&water)).unwrap();
		registry.register(registry.resource_key(loc("empty")), Arc::clone(&empty)).unwrap();
		registry.freeze().unwrap();

		assert_eq!(registry.get(&loc("water")).unwrap().0, "water");
		assert!(Arc::ptr_eq(&registry.get(&loc("lava")).unwrap(), &empty));
		assert!(Arc::ptr_eq(&registry.get_by_id(42).unwrap(), &empty));
		assert_eq!(registry.key_of(&Arc::new(Fluid("stray"))), Some(loc("empty")));
		assert_eq!(registry.id_of(&Arc::new(Fluid("stray"))), Some(1));
		assert_eq!(registry.key_of(&water), Some(loc("water")));
		assert!(!registry.contains(&loc("lava")));
		assert!(registry.validation_issues().is_empty());
	}

	#[test]
	fn test_missing_default_is_an_error() {
		let registry = fluids();
		registry.register(registry.resource_key(loc("water")), Arc::new(Fluid("water"))).unwrap();

		assert!(matches!(
			registry.value_or_default(&loc("lava")),
			Err(RegistryError::MissingDefault { .. })
		));
		assert!(matches!(
			registry.value_by_id_or_default(9),
			Err(RegistryError::MissingDefault { .. })
		));
		assert!(matches!(
			registry.key_of_or_default(&Arc::new(Fluid("stray"))),
			Err(RegistryError::MissingDefault { .. })
		));
		assert_eq!(
			registry.validation_issues(),
			vec![ValidationIssue::MissingDefault {
				registry: loc("fluid"),
				default: loc("empty"),
			}]
		);
	}

	fn without_default() -> DefaultedRegistry<Fluid> {
		let registry = fluids();
		registry.register(registry.resource_key(loc("water")), Arc::new(Fluid("water"))).unwrap();
		registry
	}

	#[test]
	fn test_hits_do_not_need_the_default() {
		let registry = without_default();
		assert_eq!(registry.get(&loc("water")).unwrap().0, "water");
		assert_eq!(registry.get_by_id(0).unwrap().0, "water");
	}

	#[test]
	#[should_panic(expected = "has not been registered")]
	fn test_get_miss_without_default_panics() {
		let _ = without_default().get(&loc("lava"));
	}

	#[test]
	#[should_panic(expected = "has not been registered")]
	fn test_get_by_key_miss_without_default_panics() {
		let registry = without_default();
		let _ = registry.get_by_key(&registry.resource_key(loc("lava")));
	}

	#[test]
	#[should_panic(expected = "has not been registered")]
	fn test_get_by_id_miss_without_default_panics() {
		let _ = without_default().get_by_id(99);
	}

	#[test]
	#[should_panic(expected = "has not been registered")]
	fn test_key_of_miss_without_default_panics() {
		let _ = without_default().key_of(&Arc::new(Fluid("stray")));
	}

	#[test]
	fn test_default_through_forward_reference() {
		let registry = fluids();
		let pending = registry.get_or_create_holder(&registry.resource_key(loc("empty"))).unwrap();
		assert!(registry.default_holder().is_err());

		registry
			.register_with_id(0, registry.resource_key(loc("empty")), Arc::new(Fluid("empty")))
			.unwrap();
		assert!(Arc::ptr_eq(&registry.default_holder().unwrap(), &pending));
		assert_eq!(registry.default_value().unwrap().0, "empty");
		assert_eq!(registry.value_or_default(&loc("nope")).unwrap().0, "empty");
	}
}
