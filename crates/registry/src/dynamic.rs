//! The registry of registries.
//!
//! # Mental Model
//!
//! A [`DynamicRegistrySet`] is built in three steps:
//!
//! 1. **Declare.** Each sub-registry is filed in a root registry together with
//!    a loader closure. Declaration order is load order.
//! 2. **Bootstrap.** The root is frozen, so the set of registries is fixed.
//!    Loaders then run one by one and each sub-registry is frozen right after
//!    its own loader, so later loaders can rely on earlier registries being
//!    complete.
//! 3. **Validate.** Every sub-registry is checked for unbound holders, bad
//!    tag members and missing defaults. All issues are reported together.
//!
//! The set is an ordinary value: tests build their own, and a server builds
//! one at startup and hands out `Arc`s to the registries it needs.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use lodestone_primitives::{Key, ResourceKey};
use parking_lot::Mutex;

use crate::defaulted::DefaultedRegistry;
use crate::error::{LoaderError, RegistryError, ValidationIssue};
use crate::settings::{DuplicatePolicy, RegistrySettings};
use crate::simple::SimpleRegistry;
use crate::traits::{Registry, WritableRegistry};

/// Type-erased view of a registry, as stored in a [`DynamicRegistrySet`].
pub trait ErasedRegistry: Any + Send + Sync {
	/// Registry name, e.g. `minecraft:block`.
	fn name(&self) -> &Key;

	fn size(&self) -> usize;

	fn frozen(&self) -> bool;

	/// Freezes the registry.
	fn seal(&self) -> Result<(), RegistryError>;

	/// Whole-registry consistency check.
	fn validate(&self) -> Vec<ValidationIssue>;

	fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + Sync + 'static> ErasedRegistry for SimpleRegistry<T> {
	fn name(&self) -> &Key {
		self.key()
	}

	fn size(&self) -> usize {
		self.len()
	}

	fn frozen(&self) -> bool {
		self.is_frozen()
	}

	fn seal(&self) -> Result<(), RegistryError> {
		self.freeze()
	}

	fn validate(&self) -> Vec<ValidationIssue> {
		self.validation_issues()
	}

	fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
		self
	}
}

impl<T: Send + Sync + 'static> ErasedRegistry for DefaultedRegistry<T> {
	fn name(&self) -> &Key {
		self.key()
	}

	fn size(&self) -> usize {
		self.len()
	}

	fn frozen(&self) -> bool {
		self.is_frozen()
	}

	fn seal(&self) -> Result<(), RegistryError> {
		self.freeze()
	}

	fn validate(&self) -> Vec<ValidationIssue> {
		self.validation_issues()
	}

	fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
		self
	}
}

/// Entry of the root registry.
pub struct RegistrySlot {
	registry: Arc<dyn ErasedRegistry>,
}

impl RegistrySlot {
	pub fn registry(&self) -> &Arc<dyn ErasedRegistry> {
		&self.registry
	}

	/// Recovers the concrete registry type.
	pub fn downcast<R: ErasedRegistry>(&self) -> Option<Arc<R>> {
		Arc::clone(&self.registry).as_any_arc().downcast::<R>().ok()
	}
}

impl fmt::Debug for RegistrySlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegistrySlot")
			.field("name", self.registry.name())
			.field("size", &self.registry.size())
			.finish()
	}
}

type Loader = Box<dyn FnOnce() -> Result<(), LoaderError> + Send>;

struct PendingLoader {
	registry: Arc<dyn ErasedRegistry>,
	run: Loader,
}

enum Phase {
	Declaring,
	Ready,
	Failed(Key),
}

/// Name of the root registry that holds every sub-registry.
pub fn root_key() -> Key {
	Key::from_static("minecraft", "root")
}

/// Ordered set of registries with deferred loaders.
pub struct DynamicRegistrySet {
	root: SimpleRegistry<RegistrySlot>,
	loaders: Mutex<Vec<PendingLoader>>,
	/// Held for the whole bootstrap; loaders must not call `bootstrap`.
	phase: Mutex<Phase>,
	ready: OnceLock<()>,
	settings: RegistrySettings,
}

impl Default for DynamicRegistrySet {
	fn default() -> Self {
		Self::new(RegistrySettings::default())
	}
}

impl DynamicRegistrySet {
	pub fn new(settings: RegistrySettings) -> Self {
		Self {
			root: SimpleRegistry::new(root_key()).with_policy(DuplicatePolicy::Reject),
			loaders: Mutex::new(Vec::new()),
			phase: Mutex::new(Phase::Declaring),
			ready: OnceLock::new(),
			settings,
		}
	}

	pub fn settings(&self) -> &RegistrySettings {
		&self.settings
	}

	/// The root registry; its entries are the declared registries.
	pub fn root(&self) -> &SimpleRegistry<RegistrySlot> {
		&self.root
	}

	/// Files `registry` and schedules `loader` to populate it during
	/// [`DynamicRegistrySet::bootstrap`].
	///
	/// Fails with [`RegistryError::DuplicateKey`] for a name that is already
	/// declared and with [`RegistryError::Frozen`] once bootstrap started.
	pub fn declare<R, F>(&self, registry: R, loader: F) -> Result<Arc<R>, RegistryError>
	where
		R: ErasedRegistry,
		F: FnOnce(&R) -> Result<(), LoaderError> + Send + 'static,
	{
		let registry = Arc::new(registry);
		let erased: Arc<dyn ErasedRegistry> = registry.clone();
		let key = self.root.resource_key(registry.name().clone());

		let mut loaders = self.loaders.lock();
		self.root.register(
			key,
			Arc::new(RegistrySlot {
				registry: Arc::clone(&erased),
			}),
		)?;
		let target = Arc::clone(&registry);
		loaders.push(PendingLoader {
			registry: erased,
			run: Box::new(move || loader(&target)),
		});
		Ok(registry)
	}

	pub fn declare_simple<T, F>(&self, key: Key, loader: F) -> Result<Arc<SimpleRegistry<T>>, RegistryError>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&SimpleRegistry<T>) -> Result<(), LoaderError> + Send + 'static,
	{
		self.declare(SimpleRegistry::new(key).with_settings(&self.settings), loader)
	}

	pub fn declare_intrusive<T, F>(&self, key: Key, loader: F) -> Result<Arc<SimpleRegistry<T>>, RegistryError>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&SimpleRegistry<T>) -> Result<(), LoaderError> + Send + 'static,
	{
		self.declare(SimpleRegistry::intrusive(key).with_settings(&self.settings), loader)
	}

	pub fn declare_defaulted<T, F>(
		&self,
		key: Key,
		default_key: Key,
		loader: F,
	) -> Result<Arc<DefaultedRegistry<T>>, RegistryError>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&DefaultedRegistry<T>) -> Result<(), LoaderError> + Send + 'static,
	{
		self.declare(DefaultedRegistry::new(key, default_key).with_settings(&self.settings), loader)
	}

	pub fn declare_defaulted_intrusive<T, F>(
		&self,
		key: Key,
		default_key: Key,
		loader: F,
	) -> Result<Arc<DefaultedRegistry<T>>, RegistryError>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&DefaultedRegistry<T>) -> Result<(), LoaderError> + Send + 'static,
	{
		self.declare(
			DefaultedRegistry::intrusive(key, default_key).with_settings(&self.settings),
			loader,
		)
	}

	/// Loads, freezes and validates every declared registry.
	///
	/// Calling it again after success is a no-op. After a failure every later
	/// call fails too, naming the registry that broke the first attempt.
	pub fn bootstrap(&self) -> Result<(), RegistryError> {
		let mut phase = self.phase.lock();
		match &*phase {
			Phase::Ready => return Ok(()),
			Phase::Failed(registry) => {
				return Err(RegistryError::Bootstrap {
					registry: registry.clone(),
					source: "an earlier bootstrap attempt failed".into(),
				});
			}
			Phase::Declaring => {}
		}

		let pending = {
			let mut loaders = self.loaders.lock();
			self.root.freeze()?;
			std::mem::take(&mut *loaders)
		};

		for PendingLoader { registry, run } in pending {
			let name = registry.name().clone();
			let loaded = run().and_then(|()| registry.seal().map_err(LoaderError::from));
			if let Err(source) = loaded {
				*phase = Phase::Failed(name.clone());
				return Err(RegistryError::Bootstrap { registry: name, source });
			}
			tracing::info!(registry = %name, entries = registry.size(), "loaded registry");
		}

		if let Err(e) = self.validate() {
			*phase = Phase::Failed(self.root.key().clone());
			return Err(e);
		}
		*phase = Phase::Ready;
		let _ = self.ready.set(());
		Ok(())
	}

	/// Checks every declared registry and reports all issues at once.
	pub fn validate(&self) -> Result<(), RegistryError> {
		let mut issues = Vec::new();
		for registry in self.registries() {
			if self.settings.warn_on_empty && registry.size() == 0 {
				tracing::warn!(registry = %registry.name(), "registry is empty after bootstrap");
			}
			issues.extend(registry.validate());
		}
		if issues.is_empty() {
			Ok(())
		} else {
			Err(RegistryError::Validation { issues })
		}
	}

	pub fn is_bootstrapped(&self) -> bool {
		self.ready.get().is_some()
	}

	/// Declared registries in declaration order.
	pub fn registries(&self) -> Vec<Arc<dyn ErasedRegistry>> {
		self.root
			.holders()
			.iter()
			.filter_map(|holder| holder.try_value().ok())
			.map(|slot| Arc::clone(&slot.registry))
			.collect()
	}

	/// Returns the registry named `key` as its concrete type.
	pub fn registry<R: ErasedRegistry>(&self, key: &Key) -> Option<Arc<R>> {
		self.root.get(key)?.downcast::<R>()
	}

	/// Typed lookup by the registry's own key under [`root_key`].
	pub fn registry_by_key<R: ErasedRegistry>(&self, key: &ResourceKey<R>) -> Option<Arc<R>> {
		self.root.get_by_key(&key.cast())?.downcast::<R>()
	}

	pub fn erased(&self, key: &Key) -> Option<Arc<dyn ErasedRegistry>> {
		self.root
			.get(key)
			.map(|slot| Arc::clone(&slot.registry))
	}

	pub fn contains(&self, key: &Key) -> bool {
		self.root.contains(key)
	}

	pub fn len(&self) -> usize {
		self.root.len()
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}
}

impl fmt::Debug for DynamicRegistrySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DynamicRegistrySet")
			.field("registries", &self.root.keys())
			.field("bootstrapped", &self.is_bootstrapped())
			.finish()
	}
}

#[cfg(test)]
mod tests;
