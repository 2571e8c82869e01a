//! Holder-based registries for game objects.
//!
//! Every typed game object (blocks, items, biomes, game rules, ...) lives in a
//! registry that gives it a stable [`Key`], a numeric id and an
//! identity-bearing [`Reference`] holder. Registries are filled during a
//! single-threaded bootstrap, frozen, and then read concurrently. Tags are the
//! only data that changes after freeze.
//!
//! # Modules
//!
//! - [`holder`] - Direct and reference holders, bind-once semantics
//! - [`tag`] - Reloadable named holder sets
//! - [`traits`] - [`Registry`] and [`WritableRegistry`] contracts
//! - [`simple`] - The plain [`SimpleRegistry`]
//! - [`defaulted`] - [`DefaultedRegistry`] with fallback lookups
//! - [`codec`] - Failing name/id lookups and serde adapters
//! - [`loader`] - Ordered bootstrap tables
//! - [`settings`] - Duplicate policy and other knobs
//! - [`dynamic`] - [`DynamicRegistrySet`], the registry of registries
//!
//! # Bootstrap
//!
//! 1. Declare registries on a [`DynamicRegistrySet`] with their loaders.
//! 2. Call [`DynamicRegistrySet::bootstrap`]; it runs loaders in order and
//!    freezes each registry right after its loader.
//! 3. Bind tags with [`WritableRegistry::bind_tags`] whenever tag data is
//!    (re)loaded.

pub mod codec;
pub mod defaulted;
pub mod dynamic;
pub mod error;
pub mod holder;
pub mod loader;
pub mod settings;
pub mod simple;
pub mod tag;
pub mod traits;

pub use codec::{CodecError, RegistryCodec, RegistryLookup};
pub use defaulted::DefaultedRegistry;
pub use dynamic::{DynamicRegistrySet, ErasedRegistry, RegistrySlot, root_key};
pub use error::{LoaderError, RegistryError, ValidationIssue};
pub use holder::{Holder, HolderKind, HolderOwner, OwnerId, Reference, ReferenceKind};
pub use loader::RegistryLoader;
pub use lodestone_primitives::{Key, KeyError, ResourceKey, TagKey};
pub use settings::{DuplicatePolicy, RegistrySettings, SettingsError};
pub use simple::{MAX_ID, SimpleRegistry};
pub use tag::{TagMap, TagMembers, TagSet};
pub use traits::{RegistrationLookup, Registry, TagBindings, WritableRegistry};

/// Traits needed to call registry methods.
pub mod prelude {
	pub use crate::codec::RegistryLookup;
	pub use crate::dynamic::ErasedRegistry;
	pub use crate::traits::{Registry, WritableRegistry};
}
