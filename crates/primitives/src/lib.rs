//! Identifier types shared by every registry: plain keys, registry-scoped
//! resource keys, and tag keys.

/// Namespaced `namespace:path` identifiers.
pub mod key;
/// Keys naming one entry in one registry.
pub mod resource_key;
/// Keys naming a tag in one registry.
pub mod tag_key;

pub use key::{DEFAULT_NAMESPACE, Key, KeyError};
pub use resource_key::ResourceKey;
pub use tag_key::TagKey;
