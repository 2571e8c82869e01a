//! Registry behavior settings.
//!
//! Settings are plain serde data so they can live in the server config file:
//!
//! ```toml
//! duplicate_policy = "last_wins"
//! warn_on_empty = true
//!
//! [overrides]
//! "minecraft:root" = "reject"
//! ```

use std::collections::BTreeMap;

use lodestone_primitives::Key;
use serde::{Deserialize, Serialize};

/// What `register` does when a key, value, or id is already taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Log a warning; the later registration wins in every lookup table.
	#[default]
	LastWins,
	/// Return an error and leave the registry unchanged.
	Reject,
}

/// Settings applied to registries created through a
/// [`crate::DynamicRegistrySet`] (or passed explicitly to constructors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
	pub duplicate_policy: DuplicatePolicy,
	/// Log a warning for registries that are still empty after bootstrap.
	pub warn_on_empty: bool,
	/// Per-registry duplicate policies, keyed by registry name.
	pub overrides: BTreeMap<Key, DuplicatePolicy>,
}

impl Default for RegistrySettings {
	fn default() -> Self {
		Self {
			duplicate_policy: DuplicatePolicy::default(),
			warn_on_empty: true,
			overrides: BTreeMap::new(),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("invalid registry settings: {0}")]
	Toml(#[from] toml::de::Error),
}

impl RegistrySettings {
	/// Parses settings from a TOML document. Missing fields take defaults.
	pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(s)?)
	}

	/// Effective duplicate policy for the registry named `registry`.
	pub fn policy_for(&self, registry: &Key) -> DuplicatePolicy {
		self.overrides
			.get(registry)
			.copied()
			.unwrap_or(self.duplicate_policy)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_from_empty_document() {
		let settings = RegistrySettings::from_toml_str("").unwrap();
		assert_eq!(settings, RegistrySettings::default());
		assert!(settings.warn_on_empty);
	}

	#[test]
	fn test_overrides_resolve_per_registry() {
		let settings = RegistrySettings::from_toml_str(
			r#"
			duplicate_policy = "last_wins"

			[overrides]
			"minecraft:block" = "reject"
			"#,
		)
		.unwrap();
		let block = Key::minecraft("block").unwrap();
		let item = Key::minecraft("item").unwrap();
		assert_eq!(settings.policy_for(&block), DuplicatePolicy::Reject);
		assert_eq!(settings.policy_for(&item), DuplicatePolicy::LastWins);
	}

	#[test]
	fn test_rejects_unknown_fields_and_bad_keys() {
		assert!(RegistrySettings::from_toml_str("duplicates = \"reject\"").is_err());
		assert!(RegistrySettings::from_toml_str("[overrides]\n\"Bad Key\" = \"reject\"").is_err());
	}
}
