//! Namespaced identifiers.
//!
//! A [`Key`] is the universal name for anything storable: `namespace:path`.
//! Both halves are restricted to a small, lowercase charset so keys can be used
//! verbatim in file paths, network payloads, and command arguments.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Namespace assumed when a key string has no `:` separator.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Errors produced while parsing or constructing a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
	#[error("empty key")]
	Empty,
	#[error("key {key:?} has an empty path")]
	MissingPath { key: String },
	#[error("key {key:?} has an empty namespace")]
	MissingNamespace { key: String },
	#[error("invalid character {found:?} in namespace of key {key:?}")]
	InvalidNamespace { key: String, found: char },
	#[error("invalid character {found:?} in path of key {key:?}")]
	InvalidPath { key: String, found: char },
}

/// A namespaced, immutable identifier (`namespace:path`).
///
/// Cloning is cheap: both halves share reference-counted storage.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
	namespace: Arc<str>,
	path: Arc<str>,
}

impl Key {
	/// Creates a key after validating both halves.
	pub fn new(namespace: &str, path: &str) -> Result<Self, KeyError> {
		let display = || format!("{namespace}:{path}");
		if namespace.is_empty() {
			return Err(KeyError::MissingNamespace { key: display() });
		}
		if path.is_empty() {
			return Err(KeyError::MissingPath { key: display() });
		}
		if let Some(found) = namespace.chars().find(|&c| !is_namespace_char(c)) {
			return Err(KeyError::InvalidNamespace { key: display(), found });
		}
		if let Some(found) = path.chars().find(|&c| !is_path_char(c)) {
			return Err(KeyError::InvalidPath { key: display(), found });
		}
		Ok(Self {
			namespace: Arc::from(namespace),
			path: Arc::from(path),
		})
	}

	/// Creates a key from string literals.
	///
	/// # Panics
	///
	/// Panics if either half is invalid. Use [`Key::new`] for input that is not
	/// a compile-time constant.
	pub fn from_static(namespace: &'static str, path: &'static str) -> Self {
		match Self::new(namespace, path) {
			Ok(key) => key,
			Err(e) => panic!("invalid static key: {e}"),
		}
	}

	/// Creates a key in the [`DEFAULT_NAMESPACE`].
	pub fn minecraft(path: &str) -> Result<Self, KeyError> {
		Self::new(DEFAULT_NAMESPACE, path)
	}

	/// Parses `namespace:path`, or `path` alone in the default namespace.
	pub fn parse(s: &str) -> Result<Self, KeyError> {
		if s.is_empty() {
			return Err(KeyError::Empty);
		}
		match s.split_once(':') {
			Some((namespace, path)) => Self::new(namespace, path),
			None => Self::minecraft(s),
		}
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn path(&self) -> &str {
		&self.path
	}
}

/// Returns true if `c` may appear in a key namespace.
pub fn is_namespace_char(c: char) -> bool {
	matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

/// Returns true if `c` may appear in a key path.
pub fn is_path_char(c: char) -> bool {
	is_namespace_char(c) || c == '/'
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.namespace, self.path)
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Key({self})")
	}
}

impl FromStr for Key {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<&str> for Key {
	type Error = KeyError;

	fn try_from(s: &str) -> Result<Self, Self::Error> {
		Self::parse(s)
	}
}

impl Serialize for Key {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Key {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct KeyVisitor;

		impl Visitor<'_> for KeyVisitor {
			type Value = Key;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a namespaced key such as \"minecraft:stone\"")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Key, E> {
				Key::parse(v).map_err(E::custom)
			}
		}

		deserializer.deserialize_str(KeyVisitor)
	}
}

#[cfg(test)]
mod tests;
