//! Name and id lookups used to encode registry-typed fields.
//!
//! Persisted data and packets refer to registry entries by [`Key`] or by
//! numeric id. [`RegistryLookup`] turns absence into a [`CodecError`], and
//! [`RegistryCodec`] plugs a registry into serde as a key string.

use std::marker::PhantomData;
use std::sync::Arc;

use lodestone_primitives::{Key, KeyError};
use serde::de::{self, DeserializeSeed, Deserializer};
use serde::ser::{self, Serialize, Serializer};

use crate::traits::Registry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
	#[error("unknown key {key} in registry {registry}")]
	UnknownKey { registry: Key, key: Key },
	#[error("unknown value in registry {registry}")]
	UnknownValue { registry: Key },
	#[error("unknown id {id} in registry {registry}")]
	UnknownId { registry: Key, id: u32 },
	#[error(transparent)]
	Key(#[from] KeyError),
}

/// Failing lookups over any [`Registry`].
///
/// Defaulted registries never fail these once their default is registered;
/// before that a miss panics, see [`crate::DefaultedRegistry`].
pub trait RegistryLookup<T> {
	fn by_name(&self, key: &Key) -> Result<Arc<T>, CodecError>;

	fn name_of(&self, value: &Arc<T>) -> Result<Key, CodecError>;

	fn by_network_id(&self, id: u32) -> Result<Arc<T>, CodecError>;

	fn network_id_of(&self, value: &Arc<T>) -> Result<u32, CodecError>;

	/// Parses `name` and resolves it with [`RegistryLookup::by_name`].
	fn by_name_str(&self, name: &str) -> Result<Arc<T>, CodecError> {
		self.by_name(&Key::parse(name)?)
	}
}

impl<T, R: Registry<T> + ?Sized> RegistryLookup<T> for R {
	fn by_name(&self, key: &Key) -> Result<Arc<T>, CodecError> {
		self.get(key).ok_or_else(|| CodecError::UnknownKey {
			registry: self.key().clone(),
			key: key.clone(),
		})
	}

	fn name_of(&self, value: &Arc<T>) -> Result<Key, CodecError> {
		self.key_of(value).ok_or_else(|| CodecError::UnknownValue {
			registry: self.key().clone(),
		})
	}

	fn by_network_id(&self, id: u32) -> Result<Arc<T>, CodecError> {
		self.get_by_id(id).ok_or_else(|| CodecError::UnknownId {
			registry: self.key().clone(),
			id,
		})
	}

	fn network_id_of(&self, value: &Arc<T>) -> Result<u32, CodecError> {
		self.id_of(value).ok_or_else(|| CodecError::UnknownValue {
			registry: self.key().clone(),
		})
	}
}

/// Serde adapter that writes entries as their key string.
pub struct RegistryCodec<'a, T> {
	registry: &'a dyn Registry<T>,
}

impl<T> Clone for RegistryCodec<'_, T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for RegistryCodec<'_, T> {}

impl<'a, T> RegistryCodec<'a, T> {
	pub fn new(registry: &'a dyn Registry<T>) -> Self {
		Self { registry }
	}

	pub fn encode<S: Serializer>(&self, value: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error> {
		let key = self.registry.name_of(value).map_err(ser::Error::custom)?;
		key.serialize(serializer)
	}

	pub fn decode<'de, D: Deserializer<'de>>(&self, deserializer: D) -> Result<Arc<T>, D::Error> {
		let key = <Key as de::Deserialize>::deserialize(deserializer)?;
		self.registry.by_name(&key).map_err(de::Error::custom)
	}

	/// Borrows `value` as something serde can serialize.
	pub fn wrap<'v>(&self, value: &'v Arc<T>) -> Encoded<'a, 'v, T> {
		Encoded {
			codec: *self,
			value,
		}
	}

	/// A seed that decodes a sequence of key strings.
	pub fn list(&self) -> ListSeed<'a, T> {
		ListSeed {
			codec: *self,
			_marker: PhantomData,
		}
	}
}

impl<'de, T> DeserializeSeed<'de> for RegistryCodec<'_, T> {
	type Value = Arc<T>;

	fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		self.decode(deserializer)
	}
}

/// A registry entry paired with the codec that names it.
pub struct Encoded<'a, 'v, T> {
	codec: RegistryCodec<'a, T>,
	value: &'v Arc<T>,
}

impl<T> Serialize for Encoded<'_, '_, T> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.codec.encode(self.value, serializer)
	}
}

pub struct ListSeed<'a, T> {
	codec: RegistryCodec<'a, T>,
	_marker: PhantomData<fn() -> T>,
}

impl<'de, T> DeserializeSeed<'de> for ListSeed<'_, T> {
	type Value = Vec<Arc<T>>;

	fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		deserializer.deserialize_seq(self)
	}
}

impl<'de, T> de::Visitor<'de> for ListSeed<'_, T> {
	type Value = Vec<Arc<T>>;

	fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("a list of registry keys")
	}

	fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
		let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(value) = seq.next_element_seed(self.codec)? {
			values.push(value);
		}
		Ok(values)
	}
}
