use proptest::prelude::*;

use super::{DEFAULT_NAMESPACE, Key, KeyError};
use crate::{ResourceKey, TagKey};

#[test]
fn test_parse_namespaced() {
	let key = Key::parse("lodestone:damage/fall").unwrap();
	assert_eq!(key.namespace(), "lodestone");
	assert_eq!(key.path(), "damage/fall");
	assert_eq!(key.to_string(), "lodestone:damage/fall");
}

#[test]
fn test_parse_defaults_namespace() {
	let key = Key::parse("stone").unwrap();
	assert_eq!(key.namespace(), DEFAULT_NAMESPACE);
	assert_eq!(key, Key::minecraft("stone").unwrap());
}

#[test]
fn test_parse_rejects_bad_input() {
	assert_eq!(Key::parse(""), Err(KeyError::Empty));
	assert!(matches!(
		Key::parse("minecraft:"),
		Err(KeyError::MissingPath { .. })
	));
	assert!(matches!(
		Key::parse(":stone"),
		Err(KeyError::MissingNamespace { .. })
	));
	assert!(matches!(
		Key::parse("Mine:stone"),
		Err(KeyError::InvalidNamespace { found: 'M', .. })
	));
	// Slashes are allowed in paths but not namespaces.
	assert!(matches!(
		Key::parse("a/b:stone"),
		Err(KeyError::InvalidNamespace { found: '/', .. })
	));
	assert!(matches!(
		Key::parse("minecraft:stone block"),
		Err(KeyError::InvalidPath { found: ' ', .. })
	));
}

#[test]
fn test_serde_uses_string_form() {
	let key = Key::parse("minecraft:oak_log").unwrap();
	let json = serde_json::to_string(&key).unwrap();
	assert_eq!(json, "\"minecraft:oak_log\"");
	let back: Key = serde_json::from_str(&json).unwrap();
	assert_eq!(back, key);
	assert!(serde_json::from_str::<Key>("\"Bad Key\"").is_err());
}

#[test]
fn test_resource_key_identity_spans_registry() {
	let block = Key::minecraft("block").unwrap();
	let item = Key::minecraft("item").unwrap();
	let stone = Key::minecraft("stone").unwrap();

	let a: ResourceKey<u8> = ResourceKey::new(block.clone(), stone.clone());
	let b: ResourceKey<u8> = ResourceKey::new(item.clone(), stone.clone());
	assert_ne!(a, b);
	assert_eq!(a, ResourceKey::new(block.clone(), stone.clone()));
	assert!(a.is_for(&block));
	assert_eq!(a.cast::<str>().location(), &stone);
}

#[test]
fn test_tag_key_display() {
	let tag: TagKey<u8> = TagKey::new(
		Key::minecraft("block").unwrap(),
		Key::minecraft("logs").unwrap(),
	);
	assert_eq!(tag.to_string(), "#minecraft:logs");
}

proptest! {
	#[test]
	fn prop_display_parse_stable(ns in "[a-z0-9_.-]{1,12}", path in "[a-z0-9_./-]{1,24}") {
		let key = Key::new(&ns, &path).unwrap();
		let parsed = Key::parse(&key.to_string()).unwrap();
		prop_assert_eq!(parsed, key);
	}

	#[test]
	fn prop_uppercase_never_valid(path in "[a-z]{0,8}[A-Z][a-z]{0,8}") {
		prop_assert!(Key::minecraft(&path).is_err());
	}
}
