use std::sync::Arc;

use lodestone_primitives::{Key, ResourceKey, TagKey};

use super::*;

struct Block(&'static str);

fn block_registry() -> Key {
	Key::minecraft("block").unwrap()
}

fn block_key(path: &str) -> ResourceKey<Block> {
	ResourceKey::new(block_registry(), Key::minecraft(path).unwrap())
}

#[test]
fn test_standalone_binds_value_later() {
	let owner = OwnerId::next();
	let holder = Reference::standalone(owner, block_registry(), block_key("stone"));

	assert_eq!(holder.kind(), ReferenceKind::Standalone);
	assert!(!holder.is_bound());
	assert!(holder.key().is_some());
	assert!(matches!(holder.try_value(), Err(RegistryError::UnboundHolder { .. })));

	holder.bind(block_key("stone"), Arc::new(Block("stone"))).unwrap();
	assert!(holder.is_bound());
	assert_eq!(holder.value().0, "stone");
}

#[test]
fn test_standalone_rejects_different_key() {
	let holder = Reference::standalone(OwnerId::next(), block_registry(), block_key("stone"));
	let err = holder.bind(block_key("dirt"), Arc::new(Block("dirt"))).unwrap_err();
	assert!(matches!(err, RegistryError::HolderKeyConflict { .. }));
	assert!(!holder.is_bound());
}

#[test]
fn test_standalone_value_can_be_replaced() {
	let holder = Reference::standalone(OwnerId::next(), block_registry(), block_key("stone"));
	holder.bind(block_key("stone"), Arc::new(Block("old"))).unwrap();
	holder.bind(block_key("stone"), Arc::new(Block("new"))).unwrap();
	assert_eq!(holder.value().0, "new");
}

#[test]
fn test_intrusive_binds_key_once() {
	let value = Arc::new(Block("sand"));
	let holder = Reference::intrusive(OwnerId::next(), block_registry(), Arc::clone(&value));

	assert_eq!(holder.kind(), ReferenceKind::Intrusive);
	assert!(holder.key().is_none());
	assert!(matches!(holder.try_key(), Err(RegistryError::UnboundHolder { .. })));
	assert!(!holder.is_bound());
	assert!(Arc::ptr_eq(&holder.try_value().unwrap(), &value));

	holder.bind(block_key("sand"), Arc::clone(&value)).unwrap();
	assert!(holder.is_bound());
	assert_eq!(holder.try_key().unwrap(), &block_key("sand"));
	assert!(holder.is(&Key::minecraft("sand").unwrap()));

	// Same key and same object again is accepted.
	holder.bind(block_key("sand"), Arc::clone(&value)).unwrap();

	let err = holder.bind(block_key("gravel"), Arc::clone(&value)).unwrap_err();
	assert!(matches!(err, RegistryError::HolderKeyConflict { .. }));
}

#[test]
fn test_intrusive_rejects_other_value_object() {
	let holder = Reference::intrusive(OwnerId::next(), block_registry(), Arc::new(Block("sand")));
	let err = holder.bind(block_key("sand"), Arc::new(Block("sand"))).unwrap_err();
	assert!(matches!(err, RegistryError::IntrusiveValueConflict { .. }));
	assert!(holder.key().is_none());
}

#[test]
fn test_holder_identity_is_pointer_based() {
	let reference = Arc::new(Reference::standalone(OwnerId::next(), block_registry(), block_key("stone")));
	let a = Holder::from(Arc::clone(&reference));
	let b = Holder::Reference(Arc::clone(&reference));
	assert_eq!(a, b);

	let other = Holder::from(Arc::new(Reference::standalone(
		OwnerId::next(),
		block_registry(),
		block_key("stone"),
	)));
	assert_ne!(a, other);

	let direct = Holder::direct(Block("stone"));
	assert_eq!(direct, direct.clone());
	assert_ne!(direct, Holder::direct(Block("stone")));
}

#[test]
fn test_direct_holder_has_no_identity() {
	let owner = OwnerId::next();
	let holder = Holder::direct(Block("air"));
	let tag = TagKey::new(block_registry(), Key::minecraft("air").unwrap());

	assert_eq!(holder.kind(), HolderKind::Direct);
	assert!(holder.is_bound());
	assert!(holder.is_valid_in(&owner));
	assert!(holder.tags().is_empty());
	assert!(!holder.has_tag(&tag));
	assert!(holder.unwrap_key().is_none());
	assert!(!holder.is(&Key::minecraft("air").unwrap()));
	assert_eq!(holder.value().0, "air");
}

#[test]
fn test_validity_is_per_owner_instance() {
	let first = OwnerId::next();
	let second = OwnerId::next();
	let holder = Holder::from(Arc::new(Reference::standalone(first, block_registry(), block_key("stone"))));
	assert!(holder.is_valid_in(&first));
	assert!(!holder.is_valid_in(&second));
}

#[test]
fn test_reverse_tags_are_replaced_wholesale() {
	let reference = Arc::new(Reference::standalone(OwnerId::next(), block_registry(), block_key("log")));
	let logs = TagKey::new(block_registry(), Key::minecraft("logs").unwrap());
	let burnable = TagKey::new(block_registry(), Key::minecraft("burnable").unwrap());

	reference.bind_tags([logs.clone(), burnable.clone()].into_iter().collect());
	let before = reference.tags();
	assert!(reference.has_tag(&logs));

	reference.bind_tags([burnable.clone()].into_iter().collect());
	assert!(!reference.has_tag(&logs));
	assert!(reference.has_tag(&burnable));
	assert_eq!(before.len(), 2);

	let holder = Holder::from(reference);
	assert_eq!(holder.tags(), vec![burnable]);
}

#[test]
#[should_panic(expected = "unbound holder")]
fn test_value_panics_when_unbound() {
	let holder = Holder::from(Arc::new(Reference::standalone(
		OwnerId::next(),
		block_registry(),
		block_key("stone"),
	)));
	let _ = holder.value();
}
