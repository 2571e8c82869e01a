use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

struct Block(&'static str);
struct Item(&'static str);

fn loc(path: &str) -> Key {
	Key::minecraft(path).unwrap()
}

#[test]
fn test_declare_rejects_duplicate_names() {
	let set = DynamicRegistrySet::default();
	set.declare_simple::<Block, _>(loc("block"), |_| Ok(())).unwrap();
	let err = set
		.declare_simple::<Block, _>(loc("block"), |_| Ok(()))
		.err().unwrap();
	assert!(matches!(err, RegistryError::DuplicateKey { .. }));
	assert_eq!(set.len(), 1);
}

#[test]
fn test_registries_keep_declaration_order() {
	let set = DynamicRegistrySet::default();
	set.declare_simple::<Item, _>(loc("item"), |_| Ok(())).unwrap();
	set.declare_simple::<Block, _>(loc("block"), |_| Ok(())).unwrap();
	let names: Vec<Key> = set
		.registries()
		.iter()
		.map(|registry| registry.name().clone())
		.collect();
	assert_eq!(names, vec![loc("item"), loc("block")]);
}

#[test]
fn test_typed_access_downcasts() {
	let set = DynamicRegistrySet::default();
	let blocks = set.declare_simple::<Block, _>(loc("block"), |_| Ok(())).unwrap();

	let found = set.registry::<SimpleRegistry<Block>>(&loc("block")).unwrap();
	assert!(Arc::ptr_eq(&found, &blocks));
	assert!(set.registry::<SimpleRegistry<Item>>(&loc("block")).is_none());
	assert!(set.registry::<SimpleRegistry<Block>>(&loc("item")).is_none());
	assert!(set.erased(&loc("block")).is_some());

	let typed: ResourceKey<SimpleRegistry<Block>> = ResourceKey::new(root_key(), loc("block"));
	assert!(Arc::ptr_eq(&set.registry_by_key(&typed).unwrap(), &blocks));
	let wrong_root: ResourceKey<SimpleRegistry<Block>> = ResourceKey::new(loc("other"), loc("block"));
	assert!(set.registry_by_key(&wrong_root).is_none());
	assert!(set.contains(&loc("block")));
}

#[test]
fn test_bootstrap_runs_once() {
	let set = DynamicRegistrySet::default();
	let runs = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&runs);
	let blocks = set
		.declare_simple(loc("block"), move |registry: &SimpleRegistry<Block>| {
			counter.fetch_add(1, Ordering::SeqCst);
			registry.register_as(loc("stone"), Block("stone"))?;
			Ok(())
		})
		.unwrap();

	set.bootstrap().unwrap();
	set.bootstrap().unwrap();
	assert_eq!(runs.load(Ordering::SeqCst), 1);
	assert!(set.is_bootstrapped());
	assert!(blocks.is_frozen());
	assert_eq!(blocks.get(&loc("stone")).unwrap().0, "stone");

	let err = set.declare_simple::<Item, _>(loc("item"), |_| Ok(())).err().unwrap();
	assert!(matches!(err, RegistryError::Frozen { .. }));
}

#[test]
fn test_failed_bootstrap_stays_failed() {
	let set = DynamicRegistrySet::default();
	set.declare_simple::<Block, _>(loc("block"), |_| Err("no blocks today".into()))
		.unwrap();

	let err = set.bootstrap().unwrap_err();
	assert!(matches!(&err, RegistryError::Bootstrap { registry, .. } if *registry == loc("block")));
	let again = set.bootstrap().unwrap_err();
	assert!(matches!(&again, RegistryError::Bootstrap { registry, .. } if *registry == loc("block")));
	assert!(!set.is_bootstrapped());
}

#[test]
fn test_settings_reach_declared_registries() {
	let settings = RegistrySettings::from_toml_str("duplicate_policy = \"reject\"").unwrap();
	let set = DynamicRegistrySet::new(settings);
	let blocks = set.declare_simple::<Block, _>(loc("block"), |_| Ok(())).unwrap();
	assert_eq!(blocks.policy(), DuplicatePolicy::Reject);
	assert_eq!(set.root().len(), 1);
}
