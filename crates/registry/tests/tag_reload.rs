use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use lodestone_registry::prelude::*;
use lodestone_registry::{Holder, Key, SimpleRegistry, TagBindings, TagKey};

struct Block;

fn loc(path: &str) -> Key {
	Key::minecraft(path).unwrap()
}

fn frozen_blocks(count: usize) -> (SimpleRegistry<Block>, Vec<Holder<Block>>) {
	let registry = SimpleRegistry::new(loc("block"));
	let holders = (0..count)
		.map(|i| {
			registry
				.register(registry.resource_key(loc(&format!("block_{i}"))), Arc::new(Block))
				.map(Holder::from)
				.unwrap()
		})
		.collect();
	registry.freeze().unwrap();
	(registry, holders)
}

fn bindings(entries: impl IntoIterator<Item = (TagKey<Block>, Vec<Holder<Block>>)>) -> TagBindings<Block> {
	entries.into_iter().collect()
}

#[test]
fn test_readers_never_see_partial_tags() {
	let (registry, holders) = frozen_blocks(64);
	let registry = Arc::new(registry);
	let evens = registry.tag_key(loc("evens"));
	let odds = registry.tag_key(loc("odds"));

	let even_members: Vec<_> = holders.iter().step_by(2).cloned().collect();
	let odd_members: Vec<_> = holders.iter().skip(1).step_by(2).cloned().collect();
	registry
		.bind_tags(bindings([
			(evens.clone(), even_members.clone()),
			(odds.clone(), odd_members.clone()),
		]))
		.unwrap();

	let set = registry.get_or_create_tag(evens.clone());
	let done = Arc::new(AtomicBool::new(false));

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let set = Arc::clone(&set);
			let done = Arc::clone(&done);
			thread::spawn(move || {
				let mut snapshots = 0usize;
				while !done.load(Ordering::Acquire) {
					// A snapshot is always one complete member list.
					let members = set.members();
					assert_eq!(members.len(), 32);
					let first_even = members.iter().next().is_some_and(|holder| holder.is(&loc("block_0")));
					let all_same_parity = members.iter().all(|holder| {
						let parity = holder
							.unwrap_key()
							.and_then(|key| key.location().path().trim_start_matches("block_").parse::<usize>().ok())
							.map(|n| n % 2 == 0);
						parity == Some(first_even)
					});
					assert!(all_same_parity);
					snapshots += 1;
				}
				snapshots
			})
		})
		.collect();

	for round in 0..200 {
		let members = if round % 2 == 0 { &odd_members } else { &even_members };
		registry
			.bind_tags(bindings([(evens.clone(), members.clone()), (odds.clone(), Vec::new())]))
			.unwrap();
	}
	done.store(true, Ordering::Release);

	for reader in readers {
		reader.join().unwrap();
	}
	assert!(Arc::ptr_eq(&set, &registry.get_or_create_tag(evens)));
}

#[test]
fn test_concurrent_reloads_are_serialized() {
	let (registry, holders) = frozen_blocks(8);
	let registry = Arc::new(registry);
	let tag = registry.tag_key(loc("shared"));

	let writers: Vec<_> = (0..4)
		.map(|w| {
			let registry = Arc::clone(&registry);
			let tag = tag.clone();
			let members: Vec<_> = holders.iter().skip(w * 2).take(2).cloned().collect();
			thread::spawn(move || {
				for _ in 0..50 {
					registry.reset_tags();
					registry
						.bind_tags(bindings([(tag.clone(), members.clone())]))
						.unwrap();
				}
			})
		})
		.collect();
	for writer in writers {
		writer.join().unwrap();
	}

	// Whichever reload finished last, its reverse links match its member list.
	let set = registry.tag(&tag).unwrap();
	assert_eq!(set.len(), 2);
	for holder in &holders {
		assert_eq!(holder.has_tag(&tag), set.contains(holder));
	}
}
