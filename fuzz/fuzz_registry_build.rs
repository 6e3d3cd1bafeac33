//! Fuzz target for registry construction.
//!
//! Run with: cargo +nightly fuzz run fuzz_registry_build
//!
//! Arbitrary JSON indexes, including cyclic and dangling tag graphs, must
//! build without panicking and every query must stay within the index.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tagtree_core::{CyclePolicy, FilterOp, RawIndex, Registry, RegistryOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(index) = RawIndex::from_json_slice(data) else {
        return;
    };
    let keys: Vec<String> = index.keys().map(str::to_string).collect();

    let options = RegistryOptions {
        cycle_policy: CyclePolicy::Truncate,
        ..RegistryOptions::default()
    };
    let Ok(registry) = Registry::with_options(index, options) else {
        return;
    };

    for key in &keys {
        let view = registry.flat(key).expect("every key is flattened");
        assert!(view.tags.iter().all(|t| registry.contains(t)));
        assert!(registry.parents(key).iter().all(|p| registry.children(p).contains(key)));
        let _ = registry.descendants(key);
        let _ = registry.field_values(key);
    }

    let subset = registry.filter(&keys, FilterOp::Or, None);
    assert!(subset.keys().len() <= keys.len());
    let _ = registry.gather_reduce(registry.roots(), |_, children: Vec<usize>, _| {
        1 + children.iter().sum::<usize>()
    });
});
