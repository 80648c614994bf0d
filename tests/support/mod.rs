#![allow(dead_code)]

use fpjoin::{Attribute, Trie};
use proptest::prelude::*;
use proptest::sample::SizeRange;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;

/// Keys in the global order every generated document follows. `k0` is
/// carried by every document.
pub const KEYS: [&str; 6] = ["k0", "k1", "k2", "k3", "k4", "k5"];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A document with `k0` and a random subset of the other keys, values drawn
/// from a small range so that shared prefixes and conflicts are common.
pub fn document() -> impl Strategy<Value = Vec<Attribute>> {
    (
        0u8..2,
        prop::collection::vec(prop::option::weighted(0.66, 0u8..3), KEYS.len() - 1),
    )
        .prop_map(|(first, rest)| {
            let mut attributes = vec![Attribute::new(KEYS[0], first.to_string())];
            for (key, value) in KEYS[1..].iter().zip(rest) {
                if let Some(value) = value {
                    attributes.push(Attribute::new(key, value.to_string()));
                }
            }
            attributes
        })
}

/// Documents named `doc0`, `doc1`, ... in generation order.
pub fn corpus(size: impl Into<SizeRange>) -> impl Strategy<Value = Vec<(String, Vec<Attribute>)>> {
    prop::collection::vec(document(), size).prop_map(|documents| {
        documents
            .into_iter()
            .enumerate()
            .map(|(i, attributes)| (format!("doc{i}"), attributes))
            .collect()
    })
}

/// One fixed corpus of exactly `size` documents, the same on every run.
pub fn sample_corpus(size: usize) -> Vec<(String, Vec<Attribute>)> {
    let mut runner = TestRunner::deterministic();
    corpus(size..=size)
        .new_tree(&mut runner)
        .expect("corpus strategy never rejects")
        .current()
}

pub fn load(corpus: &[(String, Vec<Attribute>)]) -> Trie {
    let mut trie = Trie::new();
    for (id, attributes) in corpus {
        trie.insert(id, attributes).unwrap();
    }
    trie.label_branches();
    trie
}
