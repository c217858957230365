#![no_main]
use graft::scoring::Scored;
use graft::search::Beam;
use graft::trie::{Trie, TriePolicy};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

struct Hyp(f64);

impl Scored for Hyp {
    fn log_prob(&self) -> f64 {
        self.0
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&depth, rest)) = data.split_first() else {
        return;
    };
    let max = usize::from(depth % 4) + 1;
    let Ok(policy) = TriePolicy::new(max) else {
        return;
    };

    // Trie: every byte chunk is a key, its position the value
    let mut trie = Trie::new(policy);
    let mut model = BTreeMap::new();
    for (value, chunk) in rest.chunks(max).enumerate() {
        let key = &chunk[..usize::from(chunk[0] % 4).min(chunk.len() - 1) + 1];
        trie.put(key, value).expect("key within policy");
        model.insert(key.to_vec(), value);
    }
    assert_eq!(trie.len(), model.len());
    for (key, value) in &model {
        assert_eq!(trie.get(key), Some(value), "last write must win");
    }

    // Beam: capacity from the first byte, scores from the rest
    let capacity = usize::from(depth % 16);
    let mut beam = Beam::new(capacity);
    let mut scores: Vec<f64> = rest.iter().map(|b| -f64::from(*b) / 8.0).collect();
    for s in &scores {
        beam.add(Hyp(*s));
        assert!(beam.len() <= capacity);
    }
    scores.sort_by(|a, b| b.total_cmp(a));
    scores.truncate(capacity);
    let kept: Vec<f64> = beam.iter_best_first().map(Scored::log_prob).collect();
    assert_eq!(kept, scores, "beam must hold the best offers");
});
