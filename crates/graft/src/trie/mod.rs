//! # Trie
//!
//! A map from short key sequences to values, used to index grammar rules by
//! their source right-hand side.
//!
//! ## Overview
//!
//! Each node keeps its outgoing keys in a sorted `Vec` with a parallel vector
//! of entries, and every descent step is a binary search. Keys are bounded by
//! [`TriePolicy::max_key_len`]:
//!
//! - a key of exactly the maximum length stores its value directly in the
//!   entry of the deepest node (a *leaf* value, no child node is allocated)
//! - a shorter key stores its value as the *internal* value of the child node
//!   one level below its last element, creating that child or reusing it
//!
//! The policy is an immutable value shared through an `Arc`, so tries with
//! different depth limits can coexist in one process.
//!
//! ## Usage
//!
//! ```rust
//! use graft::trie::{Storage, Trie, TriePolicy};
//!
//! let mut trie = Trie::new(TriePolicy::new(2)?);
//! trie.put(&["a"], 1)?;
//! trie.put(&["a", "b"], 2)?;
//!
//! assert_eq!(trie.get(&["a"]), Some(&1));
//! assert_eq!(trie.lookup(&["a", "b"]), Some((&2, Storage::Leaf)));
//! assert_eq!(trie.get(&["b"]), None);
//! # Ok::<(), graft::GraftError>(())
//! ```

use crate::error::{GraftError, Result};
use std::fmt;
use std::sync::Arc;

/// Depth and sizing limits shared by every node of a [`Trie`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriePolicy {
    max_key_len: usize,
    initial_capacity: usize,
}

impl TriePolicy {
    /// Create a policy allowing keys of up to `max_key_len` elements
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::Config`] if `max_key_len` is zero.
    pub fn new(max_key_len: usize) -> Result<Self> {
        if max_key_len == 0 {
            return Err(GraftError::config("trie max_key_len must be at least 1"));
        }
        Ok(Self {
            max_key_len,
            initial_capacity: 4,
        })
    }

    /// Set the number of key slots reserved in each new node
    #[must_use]
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    #[must_use]
    pub const fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    #[must_use]
    pub const fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }
}

/// Where a value was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Stored directly in the deepest node's entry
    Leaf,
    /// Stored as the internal value of a child node
    Internal,
}

struct Entry<K, V> {
    leaf: Option<V>,
    child: Option<Box<TrieNode<K, V>>>,
}

struct TrieNode<K, V> {
    keys: Vec<K>,
    entries: Vec<Entry<K, V>>,
    internal: Option<V>,
}

impl<K: Ord + Clone, V> TrieNode<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            internal: None,
        }
    }

    fn entry(&self, elem: &K) -> Option<&Entry<K, V>> {
        let index = self.keys.binary_search(elem).ok()?;
        self.entries.get(index)
    }

    fn entry_mut_or_insert(&mut self, elem: &K) -> &mut Entry<K, V> {
        let index = match self.keys.binary_search(elem) {
            Ok(index) => index,
            Err(index) => {
                self.keys.insert(index, elem.clone());
                self.entries.insert(
                    index,
                    Entry {
                        leaf: None,
                        child: None,
                    },
                );
                index
            }
        };
        &mut self.entries[index]
    }

    fn child_mut_or_insert(&mut self, elem: &K, capacity: usize) -> &mut Self {
        self.entry_mut_or_insert(elem)
            .child
            .get_or_insert_with(|| Box::new(Self::with_capacity(capacity)))
    }
}

/// Sequence-keyed map with bounded key length
pub struct Trie<K, V> {
    policy: Arc<TriePolicy>,
    root: TrieNode<K, V>,
    len: usize,
}

impl<K: Ord + Clone, V> Trie<K, V> {
    /// Create an empty trie
    #[must_use]
    pub fn new(policy: TriePolicy) -> Self {
        Self::with_policy(Arc::new(policy))
    }

    /// Create an empty trie sharing an existing policy
    #[must_use]
    pub fn with_policy(policy: Arc<TriePolicy>) -> Self {
        let root = TrieNode::with_capacity(policy.initial_capacity);
        Self {
            policy,
            root,
            len: 0,
        }
    }

    fn check_key(&self, key: &[K]) -> Result<()> {
        if key.is_empty() {
            return Err(GraftError::EmptyKey);
        }
        if key.len() > self.policy.max_key_len {
            return Err(GraftError::KeyTooLong {
                len: key.len(),
                max: self.policy.max_key_len,
            });
        }
        Ok(())
    }

    /// Insert or overwrite the value for `key`, returning the previous value
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::EmptyKey`] for a zero-length key and
    /// [`GraftError::KeyTooLong`] for a key longer than the policy allows.
    pub fn put(&mut self, key: &[K], value: V) -> Result<Option<V>> {
        self.check_key(key)?;
        let (last, prefix) = key.split_last().ok_or(GraftError::EmptyKey)?;
        let capacity = self.policy.initial_capacity;

        let mut node = &mut self.root;
        for elem in prefix {
            node = node.child_mut_or_insert(elem, capacity);
        }

        let previous = if key.len() == self.policy.max_key_len {
            node.entry_mut_or_insert(last).leaf.replace(value)
        } else {
            node.child_mut_or_insert(last, capacity)
                .internal
                .replace(value)
        };

        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Value stored for `key`
    ///
    /// Keys that could never have been stored (empty, or longer than the
    /// policy allows) are a miss here; use [`Trie::try_get`] to have them
    /// reported as errors instead.
    #[must_use]
    pub fn get(&self, key: &[K]) -> Option<&V> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Value stored for `key`, rejecting malformed keys
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::EmptyKey`] or [`GraftError::KeyTooLong`] for keys
    /// that violate the policy. A well-formed key that is absent is `Ok(None)`.
    pub fn try_get(&self, key: &[K]) -> Result<Option<&V>> {
        self.check_key(key)?;
        Ok(self.get(key))
    }

    /// Mutable access to the value stored for `key`
    #[must_use]
    pub fn get_mut(&mut self, key: &[K]) -> Option<&mut V> {
        if key.len() > self.policy.max_key_len {
            return None;
        }
        let at_leaf = key.len() == self.policy.max_key_len;
        let (last, prefix) = key.split_last()?;

        let mut node = &mut self.root;
        for elem in prefix {
            let index = node.keys.binary_search(elem).ok()?;
            node = node.entries[index].child.as_deref_mut()?;
        }
        let index = node.keys.binary_search(last).ok()?;
        let entry = &mut node.entries[index];
        if at_leaf {
            entry.leaf.as_mut()
        } else {
            entry.child.as_deref_mut()?.internal.as_mut()
        }
    }

    /// Value stored for `key` along with where it lives
    #[must_use]
    pub fn lookup(&self, key: &[K]) -> Option<(&V, Storage)> {
        if key.is_empty() || key.len() > self.policy.max_key_len {
            return None;
        }
        let mut cursor = self.cursor();
        for elem in key {
            cursor = cursor.advance(elem)?;
        }
        cursor.located()
    }

    /// Length of the longest stored key that prefixes `query`, and its value
    ///
    /// Returns `(0, None)` when no prefix of `query` is stored.
    #[must_use]
    pub fn longest_prefix(&self, query: &[K]) -> (usize, Option<&V>) {
        let mut best = (0, None);
        let mut cursor = self.cursor();
        for elem in query {
            match cursor.advance(elem) {
                Some(next) => cursor = next,
                None => break,
            }
            if let Some(value) = cursor.value() {
                best = (cursor.depth(), Some(value));
            }
        }
        best
    }

    /// A cursor positioned at the root, for symbol-by-symbol lookup
    #[must_use]
    pub fn cursor(&self) -> TrieCursor<'_, K, V> {
        TrieCursor {
            node: Some(&self.root),
            located: None,
            depth: 0,
        }
    }

    /// Number of stored values
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the trie holds no values
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The shared policy
    #[must_use]
    pub fn policy(&self) -> &Arc<TriePolicy> {
        &self.policy
    }
}

impl<K, V> fmt::Debug for Trie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trie")
            .field("policy", &self.policy)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Incremental position inside a [`Trie`]
///
/// Each [`advance`](TrieCursor::advance) consumes one key element. The cursor
/// is `Copy`, so a chart can fork it at every cell boundary.
pub struct TrieCursor<'a, K, V> {
    node: Option<&'a TrieNode<K, V>>,
    located: Option<(&'a V, Storage)>,
    depth: usize,
}

impl<K, V> Clone for TrieCursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for TrieCursor<'_, K, V> {}

impl<'a, K: Ord + Clone, V> TrieCursor<'a, K, V> {
    /// Move one element deeper, or `None` if no stored key continues this way
    #[must_use]
    pub fn advance(&self, elem: &K) -> Option<Self> {
        let entry = self.node?.entry(elem)?;
        let child = entry.child.as_deref();
        let located = match (&entry.leaf, child.and_then(|c| c.internal.as_ref())) {
            (Some(value), _) => Some((value, Storage::Leaf)),
            (None, Some(value)) => Some((value, Storage::Internal)),
            (None, None) => None,
        };
        Some(Self {
            node: child,
            located,
            depth: self.depth + 1,
        })
    }

    /// Value stored for the key consumed so far
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.located.map(|(value, _)| value)
    }

    /// Value and storage kind for the key consumed so far
    #[must_use]
    pub fn located(&self) -> Option<(&'a V, Storage)> {
        self.located
    }

    /// Whether any longer key continues from here
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.node.is_some_and(|node| !node.keys.is_empty())
    }

    /// Number of key elements consumed
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(max: usize) -> Trie<&'static str, i32> {
        Trie::new(TriePolicy::new(max).unwrap())
    }

    #[test]
    fn test_policy_rejects_zero_depth() {
        assert!(matches!(TriePolicy::new(0), Err(GraftError::Config(_))));
    }

    #[test]
    fn test_leaf_and_internal_storage() {
        let mut t = trie(2);
        t.put(&["a"], 1).unwrap();
        t.put(&["a", "b"], 2).unwrap();
        t.put(&["a", "x"], 3).unwrap();

        assert_eq!(t.lookup(&["a"]), Some((&1, Storage::Internal)));
        assert_eq!(t.lookup(&["a", "b"]), Some((&2, Storage::Leaf)));
        assert_eq!(t.lookup(&["a", "x"]), Some((&3, Storage::Leaf)));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_overwrite_returns_previous() {
        let mut t = trie(3);
        assert_eq!(t.put(&["k"], 1).unwrap(), None);
        assert_eq!(t.put(&["k"], 2).unwrap(), Some(1));
        assert_eq!(t.get(&["k"]), Some(&2));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_prefix_written_after_longer_key() {
        let mut t = trie(3);
        t.put(&["a", "b"], 1).unwrap();
        t.put(&["a"], 2).unwrap();
        t.put(&["a", "b", "c"], 3).unwrap();

        // every write survives revisiting the shared child
        assert_eq!(t.get(&["a"]), Some(&2));
        assert_eq!(t.get(&["a", "b"]), Some(&1));
        assert_eq!(t.get(&["a", "b", "c"]), Some(&3));
    }

    #[test]
    fn test_get_mut() {
        let mut t = trie(2);
        t.put(&["a"], 1).unwrap();
        t.put(&["a", "b"], 2).unwrap();

        *t.get_mut(&["a"]).unwrap() += 10;
        *t.get_mut(&["a", "b"]).unwrap() += 20;
        assert_eq!(t.get(&["a"]), Some(&11));
        assert_eq!(t.get(&["a", "b"]), Some(&22));
        assert!(t.get_mut(&["b"]).is_none());
        assert!(t.get_mut(&[]).is_none());
    }

    #[test]
    fn test_malformed_keys() {
        let mut t = trie(2);
        assert_eq!(t.put(&[], 1), Err(GraftError::EmptyKey));
        assert_eq!(
            t.put(&["a", "b", "c"], 1),
            Err(GraftError::KeyTooLong { len: 3, max: 2 })
        );
        assert_eq!(t.get(&[]), None);
        assert_eq!(t.try_get(&[]), Err(GraftError::EmptyKey));
        assert_eq!(t.try_get(&["zz"]), Ok(None));
        assert!(t.is_empty());
    }

    #[test]
    fn test_cursor_walk() {
        let mut t = trie(3);
        t.put(&["x", "y"], 7).unwrap();

        let root = t.cursor();
        let x = root.advance(&"x").unwrap();
        assert_eq!(x.value(), None);
        assert!(x.has_children());

        let xy = x.advance(&"y").unwrap();
        assert_eq!(xy.value(), Some(&7));
        assert_eq!(xy.depth(), 2);
        assert!(!xy.has_children());
        assert!(root.advance(&"y").is_none());
    }

    #[test]
    fn test_longest_prefix() {
        let mut t = trie(4);
        t.put(&["a"], 1).unwrap();
        t.put(&["a", "b", "c"], 3).unwrap();

        assert_eq!(t.longest_prefix(&["a", "b", "c", "d"]), (3, Some(&3)));
        assert_eq!(t.longest_prefix(&["a", "b"]), (1, Some(&1)));
        assert_eq!(t.longest_prefix(&["q"]), (0, None));
    }

    #[test]
    fn test_keys_stay_sorted() {
        let mut t = trie(1);
        for (i, key) in ["m", "c", "x", "a", "q"].iter().enumerate() {
            t.put(&[*key], i as i32).unwrap();
        }
        let mut sorted = t.root.keys.clone();
        sorted.sort_unstable();
        assert_eq!(t.root.keys, sorted);
        assert_eq!(t.get(&["a"]), Some(&3));
    }
}
