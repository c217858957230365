use super::Token;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// An immutable ordered run of [`Token`]s
///
/// Storage is a shared `Arc<[Token]>`, so cloning is cheap and every
/// operation that "changes" the sequence returns a new one. Equality and
/// hashing are structural over the token values, which makes a sequence usable
/// as the key of a recombination map.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenSequence {
    tokens: Arc<[Token]>,
}

impl TokenSequence {
    /// The empty sequence
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tokens: Arc::from(Vec::new()),
        }
    }

    /// Number of tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the sequence holds no tokens
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`, if any
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Token> {
        self.tokens.get(index).copied()
    }

    /// Borrow the tokens
    #[must_use]
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterate over the tokens in order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }

    /// The first `n` tokens
    ///
    /// Returns the whole sequence when `n` exceeds its length.
    #[must_use]
    pub fn keep_left(&self, n: usize) -> Self {
        if n >= self.len() {
            return self.clone();
        }
        Self::from(&self.tokens[..n])
    }

    /// The last `n` tokens
    ///
    /// Returns the whole sequence when `n` exceeds its length.
    #[must_use]
    pub fn keep_right(&self, n: usize) -> Self {
        if n >= self.len() {
            return self.clone();
        }
        Self::from(&self.tokens[self.len() - n..])
    }

    /// Tokens in `range`, clamped to the sequence bounds
    #[must_use]
    pub fn subsequence(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self::from(&self.tokens[start..end])
    }

    /// This sequence followed by `other`
    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        self.tokens
            .iter()
            .chain(other.tokens.iter())
            .copied()
            .collect()
    }
}

impl Default for TokenSequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&[Token]> for TokenSequence {
    fn from(tokens: &[Token]) -> Self {
        Self {
            tokens: Arc::from(tokens),
        }
    }
}

impl From<Vec<Token>> for TokenSequence {
    fn from(tokens: Vec<Token>) -> Self {
        Self {
            tokens: Arc::from(tokens),
        }
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl std::ops::Deref for TokenSequence {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.tokens
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl fmt::Debug for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tokens.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenFactory;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(seq: &TokenSequence) -> u64 {
        let mut hasher = DefaultHasher::new();
        seq.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_keep_left_and_right() {
        let factory = TokenFactory::new();
        let seq = factory.sequence(&factory.terminals(&["a", "b", "c", "d"]));

        assert_eq!(factory.render(&seq.keep_left(2)), "a b");
        assert_eq!(factory.render(&seq.keep_right(2)), "c d");
        // original untouched
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn test_keep_more_than_length() {
        let factory = TokenFactory::new();
        let seq = factory.sequence(&factory.terminals(&["a", "b"]));

        assert_eq!(seq.keep_left(5), seq);
        assert_eq!(seq.keep_right(5), seq);
        assert!(seq.keep_left(0).is_empty());
        assert!(seq.keep_right(0).is_empty());
    }

    #[test]
    fn test_equality_and_hash() {
        let factory = TokenFactory::new();
        let a = factory.sequence(&factory.terminals(&["x", "y"]));
        let b = factory.sequence(&factory.terminals(&["x", "y"]));
        let c = factory.sequence(&factory.terminals(&["x"]));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_append_and_subsequence() {
        let factory = TokenFactory::new();
        let left = factory.sequence(&factory.terminals(&["a", "b"]));
        let right = factory.sequence(&factory.terminals(&["c"]));

        let joined = left.append(&right);
        assert_eq!(factory.render(&joined), "a b c");
        assert_eq!(joined.subsequence(1..3), factory.sequence(&factory.terminals(&["b", "c"])));
        assert!(joined.subsequence(5..9).is_empty());
        assert_eq!(left.append(&TokenSequence::empty()), left);
    }

    #[test]
    fn test_get() {
        let factory = TokenFactory::new();
        let tokens = factory.terminals(&["p", "q"]);
        let seq: TokenSequence = tokens.iter().copied().collect();

        assert_eq!(seq.get(1), Some(tokens[1]));
        assert_eq!(seq.get(2), None);
        assert_eq!(seq.iter().count(), 2);
    }
}
