//! # Tokens
//!
//! Canonical grammar symbols and the immutable sequences built from them.
//!
//! ## Overview
//!
//! Every terminal and nonterminal is interned once by a [`TokenFactory`] and
//! handed out as a [`Token`]: a `Copy` tagged handle that compares and hashes
//! in O(1). Two calls with the same string and the same terminal flag always
//! return the same token; the same string under the two flags yields two
//! different tokens, so the literal `"NP"` never collides with the
//! nonterminal `NP`.
//!
//! The factory sits on a `lasso::ThreadedRodeo`, so a fully populated factory
//! can be shared behind an `Arc` by every sentence worker.
//!
//! ## Usage
//!
//! ```rust
//! use graft::token::TokenFactory;
//!
//! let factory = TokenFactory::new();
//! let np = factory.nonterminal("NP");
//! let word = factory.terminal("NP");
//!
//! assert_ne!(np, word);
//! assert_eq!(np, factory.nonterminal("NP"));
//! assert_eq!(factory.resolve(np), "NP");
//!
//! let seq = factory.sequence(&factory.terminals(&["the", "big", "cat"]));
//! assert_eq!(factory.render(&seq.keep_right(2)), "big cat");
//! ```

mod sequence;

pub use sequence::TokenSequence;

use lasso::{Spur, ThreadedRodeo};
use std::fmt;

/// Interned symbol text shared by terminals and nonterminals
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.0)
    }
}

/// A canonical grammar symbol
///
/// Tokens are only obtained from a [`TokenFactory`]. Equality is identity of
/// the interned symbol plus the terminal flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    /// A word of the source or target language
    Terminal(Symbol),
    /// A grammar category
    Nonterminal(Symbol),
}

impl Token {
    /// Whether this token is a terminal
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// The interned text of this token
    #[must_use]
    pub const fn symbol(self) -> Symbol {
        match self {
            Self::Terminal(symbol) | Self::Nonterminal(symbol) => symbol,
        }
    }
}

/// Sentence boundary markers used by target-side scoring
pub const SENTENCE_START: &str = "<s>";
pub const SENTENCE_END: &str = "</s>";

/// Canonicalizing factory for [`Token`]s
///
/// Interning takes `&self`, so the factory can be populated through a shared
/// reference while grammars load. Once decoding starts it should only be read.
pub struct TokenFactory {
    rodeo: ThreadedRodeo,
}

impl TokenFactory {
    /// Create a new empty factory
    #[must_use]
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Create a new factory with pre-allocated capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        use std::num::NonZeroUsize;
        let bytes = NonZeroUsize::new(capacity.saturating_mul(8)).unwrap_or(NonZeroUsize::MIN);
        Self {
            rodeo: ThreadedRodeo::with_capacity(lasso::Capacity::new(capacity, bytes)),
        }
    }

    /// Intern `text` as a terminal or a nonterminal
    pub fn make_token(&self, text: &str, terminal: bool) -> Token {
        let symbol = Symbol(self.rodeo.get_or_intern(text));
        if terminal {
            Token::Terminal(symbol)
        } else {
            Token::Nonterminal(symbol)
        }
    }

    /// Intern a terminal
    pub fn terminal(&self, text: &str) -> Token {
        self.make_token(text, true)
    }

    /// Intern a nonterminal
    pub fn nonterminal(&self, text: &str) -> Token {
        self.make_token(text, false)
    }

    /// Intern every string as a terminal, preserving order
    pub fn terminals(&self, words: &[&str]) -> Vec<Token> {
        words.iter().map(|word| self.terminal(word)).collect()
    }

    /// Look up a token without interning it
    #[must_use]
    pub fn get(&self, text: &str, terminal: bool) -> Option<Token> {
        let symbol = Symbol(self.rodeo.get(text)?);
        Some(if terminal {
            Token::Terminal(symbol)
        } else {
            Token::Nonterminal(symbol)
        })
    }

    /// The `<s>` and `</s>` terminals
    pub fn sentence_markers(&self) -> (Token, Token) {
        (self.terminal(SENTENCE_START), self.terminal(SENTENCE_END))
    }

    /// Build a sequence from tokens produced by this factory
    #[must_use]
    pub fn sequence(&self, tokens: &[Token]) -> TokenSequence {
        TokenSequence::from(tokens)
    }

    /// Resolve a token back to its text
    ///
    /// # Panics
    ///
    /// Panics if the token was not created by this factory.
    #[must_use]
    pub fn resolve(&self, token: Token) -> &str {
        self.rodeo.resolve(&token.symbol().0)
    }

    /// Try to resolve a token
    ///
    /// Returns `None` if the token was not created by this factory.
    #[must_use]
    pub fn try_resolve(&self, token: Token) -> Option<&str> {
        self.rodeo.try_resolve(&token.symbol().0)
    }

    /// Render a sequence as space-separated text
    #[must_use]
    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(self.try_resolve(*token).unwrap_or("<?>"));
        }
        out
    }

    /// Number of distinct strings interned
    #[must_use]
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Check if nothing has been interned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for TokenFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFactory")
            .field("len", &self.rodeo.len())
            .finish()
    }
}
