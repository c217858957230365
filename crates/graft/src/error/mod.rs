//! # Error Types
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`GraftError`].
//!
//! ## Overview
//!
//! Errors fall into three groups:
//!
//! - **Contract violations**: a caller handed the core something malformed
//!   (an empty trie key, a slot list that does not match the rule arity, an
//!   alignment pointing past the source right-hand side). These fail fast and
//!   are never confused with an ordinary lookup miss, which is `None`.
//! - **Model errors**: a rule that does not validate, a feature vector that
//!   does not line up with the weight vector, or a score that left the set of
//!   representable log-probabilities.
//! - **Run errors**: unknown component names, bad configuration, or a sentence
//!   whose worker panicked. The batch layer records these per sentence.
//!
//! ## Usage
//!
//! ```rust
//! use graft::error::GraftError;
//! use graft::trie::{Trie, TriePolicy};
//!
//! let mut trie: Trie<u32, &str> = Trie::new(TriePolicy::new(2).unwrap());
//! let err = trie.put(&[], "x").unwrap_err();
//! assert!(matches!(err, GraftError::EmptyKey));
//! assert!(err.is_contract_violation());
//! ```

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraftError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraftError {
    #[error("trie keys must contain at least one element")]
    EmptyKey,

    #[error("key of length {len} exceeds the trie maximum key length {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("arity mismatch in {context}: expected {expected}, found {found}")]
    ArityMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("slot {slot} is out of range for a node with {arity} slots")]
    SlotOutOfRange { slot: usize, arity: usize },

    #[error("invalid rule {rule_id}: {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("{context} produced the non-finite score {value}")]
    NonFiniteScore { value: f64, context: &'static str },

    #[error("no weight configured for feature {name}")]
    MissingFeature { name: String },

    #[error("feature vector has {found} values, expected {expected}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("unknown {kind}: {name}")]
    UnknownComponent { kind: &'static str, name: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sentence {sentence_id} panicked: {message}")]
    Panicked {
        sentence_id: String,
        message: String,
    },
}

impl GraftError {
    /// Create an invalid rule error
    #[must_use]
    pub fn invalid_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown component error
    #[must_use]
    pub fn unknown_component(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownComponent {
            kind,
            name: name.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error signals a caller handing the core malformed input,
    /// as opposed to a model or run failure.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptyKey
                | Self::KeyTooLong { .. }
                | Self::ArityMismatch { .. }
                | Self::SlotOutOfRange { .. }
        )
    }
}

impl From<serde_json::Error> for GraftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
