//! # Grammar Rules
//!
//! The rule contract consumed by the combiners, its monolingual and
//! synchronous implementations, and an index over rule right-hand sides.
//!
//! ## Overview
//!
//! A [`GrammarRule`] exposes a left-hand side, a source right-hand side and a
//! vector of feature log-probabilities. [`SyncRule`] adds a target side and a
//! target-to-source alignment; construction validates that alignment so the
//! combiners can rely on it without rechecking:
//!
//! - the alignment has one entry per target slot
//! - an aligned pair links a nonterminal on both sides, and no source slot is
//!   aligned twice
//! - an unaligned target slot is a terminal (inserted target material)
//! - an unaligned source slot is a terminal (deleted source material)
//!
//! [`GrammarIndex`] stores rules in a [`Trie`] keyed by source right-hand side
//! so a chart can find candidate rules symbol by symbol.
//!
//! ## Usage
//!
//! ```rust
//! use graft::grammar::{GrammarRule, SyncRule};
//! use graft::token::TokenFactory;
//!
//! let f = TokenFactory::new();
//! let (np, adj, n) = (f.nonterminal("NP"), f.nonterminal("ADJ"), f.nonterminal("N"));
//!
//! // NP -> ADJ N  ||  NP -> N ADJ
//! let rule = SyncRule::new("np-1", np, vec![adj, n], np, vec![n, adj], vec![Some(1), Some(0)], vec![-0.5])?;
//! assert_eq!(rule.arity(), 2);
//! assert_eq!(rule.source_to_target(), &[Some(1), Some(0)]);
//! assert!(rule.target_constraint_satisfied(0, adj));
//! assert!(!rule.target_constraint_satisfied(0, n));
//! # Ok::<(), graft::GraftError>(())
//! ```

use crate::error::{GraftError, Result};
use crate::token::{Token, TokenSequence};
use crate::trie::{Trie, TriePolicy};
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

/// A rule the combiners can expand
pub trait GrammarRule: Send + Sync {
    /// Identifier used in diagnostics
    fn id(&self) -> &str;

    /// Source-side left-hand side
    fn lhs(&self) -> Token;

    /// Source-side right-hand side; terminals and nonterminals mix freely
    fn rhs(&self) -> &[Token];

    /// Number of source right-hand side slots
    fn arity(&self) -> usize {
        self.rhs().len()
    }

    /// Rule feature log-probabilities
    fn features(&self) -> &[f64];
}

fn check_features(id: &str, features: &[f64]) -> Result<()> {
    match features.iter().find(|v| v.is_nan() || **v == f64::INFINITY) {
        Some(value) => Err(GraftError::invalid_rule(
            id,
            format!("feature value {value} is not a log-probability"),
        )),
        None => Ok(()),
    }
}

fn check_lhs(id: &str, side: &str, lhs: Token) -> Result<()> {
    if lhs.is_terminal() {
        return Err(GraftError::invalid_rule(
            id,
            format!("{side} left-hand side must be a nonterminal"),
        ));
    }
    Ok(())
}

/// A monolingual context-free rule
#[derive(Clone)]
pub struct MonoRule {
    id: CompactString,
    lhs: Token,
    rhs: Box<[Token]>,
    features: Box<[f64]>,
}

impl MonoRule {
    /// Create a monolingual rule
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::InvalidRule`] if the left-hand side is a terminal
    /// or a feature value is NaN or positive infinity.
    pub fn new(
        id: impl Into<CompactString>,
        lhs: Token,
        rhs: Vec<Token>,
        features: Vec<f64>,
    ) -> Result<Self> {
        let id = id.into();
        check_lhs(&id, "source", lhs)?;
        check_features(&id, &features)?;
        Ok(Self {
            id,
            lhs,
            rhs: rhs.into_boxed_slice(),
            features: features.into_boxed_slice(),
        })
    }
}

impl GrammarRule for MonoRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lhs(&self) -> Token {
        self.lhs
    }

    fn rhs(&self) -> &[Token] {
        &self.rhs
    }

    fn features(&self) -> &[f64] {
        &self.features
    }
}

impl fmt::Debug for MonoRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonoRule")
            .field("id", &self.id)
            .field("arity", &self.rhs.len())
            .finish_non_exhaustive()
    }
}

/// A synchronous context-free rule with a target side and alignment
#[derive(Clone)]
pub struct SyncRule {
    id: CompactString,
    lhs: Token,
    rhs: Box<[Token]>,
    target_lhs: Token,
    target_rhs: Box<[Token]>,
    target_to_source: Box<[Option<usize>]>,
    source_to_target: Box<[Option<usize>]>,
    features: Box<[f64]>,
}

impl SyncRule {
    /// Create and validate a synchronous rule
    ///
    /// `target_to_source[t]` names the source slot aligned with target slot
    /// `t`, or `None` for inserted target material.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::InvalidRule`] when the alignment breaks any of the
    /// rules listed in the module documentation, when either left-hand side is
    /// a terminal, or when a feature value is NaN or positive infinity.
    pub fn new(
        id: impl Into<CompactString>,
        lhs: Token,
        rhs: Vec<Token>,
        target_lhs: Token,
        target_rhs: Vec<Token>,
        target_to_source: Vec<Option<usize>>,
        features: Vec<f64>,
    ) -> Result<Self> {
        let id = id.into();
        check_lhs(&id, "source", lhs)?;
        check_lhs(&id, "target", target_lhs)?;
        check_features(&id, &features)?;

        if target_to_source.len() != target_rhs.len() {
            return Err(GraftError::invalid_rule(
                id.as_str(),
                format!(
                    "alignment has {} entries for {} target slots",
                    target_to_source.len(),
                    target_rhs.len()
                ),
            ));
        }

        let mut source_to_target = vec![None; rhs.len()];
        for (target_slot, aligned) in target_to_source.iter().enumerate() {
            let target_token = target_rhs[target_slot];
            let Some(source_slot) = *aligned else {
                if !target_token.is_terminal() {
                    return Err(GraftError::invalid_rule(
                        id.as_str(),
                        format!("unaligned target slot {target_slot} is a nonterminal"),
                    ));
                }
                continue;
            };
            let Some(source_token) = rhs.get(source_slot).copied() else {
                return Err(GraftError::invalid_rule(
                    id.as_str(),
                    format!(
                        "target slot {target_slot} aligns to source slot {source_slot} of {}",
                        rhs.len()
                    ),
                ));
            };
            if source_token.is_terminal() || target_token.is_terminal() {
                return Err(GraftError::invalid_rule(
                    id.as_str(),
                    format!(
                        "aligned slots {source_slot}->{target_slot} must both be nonterminals"
                    ),
                ));
            }
            if source_to_target[source_slot].replace(target_slot).is_some() {
                return Err(GraftError::invalid_rule(
                    id.as_str(),
                    format!("source slot {source_slot} is aligned more than once"),
                ));
            }
        }

        for (source_slot, aligned) in source_to_target.iter().enumerate() {
            if aligned.is_none() && !rhs[source_slot].is_terminal() {
                return Err(GraftError::invalid_rule(
                    id.as_str(),
                    format!("unaligned source slot {source_slot} is a nonterminal"),
                ));
            }
        }

        Ok(Self {
            id,
            lhs,
            rhs: rhs.into_boxed_slice(),
            target_lhs,
            target_rhs: target_rhs.into_boxed_slice(),
            target_to_source: target_to_source.into_boxed_slice(),
            source_to_target: source_to_target.into_boxed_slice(),
            features: features.into_boxed_slice(),
        })
    }

    #[must_use]
    pub const fn target_lhs(&self) -> Token {
        self.target_lhs
    }

    #[must_use]
    pub fn target_rhs(&self) -> &[Token] {
        &self.target_rhs
    }

    /// Source slot for each target slot
    #[must_use]
    pub fn target_to_source(&self) -> &[Option<usize>] {
        &self.target_to_source
    }

    /// Target slot for each source slot
    #[must_use]
    pub fn source_to_target(&self) -> &[Option<usize>] {
        &self.source_to_target
    }

    /// Whether a child whose target left-hand side is `child_target_lhs` may
    /// fill source slot `source_slot`
    ///
    /// Terminal source slots accept anything; a nonterminal slot requires the
    /// child's target category to equal the aligned target symbol. Slots
    /// outside the right-hand side are never satisfied.
    #[must_use]
    pub fn target_constraint_satisfied(&self, source_slot: usize, child_target_lhs: Token) -> bool {
        let Some(source_token) = self.rhs.get(source_slot) else {
            return false;
        };
        if source_token.is_terminal() {
            return true;
        }
        self.source_to_target
            .get(source_slot)
            .copied()
            .flatten()
            .and_then(|target_slot| self.target_rhs.get(target_slot))
            .is_some_and(|required| *required == child_target_lhs)
    }

    /// Left-hand side followed by the source right-hand side
    ///
    /// Two arcs over the same span can be packed together when these keys
    /// agree.
    #[must_use]
    pub fn packing_key(&self) -> TokenSequence {
        std::iter::once(self.lhs)
            .chain(self.rhs.iter().copied())
            .collect()
    }
}

impl GrammarRule for SyncRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lhs(&self) -> Token {
        self.lhs
    }

    fn rhs(&self) -> &[Token] {
        &self.rhs
    }

    fn features(&self) -> &[f64] {
        &self.features
    }
}

impl fmt::Debug for SyncRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRule")
            .field("id", &self.id)
            .field("source_arity", &self.rhs.len())
            .field("target_arity", &self.target_rhs.len())
            .field("alignment", &self.target_to_source)
            .finish_non_exhaustive()
    }
}

/// Rules indexed by source right-hand side
pub struct GrammarIndex<R> {
    trie: Trie<Token, Vec<Arc<R>>>,
    rules: usize,
}

impl<R: GrammarRule> GrammarIndex<R> {
    /// Create an empty index whose keys are bounded by `policy`
    #[must_use]
    pub fn new(policy: TriePolicy) -> Self {
        Self {
            trie: Trie::new(policy),
            rules: 0,
        }
    }

    /// Add a rule under its source right-hand side
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::EmptyKey`] for an epsilon rule and
    /// [`GraftError::KeyTooLong`] for a right-hand side longer than the policy
    /// allows.
    pub fn insert(&mut self, rule: Arc<R>) -> Result<()> {
        let key = rule.rhs().to_vec();
        match self.trie.get_mut(&key) {
            Some(bucket) => bucket.push(rule),
            None => {
                self.trie.put(&key, vec![rule])?;
            }
        }
        self.rules += 1;
        Ok(())
    }

    /// All rules whose source right-hand side equals `rhs`, in insertion order
    #[must_use]
    pub fn rules_for(&self, rhs: &[Token]) -> &[Arc<R>] {
        self.trie.get(rhs).map_or(&[], Vec::as_slice)
    }

    /// Cursor for symbol-by-symbol matching
    #[must_use]
    pub fn cursor(&self) -> crate::trie::TrieCursor<'_, Token, Vec<Arc<R>>> {
        self.trie.cursor()
    }

    /// Number of rules
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rules
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rules == 0
    }

    /// Number of distinct right-hand sides
    #[must_use]
    pub const fn distinct_rhs(&self) -> usize {
        self.trie.len()
    }
}

impl<R> fmt::Debug for GrammarIndex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarIndex")
            .field("rules", &self.rules)
            .field("trie", &self.trie)
            .finish()
    }
}
