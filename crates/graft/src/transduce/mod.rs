//! # Transduction
//!
//! How a matched rule maps onto the target side, and the forest types that
//! output layers consume.
//!
//! ## Overview
//!
//! A [`Transducer`] answers three questions per rule: the target left-hand
//! side, the target right-hand side, and for every target slot the source slot
//! it came from (`None` for inserted target material). The combiners fill
//! target slots in order and use the alignment to decide where each child's
//! source tree goes.
//!
//! - [`MonoTransducer`] is the identity: the target side is the source side
//! - [`SyncTransducer`] reads the declared permutation of a [`SyncRule`]
//!
//! [`Vertex`] and [`Forest`] are plain data: a packed representation of
//! transduced constituents with alternative children per slot.

use crate::error::{GraftError, Result};
use crate::grammar::{GrammarRule, SyncRule};
use crate::parse::Span;
use crate::token::Token;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Target-side view of a rule
pub trait Transducer<R: ?Sized>: Send + Sync {
    /// Target left-hand side
    fn target_lhs(&self, rule: &R) -> Token;

    /// Target right-hand side, one token per target slot
    fn target_rhs<'r>(&self, rule: &'r R) -> &'r [Token];

    /// Source slot of every target slot
    fn target_to_source<'r>(&self, rule: &'r R) -> Cow<'r, [Option<usize>]>;
}

/// Monolingual transduction: target order equals source order
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoTransducer;

impl<R: GrammarRule + ?Sized> Transducer<R> for MonoTransducer {
    fn target_lhs(&self, rule: &R) -> Token {
        rule.lhs()
    }

    fn target_rhs<'r>(&self, rule: &'r R) -> &'r [Token] {
        rule.rhs()
    }

    fn target_to_source<'r>(&self, rule: &'r R) -> Cow<'r, [Option<usize>]> {
        Cow::Owned((0..rule.arity()).map(Some).collect())
    }
}

/// Synchronous transduction over the rule's declared alignment
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncTransducer;

impl Transducer<SyncRule> for SyncTransducer {
    fn target_lhs(&self, rule: &SyncRule) -> Token {
        rule.target_lhs()
    }

    fn target_rhs<'r>(&self, rule: &'r SyncRule) -> &'r [Token] {
        rule.target_rhs()
    }

    fn target_to_source<'r>(&self, rule: &'r SyncRule) -> Cow<'r, [Option<usize>]> {
        Cow::Borrowed(rule.target_to_source())
    }
}

/// A transduced constituent with alternative children per slot
pub struct Vertex<R> {
    span: Span,
    rule: Option<Arc<R>>,
    label: Token,
    children: Vec<Vec<Vertex<R>>>,
}

impl<R> Vertex<R> {
    /// A leaf covering `span`
    #[must_use]
    pub const fn terminal(span: Span, label: Token) -> Self {
        Self {
            span,
            rule: None,
            label,
            children: Vec::new(),
        }
    }

    /// An inner vertex built by `rule`, with `arity` empty slots
    #[must_use]
    pub fn nonterminal(span: Span, rule: Arc<R>, label: Token, arity: usize) -> Self {
        Self {
            span,
            rule: Some(rule),
            label,
            children: (0..arity).map(|_| Vec::new()).collect(),
        }
    }

    /// Add one more way of filling `slot`
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::SlotOutOfRange`] if `slot` is past the arity.
    pub fn push_alternative(&mut self, slot: usize, child: Vertex<R>) -> Result<()> {
        let arity = self.children.len();
        self.children
            .get_mut(slot)
            .ok_or(GraftError::SlotOutOfRange { slot, arity })?
            .push(child);
        Ok(())
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub fn rule(&self) -> Option<&Arc<R>> {
        self.rule.as_ref()
    }

    #[must_use]
    pub const fn label(&self) -> Token {
        self.label
    }

    /// Alternatives for each slot
    #[must_use]
    pub fn children(&self) -> &[Vec<Vertex<R>>] {
        &self.children
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.rule.is_none()
    }

    /// Whether any slot at or below this vertex has more than one alternative
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.children
            .iter()
            .any(|alts| alts.len() > 1 || alts.iter().any(Vertex::is_ambiguous))
    }

    /// Number of distinct derivations packed below this vertex
    ///
    /// Slots without alternatives are ignored. Saturates at `usize::MAX`.
    #[must_use]
    pub fn derivation_count(&self) -> usize {
        self.children
            .iter()
            .filter(|alts| !alts.is_empty())
            .map(|alts| {
                alts.iter()
                    .map(Vertex::derivation_count)
                    .fold(0usize, usize::saturating_add)
            })
            .fold(1usize, usize::saturating_mul)
    }
}

impl<R> fmt::Debug for Vertex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vertex")
            .field("span", &self.span)
            .field("label", &self.label)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Root vertices of a transduced sentence
pub struct Forest<R> {
    roots: Vec<Vertex<R>>,
}

impl<R> Forest<R> {
    #[must_use]
    pub const fn new() -> Self {
        Self { roots: Vec::new() }
    }

    pub fn add_root(&mut self, root: Vertex<R>) {
        self.roots.push(root);
    }

    #[must_use]
    pub fn roots(&self) -> &[Vertex<R>] {
        &self.roots
    }

    #[must_use]
    pub fn first_root(&self) -> Option<&Vertex<R>> {
        self.roots.first()
    }

    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Multiple roots, or an ambiguous slot anywhere below one
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.roots.len() > 1 || self.roots.iter().any(Vertex::is_ambiguous)
    }

    /// Total derivations across all roots, saturating
    #[must_use]
    pub fn derivation_count(&self) -> usize {
        self.roots
            .iter()
            .map(Vertex::derivation_count)
            .fold(0usize, usize::saturating_add)
    }
}

impl<R> Default for Forest<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Forest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forest").field("roots", &self.roots).finish()
    }
}
