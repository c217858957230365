use super::format::TreeFormatter;
use crate::error::{GraftError, Result};
use crate::scoring::Scores;
use crate::token::Token;
use std::fmt;
use std::sync::Arc;

/// Half-open range `[start, end)` of input positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest span covering both
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// One side of a derivation
///
/// A node has exactly as many child slots as the rule that created it has
/// right-hand side symbols; terminals have none. Slots are filled by index and
/// may stay empty (a source terminal nobody attached, for instance). Subtrees
/// are shared through `Arc` and never change once attached.
#[derive(Clone)]
pub struct Tree {
    label: Token,
    scores: Option<Arc<Scores>>,
    children: Box<[Option<Arc<Tree>>]>,
}

impl Tree {
    /// A leaf with no slots
    #[must_use]
    pub fn terminal(label: Token) -> Self {
        Self::with_arity(label, 0)
    }

    /// A node with `arity` empty slots
    #[must_use]
    pub fn with_arity(label: Token, arity: usize) -> Self {
        Self {
            label,
            scores: None,
            children: vec![None; arity].into_boxed_slice(),
        }
    }

    /// A node whose slots are all filled, in order, by `children`
    #[must_use]
    pub fn with_children(label: Token, children: impl IntoIterator<Item = Arc<Tree>>) -> Self {
        Self {
            label,
            scores: None,
            children: children.into_iter().map(Some).collect(),
        }
    }

    /// Put `child` into `slot`, replacing anything already there
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::SlotOutOfRange`] if `slot >= self.arity()`.
    pub fn attach(&mut self, slot: usize, child: Arc<Tree>) -> Result<()> {
        let arity = self.children.len();
        let target = self
            .children
            .get_mut(slot)
            .ok_or(GraftError::SlotOutOfRange { slot, arity })?;
        *target = Some(child);
        Ok(())
    }

    #[must_use]
    pub const fn label(&self) -> Token {
        self.label
    }

    #[must_use]
    pub fn scores(&self) -> Option<&Scores> {
        self.scores.as_deref()
    }

    pub fn set_scores(&mut self, scores: Arc<Scores>) {
        self.scores = Some(scores);
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Child in `slot`, if filled
    #[must_use]
    pub fn child(&self, slot: usize) -> Option<&Arc<Tree>> {
        self.children.get(slot)?.as_ref()
    }

    /// Every slot in order, filled or not
    #[must_use]
    pub fn children(&self) -> &[Option<Arc<Tree>>] {
        &self.children
    }

    /// Terminal leaves, left to right
    #[must_use]
    pub fn terminals(&self) -> Vec<Token> {
        let mut out = Vec::new();
        self.collect_terminals(&mut out);
        out
    }

    fn collect_terminals(&self, out: &mut Vec<Token>) {
        if self.is_leaf() {
            if self.label.is_terminal() {
                out.push(self.label);
            }
            return;
        }
        for child in self.children.iter().flatten() {
            child.collect_terminals(out);
        }
    }

    /// Walk this tree in pre-order, driving `formatter`
    ///
    /// Inner nodes call `nonterminal_before`, then each filled slot in order,
    /// then `nonterminal_after`. Leaves call `terminal` once.
    pub fn format<F: TreeFormatter + ?Sized>(&self, formatter: &mut F, out: &mut String) {
        if self.is_leaf() {
            formatter.terminal(self.label, out);
            return;
        }
        formatter.nonterminal_before(self.label, self.scores(), out);
        for child in self.children.iter().flatten() {
            child.format(formatter, out);
        }
        formatter.nonterminal_after(self.label, self.scores(), out);
    }

    /// Number of nodes in this tree
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|child| child.node_count())
            .sum::<usize>()
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return write!(f, "{:?}", self.label);
        }
        let mut list = f.debug_tuple(&format!("{:?}", self.label));
        for child in self.children.iter() {
            list.field(child);
        }
        list.finish()
    }
}
