use crate::scoring::Scores;
use crate::token::{Token, TokenFactory};
use std::fmt::Write;

/// Hooks called by [`Tree::format`](super::Tree::format)
///
/// Every hook defaults to doing nothing, so an implementation only overrides
/// what it renders.
pub trait TreeFormatter {
    /// Called when entering an inner node, before its children
    fn nonterminal_before(&mut self, label: Token, scores: Option<&Scores>, out: &mut String) {
        let _ = (label, scores, out);
    }

    /// Called when leaving an inner node, after its children
    fn nonterminal_after(&mut self, label: Token, scores: Option<&Scores>, out: &mut String) {
        let _ = (label, scores, out);
    }

    /// Called once per leaf
    fn terminal(&mut self, label: Token, out: &mut String) {
        let _ = (label, out);
    }
}

/// Bracketed or flat rendering through a [`TokenFactory`]
///
/// With `show_tree` a node renders as `(LABEL child ... )`; with
/// `show_scores` the label is followed by `=` and the node's log-probability.
/// Without `show_tree` only the leaves are written, space separated.
#[derive(Debug, Clone, Copy)]
pub struct BasicTreeFormatter<'f> {
    factory: &'f TokenFactory,
    show_tree: bool,
    show_scores: bool,
}

impl<'f> BasicTreeFormatter<'f> {
    #[must_use]
    pub const fn new(factory: &'f TokenFactory, show_tree: bool, show_scores: bool) -> Self {
        Self {
            factory,
            show_tree,
            show_scores,
        }
    }

    /// Leaves only
    #[must_use]
    pub const fn flat(factory: &'f TokenFactory) -> Self {
        Self::new(factory, false, false)
    }

    /// Bracketed, with scores
    #[must_use]
    pub const fn bracketed(factory: &'f TokenFactory) -> Self {
        Self::new(factory, true, true)
    }

    fn text(&self, token: Token) -> &'f str {
        self.factory.try_resolve(token).unwrap_or("<?>")
    }
}

impl TreeFormatter for BasicTreeFormatter<'_> {
    fn nonterminal_before(&mut self, label: Token, scores: Option<&Scores>, out: &mut String) {
        if !self.show_tree {
            return;
        }
        out.push('(');
        out.push_str(self.text(label));
        if let (true, Some(scores)) = (self.show_scores, scores) {
            let _ = write!(out, "={:.4}", scores.log_prob());
        }
        out.push(' ');
    }

    fn nonterminal_after(&mut self, _label: Token, _scores: Option<&Scores>, out: &mut String) {
        if self.show_tree {
            out.push_str(") ");
        }
    }

    fn terminal(&mut self, label: Token, out: &mut String) {
        out.push_str(self.text(label));
        out.push(' ');
    }
}
