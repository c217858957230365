//! # Parses
//!
//! Bilingual derivations: a source tree, a target tree, the target yield and
//! the scores that rank them.
//!
//! ## Overview
//!
//! A [`Parse`] is created either as a terminal leaf or as a *seed*: the bare
//! left-hand sides of a rule with empty child slots sized to the source and
//! target arities. Combiners then derive copies of the seed and attach one
//! child per slot with [`Parse::append_parse`].
//!
//! Roots are held behind `Arc` and written copy-on-write, so a derived parse
//! never disturbs the parse it was derived from while attached subtrees stay
//! shared. The target token list is kept in step with the target tree: it
//! always equals the tree's terminal leaves, left to right, as long as
//! children are appended in target-slot order (which every combiner does).
//!
//! Parses have no structural equality. Hypotheses are told apart by their
//! [`target_yield`](Parse::target_yield) or by identity.
//!
//! ## Usage
//!
//! ```rust
//! use graft::parse::{BasicTreeFormatter, Parse};
//! use graft::scoring::Scores;
//! use graft::token::TokenFactory;
//!
//! let f = TokenFactory::new();
//! let (x, a, b) = (f.nonterminal("X"), f.nonterminal("A"), f.nonterminal("B"));
//!
//! let mut child_a = Parse::seed(a, a, 0, 1, Scores::default());
//! child_a.append_parse(None, 0, &Parse::target_terminal(f.terminal("one")))?;
//! let mut child_b = Parse::seed(b, b, 0, 1, Scores::default());
//! child_b.append_parse(None, 0, &Parse::target_terminal(f.terminal("two")))?;
//!
//! // X -> A B || X -> B A
//! let mut parse = Parse::seed(x, x, 2, 2, Scores::default());
//! parse.append_parse(Some(1), 0, &child_b)?;
//! parse.append_parse(Some(0), 1, &child_a)?;
//!
//! assert_eq!(f.render(&parse.target_yield()), "two one");
//! assert_eq!(parse.format_target(&mut BasicTreeFormatter::new(&f, true, false)), "(X (B two ) (A one ) )");
//! # Ok::<(), graft::GraftError>(())
//! ```

mod format;
mod tree;

pub use format::{BasicTreeFormatter, TreeFormatter};
pub use tree::{Span, Tree};

use crate::error::{GraftError, Result};
use crate::scoring::{Scored, Scores};
use crate::token::{Token, TokenSequence};
use std::fmt;
use std::sync::Arc;

/// A partial or complete bilingual derivation
#[derive(Clone)]
pub struct Parse {
    source: Option<Arc<Tree>>,
    target: Option<Arc<Tree>>,
    target_tokens: Vec<Token>,
    scores: Arc<Scores>,
    span: Option<Span>,
    recombined: Vec<Arc<Parse>>,
}

impl Parse {
    /// A target-side terminal leaf
    #[must_use]
    pub fn target_terminal(token: Token) -> Self {
        Self {
            source: None,
            target: Some(Arc::new(Tree::terminal(token))),
            target_tokens: vec![token],
            scores: Arc::default(),
            span: None,
            recombined: Vec::new(),
        }
    }

    /// A target-side node labeled `label` whose leaves are `tokens`
    ///
    /// Used to seed fixed target material such as the `<s>` and `</s>`
    /// markers around a sentence.
    #[must_use]
    pub fn target_terminals(label: Token, tokens: &[Token]) -> Self {
        let tree = Tree::with_children(
            label,
            tokens.iter().map(|token| Arc::new(Tree::terminal(*token))),
        );
        Self {
            source: None,
            target: Some(Arc::new(tree)),
            target_tokens: tokens.to_vec(),
            scores: Arc::default(),
            span: None,
            recombined: Vec::new(),
        }
    }

    /// A source-side terminal leaf covering `span`
    #[must_use]
    pub fn source_terminal(token: Token, span: Span) -> Self {
        Self {
            source: Some(Arc::new(Tree::terminal(token))),
            target: None,
            target_tokens: Vec::new(),
            scores: Arc::default(),
            span: Some(span),
            recombined: Vec::new(),
        }
    }

    /// Bare left-hand sides with empty child slots
    #[must_use]
    pub fn seed(
        source_lhs: Token,
        target_lhs: Token,
        source_arity: usize,
        target_arity: usize,
        scores: Scores,
    ) -> Self {
        let mut parse = Self {
            source: Some(Arc::new(Tree::with_arity(source_lhs, source_arity))),
            target: Some(Arc::new(Tree::with_arity(target_lhs, target_arity))),
            target_tokens: Vec::new(),
            scores: Arc::default(),
            span: None,
            recombined: Vec::new(),
        };
        parse.set_scores(scores);
        parse
    }

    /// This parse with `scores` installed
    #[must_use]
    pub fn with_scores(mut self, scores: Scores) -> Self {
        self.set_scores(scores);
        self
    }

    /// A copy to extend, without the recombined alternatives
    #[must_use]
    pub fn derive(&self) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.clone(),
            target_tokens: self.target_tokens.clone(),
            scores: Arc::clone(&self.scores),
            span: self.span,
            recombined: Vec::new(),
        }
    }

    /// Attach `child` at `target_slot` of the target tree and, unless
    /// `source_slot` is `None`, at `source_slot` of the source tree
    ///
    /// The child's target tokens are appended to this parse's yield. A child
    /// without a source tree (inserted target material) skips the source
    /// side. Nothing is modified when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::SlotOutOfRange`] if either slot is outside its
    /// tree, or if the side it addresses is missing.
    pub fn append_parse(
        &mut self,
        source_slot: Option<usize>,
        target_slot: usize,
        child: &Parse,
    ) -> Result<()> {
        let target_arity = self.target.as_ref().map_or(0, |t| t.arity());
        if target_slot >= target_arity {
            return Err(GraftError::SlotOutOfRange {
                slot: target_slot,
                arity: target_arity,
            });
        }
        let source_attach = match (source_slot, &child.source) {
            (Some(slot), Some(child_source)) => {
                let arity = self.source.as_ref().map_or(0, |s| s.arity());
                if slot >= arity {
                    return Err(GraftError::SlotOutOfRange { slot, arity });
                }
                Some((slot, Arc::clone(child_source)))
            }
            _ => None,
        };

        if let (Some(root), Some(child_target)) = (self.target.as_mut(), &child.target) {
            Arc::make_mut(root).attach(target_slot, Arc::clone(child_target))?;
        }
        if let (Some(root), Some((slot, child_source))) = (self.source.as_mut(), source_attach) {
            Arc::make_mut(root).attach(slot, child_source)?;
        }
        self.target_tokens.extend_from_slice(&child.target_tokens);
        self.span = match (self.span, child.span) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        Ok(())
    }

    /// Fill source slot `slot` with the terminal `token`
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::SlotOutOfRange`] if the slot is outside the
    /// source tree or there is no source tree.
    pub fn append_source_terminal(&mut self, slot: usize, token: Token) -> Result<()> {
        let root = self
            .source
            .as_mut()
            .ok_or(GraftError::SlotOutOfRange { slot, arity: 0 })?;
        Arc::make_mut(root).attach(slot, Arc::new(Tree::terminal(token)))
    }

    /// Replace the scores, sharing the same object with both root trees
    pub fn set_scores(&mut self, scores: Scores) {
        let shared = Arc::new(scores);
        for root in [self.source.as_mut(), self.target.as_mut()].into_iter().flatten() {
            Arc::make_mut(root).set_scores(Arc::clone(&shared));
        }
        self.scores = shared;
    }

    #[must_use]
    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    /// Record a duplicate derivation folded into this one
    pub fn add_recombined(&mut self, parse: Parse) {
        self.recombined.push(Arc::new(parse));
    }

    /// Duplicates folded into this parse, in the order they were merged
    #[must_use]
    pub fn recombined(&self) -> &[Arc<Parse>] {
        &self.recombined
    }

    /// Target terminals, left to right
    #[must_use]
    pub fn target_tokens(&self) -> &[Token] {
        &self.target_tokens
    }

    /// The target yield as a hashable fingerprint
    #[must_use]
    pub fn target_yield(&self) -> TokenSequence {
        TokenSequence::from(self.target_tokens.as_slice())
    }

    #[must_use]
    pub fn source_tree(&self) -> Option<&Tree> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn target_tree(&self) -> Option<&Tree> {
        self.target.as_deref()
    }

    /// Input positions covered by the source terminals below this parse
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        self.span
    }

    /// Set the covered span, as a chart does when it places a parse in a cell
    pub fn set_span(&mut self, span: Span) {
        self.span = Some(span);
    }

    /// Render the target tree, trimmed of trailing whitespace
    pub fn format_target<F: TreeFormatter + ?Sized>(&self, formatter: &mut F) -> String {
        Self::render(self.target.as_deref(), formatter)
    }

    /// Render the source tree, trimmed of trailing whitespace
    pub fn format_source<F: TreeFormatter + ?Sized>(&self, formatter: &mut F) -> String {
        Self::render(self.source.as_deref(), formatter)
    }

    fn render<F: TreeFormatter + ?Sized>(tree: Option<&Tree>, formatter: &mut F) -> String {
        let mut out = String::new();
        if let Some(tree) = tree {
            tree.format(formatter, &mut out);
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out
    }
}

impl Scored for Parse {
    fn log_prob(&self) -> f64 {
        self.scores.log_prob()
    }
}

impl fmt::Debug for Parse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parse")
            .field("target", &self.target)
            .field("scores", &self.scores)
            .field("span", &self.span)
            .field("recombined", &self.recombined.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenFactory;

    #[test]
    fn test_target_terminal() {
        let f = TokenFactory::new();
        let word = f.terminal("casa");
        let parse = Parse::target_terminal(word);

        assert_eq!(parse.target_tokens(), &[word]);
        assert!(parse.source_tree().is_none());
        assert_eq!(parse.target_tree().map(Tree::terminals), Some(vec![word]));
    }

    #[test]
    fn test_target_terminals_keep_yield_in_step() {
        let f = TokenFactory::new();
        let (bos, eos) = f.sentence_markers();
        let parse = Parse::target_terminals(f.nonterminal("BOUNDARY"), &[bos, eos]);

        assert_eq!(parse.target_tokens(), &[bos, eos]);
        assert_eq!(parse.target_tree().map(Tree::terminals), Some(vec![bos, eos]));
    }

    #[test]
    fn test_derived_parse_does_not_alias() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let seed = Parse::seed(x, x, 1, 1, Scores::default());

        let mut derived = seed.derive();
        let mut child = Parse::seed(f.nonterminal("A"), f.nonterminal("A"), 0, 1, Scores::default());
        child.append_parse(None, 0, &Parse::target_terminal(f.terminal("w"))).unwrap();
        derived.append_parse(Some(0), 0, &child).unwrap();

        assert!(seed.target_tokens().is_empty());
        assert!(seed.target_tree().unwrap().child(0).is_none());
        assert!(seed.source_tree().unwrap().child(0).is_none());
        assert_eq!(derived.target_tokens(), &[f.terminal("w")]);
        assert!(derived.source_tree().unwrap().child(0).is_some());
    }

    #[test]
    fn test_append_out_of_range_leaves_parse_untouched() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let mut parse = Parse::seed(x, x, 1, 1, Scores::default());
        let child = Parse::seed(x, x, 0, 0, Scores::default());

        assert_eq!(
            parse.append_parse(Some(0), 3, &child),
            Err(GraftError::SlotOutOfRange { slot: 3, arity: 1 })
        );
        assert_eq!(
            parse.append_parse(Some(5), 0, &child),
            Err(GraftError::SlotOutOfRange { slot: 5, arity: 1 })
        );
        assert!(parse.target_tree().unwrap().child(0).is_none());
    }

    #[test]
    fn test_set_scores_shares_with_trees() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let mut parse = Parse::seed(x, x, 0, 0, Scores::default());
        parse.set_scores(Scores::scalar(-2.0).unwrap());

        assert_eq!(parse.log_prob(), -2.0);
        let target = parse.target_tree().and_then(Tree::scores).unwrap();
        let source = parse.source_tree().and_then(Tree::scores).unwrap();
        assert!(std::ptr::eq(target, source));
        assert!(std::ptr::eq(target, parse.scores()));
    }

    #[test]
    fn test_source_terminal_and_span() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let mut parse = Parse::seed(x, x, 2, 1, Scores::default());
        parse.append_source_terminal(0, f.terminal("ne")).unwrap();
        assert!(parse.append_source_terminal(2, f.terminal("pas")).is_err());

        let mut child = Parse::seed(x, x, 0, 0, Scores::default());
        child.set_span(Span::new(1, 3));
        parse.append_parse(Some(1), 0, &child).unwrap();
        assert_eq!(parse.span(), Some(Span::new(1, 3)));
        assert_eq!(parse.source_tree().unwrap().terminals(), vec![f.terminal("ne")]);
    }

    #[test]
    fn test_recombined_alternatives() {
        let f = TokenFactory::new();
        let mut survivor = Parse::target_terminal(f.terminal("a"));
        survivor.add_recombined(Parse::target_terminal(f.terminal("a")));

        assert_eq!(survivor.recombined().len(), 1);
        assert!(survivor.derive().recombined().is_empty());
    }
}
