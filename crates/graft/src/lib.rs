//! # Graft
//!
//! The search and transduction core of a synchronous-grammar translation
//! decoder.
//!
//! ## Overview
//!
//! A chart parser hands graft, for every rule it matches over a span, the best
//! partial derivations already found for each of the rule's child slots. Graft
//! combines them into bilingual derivations for the larger span:
//!
//! - **Transduction**: children are reordered per the rule's target alignment
//! - **Combination**: one candidate per slot, scored under a log-linear model
//! - **Recombination**: derivations with the same target yield are merged
//! - **Pruning**: a bounded beam keeps the best hypotheses for the next span
//!
//! The chart loop itself, grammar file formats and language-model loading live
//! outside this crate.
//!
//! ## Quick Start
//!
//! A rule `X -> A B` whose target side swaps its children:
//!
//! ```rust
//! use graft::prelude::*;
//!
//! let f = TokenFactory::new();
//! let (x, a, b) = (f.nonterminal("X"), f.nonterminal("A"), f.nonterminal("B"));
//! let rule = SyncRule::new("swap", x, vec![a, b], x, vec![b, a], vec![Some(1), Some(0)], vec![])?;
//!
//! // one candidate list per target slot: first B, then A
//! let word = |w: &str, p: f64| Parse::target_terminal(f.terminal(w)).with_scores(Scores::scalar(p).unwrap());
//! let slots = vec![
//!     vec![word("rouge", -0.5), word("rouges", -2.0)],
//!     vec![word("voiture", -1.0)],
//! ];
//!
//! let parses = CrossProductMerger.combine(&rule, &slots, &BasicScorer::default(), &SyncTransducer)?;
//! assert_eq!(parses.len(), 2);
//! assert_eq!(f.render(parses[0].target_tokens()), "rouge voiture");
//! assert_eq!(parses[0].log_prob(), -1.5);
//! # Ok::<(), graft::GraftError>(())
//! ```
//!
//! ## Modules
//!
//! - [`token`] - Interned terminal/nonterminal tokens and token sequences
//! - [`trie`] - Depth-bounded trie keyed by token sequences
//! - [`grammar`] - Rule contracts, synchronous rules and the rule index
//! - [`parse`] - Derivation trees, parses and tree formatting
//! - [`scoring`] - Feature scores, scorers and merge policies
//! - [`transduce`] - Target-side views of rules and packed forests
//! - [`merge`] - Combiners over per-slot candidates
//! - [`search`] - The bounded beam
//! - [`recombine`] - Merging hypotheses with equal target yields
//! - [`cell`] - The per-cell combine, recombine, prune pipeline
//! - [`config`] - Serializable decoder settings
//! - [`registry`] - Components resolved by name from configuration
//! - [`batch`] - Parallel per-sentence orchestration
//! - [`error`] - Error types

pub mod batch;
pub mod cell;
pub mod config;
pub mod error;
pub mod grammar;
pub mod merge;
pub mod parse;
pub mod recombine;
pub mod registry;
pub mod scoring;
pub mod search;
pub mod token;
pub mod transduce;
pub mod trie;

// Re-export commonly used types
pub use error::{GraftError, Result};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::cell::{CellExpander, RuleMatch};
    pub use crate::config::DecoderConfig;
    pub use crate::error::{GraftError, Result};
    pub use crate::grammar::{GrammarIndex, GrammarRule, MonoRule, SyncRule};
    pub use crate::merge::{BeamSearchMerger, CrossProductMerger, CubePruningMerger, Merger};
    pub use crate::parse::{BasicTreeFormatter, Parse, Span, Tree, TreeFormatter};
    pub use crate::recombine::{NullRecombiner, Recombiner, YieldRecombiner};
    pub use crate::registry::ComponentRegistry;
    pub use crate::scoring::{BasicScorer, LogLinearScorer, MergePolicy, Scored, Scorer, Scores};
    pub use crate::search::Beam;
    pub use crate::token::{Token, TokenFactory, TokenSequence};
    pub use crate::transduce::{MonoTransducer, SyncTransducer, Transducer};
    pub use crate::trie::{Trie, TriePolicy};
}
