//! # Combiners
//!
//! Turn the candidate children of a matched rule into new parses.
//!
//! ## Overview
//!
//! Each combiner receives the rule, one candidate list per *target* slot, the
//! scorer and the transducer. Every result starts from the same seed (both
//! left-hand sides, empty slots, the scorer's initial scores, source terminal
//! slots pre-filled from the rule) and picks exactly one candidate per slot.
//! Children are attached in target-slot order: the target tree at the slot
//! index, the source tree at the aligned source slot. The score is folded with
//! [`Scorer::combine_child_scores`] one child at a time.
//!
//! | Combiner | Output | Cost |
//! |---|---|---|
//! | [`CrossProductMerger`] | all Π mᵢ combinations | Π mᵢ parses materialized |
//! | [`BeamSearchMerger`] | best `beam_size` after each slot | `beam_size × mᵢ` per slot |
//! | [`CubePruningMerger`] | best `beam_size`, best first | `beam_size × arity` frontier |
//!
//! The cross product is exact but grows exponentially with arity; it is kept
//! for small rules and as the reference the pruned combiners are tested
//! against.
//!
//! ## Errors
//!
//! A slot list whose length differs from the target arity, or an alignment of
//! the wrong length, is [`GraftError::ArityMismatch`]. An alignment naming a
//! source slot past the source arity is [`GraftError::SlotOutOfRange`].

mod beam_search;
mod cross_product;
mod cube;

pub use beam_search::BeamSearchMerger;
pub use cross_product::CrossProductMerger;
pub use cube::CubePruningMerger;

use crate::error::{GraftError, Result};
use crate::grammar::GrammarRule;
use crate::parse::Parse;
use crate::scoring::Scorer;
use crate::transduce::Transducer;
use std::borrow::Cow;

/// Strategy for combining per-slot candidates under one rule
pub trait Merger<R>: Send + Sync {
    /// Registry name of this combiner
    fn name(&self) -> &'static str;

    /// Combine one candidate from each target slot into new parses
    ///
    /// # Errors
    ///
    /// Contract violations as described in the module documentation, and any
    /// error the scorer reports.
    fn combine(
        &self,
        rule: &R,
        slots: &[Vec<Parse>],
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Vec<Parse>>;
}

/// Validated alignment plus the seed every combination starts from
pub(crate) struct Expansion<'r> {
    alignment: Cow<'r, [Option<usize>]>,
    seed: Parse,
}

impl<'r> Expansion<'r> {
    pub(crate) fn new<R: GrammarRule>(
        rule: &'r R,
        slots: &[Vec<Parse>],
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Self> {
        let target_arity = transducer.target_rhs(rule).len();
        if slots.len() != target_arity {
            return Err(GraftError::ArityMismatch {
                context: "candidate slots",
                expected: target_arity,
                found: slots.len(),
            });
        }
        let alignment = transducer.target_to_source(rule);
        if alignment.len() != target_arity {
            return Err(GraftError::ArityMismatch {
                context: "alignment",
                expected: target_arity,
                found: alignment.len(),
            });
        }
        let source_arity = rule.arity();
        if let Some(slot) = alignment.iter().flatten().find(|s| **s >= source_arity) {
            return Err(GraftError::SlotOutOfRange {
                slot: *slot,
                arity: source_arity,
            });
        }

        let mut seed = Parse::seed(
            rule.lhs(),
            transducer.target_lhs(rule),
            source_arity,
            target_arity,
            scorer.initial_scores(),
        );
        for (slot, token) in rule.rhs().iter().enumerate() {
            if token.is_terminal() {
                seed.append_source_terminal(slot, *token)?;
            }
        }
        Ok(Self { alignment, seed })
    }

    pub(crate) fn seed(&self) -> Parse {
        self.seed.derive()
    }

    /// `base` with `candidate` attached at target slot `slot`
    pub(crate) fn extend(
        &self,
        base: &Parse,
        slot: usize,
        candidate: &Parse,
        scorer: &dyn Scorer,
    ) -> Result<Parse> {
        let mut next = base.derive();
        next.append_parse(self.alignment[slot], slot, candidate)?;
        next.set_scores(scorer.combine_child_scores(candidate.scores(), base.scores())?);
        Ok(next)
    }
}
