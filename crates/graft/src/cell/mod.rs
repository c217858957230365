//! # Cell Expansion
//!
//! The per-cell pipeline a chart runs after matching rules over a span:
//! combine children, apply the rule score, recombine, prune.
//!
//! ## Overview
//!
//! For every rule matched over the cell, the configured [`Merger`] builds new
//! parses from the per-slot candidates and the scorer applies the rule's own
//! features. The parses from all rules of the cell are then recombined
//! together (two rules can derive the same target yield) and a [`Beam`] keeps
//! the best `beam_size`. The survivors, best first, become candidate children
//! for larger spans.

use crate::error::Result;
use crate::grammar::GrammarRule;
use crate::merge::Merger;
use crate::parse::Parse;
use crate::recombine::Recombiner;
use crate::scoring::Scorer;
use crate::search::Beam;
use crate::transduce::Transducer;
use std::fmt;
use tracing::debug;

/// One rule matched over a cell, with a candidate list per target slot
pub struct RuleMatch<'a, R> {
    pub rule: &'a R,
    pub slots: &'a [Vec<Parse>],
}

impl<'a, R> RuleMatch<'a, R> {
    #[must_use]
    pub const fn new(rule: &'a R, slots: &'a [Vec<Parse>]) -> Self {
        Self { rule, slots }
    }
}

/// Combiner, recombiner and beam width for one decoding run
pub struct CellExpander<R> {
    merger: Box<dyn Merger<R>>,
    recombiner: Box<dyn Recombiner>,
    beam_size: usize,
}

impl<R: GrammarRule> CellExpander<R> {
    #[must_use]
    pub fn new(
        merger: Box<dyn Merger<R>>,
        recombiner: Box<dyn Recombiner>,
        beam_size: usize,
    ) -> Self {
        Self {
            merger,
            recombiner,
            beam_size,
        }
    }

    /// Expand a single matched rule
    ///
    /// # Errors
    ///
    /// Propagates combiner contract violations and scorer errors.
    pub fn expand(
        &self,
        rule: &R,
        slots: &[Vec<Parse>],
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Vec<Parse>> {
        self.expand_cell([RuleMatch::new(rule, slots)], scorer, transducer)
    }

    /// Expand every rule matched over one cell and prune them together
    ///
    /// # Errors
    ///
    /// Propagates combiner contract violations and scorer errors from any
    /// rule; no partial result is returned.
    pub fn expand_cell<'a, I>(
        &self,
        matches: I,
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Vec<Parse>>
    where
        I: IntoIterator<Item = RuleMatch<'a, R>>,
        R: 'a,
    {
        let mut parses = Vec::new();
        let mut rules = 0usize;
        for RuleMatch { rule, slots } in matches {
            rules += 1;
            for mut parse in self.merger.combine(rule, slots, scorer, transducer)? {
                let scores = scorer.combine_rule(parse.scores(), rule)?;
                parse.set_scores(scores);
                parses.push(parse);
            }
        }

        let combined = parses.len();
        let stats = self.recombiner.recombine(&mut parses, scorer)?;
        let mut beam = Beam::new(self.beam_size);
        beam.extend(parses);

        debug!(
            rules,
            combined,
            merged = stats.merged,
            kept = beam.len(),
            merger = self.merger.name(),
            "expanded cell"
        );
        Ok(beam.into_sorted_vec())
    }

    #[must_use]
    pub const fn beam_size(&self) -> usize {
        self.beam_size
    }

    #[must_use]
    pub fn merger(&self) -> &dyn Merger<R> {
        self.merger.as_ref()
    }

    #[must_use]
    pub fn recombiner(&self) -> &dyn Recombiner {
        self.recombiner.as_ref()
    }
}

impl<R> fmt::Debug for CellExpander<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellExpander")
            .field("merger", &self.merger.name())
            .field("recombiner", &self.recombiner.name())
            .field("beam_size", &self.beam_size)
            .finish()
    }
}
