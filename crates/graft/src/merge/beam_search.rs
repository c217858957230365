use super::{Expansion, Merger};
use crate::error::Result;
use crate::grammar::GrammarRule;
use crate::parse::Parse;
use crate::recombine::{Recombiner, YieldRecombiner};
use crate::scoring::Scorer;
use crate::search::Beam;
use crate::transduce::Transducer;
use tracing::debug;

/// Slot-by-slot product pruned to a beam after every slot
///
/// With `recombine_yields` set, partial results sharing a target yield are
/// merged before pruning, which keeps the beam from filling up with spurious
/// ambiguity.
#[derive(Debug, Clone, Copy)]
pub struct BeamSearchMerger {
    beam_size: usize,
    recombine_yields: bool,
}

impl BeamSearchMerger {
    #[must_use]
    pub const fn new(beam_size: usize, recombine_yields: bool) -> Self {
        Self {
            beam_size,
            recombine_yields,
        }
    }

    #[must_use]
    pub const fn beam_size(&self) -> usize {
        self.beam_size
    }
}

impl<R: GrammarRule> Merger<R> for BeamSearchMerger {
    fn name(&self) -> &'static str {
        "beam-search"
    }

    fn combine(
        &self,
        rule: &R,
        slots: &[Vec<Parse>],
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Vec<Parse>> {
        let plan = Expansion::new(rule, slots, scorer, transducer)?;

        let mut results = vec![plan.seed()];
        for (slot, candidates) in slots.iter().enumerate() {
            let mut next = Vec::with_capacity(results.len().saturating_mul(candidates.len()));
            for candidate in candidates {
                for result in &results {
                    next.push(plan.extend(result, slot, candidate, scorer)?);
                }
            }
            if self.recombine_yields {
                YieldRecombiner.recombine(&mut next, scorer)?;
            }
            let mut beam = Beam::new(self.beam_size);
            beam.extend(next);
            results = beam.into_sorted_vec();
        }

        debug!(rule = rule.id(), produced = results.len(), "beam search");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::MonoRule;
    use crate::scoring::{BasicScorer, Scored, Scores};
    use crate::token::TokenFactory;
    use crate::transduce::MonoTransducer;

    fn word(f: &TokenFactory, w: &str, score: f64) -> Parse {
        Parse::target_terminal(f.terminal(w)).with_scores(Scores::scalar(score).unwrap())
    }

    #[test]
    fn test_keeps_best_combinations() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let (p, q) = (f.terminal("p"), f.terminal("q"));
        let rule = MonoRule::new("m", x, vec![p, q], vec![]).unwrap();

        let slots = vec![
            vec![word(&f, "p", -1.0), word(&f, "p2", -3.0), word(&f, "p3", -0.5)],
            vec![word(&f, "q", -2.0), word(&f, "q2", -0.1)],
        ];
        let parses = BeamSearchMerger::new(2, false)
            .combine(&rule, &slots, &BasicScorer::default(), &MonoTransducer)
            .unwrap();

        assert_eq!(parses.len(), 2);
        assert!((parses[0].log_prob() + 0.6).abs() < 1e-9);
        assert!((parses[1].log_prob() + 1.1).abs() < 1e-9);
        assert_eq!(f.render(parses[0].target_tokens()), "p3 q2");
    }

    #[test]
    fn test_recombines_equal_yields() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let rule = MonoRule::new("m", x, vec![f.terminal("a")], vec![]).unwrap();

        let slots = vec![vec![word(&f, "same", -1.0), word(&f, "same", -2.0)]];
        let parses = BeamSearchMerger::new(5, true)
            .combine(&rule, &slots, &BasicScorer::default(), &MonoTransducer)
            .unwrap();

        assert_eq!(parses.len(), 1);
        assert_eq!(parses[0].log_prob(), -1.0);
        assert_eq!(parses[0].recombined().len(), 1);
    }
}
