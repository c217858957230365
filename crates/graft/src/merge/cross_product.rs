use super::{Expansion, Merger};
use crate::error::Result;
use crate::grammar::GrammarRule;
use crate::parse::Parse;
use crate::scoring::Scorer;
use crate::transduce::Transducer;
use tracing::debug;

/// Exhaustive combination of every candidate in every slot
///
/// Produces exactly Π mᵢ parses for slot sizes m₁..mₖ, in candidate-major
/// order per slot. Nothing is pruned, so the result set and the memory it
/// takes grow with the product of the slot sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossProductMerger;

impl<R: GrammarRule> Merger<R> for CrossProductMerger {
    fn name(&self) -> &'static str {
        "cross-product"
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
            results = next;
        }

        debug!(rule = rule.id(), produced = results.len(), "cross product");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SyncRule;
    use crate::scoring::{BasicScorer, Scored, Scores};
    use crate::token::TokenFactory;
    use crate::transduce::SyncTransducer;

    fn leaf(f: &TokenFactory, label: &str, word: &str, score: f64) -> Parse {
        let cat = f.nonterminal(label);
        let mut parse = Parse::seed(cat, cat, 0, 1, Scores::default());
        parse
            .append_parse(None, 0, &Parse::target_terminal(f.terminal(word)))
            .unwrap();
        parse.with_scores(Scores::scalar(score).unwrap())
    }

    #[test]
    fn test_reordering_scenario() {
        let f = TokenFactory::new();
        let (x, a, b) = (f.nonterminal("X"), f.nonterminal("A"), f.nonterminal("B"));
        let rule = SyncRule::new("x", x, vec![a, b], x, vec![b, a], vec![Some(1), Some(0)], vec![])
            .unwrap();

        // target slot 0 holds B candidates, target slot 1 holds A candidates
        let slots = vec![
            vec![leaf(&f, "B", "b1", -0.5), leaf(&f, "B", "b2", -2.0)],
            vec![leaf(&f, "A", "a", -1.0)],
        ];
        let parses = CrossProductMerger
            .combine(&rule, &slots, &BasicScorer::default(), &SyncTransducer)
            .unwrap();

        assert_eq!(parses.len(), 2);
        let scores: Vec<f64> = parses.iter().map(Scored::log_prob).collect();
        assert_eq!(scores, vec![-1.5, -3.0]);

        let target = parses[0].target_tree().unwrap();
        assert_eq!(target.child(0).map(|c| c.label()), Some(b));
        assert_eq!(target.child(1).map(|c| c.label()), Some(a));
        assert_eq!(f.render(parses[0].target_tokens()), "b1 a");

        // A's source tree sits in source slot 0
        let source = parses[0].source_tree().unwrap();
        assert_eq!(source.child(0).map(|c| c.label()), Some(a));
        assert_eq!(source.child(1).map(|c| c.label()), Some(b));
    }

    #[test]
    fn test_empty_slot_yields_nothing() {
        let f = TokenFactory::new();
        let x = f.nonterminal("X");
        let rule = SyncRule::new("x", x, vec![x], x, vec![x], vec![Some(0)], vec![]).unwrap();

        let parses = CrossProductMerger
            .combine(&rule, &[vec![]], &BasicScorer::default(), &SyncTransducer)
            .unwrap();
        assert!(parses.is_empty());
    }
}
