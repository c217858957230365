//! # Recombination
//!
//! Merge hypotheses that would be indistinguishable to everything downstream.
//!
//! ## Overview
//!
//! Two parses over the same span with the same target yield lead to the same
//! translations, so keeping both only wastes beam slots. A [`Recombiner`]
//! folds such duplicates into one survivor: the scorer's
//! [`recombine`](crate::scoring::Scorer::recombine) computes the merged scores
//! under the configured [`MergePolicy`](crate::scoring::MergePolicy), and the
//! duplicate is kept on the survivor as a recombined alternative for n-best
//! and forest output.
//!
//! ## Usage
//!
//! ```rust
//! use graft::parse::Parse;
//! use graft::recombine::{Recombiner, YieldRecombiner};
//! use graft::scoring::{BasicScorer, Scores};
//! use graft::token::TokenFactory;
//!
//! let f = TokenFactory::new();
//! let mut parses = vec![
//!     Parse::target_terminal(f.terminal("casa")).with_scores(Scores::scalar(-2.0)?),
//!     Parse::target_terminal(f.terminal("hogar")).with_scores(Scores::scalar(-1.0)?),
//!     Parse::target_terminal(f.terminal("casa")).with_scores(Scores::scalar(-0.5)?),
//! ];
//!
//! let stats = YieldRecombiner.recombine(&mut parses, &BasicScorer::default())?;
//! assert_eq!((stats.survivors, stats.merged), (2, 1));
//! assert_eq!(parses[0].scores().log_prob(), -0.5);
//! # Ok::<(), graft::GraftError>(())
//! ```

use crate::error::Result;
use crate::parse::Parse;
use crate::scoring::Scorer;
use crate::token::TokenSequence;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::trace;

/// Outcome of one recombination pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecombineStats {
    /// Parses left after the pass
    pub survivors: usize,
    /// Duplicates folded into a survivor
    pub merged: usize,
}

/// Strategy for merging redundant hypotheses in place
pub trait Recombiner: Send + Sync {
    /// Registry name of this recombiner
    fn name(&self) -> &'static str;

    /// Merge duplicates in `parses`, keeping the survivors in their original
    /// relative order
    ///
    /// # Errors
    ///
    /// Any error the scorer reports while merging scores. `parses` is left
    /// unchanged in that case.
    fn recombine(&self, parses: &mut Vec<Parse>, scorer: &dyn Scorer) -> Result<RecombineStats>;
}

/// Merge parses whose target yields are equal
///
/// The first parse with a given yield survives. Every later parse with that
/// yield is folded into it and recorded with
/// [`Parse::add_recombined`].
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldRecombiner;

impl Recombiner for YieldRecombiner {
    fn name(&self) -> &'static str {
        "yield"
    }

    fn recombine(&self, parses: &mut Vec<Parse>, scorer: &dyn Scorer) -> Result<RecombineStats> {
        let mut first_seen: HashMap<TokenSequence, usize> = HashMap::with_capacity(parses.len());
        // survivor index for every duplicate, computed before anything moves
        let mut plan: Vec<Option<usize>> = Vec::with_capacity(parses.len());
        for (index, parse) in parses.iter().enumerate() {
            match first_seen.entry(parse.target_yield()) {
                Entry::Occupied(entry) => plan.push(Some(*entry.get())),
                Entry::Vacant(entry) => {
                    entry.insert(index);
                    plan.push(None);
                }
            }
        }
        let merged = plan.iter().filter(|p| p.is_some()).count();
        if merged == 0 {
            return Ok(RecombineStats {
                survivors: parses.len(),
                merged: 0,
            });
        }

        // fold scores first so a scorer error leaves `parses` intact
        let mut folded = vec![None; parses.len()];
        for (index, survivor) in plan.iter().enumerate() {
            if let Some(survivor) = *survivor {
                let current = folded[survivor]
                    .take()
                    .unwrap_or_else(|| parses[survivor].scores().clone());
                folded[survivor] = Some(scorer.recombine(&current, parses[index].scores())?);
            }
        }

        let mut kept: Vec<Parse> = Vec::with_capacity(parses.len() - merged);
        let mut position = vec![0usize; parses.len()];
        for (index, parse) in parses.drain(..).enumerate() {
            match plan[index] {
                None => {
                    position[index] = kept.len();
                    kept.push(parse);
                }
                Some(survivor) => kept[position[survivor]].add_recombined(parse),
            }
        }
        for (index, scores) in folded.into_iter().enumerate() {
            if let Some(scores) = scores {
                kept[position[index]].set_scores(scores);
            }
        }
        *parses = kept;

        trace!(survivors = parses.len(), merged, "recombined by yield");
        Ok(RecombineStats {
            survivors: parses.len(),
            merged,
        })
    }
}

/// Keep every hypothesis
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecombiner;

impl Recombiner for NullRecombiner {
    fn name(&self) -> &'static str {
        "null"
    }

    fn recombine(&self, parses: &mut Vec<Parse>, _scorer: &dyn Scorer) -> Result<RecombineStats> {
        Ok(RecombineStats {
            survivors: parses.len(),
            merged: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraftError;
    use crate::grammar::GrammarRule;
    use crate::scoring::{BasicScorer, MergePolicy, Scores};
    use crate::token::{Token, TokenFactory};
    use compact_str::CompactString;

    fn parse(f: &TokenFactory, words: &[&str], score: f64) -> Parse {
        let tokens = f.terminals(words);
        Parse::target_terminals(f.nonterminal("X"), &tokens).with_scores(Scores::scalar(score).unwrap())
    }

    #[test]
    fn test_no_shared_yields_after_pass() {
        let f = TokenFactory::new();
        let mut parses = vec![
            parse(&f, &["a", "b"], -1.0),
            parse(&f, &["a"], -2.0),
            parse(&f, &["a", "b"], -3.0),
            parse(&f, &["a", "b"], -0.5),
            parse(&f, &["b"], -1.0),
        ];

        let stats = YieldRecombiner
            .recombine(&mut parses, &BasicScorer::default())
            .unwrap();

        assert_eq!(stats, RecombineStats { survivors: 3, merged: 2 });
        let yields: Vec<String> = parses.iter().map(|p| f.render(p.target_tokens())).collect();
        assert_eq!(yields, vec!["a b", "a", "b"]);
        assert_eq!(parses[0].scores().log_prob(), -0.5);
        assert!(parses[0].scores().is_recombined());
        assert_eq!(parses[0].recombined().len(), 2);
        assert!(!parses[1].scores().is_recombined());
    }

    #[test]
    fn test_sum_policy_fold() {
        let f = TokenFactory::new();
        let mut parses = vec![parse(&f, &["w"], -1.0), parse(&f, &["w"], -1.0)];

        YieldRecombiner
            .recombine(&mut parses, &BasicScorer::new(MergePolicy::SumProbability))
            .unwrap();

        assert_eq!(parses.len(), 1);
        assert!((parses[0].scores().log_prob() - 0.2f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_null_recombiner_keeps_everything() {
        let f = TokenFactory::new();
        let mut parses = vec![parse(&f, &["w"], -1.0), parse(&f, &["w"], -2.0)];

        let stats = NullRecombiner
            .recombine(&mut parses, &BasicScorer::default())
            .unwrap();
        assert_eq!(stats, RecombineStats { survivors: 2, merged: 0 });
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn initial_scores(&self) -> Scores {
            Scores::default()
        }

        fn score_terminal(&self, _: &[Token]) -> Result<Scores> {
            Ok(Scores::default())
        }

        fn combine_rule(&self, scores: &Scores, _: &dyn GrammarRule) -> Result<Scores> {
            Ok(scores.clone())
        }

        fn combine_child_scores(&self, child: &Scores, _: &Scores) -> Result<Scores> {
            Ok(child.clone())
        }

        fn recombine(&self, _: &Scores, _: &Scores) -> Result<Scores> {
            Err(GraftError::NonFiniteScore {
                value: f64::NAN,
                context: "test",
            })
        }

        fn labels(&self) -> &[CompactString] {
            &[]
        }

        fn weights(&self) -> &[f64] {
            &[]
        }
    }

    #[test]
    fn test_scorer_error_leaves_parses_intact() {
        let f = TokenFactory::new();
        let mut parses = vec![parse(&f, &["w"], -1.0), parse(&f, &["w"], -2.0)];

        assert!(YieldRecombiner.recombine(&mut parses, &FailingScorer).is_err());
        assert_eq!(parses.len(), 2);
    }
}
