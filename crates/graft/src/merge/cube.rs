use super::{Expansion, Merger};
use crate::error::Result;
use crate::grammar::GrammarRule;
use crate::parse::Parse;
use crate::scoring::{Scored, Scorer};
use crate::transduce::Transducer;
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

type Indices = SmallVec<[usize; 4]>;

/// Lazy best-first enumeration of the slot product
///
/// Candidates in each slot are sorted best first, so the combinations form a
/// grid whose best corner is all-zeros. A max-heap frontier pops the best
/// unexplored combination and pushes its successors (one index bumped in one
/// slot). Enumeration stops after `beam_size` combinations, so at most
/// `beam_size × arity` combinations are ever built. With additive scoring the
/// output equals the top `beam_size` of the full cross product, best first.
#[derive(Debug, Clone, Copy)]
pub struct CubePruningMerger {
    beam_size: usize,
}

impl CubePruningMerger {
    #[must_use]
    pub const fn new(beam_size: usize) -> Self {
        Self { beam_size }
    }

    #[must_use]
    pub const fn beam_size(&self) -> usize {
        self.beam_size
    }
}

struct Frontier {
    score: f64,
    seq: usize,
    indices: Indices,
    parse: Parse,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // higher score first, then earlier discovery
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn build(
    plan: &Expansion<'_>,
    sorted: &[Vec<&Parse>],
    indices: &[usize],
    scorer: &dyn Scorer,
) -> Result<Parse> {
    let mut parse = plan.seed();
    for (slot, (candidates, index)) in sorted.iter().zip(indices).enumerate() {
        parse = plan.extend(&parse, slot, candidates[*index], scorer)?;
    }
    Ok(parse)
}

impl<R: GrammarRule> Merger<R> for CubePruningMerger {
    fn name(&self) -> &'static str {
        "cube-pruning"
    }

    fn combine(
        &self,
        rule: &R,
        slots: &[Vec<Parse>],
        scorer: &dyn Scorer,
        transducer: &dyn Transducer<R>,
    ) -> Result<Vec<Parse>> {
        let plan = Expansion::new(rule, slots, scorer, transducer)?;
        if self.beam_size == 0 || slots.iter().any(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let sorted: Vec<Vec<&Parse>> = slots
            .iter()
            .map(|candidates| {
                let mut sorted: Vec<&Parse> = candidates.iter().collect();
                sorted.sort_by(|a, b| b.log_prob().total_cmp(&a.log_prob()));
                sorted
            })
            .collect();

        let mut heap = BinaryHeap::new();
        let mut visited: HashSet<Indices> = HashSet::new();
        let mut seq = 0usize;

        let origin: Indices = smallvec::smallvec![0; slots.len()];
        let parse = build(&plan, &sorted, &origin, scorer)?;
        visited.insert(origin.clone());
        heap.push(Frontier {
            score: parse.log_prob(),
            seq,
            indices: origin,
            parse,
        });

        let mut results = Vec::with_capacity(self.beam_size.min(1024));
        while results.len() < self.beam_size {
            let Some(best) = heap.pop() else {
                break;
            };
            for slot in 0..best.indices.len() {
                let mut next = best.indices.clone();
                next[slot] += 1;
                if next[slot] >= sorted[slot].len() || !visited.insert(next.clone()) {
                    continue;
                }
                let parse = build(&plan, &sorted, &next, scorer)?;
                seq += 1;
                heap.push(Frontier {
                    score: parse.log_prob(),
                    seq,
                    indices: next,
                    parse,
                });
            }
            results.push(best.parse);
        }

        debug!(
            rule = rule.id(),
            produced = results.len(),
            explored = visited.len(),
            "cube pruning"
        );
        Ok(results)
    }
}
