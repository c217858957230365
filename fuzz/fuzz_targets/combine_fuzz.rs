#![no_main]
use graft::grammar::MonoRule;
use graft::merge::{CrossProductMerger, CubePruningMerger, Merger};
use graft::parse::Parse;
use graft::scoring::{BasicScorer, Scored, Scores};
use graft::token::TokenFactory;
use graft::transduce::MonoTransducer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&shape, rest)) = data.split_first() else {
        return;
    };
    let arity = usize::from(shape % 3) + 1;
    let beam_size = usize::from(shape / 3 % 8) + 1;
    if rest.len() < arity {
        return;
    }

    let f = TokenFactory::new();
    let x = f.nonterminal("X");
    let rhs = (0..arity).map(|i| f.nonterminal(&format!("C{i}"))).collect();
    let Ok(rule) = MonoRule::new("fuzz", x, rhs, vec![]) else {
        return;
    };

    // candidate scores in quarter steps so sums stay exact
    let slots: Vec<Vec<Parse>> = rest
        .chunks(rest.len().div_ceil(arity))
        .take(arity)
        .enumerate()
        .map(|(slot, chunk)| {
            chunk
                .iter()
                .take(5)
                .enumerate()
                .map(|(i, b)| {
                    Parse::target_terminal(f.terminal(&format!("{slot}.{i}")))
                        .with_scores(Scores::scalar(-f64::from(*b) / 4.0).expect("finite"))
                })
                .collect()
        })
        .collect();
    if slots.len() != arity {
        return;
    }

    let scorer = BasicScorer::default();
    let all = CrossProductMerger
        .combine(&rule, &slots, &scorer, &MonoTransducer)
        .expect("well-formed slots");
    assert_eq!(all.len(), slots.iter().map(Vec::len).product::<usize>());

    let mut exhaustive: Vec<f64> = all.iter().map(Scored::log_prob).collect();
    exhaustive.sort_by(|a, b| b.total_cmp(a));
    exhaustive.truncate(beam_size);
    let pruned: Vec<f64> = CubePruningMerger::new(beam_size)
        .combine(&rule, &slots, &scorer, &MonoTransducer)
        .expect("well-formed slots")
        .iter()
        .map(Scored::log_prob)
        .collect();
    assert_eq!(pruned, exhaustive, "cube pruning must match the exhaustive top-n");
});
