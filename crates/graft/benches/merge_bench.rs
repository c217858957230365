use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graft::grammar::MonoRule;
use graft::merge::{BeamSearchMerger, CrossProductMerger, CubePruningMerger, Merger};
use graft::parse::Parse;
use graft::recombine::{Recombiner, YieldRecombiner};
use graft::scoring::{BasicScorer, Scored, Scores};
use graft::search::Beam;
use graft::token::TokenFactory;
use graft::transduce::MonoTransducer;
use std::hint::black_box;

#[derive(Clone, Copy)]
struct Hyp(f64);

impl Scored for Hyp {
    fn log_prob(&self) -> f64 {
        self.0
    }
}

/// `arity` slots of `width` candidates with a fixed pseudo-random spread
fn setup(f: &TokenFactory, arity: usize, width: usize) -> (MonoRule, Vec<Vec<Parse>>) {
    let x = f.nonterminal("X");
    let rhs = (0..arity).map(|i| f.nonterminal(&format!("C{i}"))).collect();
    let rule = MonoRule::new("bench", x, rhs, vec![-0.5]).unwrap();
    let slots = (0..arity)
        .map(|slot| {
            (0..width)
                .map(|i| {
                    let score = -(((slot * 31 + i * 17) % 23) as f64) / 4.0;
                    Parse::target_terminal(f.terminal(&format!("w{}", i % 7)))
                        .with_scores(Scores::scalar(score).unwrap())
                })
                .collect()
        })
        .collect();
    (rule, slots)
}

fn bench_mergers(c: &mut Criterion) {
    let f = TokenFactory::new();
    let scorer = BasicScorer::default();
    let mut group = c.benchmark_group("merge");

    for (arity, width) in [(2, 10), (3, 10), (3, 20)] {
        let (rule, slots) = setup(&f, arity, width);
        let label = format!("{arity}x{width}");

        if arity * width <= 30 {
            group.bench_with_input(BenchmarkId::new("cross_product", &label), &slots, |b, slots| {
                b.iter(|| black_box(CrossProductMerger.combine(&rule, slots, &scorer, &MonoTransducer)));
            });
        }
        group.bench_with_input(BenchmarkId::new("beam_search", &label), &slots, |b, slots| {
            let merger = BeamSearchMerger::new(10, true);
            b.iter(|| black_box(merger.combine(&rule, slots, &scorer, &MonoTransducer)));
        });
        group.bench_with_input(BenchmarkId::new("cube_pruning", &label), &slots, |b, slots| {
            let merger = CubePruningMerger::new(10);
            b.iter(|| black_box(merger.combine(&rule, slots, &scorer, &MonoTransducer)));
        });
    }
    group.finish();
}

fn bench_recombine(c: &mut Criterion) {
    let f = TokenFactory::new();
    let (rule, slots) = setup(&f, 2, 20);
    let parses = CrossProductMerger
        .combine(&rule, &slots, &BasicScorer::default(), &MonoTransducer)
        .unwrap();

    c.bench_function("recombine_yield_400", |b| {
        b.iter(|| {
            let mut batch = parses.clone();
            black_box(YieldRecombiner.recombine(&mut batch, &BasicScorer::default()))
        });
    });
}

fn bench_beam(c: &mut Criterion) {
    let offers: Vec<Hyp> = (0..10_000)
        .map(|i| Hyp(-(((i * 7919) % 1000) as f64) / 10.0))
        .collect();

    c.bench_function("beam_add_10k_cap_100", |b| {
        b.iter(|| {
            let mut beam = Beam::new(100);
            beam.extend(offers.iter().copied());
            black_box(beam.best_score())
        });
    });
}

criterion_group!(benches, bench_mergers, bench_recombine, bench_beam);
criterion_main!(benches);
