//! Tests for the combiners and the cell pipeline over synchronous rules

use graft::cell::{CellExpander, RuleMatch};
use graft::config::DecoderConfig;
use graft::error::GraftError;
use graft::grammar::SyncRule;
use graft::merge::{BeamSearchMerger, CrossProductMerger, CubePruningMerger, Merger};
use graft::parse::{BasicTreeFormatter, Parse};
use graft::recombine::{Recombiner, YieldRecombiner};
use graft::registry::ComponentRegistry;
use graft::scoring::{
    BasicScorer, LogLinearScorer, MergePolicy, RuleFeature, Scored, Scorer, Scores,
    WordPenaltyFeature,
};
use graft::token::TokenFactory;
use graft::transduce::SyncTransducer;

fn word(f: &TokenFactory, w: &str, score: f64) -> Parse {
    Parse::target_terminal(f.terminal(w)).with_scores(Scores::scalar(score).unwrap())
}

fn swap_rule(f: &TokenFactory, id: &str, features: Vec<f64>) -> SyncRule {
    let (x, a, b) = (f.nonterminal("X"), f.nonterminal("A"), f.nonterminal("B"));
    SyncRule::new(id, x, vec![a, b], x, vec![b, a], vec![Some(1), Some(0)], features).unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_swap_scenario() {
    let f = TokenFactory::new();
    let rule = swap_rule(&f, "swap", vec![]);

    // target slot 0 is B, target slot 1 is A
    let slots = vec![
        vec![word(&f, "b1", -0.5), word(&f, "b2", -2.0)],
        vec![word(&f, "a1", -1.0)],
    ];
    let parses = CrossProductMerger
        .combine(&rule, &slots, &BasicScorer::default(), &SyncTransducer)
        .unwrap();

    assert_eq!(parses.len(), 2);
    let scores: Vec<f64> = parses.iter().map(Scored::log_prob).collect();
    assert_eq!(scores, vec![-1.5, -3.0]);

    let target = parses[0].target_tree().unwrap();
    assert_eq!(target.label(), f.nonterminal("X"));
    assert_eq!(target.child(0).unwrap().label(), f.terminal("b1"));
    assert_eq!(target.child(1).unwrap().label(), f.terminal("a1"));
    assert_eq!(f.render(parses[0].target_tokens()), "b1 a1");
}

#[test]
fn test_product_size_and_scores() {
    let f = TokenFactory::new();
    let x = f.nonterminal("X");
    let rhs = vec![f.nonterminal("A"), f.nonterminal("B"), f.nonterminal("C")];
    let rule = SyncRule::new(
        "mono3",
        x,
        rhs.clone(),
        x,
        rhs,
        vec![Some(0), Some(1), Some(2)],
        vec![],
    )
    .unwrap();

    let slots: Vec<Vec<Parse>> = [3usize, 2, 4]
        .iter()
        .enumerate()
        .map(|(slot, m)| {
            (0..*m)
                .map(|i| word(&f, &format!("w{slot}{i}"), -(i as f64) - slot as f64 * 0.125))
                .collect()
        })
        .collect();

    let parses = CrossProductMerger
        .combine(&rule, &slots, &BasicScorer::default(), &SyncTransducer)
        .unwrap();
    assert_eq!(parses.len(), 24);

    for parse in &parses {
        let expected: f64 = parse
            .target_tokens()
            .iter()
            .map(|t| {
                slots
                    .iter()
                    .flatten()
                    .find(|c| c.target_tokens() == [*t])
                    .unwrap()
                    .log_prob()
            })
            .sum();
        assert!(approx(parse.log_prob(), expected));
        assert_eq!(parse.target_tokens().len(), 3);
    }
}

#[test]
fn test_pruned_combiners_agree_with_exhaustive() {
    let f = TokenFactory::new();
    let rule = swap_rule(&f, "swap", vec![]);
    let slots = vec![
        vec![word(&f, "b1", -0.5), word(&f, "b2", -2.0), word(&f, "b3", -0.75)],
        vec![word(&f, "a1", -1.0), word(&f, "a2", -0.25)],
    ];
    let scorer = BasicScorer::default();

    let mut exhaustive: Vec<f64> = CrossProductMerger
        .combine(&rule, &slots, &scorer, &SyncTransducer)
        .unwrap()
        .iter()
        .map(Scored::log_prob)
        .collect();
    exhaustive.sort_by(|a, b| b.total_cmp(a));
    exhaustive.truncate(3);

    let cube: Vec<f64> = CubePruningMerger::new(3)
        .combine(&rule, &slots, &scorer, &SyncTransducer)
        .unwrap()
        .iter()
        .map(Scored::log_prob)
        .collect();
    assert_eq!(cube, exhaustive);

    let beam = BeamSearchMerger::new(3, false)
        .combine(&rule, &slots, &scorer, &SyncTransducer)
        .unwrap();
    assert_eq!(beam.len(), 3);
    assert!(approx(beam[0].log_prob(), exhaustive[0]));
}

#[test]
fn test_contract_violations() {
    let f = TokenFactory::new();
    let rule = swap_rule(&f, "swap", vec![]);

    let err = CubePruningMerger::new(4)
        .combine(&rule, &[vec![word(&f, "b", -1.0)]], &BasicScorer::default(), &SyncTransducer)
        .unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(err, GraftError::ArityMismatch { expected: 2, found: 1, .. }));
}

#[test]
fn test_inserted_target_terminal() {
    let f = TokenFactory::new();
    let (x, a) = (f.nonterminal("X"), f.nonterminal("A"));
    let (ne, pas) = (f.terminal("ne"), f.terminal("pas"));
    // X -> A  ||  X -> ne A pas
    let rule = SyncRule::new("neg", x, vec![a], x, vec![ne, a, pas], vec![None, Some(0), None], vec![])
        .unwrap();

    let slots = vec![
        vec![Parse::target_terminal(ne)],
        vec![word(&f, "mange", -1.0)],
        vec![Parse::target_terminal(pas)],
    ];
    let parses = CrossProductMerger
        .combine(&rule, &slots, &BasicScorer::default(), &SyncTransducer)
        .unwrap();

    assert_eq!(parses.len(), 1);
    assert_eq!(f.render(parses[0].target_tokens()), "ne mange pas");
    assert_eq!(
        parses[0].format_target(&mut BasicTreeFormatter::flat(&f)),
        "ne mange pas"
    );
}

fn log_linear(config: &DecoderConfig, policy: MergePolicy) -> LogLinearScorer {
    LogLinearScorer::new(
        vec![
            Box::new(RuleFeature::new(&["p"])),
            Box::new(WordPenaltyFeature::new()),
        ],
        &config.feature_weights,
        policy,
    )
    .unwrap()
}

#[test]
fn test_cell_pipeline_from_config() {
    let config = DecoderConfig::from_json_str(
        r#"{
            "beam_size": 4,
            "feature_weights": { "rule.p": 1.0, "word-penalty.count": 0.5 }
        }"#,
    )
    .unwrap();
    let registry: ComponentRegistry<SyncRule> = ComponentRegistry::with_defaults();
    let components = registry.resolve(&config).unwrap();
    let scorer = log_linear(&config, components.policy);
    let expander = components.into_expander();

    let f = TokenFactory::new();
    let good = swap_rule(&f, "good", vec![-0.25]);
    let bad = swap_rule(&f, "bad", vec![-1.0]);

    let terminal = |w: &str| {
        let token = f.terminal(w);
        Parse::target_terminal(token).with_scores(scorer.score_terminal(&[token]).unwrap())
    };
    let b2 = Parse::target_terminal(f.terminal("b2"))
        .with_scores(Scores::new(vec![-1.0, -1.0], -1.5).unwrap());
    let slots = vec![vec![terminal("b1"), b2], vec![terminal("a1")]];

    let parses = expander
        .expand_cell(
            [RuleMatch::new(&bad, &slots), RuleMatch::new(&good, &slots)],
            &scorer,
            &SyncTransducer,
        )
        .unwrap();

    assert_eq!(parses.len(), 2);
    assert_eq!(f.render(parses[0].target_tokens()), "b1 a1");
    assert!(approx(parses[0].log_prob(), -1.25));
    assert!(approx(parses[1].log_prob(), -2.25));
    for parse in &parses {
        assert!(parse.scores().is_recombined());
        assert_eq!(parse.recombined().len(), 1);
    }
    assert_eq!(
        parses[0].format_target(&mut BasicTreeFormatter::bracketed(&f)),
        "(X=-1.2500 b1 a1 )"
    );
}

#[test]
fn test_cell_pipeline_beam_bound() {
    let f = TokenFactory::new();
    let rule = swap_rule(&f, "swap", vec![0.0]);
    let slots = vec![
        (0..6).map(|i| word(&f, &format!("b{i}"), -(i as f64))).collect::<Vec<_>>(),
        (0..6).map(|i| word(&f, &format!("a{i}"), -(i as f64) / 2.0)).collect::<Vec<_>>(),
    ];

    let expander: CellExpander<SyncRule> = CellExpander::new(
        Box::new(CubePruningMerger::new(5)),
        Box::new(YieldRecombiner),
        3,
    );
    let parses = expander
        .expand(&rule, &slots, &BasicScorer::default(), &SyncTransducer)
        .unwrap();

    let scores: Vec<f64> = parses.iter().map(Scored::log_prob).collect();
    assert_eq!(scores, vec![0.0, -0.5, -1.0]);
}

#[test]
fn test_summed_duplicates_score_their_parent() {
    let config = DecoderConfig::from_json_str(
        r#"{
            "merge_policy": "sum-probability",
            "feature_weights": { "rule.p": 1.0, "word-penalty.count": 1.0 }
        }"#,
    )
    .unwrap();
    let registry: ComponentRegistry<SyncRule> = ComponentRegistry::with_defaults();
    let components = registry.resolve(&config).unwrap();
    assert_eq!(components.policy, MergePolicy::SumProbability);
    let scorer = log_linear(&config, components.policy);

    let f = TokenFactory::new();
    let w = f.terminal("w");
    let leaf = || Parse::target_terminal(w).with_scores(scorer.score_terminal(&[w]).unwrap());
    let mut cell = vec![leaf(), leaf()];
    components.recombiner.recombine(&mut cell, &scorer).unwrap();
    assert_eq!(cell.len(), 1);
    // 10^-1 + 10^-1
    assert!(approx(cell[0].log_prob(), 0.2f64.log10()));

    let (x, a) = (f.nonterminal("X"), f.nonterminal("A"));
    let lift = SyncRule::new("lift", x, vec![a], x, vec![a], vec![Some(0)], vec![0.0]).unwrap();
    let parents = CrossProductMerger
        .combine(&lift, &[cell.clone()], &scorer, &SyncTransducer)
        .unwrap();

    assert_eq!(parents.len(), 1);
    assert!(approx(parents[0].log_prob(), cell[0].log_prob()));
}
