//! # Scoring
//!
//! Feature scores, the scorer contract used by the combiners, and the
//! policies that fold two equivalent derivations into one.
//!
//! ## Overview
//!
//! Every hypothesis carries [`Scores`]: a vector of feature values in the
//! base-10 log domain, the scalar log-probability the model derives from them,
//! and a flag recording whether the hypothesis absorbed a recombined
//! duplicate. Scores never hold NaN or positive infinity; each constructor and
//! combination checks its output and reports [`GraftError::NonFiniteScore`].
//!
//! A [`Scorer`] owns the model. The combiners ask it for a seed score, fold
//! children into an accumulated score with
//! [`combine_child_scores`](Scorer::combine_child_scores), apply the rule's own
//! features with [`combine_rule`](Scorer::combine_rule), and merge duplicates
//! with [`recombine`](Scorer::recombine), which delegates to a [`MergePolicy`].
//!
//! Two scorers ship with the crate:
//!
//! - [`BasicScorer`] carries only the scalar and adds rule log-probabilities
//! - [`LogLinearScorer`] dots a vector of [`Feature`] values with weights
//!
//! ## Usage
//!
//! ```rust
//! use graft::scoring::{BasicScorer, MergePolicy, Scorer, Scores};
//!
//! let scorer = BasicScorer::new(MergePolicy::MaxDerivation);
//! let a = Scores::scalar(-1.0)?;
//! let b = Scores::scalar(-0.5)?;
//!
//! let combined = scorer.combine_child_scores(&b, &a)?;
//! assert_eq!(combined.log_prob(), -1.5);
//! # Ok::<(), graft::GraftError>(())
//! ```

mod log_linear;
mod policy;

pub use log_linear::{Feature, LogLinearScorer, RuleFeature, WordPenaltyFeature};
pub use policy::{log_sum, MergePolicy};

use crate::error::{GraftError, Result};
use crate::grammar::GrammarRule;
use crate::token::Token;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;

/// Anything ranked by a log-probability
pub trait Scored {
    /// Base-10 log-probability; higher is better
    fn log_prob(&self) -> f64;
}

/// Inline storage for feature values
pub type FeatureVector = SmallVec<[f64; 8]>;

pub(crate) fn check_finite(value: f64, context: &'static str) -> Result<f64> {
    if value.is_nan() || value == f64::INFINITY {
        return Err(GraftError::NonFiniteScore { value, context });
    }
    Ok(value)
}

/// Feature values plus the scalar derived from them
#[derive(Clone, PartialEq)]
pub struct Scores {
    features: FeatureVector,
    log_prob: f64,
    recombined: bool,
}

impl Scores {
    /// Create scores from feature values and their combined log-probability
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::NonFiniteScore`] if any value is NaN or positive
    /// infinity. Negative infinity (probability zero) is allowed.
    pub fn new(features: impl Into<FeatureVector>, log_prob: f64) -> Result<Self> {
        let features = features.into();
        for value in &features {
            check_finite(*value, "feature value")?;
        }
        Ok(Self {
            features,
            log_prob: check_finite(log_prob, "log-probability")?,
            recombined: false,
        })
    }

    /// Scores with no feature breakdown
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::NonFiniteScore`] for NaN or positive infinity.
    pub fn scalar(log_prob: f64) -> Result<Self> {
        Self::new(FeatureVector::new(), log_prob)
    }

    /// `n` zero features and a zero scalar (probability one)
    #[must_use]
    pub fn zero(n: usize) -> Self {
        Self {
            features: smallvec::smallvec![0.0; n],
            log_prob: 0.0,
            recombined: false,
        }
    }

    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    #[must_use]
    pub const fn log_prob(&self) -> f64 {
        self.log_prob
    }

    /// Whether a duplicate derivation was folded into these scores
    #[must_use]
    pub const fn is_recombined(&self) -> bool {
        self.recombined
    }

    /// The same scores flagged as recombined
    #[must_use]
    pub fn into_recombined(mut self) -> Self {
        self.recombined = true;
        self
    }
}

impl Default for Scores {
    fn default() -> Self {
        Self::zero(0)
    }
}

impl Scored for Scores {
    fn log_prob(&self) -> f64 {
        self.log_prob
    }
}

impl fmt::Debug for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scores({:.4}", self.log_prob)?;
        if !self.features.is_empty() {
            write!(f, " {:?}", self.features.as_slice())?;
        }
        if self.recombined {
            f.write_str(" recombined")?;
        }
        f.write_str(")")
    }
}

/// The model the combiners consult
///
/// Implementations must be associative in
/// [`combine_child_scores`](Scorer::combine_child_scores): the combiners fold
/// children in target-slot order and cube pruning relies on the result not
/// depending on how the fold is grouped.
///
/// The recombined flag describes the hypothesis under construction: both
/// combinations keep the flag of the scores being extended and never inherit
/// it from a child or a rule.
pub trait Scorer: Send + Sync {
    /// Scores of a bare seed, before any child or rule is applied
    fn initial_scores(&self) -> Scores;

    /// Scores of a terminal leaf whose target yield is `target_tokens`
    fn score_terminal(&self, target_tokens: &[Token]) -> Result<Scores>;

    /// Apply a rule's own features to an accumulated score
    fn combine_rule(&self, scores: &Scores, rule: &dyn GrammarRule) -> Result<Scores>;

    /// Fold the scores of a newly attached child into the accumulated scores
    fn combine_child_scores(&self, child: &Scores, accumulated: &Scores) -> Result<Scores>;

    /// Merge the scores of a duplicate derivation into its survivor
    fn recombine(&self, survivor: &Scores, duplicate: &Scores) -> Result<Scores>;

    /// Label of each feature value, in vector order
    fn labels(&self) -> &[CompactString];

    /// Weight of each feature value, in vector order
    fn weights(&self) -> &[f64];
}

/// Scalar-only scorer: children add, rules add the sum of their features
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicScorer {
    policy: MergePolicy,
}

impl BasicScorer {
    #[must_use]
    pub const fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> MergePolicy {
        self.policy
    }
}

impl Scorer for BasicScorer {
    fn initial_scores(&self) -> Scores {
        Scores::zero(0)
    }

    fn score_terminal(&self, _target_tokens: &[Token]) -> Result<Scores> {
        Ok(Scores::zero(0))
    }

    fn combine_rule(&self, scores: &Scores, rule: &dyn GrammarRule) -> Result<Scores> {
        let rule_prob: f64 = rule.features().iter().sum();
        let mut combined = Scores::scalar(scores.log_prob + rule_prob)?;
        combined.recombined = scores.recombined;
        Ok(combined)
    }

    fn combine_child_scores(&self, child: &Scores, accumulated: &Scores) -> Result<Scores> {
        let mut combined = Scores::scalar(child.log_prob + accumulated.log_prob)?;
        combined.recombined = accumulated.recombined;
        Ok(combined)
    }

    fn recombine(&self, survivor: &Scores, duplicate: &Scores) -> Result<Scores> {
        self.policy.merge(survivor, duplicate)
    }

    fn labels(&self) -> &[CompactString] {
        &[]
    }

    fn weights(&self) -> &[f64] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::MonoRule;
    use crate::token::TokenFactory;

    #[test]
    fn test_scores_reject_nan_and_positive_infinity() {
        assert!(matches!(
            Scores::scalar(f64::NAN),
            Err(GraftError::NonFiniteScore { .. })
        ));
        assert!(Scores::scalar(f64::INFINITY).is_err());
        assert!(Scores::new(FeatureVector::from_slice(&[f64::NAN]), 0.0).is_err());
        assert!(Scores::scalar(f64::NEG_INFINITY).is_ok());
    }

    #[test]
    fn test_zero_scores() {
        let zero = Scores::zero(3);
        assert_eq!(zero.features(), &[0.0, 0.0, 0.0]);
        assert_eq!(zero.log_prob(), 0.0);
        assert!(!zero.is_recombined());
        assert!(zero.into_recombined().is_recombined());
    }

    #[test]
    fn test_basic_scorer_adds() {
        let scorer = BasicScorer::default();
        let a = Scores::scalar(-1.0).unwrap();
        let b = Scores::scalar(-2.5).unwrap();

        let ab = scorer.combine_child_scores(&a, &b).unwrap();
        assert_eq!(ab.log_prob(), -3.5);
        assert_eq!(scorer.initial_scores().log_prob(), 0.0);
    }

    #[test]
    fn test_basic_scorer_rule() {
        let f = TokenFactory::new();
        let rule = MonoRule::new("r", f.nonterminal("S"), vec![f.nonterminal("NP")], vec![-0.25, -0.5])
            .unwrap();
        let scorer = BasicScorer::default();

        let scored = scorer
            .combine_rule(&Scores::scalar(-1.0).unwrap(), &rule)
            .unwrap();
        assert_eq!(scored.log_prob(), -1.75);
    }

    #[test]
    fn test_flag_follows_extended_scores() {
        let f = TokenFactory::new();
        let rule = MonoRule::new("r", f.nonterminal("S"), vec![f.nonterminal("NP")], vec![-0.25])
            .unwrap();
        let scorer = BasicScorer::default();
        let merged = Scores::scalar(-1.0).unwrap().into_recombined();
        let fresh = scorer.initial_scores();

        assert!(!scorer.combine_child_scores(&merged, &fresh).unwrap().is_recombined());
        assert!(!scorer.combine_rule(&fresh, &rule).unwrap().is_recombined());
        assert!(scorer.combine_child_scores(&fresh, &merged).unwrap().is_recombined());
        assert!(scorer.combine_rule(&merged, &rule).unwrap().is_recombined());
    }

    #[test]
    fn test_debug_format() {
        let scores = Scores::new(FeatureVector::from_slice(&[-1.0]), -2.0).unwrap();
        assert_eq!(format!("{scores:?}"), "Scores(-2.0000 [-1.0])");
    }
}
