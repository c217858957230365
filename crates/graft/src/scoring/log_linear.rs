use super::{FeatureVector, MergePolicy, Scorer, Scores};
use crate::error::{GraftError, Result};
use crate::grammar::GrammarRule;
use crate::token::Token;
use compact_str::{format_compact, CompactString};
use std::collections::BTreeMap;
use std::fmt;

/// One component of a log-linear model
///
/// A feature contributes a fixed-length sub-vector, one value per label.
/// Values must combine additively across a derivation.
pub trait Feature: Send + Sync {
    /// Name used to qualify this feature's weights, as in `name.label`
    fn name(&self) -> &str;

    /// One label per value this feature produces
    fn labels(&self) -> &[CompactString];

    /// Values for a terminal leaf with the given target yield
    fn score_terminal(&self, target_tokens: &[Token]) -> Result<FeatureVector>;

    /// Values contributed by applying `rule`
    fn score_rule(&self, rule: &dyn GrammarRule) -> Result<FeatureVector>;
}

/// The rule's own log-probabilities, summed over every rule in a derivation
#[derive(Debug, Clone)]
pub struct RuleFeature {
    labels: Vec<CompactString>,
}

impl RuleFeature {
    /// `labels` names each value of the rules' feature vectors, in order
    #[must_use]
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| CompactString::from(*l)).collect(),
        }
    }
}

impl Feature for RuleFeature {
    fn name(&self) -> &str {
        "rule"
    }

    fn labels(&self) -> &[CompactString] {
        &self.labels
    }

    fn score_terminal(&self, _target_tokens: &[Token]) -> Result<FeatureVector> {
        Ok(smallvec::smallvec![0.0; self.labels.len()])
    }

    fn score_rule(&self, rule: &dyn GrammarRule) -> Result<FeatureVector> {
        let values = rule.features();
        if values.len() != self.labels.len() {
            return Err(GraftError::FeatureMismatch {
                expected: self.labels.len(),
                found: values.len(),
            });
        }
        Ok(FeatureVector::from_slice(values))
    }
}

/// Minus one for every target terminal produced
#[derive(Debug, Clone)]
pub struct WordPenaltyFeature {
    labels: [CompactString; 1],
}

impl WordPenaltyFeature {
    #[must_use]
    pub fn new() -> Self {
        Self {
            labels: [CompactString::const_new("count")],
        }
    }
}

impl Default for WordPenaltyFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for WordPenaltyFeature {
    fn name(&self) -> &str {
        "word-penalty"
    }

    fn labels(&self) -> &[CompactString] {
        &self.labels
    }

    fn score_terminal(&self, target_tokens: &[Token]) -> Result<FeatureVector> {
        let words = target_tokens.iter().filter(|t| t.is_terminal()).count();
        Ok(smallvec::smallvec![-(words as f64)])
    }

    fn score_rule(&self, _rule: &dyn GrammarRule) -> Result<FeatureVector> {
        Ok(smallvec::smallvec![0.0])
    }
}

/// Weighted sum of feature values
///
/// Leaves and rules are scored by the dot product of their feature values
/// with the weight vector. Combination adds both the feature vectors and the
/// scalars, so the scalar stays the dot product of the features until a
/// [`MergePolicy::SumProbability`] recombination replaces it with the log of
/// the summed probabilities. That surplus is carried into every parent.
pub struct LogLinearScorer {
    features: Vec<Box<dyn Feature>>,
    labels: Vec<CompactString>,
    weights: Vec<f64>,
    policy: MergePolicy,
}

impl LogLinearScorer {
    /// Build a scorer, taking each weight from `weights["name.label"]`
    ///
    /// Weights for labels no feature declares are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::MissingFeature`] if a declared label has no
    /// configured weight.
    pub fn new(
        features: Vec<Box<dyn Feature>>,
        weights: &BTreeMap<String, f64>,
        policy: MergePolicy,
    ) -> Result<Self> {
        let mut labels = Vec::new();
        let mut weight_vector = Vec::new();
        for feature in &features {
            for label in feature.labels() {
                let qualified = format_compact!("{}.{}", feature.name(), label);
                let weight = weights.get(qualified.as_str()).copied().ok_or_else(|| {
                    GraftError::MissingFeature {
                        name: qualified.to_string(),
                    }
                })?;
                labels.push(qualified);
                weight_vector.push(weight);
            }
        }
        if weights.len() > labels.len() {
            tracing::debug!(
                configured = weights.len(),
                used = labels.len(),
                "ignoring weights with no matching feature"
            );
        }
        Ok(Self {
            features,
            labels,
            weights: weight_vector,
            policy,
        })
    }

    /// Replace the weight vector, as a tuner would between iterations
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::FeatureMismatch`] if `weights` does not have one
    /// value per label.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        if weights.len() != self.labels.len() {
            return Err(GraftError::FeatureMismatch {
                expected: self.labels.len(),
                found: weights.len(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    #[must_use]
    pub const fn policy(&self) -> MergePolicy {
        self.policy
    }

    fn dot(&self, values: &[f64]) -> f64 {
        values.iter().zip(&self.weights).map(|(v, w)| v * w).sum()
    }

    fn check_len(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.labels.len() {
            return Err(GraftError::FeatureMismatch {
                expected: self.labels.len(),
                found: values.len(),
            });
        }
        Ok(())
    }

    fn collect(
        &self,
        mut score: impl FnMut(&dyn Feature) -> Result<FeatureVector>,
    ) -> Result<FeatureVector> {
        let mut values = FeatureVector::with_capacity(self.labels.len());
        for feature in &self.features {
            let part = score(feature.as_ref())?;
            if part.len() != feature.labels().len() {
                return Err(GraftError::FeatureMismatch {
                    expected: feature.labels().len(),
                    found: part.len(),
                });
            }
            values.extend_from_slice(&part);
        }
        Ok(values)
    }

    fn add(&self, a: &Scores, b: &Scores, recombined: bool) -> Result<Scores> {
        self.check_len(&a.features)?;
        self.check_len(&b.features)?;
        let values: FeatureVector = a
            .features
            .iter()
            .zip(&b.features)
            .map(|(x, y)| x + y)
            .collect();
        let mut scores = Scores::new(values, a.log_prob + b.log_prob)?;
        scores.recombined = recombined;
        Ok(scores)
    }
}

impl Scorer for LogLinearScorer {
    fn initial_scores(&self) -> Scores {
        Scores::zero(self.labels.len())
    }

    fn score_terminal(&self, target_tokens: &[Token]) -> Result<Scores> {
        let values = self.collect(|feature| feature.score_terminal(target_tokens))?;
        let log_prob = self.dot(&values);
        Scores::new(values, log_prob)
    }

    fn combine_rule(&self, scores: &Scores, rule: &dyn GrammarRule) -> Result<Scores> {
        let values = self.collect(|feature| feature.score_rule(rule))?;
        let log_prob = self.dot(&values);
        let rule_scores = Scores::new(values, log_prob)?;
        self.add(scores, &rule_scores, scores.recombined)
    }

    fn combine_child_scores(&self, child: &Scores, accumulated: &Scores) -> Result<Scores> {
        self.add(child, accumulated, accumulated.recombined)
    }

    fn recombine(&self, survivor: &Scores, duplicate: &Scores) -> Result<Scores> {
        self.policy.merge(survivor, duplicate)
    }

    fn labels(&self) -> &[CompactString] {
        &self.labels
    }

    fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl fmt::Debug for LogLinearScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLinearScorer")
            .field("labels", &self.labels)
            .field("weights", &self.weights)
            .field("policy", &self.policy)
            .finish()
    }
}
