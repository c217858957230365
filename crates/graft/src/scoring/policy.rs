use super::{check_finite, Scores};
use crate::error::{GraftError, Result};
use std::fmt;
use std::str::FromStr;

/// `log10(10^a + 10^b)` without leaving the log domain
///
/// Negative infinity is the identity.
#[must_use]
pub fn log_sum(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY {
        return hi;
    }
    hi + (10f64.powf(lo - hi)).ln_1p() / std::f64::consts::LN_10
}

/// How two derivations with the same target yield are folded together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Keep the better derivation's scores (Viterbi)
    #[default]
    MaxDerivation,
    /// Add the two derivations' probabilities; features come from the
    /// better derivation
    SumProbability,
}

impl MergePolicy {
    pub const ALL: [Self; 2] = [Self::MaxDerivation, Self::SumProbability];

    /// Registry name of this policy
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Every name this policy is known by, canonical name first
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::MaxDerivation => &["max", "max-derivation"],
            Self::SumProbability => &["sum", "sum-probability"],
        }
    }

    /// Fold `duplicate` into `survivor`
    ///
    /// Ties keep the survivor's features. The result is always flagged as
    /// recombined.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::NonFiniteScore`] if the folded scalar is not a
    /// valid log-probability.
    pub fn merge(self, survivor: &Scores, duplicate: &Scores) -> Result<Scores> {
        let better = if duplicate.log_prob > survivor.log_prob {
            duplicate
        } else {
            survivor
        };
        let log_prob = match self {
            Self::MaxDerivation => better.log_prob,
            Self::SumProbability => check_finite(
                log_sum(survivor.log_prob, duplicate.log_prob),
                "sum-probability recombination",
            )?,
        };
        Ok(Scores {
            features: better.features.clone(),
            log_prob,
            recombined: true,
        })
    }
}

impl FromStr for MergePolicy {
    type Err = GraftError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.aliases().contains(&s))
            .ok_or_else(|| GraftError::unknown_component("merge policy", s))
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FeatureVector;

    fn scores(features: &[f64], log_prob: f64) -> Scores {
        Scores::new(FeatureVector::from_slice(features), log_prob).unwrap()
    }

    #[test]
    fn test_log_sum() {
        // 0.1 + 0.1 = 0.2
        let sum = log_sum(-1.0, -1.0);
        assert!((sum - 0.2f64.log10()).abs() < 1e-12);
        assert_eq!(log_sum(f64::NEG_INFINITY, -3.0), -3.0);
        assert_eq!(log_sum(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert!((log_sum(-2.0, -1.0) - 0.11f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_max_keeps_better_derivation() {
        let survivor = scores(&[-1.0], -1.0);
        let duplicate = scores(&[-0.2], -0.5);

        let merged = MergePolicy::MaxDerivation.merge(&survivor, &duplicate).unwrap();
        assert_eq!(merged.log_prob(), -0.5);
        assert_eq!(merged.features(), &[-0.2]);
        assert!(merged.is_recombined());
    }

    #[test]
    fn test_max_tie_keeps_survivor() {
        let survivor = scores(&[-1.0], -1.0);
        let duplicate = scores(&[-3.0], -1.0);

        let merged = MergePolicy::MaxDerivation.merge(&survivor, &duplicate).unwrap();
        assert_eq!(merged.features(), &[-1.0]);
    }

    #[test]
    fn test_sum_adds_probabilities() {
        let survivor = scores(&[], -1.0);
        let duplicate = scores(&[], -1.0);

        let merged = MergePolicy::SumProbability.merge(&survivor, &duplicate).unwrap();
        assert!((merged.log_prob() - 0.2f64.log10()).abs() < 1e-12);
        assert!(merged.log_prob() > survivor.log_prob());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("max".parse::<MergePolicy>(), Ok(MergePolicy::MaxDerivation));
        assert_eq!("sum-probability".parse::<MergePolicy>(), Ok(MergePolicy::SumProbability));
        assert!(matches!(
            "median".parse::<MergePolicy>(),
            Err(GraftError::UnknownComponent { kind: "merge policy", .. })
        ));
        assert_eq!(MergePolicy::SumProbability.to_string(), "sum");
    }
}
