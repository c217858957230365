//! # Decoder Configuration
//!
//! Serializable settings naming the components of a decoding run.
//!
//! ## Overview
//!
//! [`DecoderConfig`] is plain data: component choices are strings resolved by
//! a [`ComponentRegistry`](crate::registry::ComponentRegistry), weights are a
//! map from `feature.label` to value. Every field has a default, so a JSON
//! document only needs the fields it changes. Unknown fields are rejected to
//! catch typos.
//!
//! ## Usage
//!
//! ```rust
//! use graft::config::DecoderConfig;
//!
//! let config = DecoderConfig::from_json_str(r#"{
//!     "beam_size": 20,
//!     "merger": "beam-search",
//!     "feature_weights": { "rule.p": 1.0, "word-penalty.count": -0.3 }
//! }"#)?;
//!
//! assert_eq!(config.beam_size, 20);
//! assert_eq!(config.recombiner, "yield");
//! assert_eq!(config.feature_weights["word-penalty.count"], -0.3);
//! # Ok::<(), graft::GraftError>(())
//! ```

use crate::error::{GraftError, Result};
use crate::scoring::MergePolicy;
use crate::trie::TriePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings for one decoding run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Hypotheses kept per cell and per combiner stage
    pub beam_size: usize,
    /// Registry name of the combiner
    pub merger: String,
    /// Registry name of the recombiner
    pub recombiner: String,
    /// Registry name of the merge policy
    pub merge_policy: String,
    /// Longest rule right-hand side the grammar index accepts
    pub max_key_len: usize,
    /// Worker threads for batch translation (0 = one per core)
    pub num_threads: usize,
    /// Translations reported per sentence
    pub n_best: usize,
    /// Weight per qualified feature label
    pub feature_weights: BTreeMap<String, f64>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam_size: 10,
            merger: "cube-pruning".to_string(),
            recombiner: "yield".to_string(),
            merge_policy: MergePolicy::MaxDerivation.name().to_string(),
            max_key_len: 8,
            num_threads: 0,
            n_best: 1,
            feature_weights: BTreeMap::new(),
        }
    }
}

impl DecoderConfig {
    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::Config`] for malformed JSON, unknown fields or a
    /// document that fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::Config`] if a weight cannot be represented in
    /// JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges that the type system does not
    ///
    /// Component names are checked when a registry resolves them.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(GraftError::config("beam_size must be at least 1"));
        }
        if self.max_key_len == 0 {
            return Err(GraftError::config("max_key_len must be at least 1"));
        }
        if self.n_best == 0 || self.n_best > self.beam_size {
            return Err(GraftError::config(format!(
                "n_best must be between 1 and beam_size ({}), got {}",
                self.beam_size, self.n_best
            )));
        }
        if let Some((name, weight)) = self.feature_weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(GraftError::config(format!(
                "weight for {name} is not finite: {weight}"
            )));
        }
        Ok(())
    }

    /// Trie policy for the grammar index
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::Config`] if `max_key_len` is zero.
    pub fn trie_policy(&self) -> Result<TriePolicy> {
        TriePolicy::new(self.max_key_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merger, "cube-pruning");
        assert_eq!(config.merge_policy, "max");
        assert_eq!(config.trie_policy().unwrap().max_key_len(), 8);
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(DecoderConfig::from_json_str("{}").unwrap(), DecoderConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = DecoderConfig::default();
        config.feature_weights.insert("rule.p".to_string(), 0.5);
        config.n_best = 3;

        let json = config.to_json_string().unwrap();
        assert_eq!(DecoderConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = DecoderConfig::from_json_str(r#"{ "beam_width": 5 }"#).unwrap_err();
        assert!(matches!(err, GraftError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let bad_beam = DecoderConfig {
            beam_size: 0,
            ..DecoderConfig::default()
        };
        assert!(bad_beam.validate().is_err());

        let bad_n_best = DecoderConfig {
            n_best: 11,
            ..DecoderConfig::default()
        };
        assert!(bad_n_best.validate().unwrap_err().to_string().contains("n_best"));

        assert!(DecoderConfig::from_json_str(r#"{ "max_key_len": 0 }"#).is_err());
    }
}
