//! # Component Registry
//!
//! Named constructors for the pluggable parts of a decoding run.
//!
//! ## Overview
//!
//! A [`DecoderConfig`] names its combiner, recombiner and merge policy as
//! strings. The registry maps each name to a constructor and builds the
//! components in one [`resolve`](ComponentRegistry::resolve) call. Callers can
//! register their own implementations next to the built-in ones:
//!
//! | Kind | Built-in names |
//! |---|---|
//! | combiner | `cross-product`, `beam-search`, `cube-pruning` |
//! | recombiner | `yield`, `null` |
//! | merge policy | `max` (`max-derivation`), `sum` (`sum-probability`) |
//!
//! ## Usage
//!
//! ```rust
//! use graft::config::DecoderConfig;
//! use graft::grammar::SyncRule;
//! use graft::registry::ComponentRegistry;
//!
//! let registry: ComponentRegistry<SyncRule> = ComponentRegistry::with_defaults();
//! let config = DecoderConfig {
//!     merger: "beam-search".to_string(),
//!     ..DecoderConfig::default()
//! };
//!
//! let components = registry.resolve(&config)?;
//! assert_eq!(components.merger.name(), "beam-search");
//! assert_eq!(components.recombiner.name(), "yield");
//! # Ok::<(), graft::GraftError>(())
//! ```

use crate::cell::CellExpander;
use crate::config::DecoderConfig;
use crate::error::{GraftError, Result};
use crate::grammar::GrammarRule;
use crate::merge::{BeamSearchMerger, CrossProductMerger, CubePruningMerger, Merger};
use crate::recombine::{NullRecombiner, Recombiner, YieldRecombiner};
use crate::scoring::MergePolicy;
use compact_str::CompactString;
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a combiner from the run configuration
pub type MergerCtor<R> = Arc<dyn Fn(&DecoderConfig) -> Box<dyn Merger<R>> + Send + Sync>;

/// Builds a recombiner from the run configuration
pub type RecombinerCtor = Arc<dyn Fn(&DecoderConfig) -> Box<dyn Recombiner> + Send + Sync>;

/// Components resolved for one run
pub struct Components<R> {
    pub merger: Box<dyn Merger<R>>,
    pub recombiner: Box<dyn Recombiner>,
    pub policy: MergePolicy,
    pub beam_size: usize,
    pub n_best: usize,
}

impl<R: GrammarRule> Components<R> {
    /// Package the combiner, recombiner and beam width as a cell pipeline
    ///
    /// The policy is consumed by the scorer, which the caller builds.
    #[must_use]
    pub fn into_expander(self) -> CellExpander<R> {
        CellExpander::new(self.merger, self.recombiner, self.beam_size)
    }
}

impl<R> fmt::Debug for Components<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("merger", &self.merger.name())
            .field("recombiner", &self.recombiner.name())
            .field("policy", &self.policy)
            .field("beam_size", &self.beam_size)
            .field("n_best", &self.n_best)
            .finish()
    }
}

/// Name → constructor tables for combiners, recombiners and merge policies
pub struct ComponentRegistry<R> {
    mergers: HashMap<CompactString, MergerCtor<R>>,
    recombiners: HashMap<CompactString, RecombinerCtor>,
    policies: HashMap<CompactString, MergePolicy>,
}

impl<R> ComponentRegistry<R> {
    /// Create a registry with nothing registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mergers: HashMap::new(),
            recombiners: HashMap::new(),
            policies: HashMap::new(),
        }
    }

    /// Register (or replace) a combiner constructor
    pub fn register_merger<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&DecoderConfig) -> Box<dyn Merger<R>> + Send + Sync + 'static,
    {
        self.mergers.insert(CompactString::from(name), Arc::new(ctor));
    }

    /// Register (or replace) a recombiner constructor
    pub fn register_recombiner<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&DecoderConfig) -> Box<dyn Recombiner> + Send + Sync + 'static,
    {
        self.recombiners.insert(CompactString::from(name), Arc::new(ctor));
    }

    /// Register (or replace) a merge policy alias
    pub fn register_policy(&mut self, name: &str, policy: MergePolicy) {
        self.policies.insert(CompactString::from(name), policy);
    }

    /// Registered combiner names, sorted
    #[must_use]
    pub fn merger_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mergers.keys().map(CompactString::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered recombiner names, sorted
    #[must_use]
    pub fn recombiner_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.recombiners.keys().map(CompactString::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a combiner by name
    ///
    /// # Errors
    ///
    /// [`GraftError::UnknownComponent`] if nothing is registered under `name`.
    pub fn merger(&self, name: &str, config: &DecoderConfig) -> Result<Box<dyn Merger<R>>> {
        self.mergers
            .get(name)
            .map(|ctor| ctor(config))
            .ok_or_else(|| GraftError::unknown_component("merger", name))
    }

    /// Build a recombiner by name
    ///
    /// # Errors
    ///
    /// [`GraftError::UnknownComponent`] if nothing is registered under `name`.
    pub fn recombiner(&self, name: &str, config: &DecoderConfig) -> Result<Box<dyn Recombiner>> {
        self.recombiners
            .get(name)
            .map(|ctor| ctor(config))
            .ok_or_else(|| GraftError::unknown_component("recombiner", name))
    }

    /// Look up a merge policy by name
    ///
    /// # Errors
    ///
    /// [`GraftError::UnknownComponent`] if nothing is registered under `name`.
    pub fn policy(&self, name: &str) -> Result<MergePolicy> {
        self.policies
            .get(name)
            .copied()
            .ok_or_else(|| GraftError::unknown_component("merge policy", name))
    }

    /// Validate `config` and build every component it names
    ///
    /// # Errors
    ///
    /// [`GraftError::Config`] from validation, or
    /// [`GraftError::UnknownComponent`] for the first name not registered.
    pub fn resolve(&self, config: &DecoderConfig) -> Result<Components<R>> {
        config.validate()?;
        Ok(Components {
            merger: self.merger(&config.merger, config)?,
            recombiner: self.recombiner(&config.recombiner, config)?,
            policy: self.policy(&config.merge_policy)?,
            beam_size: config.beam_size,
            n_best: config.n_best,
        })
    }
}

impl<R: GrammarRule + 'static> ComponentRegistry<R> {
    /// Create a registry holding the built-in components
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_merger("cross-product", |_| Box::new(CrossProductMerger));
        registry.register_merger("beam-search", |config| {
            Box::new(BeamSearchMerger::new(
                config.beam_size,
                config.recombiner != NullRecombiner.name(),
            ))
        });
        registry.register_merger("cube-pruning", |config| {
            Box::new(CubePruningMerger::new(config.beam_size))
        });
        registry.register_recombiner("yield", |_| Box::new(YieldRecombiner));
        registry.register_recombiner("null", |_| Box::new(NullRecombiner));
        for policy in MergePolicy::ALL {
            for alias in policy.aliases() {
                registry.register_policy(alias, policy);
            }
        }
        registry
    }
}

impl<R: GrammarRule + 'static> Default for ComponentRegistry<R> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<R> fmt::Debug for ComponentRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("mergers", &self.merger_names())
            .field("recombiners", &self.recombiner_names())
            .field("policies", &self.policies.len())
            .finish()
    }
}
