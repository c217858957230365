//! # Batch Translation
//!
//! Run many independent sentences through a translator, in parallel when the
//! `parallel` feature is enabled.
//!
//! ## Overview
//!
//! Sentences share nothing mutable: the translator (and through it the grammar
//! index, scorer and token factory) is shared read-only behind an `Arc`, and
//! every sentence's chart state lives on the worker that decodes it. A failure
//! in one sentence, whether an error or a panic, becomes a failed
//! [`SentenceResult`] for that sentence only; the rest of the batch is
//! unaffected.
//!
//! Without the `parallel` feature the same API runs sentences one after
//! another.
//!
//! ## Usage
//!
//! ```rust
//! use graft::batch::{aggregate_results, BatchConfig, BatchTranslator, Sentence, SentenceBatch, Translation};
//! use graft::GraftError;
//!
//! let translator = BatchTranslator::new(
//!     |sentence: &Sentence| -> graft::Result<Vec<Translation>> {
//!         if sentence.text.is_empty() {
//!             return Err(GraftError::config("empty input"));
//!         }
//!         Ok(vec![Translation::new(sentence.text.to_uppercase(), -1.0)])
//!     },
//!     BatchConfig::default(),
//! );
//!
//! let mut batch = SentenceBatch::new();
//! batch.add("s1", "hola");
//! batch.add("s2", "");
//!
//! let results = translator.translate_batch(&batch)?;
//! assert_eq!(results[0].best().map(|t| t.text.as_str()), Some("HOLA"));
//! assert!(!results[1].is_ok());
//!
//! let summary = aggregate_results(&results);
//! assert_eq!(summary.success_rate(), 50.0);
//! # Ok::<(), GraftError>(())
//! ```

use crate::config::DecoderConfig;
use crate::error::{GraftError, Result};
use crate::parse::Parse;
use crate::scoring::Scored;
use crate::token::TokenFactory;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One input sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub id: String,
    pub text: String,
}

impl Sentence {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One rendered output hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub log_prob: f64,
}

impl Translation {
    #[must_use]
    pub fn new(text: impl Into<String>, log_prob: f64) -> Self {
        Self {
            text: text.into(),
            log_prob,
        }
    }

    /// Render a parse's target yield
    #[must_use]
    pub fn from_parse(parse: &Parse, factory: &TokenFactory) -> Self {
        Self {
            text: factory.render(parse.target_tokens()),
            log_prob: parse.log_prob(),
        }
    }
}

impl Scored for Translation {
    fn log_prob(&self) -> f64 {
        self.log_prob
    }
}

/// Anything that decodes a single sentence into ranked translations
///
/// Implemented for plain closures so a caller can wrap its chart loop without
/// a named type.
pub trait Translate: Send + Sync {
    /// Translations for `sentence`, best first
    ///
    /// # Errors
    ///
    /// Any error raised while decoding; the batch records it against this
    /// sentence.
    fn translate(&self, sentence: &Sentence) -> Result<Vec<Translation>>;
}

impl<F> Translate for F
where
    F: Fn(&Sentence) -> Result<Vec<Translation>> + Send + Sync,
{
    fn translate(&self, sentence: &Sentence) -> Result<Vec<Translation>> {
        self(sentence)
    }
}

/// Outcome of translating one sentence
#[derive(Debug, Clone)]
pub struct SentenceResult {
    /// Identifier of the input sentence
    pub sentence_id: String,
    /// Position of the sentence in its batch
    pub index: usize,
    /// Up to `n_best` translations, best first
    pub translations: Vec<Translation>,
    /// Why the sentence failed, if it did
    pub error: Option<GraftError>,
    /// Wall time spent on this sentence
    pub duration: Duration,
}

impl SentenceResult {
    /// Create a successful result
    #[must_use]
    pub fn success(
        sentence_id: String,
        index: usize,
        translations: Vec<Translation>,
        duration: Duration,
    ) -> Self {
        Self {
            sentence_id,
            index,
            translations,
            error: None,
            duration,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(sentence_id: String, index: usize, error: GraftError, duration: Duration) -> Self {
        Self {
            sentence_id,
            index,
            translations: Vec::new(),
            error: Some(error),
            duration,
        }
    }

    /// Check if the sentence was translated
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The top translation, if any
    #[must_use]
    pub fn best(&self) -> Option<&Translation> {
        self.translations.first()
    }

    /// Error text for reporting
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// A batch of sentences to translate
#[derive(Debug, Clone, Default)]
pub struct SentenceBatch {
    pub sentences: Vec<Sentence>,
}

impl SentenceBatch {
    /// Create a new empty batch
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sentences: Vec::new(),
        }
    }

    /// Add a sentence to the batch
    pub fn add(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.sentences.push(Sentence::new(id, text));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

impl FromIterator<Sentence> for SentenceBatch {
    fn from_iter<I: IntoIterator<Item = Sentence>>(iter: I) -> Self {
        Self {
            sentences: iter.into_iter().collect(),
        }
    }
}

/// Progress callback: `(completed, total)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Configuration for batch translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of threads to use (0 = auto)
    pub num_threads: usize,
    /// Translations kept per sentence
    pub n_best: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            n_best: 1,
        }
    }
}

impl From<&DecoderConfig> for BatchConfig {
    fn from(config: &DecoderConfig) -> Self {
        Self {
            num_threads: config.num_threads,
            n_best: config.n_best,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Translates batches of sentences with a shared translator
pub struct BatchTranslator<T> {
    translator: Arc<T>,
    config: BatchConfig,
}

impl<T: Translate> BatchTranslator<T> {
    #[must_use]
    pub fn new(translator: T, config: BatchConfig) -> Self {
        Self::from_shared(Arc::new(translator), config)
    }

    /// Create a batch translator over an already shared translator
    #[must_use]
    pub const fn from_shared(translator: Arc<T>, config: BatchConfig) -> Self {
        Self { translator, config }
    }

    #[must_use]
    pub fn translator(&self) -> &Arc<T> {
        &self.translator
    }

    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Translate one sentence, isolating errors and panics
    #[must_use]
    pub fn translate_one(&self, index: usize, sentence: &Sentence) -> SentenceResult {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.translator.translate(sentence)))
            .unwrap_or_else(|payload| {
                Err(GraftError::Panicked {
                    sentence_id: sentence.id.clone(),
                    message: panic_message(payload.as_ref()),
                })
            });
        let duration = start.elapsed();

        match outcome {
            Ok(mut translations) => {
                translations.truncate(self.config.n_best);
                SentenceResult::success(sentence.id.clone(), index, translations, duration)
            }
            Err(error) => {
                warn!(sentence = %sentence.id, %error, "sentence failed");
                SentenceResult::failure(sentence.id.clone(), index, error, duration)
            }
        }
    }

    /// Translate a batch, one result per sentence in input order
    ///
    /// # Errors
    ///
    /// [`GraftError::Config`] if the worker pool cannot be created.
    /// Per-sentence failures are reported in the results, not here.
    pub fn translate_batch(&self, batch: &SentenceBatch) -> Result<Vec<SentenceResult>> {
        self.run(batch, |_| {})
    }

    /// Translate a batch, calling `progress(completed, total)` after every
    /// sentence
    ///
    /// # Errors
    ///
    /// As [`translate_batch`](Self::translate_batch).
    pub fn translate_batch_with_progress(
        &self,
        batch: &SentenceBatch,
        progress: ProgressCallback,
    ) -> Result<Vec<SentenceResult>> {
        let total = batch.len();
        let completed = AtomicUsize::new(0);
        self.run(batch, |_| {
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
        })
    }

    #[cfg(feature = "parallel")]
    fn run<P>(&self, batch: &SentenceBatch, on_done: P) -> Result<Vec<SentenceResult>>
    where
        P: Fn(&SentenceResult) + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| GraftError::config(format!("cannot build worker pool: {e}")))?;
        debug!(
            sentences = batch.len(),
            threads = pool.current_num_threads(),
            "translating batch"
        );

        Ok(pool.install(|| {
            batch
                .sentences
                .par_iter()
                .enumerate()
                .map(|(index, sentence)| {
                    let result = self.translate_one(index, sentence);
                    on_done(&result);
                    result
                })
                .collect()
        }))
    }

    /// Sequential fallback when parallel feature is disabled
    #[cfg(not(feature = "parallel"))]
    fn run<P>(&self, batch: &SentenceBatch, on_done: P) -> Result<Vec<SentenceResult>>
    where
        P: Fn(&SentenceResult),
    {
        debug!(sentences = batch.len(), threads = 1, "translating batch");
        Ok(batch
            .sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let result = self.translate_one(index, sentence);
                on_done(&result);
                result
            })
            .collect())
    }
}

impl<T> std::fmt::Debug for BatchTranslator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Aggregate results from batch translation
#[must_use]
pub fn aggregate_results(results: &[SentenceResult]) -> BatchSummary {
    let total = results.len();
    let successful = results.iter().filter(|r| r.is_ok()).count();
    let total_duration: Duration = results.iter().map(|r| r.duration).sum();
    let avg_duration = u32::try_from(total)
        .ok()
        .filter(|n| *n > 0)
        .map_or(Duration::ZERO, |n| total_duration / n);

    BatchSummary {
        total,
        successful,
        failed: total - successful,
        total_duration,
        avg_duration,
    }
}

/// Summary of batch translation results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Total number of sentences
    pub total: usize,
    /// Number of sentences translated
    pub successful: usize,
    /// Number of sentences that failed
    pub failed: usize,
    /// Total time spent across sentences
    pub total_duration: Duration,
    /// Average time per sentence
    pub avg_duration: Duration,
}

impl BatchSummary {
    /// Get the success rate as a percentage
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.successful as f64 / self.total as f64) * 100.0
        }
    }
}
