//! # Search
//!
//! Bounded hypothesis storage used by the combiners and cell expansion.
//!
//! ## Usage
//!
//! ```rust
//! use graft::parse::Parse;
//! use graft::scoring::Scores;
//! use graft::search::Beam;
//! use graft::token::TokenFactory;
//!
//! let f = TokenFactory::new();
//! let mut beam = Beam::new(2);
//! for (word, score) in [("a", -3.0), ("b", -1.0), ("c", -2.0)] {
//!     beam.add(Parse::target_terminal(f.terminal(word)).with_scores(Scores::scalar(score)?));
//! }
//!
//! let best: Vec<String> = beam
//!     .into_sorted_vec()
//!     .iter()
//!     .map(|p| f.render(p.target_tokens()))
//!     .collect();
//! assert_eq!(best, vec!["b", "c"]);
//! # Ok::<(), graft::GraftError>(())
//! ```

mod beam;

pub use beam::Beam;
