//! # mcdice
//!
//! A small Monte Carlo simulator for weighted, labeled dice : )
//!
//! ## Explanation
//!
//! The crate is built from three layers, each consuming the previous one:
//!
//! * [`Die`] — a set of unique faces, each with a mutable positive weight,
//!   rolled with replacement proportionally to weight.
//! * [`Game`] — an ordered collection of dice, played for some number of
//!   trials; only the most recent play is kept.
//! * [`Analyzer`] — a read-only snapshot of a game's latest play, deriving
//!   jackpot counts, per-trial face frequencies, and combination /
//!   permutation tallies.
//!
//! Randomness always flows through a caller-provided [`rand::Rng`], so runs
//! are reproducible given a fixed seed. The `mcdice` binary wraps the three
//! layers with `roll`, `play`, and `analyze` subcommands.

pub mod analyzer;
pub mod cli;
pub mod die;
pub mod game;
pub mod parse;

#[cfg(test)]
pub(crate) mod stats;

use std::{fmt, hash::Hash};

pub use analyzer::{Analyzer, FaceCounts};
pub use die::Die;
pub use game::{Game, Layout, ResultTable, Results};

////////////
// Errors //
////////////

/// Errors surfaced by [`Die`], [`Game`], and [`Analyzer`] operations.
///
/// Every error is detected synchronously at the offending call and the
/// failing operation mutates nothing; callers own all recovery.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A malformed or out-of-domain argument: duplicate faces, a non-finite
    /// or negative weight, a zero total weight, a roll/trial count < 1, an
    /// empty game, or an unrecognized layout selector.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation referenced a face that is not part of the target die.
    #[error("face not found: {0}")]
    FaceNotFound(String),

    /// Results were requested from a game that has never been played.
    #[error("no results: {0}")]
    NoResults(String),
}

////////////////
// Face trait //
////////////////

/// The face (outcome label) of a [`Die`]: any cloneable, hashable, totally
/// ordered value. Typical instantiations are `Die<u32>` and `Die<String>`;
/// the type parameter is what keeps a die's faces homogeneous.
///
/// `Ord` is what lets the analyzer sort a row of faces into its canonical
/// order-independent combination.
pub trait Face: Clone + Eq + Ord + Hash + fmt::Debug {}

impl<T: Clone + Eq + Ord + Hash + fmt::Debug> Face for T {}
