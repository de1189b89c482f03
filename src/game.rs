use crate::{die::Die, Error, Face};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

////////////
// Layout //
////////////

/// The shape of the data returned by [`Game::latest_results`].
///
/// Anything other than `wide`/`narrow` is rejected when parsing, so an
/// unrecognized layout can't make it past the string boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// One row per trial, one column per die.
    Wide,
    /// One row per (trial, die) pair, stacked in row-major order.
    Narrow,
}

impl Default for Layout {
    fn default() -> Self {
        Self::Wide
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wide" => Ok(Self::Wide),
            "narrow" => Ok(Self::Narrow),
            _ => Err(Error::InvalidInput(format!(
                "layout must be 'wide' or 'narrow', got: '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wide => f.write_str("wide"),
            Self::Narrow => f.write_str("narrow"),
        }
    }
}

/////////////////
// ResultTable //
/////////////////

/// The outcome table of one play: rows are trials in execution order, columns
/// are dice in game order, each cell the face that die produced on that
/// trial.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable<F> {
    cells: Array2<F>,
}

impl<F: Face> ResultTable<F> {
    /// Assemble a table from one outcome column per die, each of length
    /// `trials`.
    pub(crate) fn from_columns(trials: usize, columns: Vec<Vec<F>>) -> Self {
        debug_assert!(columns.iter().all(|col| col.len() == trials));

        let ndice = columns.len();
        let cells =
            Array2::from_shape_fn((trials, ndice), |(row, col)| columns[col][row].clone());
        Self { cells }
    }

    pub fn num_trials(&self) -> usize {
        self.cells.nrows()
    }

    pub fn num_dice(&self) -> usize {
        self.cells.ncols()
    }

    /// The underlying (trial × die) grid.
    pub fn cells(&self) -> &Array2<F> {
        &self.cells
    }

    /// The faces rolled on one trial, in die order.
    pub fn trial(&self, trial: usize) -> Vec<F> {
        self.cells.row(trial).to_vec()
    }

    /// Reshape into the stacked long format: `(trial, die, face)` triples in
    /// row-major order.
    pub fn to_narrow(&self) -> Vec<(usize, usize, F)> {
        self.cells
            .indexed_iter()
            .map(|((trial, die), face)| (trial, die, face.clone()))
            .collect()
    }
}

/// A copy of a game's latest results, in the requested [`Layout`].
#[derive(Clone, Debug, PartialEq)]
pub enum Results<F> {
    Wide(ResultTable<F>),
    Narrow(Vec<(usize, usize, F)>),
}

//////////
// Game //
//////////

/// A game rolls a fixed, ordered collection of dice together for some number
/// of trials, keeping only the most recent result table.
///
/// The game owns its dice, so a play has exclusive access to them for its
/// whole duration; weights cannot shift under an in-flight run.
#[derive(Clone, Debug)]
pub struct Game<F> {
    dice: Vec<Die<F>>,
    result: Option<ResultTable<F>>,
}

impl<F: Face> Game<F> {
    /// Build a game over a non-empty, ordered collection of dice.
    pub fn new(dice: Vec<Die<F>>) -> Result<Self, Error> {
        if dice.is_empty() {
            return Err(Error::InvalidInput(
                "a game needs at least one die".to_string(),
            ));
        }
        Ok(Self { dice, result: None })
    }

    /// The dice, in column order.
    pub fn dice(&self) -> &[Die<F>] {
        &self.dice
    }

    /// Roll every die `trials` times and store the resulting table, replacing
    /// any previous play wholesale.
    ///
    /// Each die is rolled for all trials in one call, in die order, so the
    /// draw order within a die matches the trial order. Fails with
    /// [`Error::InvalidInput`] if `trials < 1` or if any die cannot be rolled
    /// (zero total weight); on failure the previous result table is kept
    /// untouched.
    pub fn play<R: Rng + ?Sized>(&mut self, trials: usize, rng: &mut R) -> Result<(), Error> {
        if trials < 1 {
            return Err(Error::InvalidInput(format!(
                "number of trials must be >= 1, got: {trials}"
            )));
        }

        let mut columns = Vec::with_capacity(self.dice.len());
        for die in &self.dice {
            columns.push(die.roll(trials, rng)?);
        }

        self.result = Some(ResultTable::from_columns(trials, columns));
        Ok(())
    }

    /// The latest result table, or [`Error::NoResults`] if the game has never
    /// been played.
    pub(crate) fn latest_table(&self) -> Result<&ResultTable<F>, Error> {
        self.result
            .as_ref()
            .ok_or_else(|| Error::NoResults("the game has not been played yet".to_string()))
    }

    /// An owned copy of the latest results in the requested layout. Fails
    /// with [`Error::NoResults`] if the game has never been played.
    pub fn latest_results(&self, layout: Layout) -> Result<Results<F>, Error> {
        let table = self.latest_table()?;
        let results = match layout {
            Layout::Wide => Results::Wide(table.clone()),
            Layout::Narrow => Results::Narrow(table.to_narrow()),
        };
        Ok(results)
    }
}

///////////
// Tests //
///////////
