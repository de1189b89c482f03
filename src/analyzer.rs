use crate::{
    game::{Game, ResultTable},
    Error, Face,
};
use itertools::Itertools;
use ndarray::Array2;
use std::collections::{BTreeSet, HashMap};

//////////////
// Analyzer //
//////////////

/// Descriptive statistics over one game's latest play.
///
/// The analyzer captures an owned copy of the result table at construction
/// time; replaying the game afterwards does not change an already-built
/// analyzer's view. It never mutates after construction, and every query
/// returns owned data.
#[derive(Clone, Debug)]
pub struct Analyzer<F> {
    table: ResultTable<F>,
}

impl<F: Face> Analyzer<F> {
    /// Snapshot the game's latest results. Fails with [`Error::NoResults`]
    /// if the game has never been played.
    pub fn new(game: &Game<F>) -> Result<Self, Error> {
        let table = game.latest_table()?.clone();
        Ok(Self::from_table(table))
    }

    pub(crate) fn from_table(table: ResultTable<F>) -> Self {
        Self { table }
    }

    pub fn num_trials(&self) -> usize {
        self.table.num_trials()
    }

    pub fn num_dice(&self) -> usize {
        self.table.num_dice()
    }

    /// The number of trials in which every die produced the identical face.
    /// Always in `0..=num_trials()`.
    pub fn jackpot_count(&self) -> usize {
        self.table
            .cells()
            .outer_iter()
            .filter(|row| row.iter().all_equal())
            .count()
    }

    /// How many times each face appeared in each trial.
    ///
    /// The column set is every face observed anywhere in the table, sorted,
    /// and is the same for every row; faces absent from a trial count 0.
    pub fn face_counts_per_trial(&self) -> FaceCounts<F> {
        let faces = self
            .table
            .cells()
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let index = faces
            .iter()
            .enumerate()
            .map(|(idx, face)| (face.clone(), idx))
            .collect::<HashMap<_, _>>();

        let mut counts = Array2::<u64>::zeros((self.table.num_trials(), faces.len()));
        for (trial, row) in self.table.cells().outer_iter().enumerate() {
            for face in row.iter() {
                counts[[trial, index[face]]] += 1;
            }
        }

        FaceCounts { faces, counts }
    }

    /// Tally the distinct order-independent combinations of faces rolled:
    /// each trial's row is sorted into its canonical multiset form
    /// (duplicates kept), then identical forms are counted across trials.
    ///
    /// Ordered by descending count; ties keep first-seen row order.
    pub fn combination_counts(&self) -> Vec<(Vec<F>, usize)> {
        self.tuple_counts(true)
    }

    /// Tally the distinct as-rolled permutations of faces: like
    /// [`Self::combination_counts`] but position-sensitive, so two trials
    /// with the same faces in different die order count separately.
    ///
    /// Ordered by descending count; ties keep first-seen row order.
    pub fn permutation_counts(&self) -> Vec<(Vec<F>, usize)> {
        self.tuple_counts(false)
    }

    fn tuple_counts(&self, canonicalize: bool) -> Vec<(Vec<F>, usize)> {
        let mut tallies: Vec<(Vec<F>, usize)> = Vec::new();
        let mut index: HashMap<Vec<F>, usize> = HashMap::new();

        for row in self.table.cells().outer_iter() {
            let mut key = row.to_vec();
            if canonicalize {
                key.sort_unstable();
            }

            match index.get(&key) {
                Some(&idx) => tallies[idx].1 += 1,
                None => {
                    index.insert(key.clone(), tallies.len());
                    tallies.push((key, 1));
                }
            }
        }

        // stable sort: ties stay in first-seen order
        tallies.sort_by(|(_, count1), (_, count2)| count2.cmp(count1));
        tallies
    }
}

////////////////
// FaceCounts //
////////////////

/// The per-trial face frequency table: one row per trial, one column per
/// face ever observed in the play.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCounts<F> {
    faces: Vec<F>,
    counts: Array2<u64>,
}

impl<F: Face> FaceCounts<F> {
    /// The column faces, sorted; stable across all rows.
    pub fn faces(&self) -> &[F] {
        &self.faces
    }

    pub fn num_trials(&self) -> usize {
        self.counts.nrows()
    }

    /// The (trial × face) count grid, columns matching [`Self::faces`].
    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// One trial's counts, in column order.
    pub fn trial(&self, trial: usize) -> Vec<u64> {
        self.counts.row(trial).to_vec()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test {
    use super::*;
    use crate::die::{prop::small_rng, Die};
    use claim::{assert_le, assert_matches};
    use std::collections::HashMap;

    /// Build an analyzer straight from per-die outcome columns.
    fn analyzer_of(columns: Vec<Vec<u32>>) -> Analyzer<u32> {
        let trials = columns[0].len();
        Analyzer::from_table(ResultTable::from_columns(trials, columns))
    }

    fn played_d6_game(ndice: usize, trials: usize, seed: u64) -> Game<u32> {
        let dice = (0..ndice).map(|_| Die::new(1..=6).unwrap()).collect();
        let mut game = Game::new(dice).unwrap();
        game.play(trials, &mut small_rng(seed)).unwrap();
        game
    }

    /// A die that can only ever roll `face`.
    fn degenerate_d6(face: u32) -> Die<u32> {
        let mut die = Die::new(1..=6).unwrap();
        for other in (1..=6).filter(|&other| other != face) {
            die.set_weight(&other, 0.0).unwrap();
        }
        die
    }

    #[test]
    fn test_new_requires_a_played_game() {
        let game = Game::new(vec![Die::new(1..=6).unwrap()]).unwrap();
        assert_matches!(Analyzer::new(&game), Err(Error::NoResults(_)));
    }

    #[test]
    fn test_snapshot_is_immutable() {
        let mut game = played_d6_game(2, 12, 0xf00d);
        let analyzer = Analyzer::new(&game).unwrap();

        // replaying the game doesn't retroactively change the analyzer
        game.play(3, &mut small_rng(0xf00d)).unwrap();
        assert_eq!(12, analyzer.num_trials());
    }

    #[test]
    fn test_jackpot_count_known_table() {
        // trials: (1,1) (2,3) (4,4) (5,6)
        let analyzer = analyzer_of(vec![vec![1, 2, 4, 5], vec![1, 3, 4, 6]]);
        assert_eq!(2, analyzer.jackpot_count());
    }

    #[test]
    fn test_jackpot_count_degenerate_dice() {
        // identical single-face dice jackpot on every trial
        let dice = (0..3).map(|_| degenerate_d6(5)).collect();
        let mut game = Game::new(dice).unwrap();
        game.play(40, &mut small_rng(1)).unwrap();

        let analyzer = Analyzer::new(&game).unwrap();
        assert_eq!(40, analyzer.jackpot_count());

        // different single-face dice never jackpot
        let dice = vec![degenerate_d6(1), degenerate_d6(2)];
        let mut game = Game::new(dice).unwrap();
        game.play(40, &mut small_rng(2)).unwrap();
        assert_eq!(0, Analyzer::new(&game).unwrap().jackpot_count());
    }

    #[test]
    fn test_face_counts_known_table() {
        // trials: (2,2,3) (3,1,3) (2,1,1)
        let analyzer = analyzer_of(vec![vec![2, 3, 2], vec![2, 1, 1], vec![3, 3, 1]]);
        let face_counts = analyzer.face_counts_per_trial();

        assert_eq!(&[1, 2, 3], face_counts.faces());
        assert_eq!(3, face_counts.num_trials());
        assert_eq!(vec![0, 2, 1], face_counts.trial(0));
        assert_eq!(vec![1, 0, 2], face_counts.trial(1));
        assert_eq!(vec![2, 1, 0], face_counts.trial(2));
    }

    #[test]
    fn test_tuple_counts_known_table() {
        // trials: (1,2) (2,1) (1,2) (3,3)
        let analyzer = analyzer_of(vec![vec![1, 2, 1, 3], vec![2, 1, 2, 3]]);

        // combinations are order-independent: (1,2) x3, (3,3) x1
        assert_eq!(
            vec![(vec![1, 2], 3), (vec![3, 3], 1)],
            analyzer.combination_counts(),
        );

        // permutations keep die order: (1,2) x2, then first-seen tie-break
        // between (2,1) x1 and (3,3) x1
        assert_eq!(
            vec![(vec![1, 2], 2), (vec![2, 1], 1), (vec![3, 3], 1)],
            analyzer.permutation_counts(),
        );
    }

    #[test]
    fn test_counts_are_sorted_descending() {
        let game = played_d6_game(2, 200, 0xabcd);
        let analyzer = Analyzer::new(&game).unwrap();

        for tallies in [analyzer.combination_counts(), analyzer.permutation_counts()] {
            for pair in tallies.windows(2) {
                assert!(pair[0].1 >= pair[1].1);
            }
        }
    }

    #[test]
    fn test_permutations_refine_combinations() {
        let game = played_d6_game(3, 150, 0x1234);
        let analyzer = Analyzer::new(&game).unwrap();

        // summing permutation counts by sorted form reproduces the
        // combination counts exactly
        let mut regrouped: HashMap<Vec<u32>, usize> = HashMap::new();
        for (tuple, count) in analyzer.permutation_counts() {
            let mut sorted = tuple;
            sorted.sort_unstable();
            *regrouped.entry(sorted).or_insert(0) += count;
        }

        let combos: HashMap<Vec<u32>, usize> =
            analyzer.combination_counts().into_iter().collect();
        assert_eq!(combos, regrouped);
    }

    #[test]
    fn test_three_d6_hundred_trials() {
        let game = played_d6_game(3, 100, 0x3d6);
        let analyzer = Analyzer::new(&game).unwrap();

        assert_le!(analyzer.jackpot_count(), 100);

        let face_counts = analyzer.face_counts_per_trial();
        assert_eq!(100, face_counts.num_trials());
        assert_le!(face_counts.faces().len(), 6);
        for trial in 0..100 {
            assert_eq!(3, face_counts.trial(trial).into_iter().sum::<u64>());
        }

        let combo_total: usize = analyzer
            .combination_counts()
            .into_iter()
            .map(|(_, count)| count)
            .sum();
        let perm_total: usize = analyzer
            .permutation_counts()
            .into_iter()
            .map(|(_, count)| count)
            .sum();
        assert_eq!(100, combo_total);
        assert_eq!(100, perm_total);
    }
}
