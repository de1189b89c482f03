use crate::{
    analyzer::{Analyzer, FaceCounts},
    game::{Game, Layout, Results},
    parse::DieSpec,
};
use itertools::Itertools;
use pico_args;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    time::{Instant, SystemTime, UNIX_EPOCH},
};
use tabular::{row, Row, Table};

const DEFAULT_NUM_TRIALS: usize = 100;

///////////////////////////
// String parser helpers //
///////////////////////////

fn parse_req<T>(label: &'static str, s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    T::from_str(s).map_err(|err| format!("invalid {label}: {err}"))
}

fn parse_opt<T>(label: &'static str, opt_s: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    opt_s
        .map(T::from_str)
        .transpose()
        .map_err(|err| format!("invalid {label}: {err}"))
}

//////////////////////
// CLI Args Wrapper //
//////////////////////

pub struct Args(pico_args::Arguments);

impl Args {
    pub fn new(inner: pico_args::Arguments) -> Self {
        Self(inner)
    }

    fn subcommand(&mut self) -> Result<Option<String>, String> {
        self.0.subcommand().map_err(|err| err.to_string())
    }

    fn opt_value(&mut self, keys: impl Into<pico_args::Keys>) -> Result<Option<String>, String> {
        self.0
            .opt_value_from_fn(keys, |s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    fn free_value(&mut self) -> Result<String, String> {
        self.0
            .free_from_fn(|s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    /// Consume all remaining free arguments.
    fn free_values(self) -> Result<Vec<String>, String> {
        self.0
            .finish()
            .into_iter()
            .map(|os_str| {
                os_str
                    .into_string()
                    .map_err(|os_str| format!("invalid utf-8 argument: '{os_str:?}'"))
            })
            .collect()
    }

    fn expect_finished(self) -> Result<(), String> {
        let remaining = self.0.finish();
        if !remaining.is_empty() {
            Err(format!("unexpected arguments left: '{remaining:?}'"))
        } else {
            Ok(())
        }
    }

    fn maybe_help(&mut self, usage: &str) {
        if self.0.contains(["-h", "--help"]) {
            print!("{usage}");
            std::process::exit(0);
        }
    }
}

/////////////
// Metrics //
/////////////

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Metrics(pub Vec<(String, String)>);

impl Metrics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((label.into(), value.into()));
        self
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("{:>}  {:<}");

        for (label, value) in &self.0 {
            table.add_row(row!(label, value));
        }

        table
    }
}

/////////////////
// RNG seeding //
/////////////////

/// Resolve the RNG for one command invocation. Without an explicit seed we
/// fall back to system-time nanos, since `rand` is built without an OS
/// entropy source; the resolved seed is returned so it can be reported for
/// reproducibility.
fn seeded_rng(maybe_seed: Option<u64>) -> (u64, Xoshiro256StarStar) {
    let seed = maybe_seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0)
    });
    (seed, Xoshiro256StarStar::seed_from_u64(seed))
}

/// Expand die specs into the dice of one game. `copies` replicates a single
/// spec; it can't be combined with an explicit list of several specs.
fn dice_from_specs(specs: &[DieSpec], copies: Option<usize>) -> Result<Vec<DieSpec>, String> {
    if specs.is_empty() {
        return Err("expected at least one die spec".to_string());
    }

    match copies {
        None => Ok(specs.to_vec()),
        Some(0) => Err("--copies must be >= 1".to_string()),
        Some(copies) => {
            if specs.len() != 1 {
                return Err(format!(
                    "--copies takes exactly one die spec, got: {}",
                    specs.len()
                ));
            }
            Ok(vec![specs[0].clone(); copies])
        }
    }
}

fn row_from_cells(cells: impl Iterator<Item = String>) -> Row {
    let mut row = Row::new();
    for cell in cells {
        row.add_cell(cell);
    }
    row
}

/// A tabular format string with one right-aligned key column and `n`
/// left-aligned value columns.
fn table_format(ncols: usize) -> String {
    let mut fmt = "{:>}".to_string();
    for _ in 0..ncols {
        fmt.push_str("  {:<}");
    }
    fmt
}

///////////////////
// Command trait //
///////////////////

pub trait Command: Sized {
    const USAGE: &'static str;

    type Output: fmt::Display;

    fn try_from_cli_args(args: Args) -> Result<Self, String>;
    fn run(self) -> Result<Self::Output, String>;
}

/////////////////
// RollCommand //
/////////////////

#[derive(Clone, Debug)]
pub struct RollCommand {
    nrolls: usize,
    seed: Option<u64>,
    spec: DieSpec,
}

impl RollCommand {
    pub fn try_from_str_args(
        nrolls: Option<&str>,
        seed: Option<&str>,
        spec: &str,
    ) -> Result<Self, String> {
        Ok(Self {
            nrolls: parse_opt("rolls", nrolls)?.unwrap_or(1),
            seed: parse_opt("seed", seed)?,
            spec: parse_req("die spec", spec)?,
        })
    }
}

impl Command for RollCommand {
    const USAGE: &'static str = "\
mcdice roll - roll a single weighted die

USAGE:
    mcdice roll [option ...] <die-spec>

EXAMPLES:
    mcdice roll [1,2,3,4,5,6]
    mcdice roll -n 10 --seed 42 [H:1,T:2]

OPTIONS:
    · --rolls / -n count (default: 1)
      How many times to roll the die.

    · --seed s
      Seed for the random number generator. Defaults to system-time nanos;
      the seed used is always reported, so any run can be replayed.
";

    type Output = RollCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let nrolls = args.opt_value(["-n", "--rolls"])?;
        let seed = args.opt_value("--seed")?;
        let spec = args.free_value()?;
        args.expect_finished()?;

        Self::try_from_str_args(nrolls.as_deref(), seed.as_deref(), &spec)
    }

    fn run(self) -> Result<Self::Output, String> {
        let (seed, mut rng) = seeded_rng(self.seed);
        let die = self.spec.to_die().map_err(|err| err.to_string())?;

        let start_time = Instant::now();
        let outcomes = die.roll(self.nrolls, &mut rng).map_err(|err| err.to_string())?;
        let roll_duration = start_time.elapsed();

        let mut metrics = Metrics::new();
        metrics.push("rolls", self.nrolls.to_string());
        metrics.push("seed", seed.to_string());
        metrics.push("roll duration", format!("{roll_duration:.2?}"));

        Ok(RollCommandOutput {
            snapshot: die.snapshot(),
            outcomes,
            metrics,
        })
    }
}

pub struct RollCommandOutput {
    snapshot: Vec<(String, f64)>,
    outcomes: Vec<String>,
    metrics: Metrics,
}

impl fmt::Display for RollCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut die_table = Table::new("{:>}  {:<}").with_row(row!("face", "weight"));
        for (face, weight) in &self.snapshot {
            die_table.add_row(row!(face, weight));
        }

        let outcomes = self.outcomes.iter().join(" ");

        write!(
            f,
            "\n{}\noutcomes: {}\n\n{}",
            die_table,
            outcomes,
            self.metrics.to_table()
        )
    }
}

/////////////////
// PlayCommand //
/////////////////

#[derive(Clone, Debug)]
pub struct PlayCommand {
    trials: usize,
    seed: Option<u64>,
    layout: Layout,
    specs: Vec<DieSpec>,
}

impl PlayCommand {
    pub fn try_from_str_args(
        trials: Option<&str>,
        seed: Option<&str>,
        layout: Option<&str>,
        copies: Option<&str>,
        specs: &[&str],
    ) -> Result<Self, String> {
        let specs = specs
            .iter()
            .map(|s| parse_req("die spec", s))
            .collect::<Result<Vec<DieSpec>, String>>()?;

        Ok(Self {
            trials: parse_opt("trials", trials)?.unwrap_or(DEFAULT_NUM_TRIALS),
            seed: parse_opt("seed", seed)?,
            layout: parse_opt("layout", layout)?.unwrap_or_default(),
            specs: dice_from_specs(&specs, parse_opt("copies", copies)?)?,
        })
    }

    /// Build the game, play it, and hand back the played game plus the seed
    /// actually used. Shared with [`AnalyzeCommand`].
    fn play_game(
        specs: &[DieSpec],
        trials: usize,
        maybe_seed: Option<u64>,
    ) -> Result<(u64, Game<String>), String> {
        let dice = specs
            .iter()
            .map(|spec| spec.to_die())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;

        let (seed, mut rng) = seeded_rng(maybe_seed);

        let mut game = Game::new(dice).map_err(|err| err.to_string())?;
        game.play(trials, &mut rng).map_err(|err| err.to_string())?;

        Ok((seed, game))
    }
}

impl Command for PlayCommand {
    const USAGE: &'static str = "\
mcdice play - roll a collection of dice together and print the result table

USAGE:
    mcdice play [option ...] <die-spec> [<die-spec> ...]

EXAMPLES:
    mcdice play -n 20 [1,2,3,4,5,6] [1,2,3,4,5,6]
    mcdice play -n 100 -k 3 --seed 42 [1,2,3,4,5,6]
    mcdice play -l narrow [H:1,T:2] [H:1,T:2]

OPTIONS:
    · --trials / -n count (default: 100)
      How many trials to run. Each trial rolls every die once.

    · --layout / -l wide|narrow (default: wide)
      wide prints one row per trial with one column per die; narrow prints
      one (trial, die, face) row per cell.

    · --copies / -k count
      Replicate a single die spec this many times. Takes exactly one spec.

    · --seed s
      Seed for the random number generator. Defaults to system-time nanos.
";

    type Output = PlayCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let trials = args.opt_value(["-n", "--trials"])?;
        let seed = args.opt_value("--seed")?;
        let layout = args.opt_value(["-l", "--layout"])?;
        let copies = args.opt_value(["-k", "--copies"])?;
        let specs = args.free_values()?;

        let specs = specs.iter().map(String::as_str).collect::<Vec<_>>();
        Self::try_from_str_args(
            trials.as_deref(),
            seed.as_deref(),
            layout.as_deref(),
            copies.as_deref(),
            &specs,
        )
    }

    fn run(self) -> Result<Self::Output, String> {
        let start_time = Instant::now();
        let (seed, game) = Self::play_game(&self.specs, self.trials, self.seed)?;
        let play_duration = start_time.elapsed();

        let results = game
            .latest_results(self.layout)
            .map_err(|err| err.to_string())?;

        let mut metrics = Metrics::new();
        metrics.push("trials", self.trials.to_string());
        metrics.push("dice", game.dice().len().to_string());
        metrics.push("layout", self.layout.to_string());
        metrics.push("seed", seed.to_string());
        metrics.push("play duration", format!("{play_duration:.2?}"));

        Ok(PlayCommandOutput { results, metrics })
    }
}

pub struct PlayCommandOutput {
    results: Results<String>,
    metrics: Metrics,
}

impl fmt::Display for PlayCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = match &self.results {
            Results::Wide(table) => {
                let ndice = table.num_dice();
                let mut out = Table::new(&table_format(ndice));
                out.add_row(row_from_cells(
                    std::iter::once("trial".to_string())
                        .chain((0..ndice).map(|die| format!("die {die}"))),
                ));
                for trial in 0..table.num_trials() {
                    out.add_row(row_from_cells(
                        std::iter::once(trial.to_string()).chain(table.trial(trial).into_iter()),
                    ));
                }
                out
            }
            Results::Narrow(rows) => {
                let mut out =
                    Table::new("{:>}  {:>}  {:<}").with_row(row!("trial", "die", "face"));
                for (trial, die, face) in rows {
                    out.add_row(row!(trial, die, face));
                }
                out
            }
        };

        write!(f, "\n{}\n{}", table, self.metrics.to_table())
    }
}

////////////////////
// AnalyzeCommand //
////////////////////

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeCommand {
    trials: usize,
    seed: Option<u64>,
    specs: Vec<DieSpec>,
}

impl AnalyzeCommand {
    pub fn try_from_str_args(
        trials: Option<&str>,
        seed: Option<&str>,
        copies: Option<&str>,
        specs: &[&str],
    ) -> Result<Self, String> {
        let specs = specs
            .iter()
            .map(|s| parse_req("die spec", s))
            .collect::<Result<Vec<DieSpec>, String>>()?;

        Ok(Self {
            trials: parse_opt("trials", trials)?.unwrap_or(DEFAULT_NUM_TRIALS),
            seed: parse_opt("seed", seed)?,
            specs: dice_from_specs(&specs, parse_opt("copies", copies)?)?,
        })
    }
}

impl Command for AnalyzeCommand {
    const USAGE: &'static str = "\
mcdice analyze - play a game and print descriptive statistics of the results

USAGE:
    mcdice analyze [option ...] <die-spec> [<die-spec> ...]

Prints the jackpot count (trials where every die shows the same face), the
per-trial face frequency table, and the combination / permutation tallies.

EXAMPLES:
    mcdice analyze -n 100 -k 3 [1,2,3,4,5,6]
    mcdice analyze -n 1000 --seed 42 [H:1,T:2] [H:1,T:2]

OPTIONS:
    · --trials / -n count (default: 100)
      How many trials to run. Each trial rolls every die once.

    · --copies / -k count
      Replicate a single die spec this many times. Takes exactly one spec.

    · --seed s
      Seed for the random number generator. Defaults to system-time nanos.
";

    type Output = AnalyzeCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let trials = args.opt_value(["-n", "--trials"])?;
        let seed = args.opt_value("--seed")?;
        let copies = args.opt_value(["-k", "--copies"])?;
        let specs = args.free_values()?;

        let specs = specs.iter().map(String::as_str).collect::<Vec<_>>();
        Self::try_from_str_args(trials.as_deref(), seed.as_deref(), copies.as_deref(), &specs)
    }

    fn run(self) -> Result<Self::Output, String> {
        let start_time = Instant::now();
        let (seed, game) = PlayCommand::play_game(&self.specs, self.trials, self.seed)?;

        let analyzer = Analyzer::new(&game).map_err(|err| err.to_string())?;
        let jackpots = analyzer.jackpot_count();
        let face_counts = analyzer.face_counts_per_trial();
        let combinations = analyzer.combination_counts();
        let permutations = analyzer.permutation_counts();
        let analyze_duration = start_time.elapsed();

        let mut metrics = Metrics::new();
        metrics.push("trials", self.trials.to_string());
        metrics.push("dice", game.dice().len().to_string());
        metrics.push("seed", seed.to_string());
        metrics.push("jackpots", jackpots.to_string());
        metrics.push(
            "distinct combinations",
            combinations.len().to_string(),
        );
        metrics.push(
            "distinct permutations",
            permutations.len().to_string(),
        );
        metrics.push("analyze duration", format!("{analyze_duration:.2?}"));

        Ok(AnalyzeCommandOutput {
            face_counts,
            combinations,
            permutations,
            metrics,
        })
    }
}

pub struct AnalyzeCommandOutput {
    pub(crate) face_counts: FaceCounts<String>,
    pub(crate) combinations: Vec<(Vec<String>, usize)>,
    pub(crate) permutations: Vec<(Vec<String>, usize)>,
    pub(crate) metrics: Metrics,
}

impl AnalyzeCommandOutput {
    fn tally_table(heading: &str, tallies: &[(Vec<String>, usize)]) -> Table {
        let mut table = Table::new("{:>}  {:<}").with_row(row!(heading, "count"));
        for (tuple, count) in tallies {
            table.add_row(row!(tuple.iter().join(" "), count));
        }
        table
    }
}

impl fmt::Display for AnalyzeCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let faces = self.face_counts.faces();
        let mut face_table = Table::new(&table_format(faces.len()));
        face_table.add_row(row_from_cells(
            std::iter::once("trial".to_string()).chain(faces.iter().cloned()),
        ));
        for trial in 0..self.face_counts.num_trials() {
            face_table.add_row(row_from_cells(
                std::iter::once(trial.to_string()).chain(
                    self.face_counts
                        .trial(trial)
                        .into_iter()
                        .map(|count| count.to_string()),
                ),
            ));
        }

        write!(
            f,
            "\nface counts per trial:\n{}\n{}\n{}\n{}",
            face_table,
            Self::tally_table("combination", &self.combinations),
            Self::tally_table("permutation", &self.permutations),
            self.metrics.to_table(),
        )
    }
}

/////////////////
// BaseCommand //
/////////////////

#[derive(Debug)]
pub enum BaseCommand {
    Roll(RollCommand),
    Play(PlayCommand),
    Analyze(AnalyzeCommand),
}

impl Command for BaseCommand {
    const USAGE: &'static str = "\
mcdice - A Monte Carlo simulator for weighted, labeled dice!

USAGE:
    mcdice [option ...] <subcommand>

SUBCOMMANDS:
    · mcdice roll - roll a single weighted die
    · mcdice play - roll a collection of dice together and print the results
    · mcdice analyze - play a game and print descriptive statistics

A die spec is a bracketed list of unique faces with optional weights,
e.g. [1,2,3,4,5,6] or [H:1,T:2]. Weights default to 1.
";

    type Output = String;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        let maybe_subcommand = args.subcommand()?;

        match maybe_subcommand.as_deref() {
            Some("roll") => Ok(Self::Roll(RollCommand::try_from_cli_args(args)?)),
            Some("play") => Ok(Self::Play(PlayCommand::try_from_cli_args(args)?)),
            Some("analyze") => Ok(Self::Analyze(AnalyzeCommand::try_from_cli_args(args)?)),
            Some(command) => Err(format!("'{command}' is not a recognized command")),
            None => {
                args.maybe_help(Self::USAGE);
                Err("no subcommand specified".to_string())
            }
        }
    }

    fn run(self) -> Result<String, String> {
        match self {
            Self::Roll(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Play(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Analyze(cmd) => cmd.run().map(|out| out.to_string()),
        }
    }
}

///////////
// Tests //
///////////
