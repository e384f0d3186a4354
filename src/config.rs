//! Configuration from the command line, and the run context every
//! component shares.
use crate::logger::OutLvl;
use crate::vars::VarPool;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// Which algorithm drives the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// A single property-directed reachability run
    Pdr,
    /// Incremental runs over a changing constraint
    Ipdr,
    /// Bounded unrolling (pebbling only)
    Bounded,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Mode::Pdr => "pdr",
            Mode::Ipdr => "ipdr",
            Mode::Bounded => "bounded",
        };
        write!(f, "{}", s)
    }
}

/// How the incremental driver walks the constraint values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Tactic {
    /// One run at the given constraint, full reset otherwise
    Basic,
    /// Walk upward until the first trace
    Relax,
    /// Walk downward until the first invariant
    Constrain,
    /// Bisect the constraint range
    BinarySearch,
    /// A basic run, then one relaxed run ten steps up
    IncJumpTest,
    /// A basic run, then one relaxed run one step up
    IncOneTest,
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Tactic::Basic => "basic",
            Tactic::Relax => "relax",
            Tactic::Constrain => "constrain",
            Tactic::BinarySearch => "binary-search",
            Tactic::IncJumpTest => "inc-jump-test",
            Tactic::IncOneTest => "inc-one-test",
        };
        write!(f, "{}", s)
    }
}

/// Configuration built from command line options.
#[derive(Debug, Parser)]
#[command(name = "ipdr", about, version)]
pub struct Config {
    #[command(subcommand)]
    pub model: ModelArg,

    /// Algorithm to run
    #[arg(long, value_enum, default_value_t = Mode::Pdr)]
    pub mode: Mode,

    /// Constraint walk for incremental runs
    #[arg(long, value_enum, default_value_t = Tactic::Basic)]
    pub tactic: Tactic,

    /// Starting pebble bound (defaults to what the tactic dictates)
    #[arg(long)]
    pub pebbles: Option<u32>,

    /// Failed literal drops before a minimization settles
    #[arg(long, default_value_t = 3)]
    pub mic_retries: usize,

    /// One shared solver for all frames, selected by activation literals
    #[arg(long)]
    pub delta: bool,

    /// Build the pebbling transition via Tseitin conversion
    #[arg(long)]
    pub tseytin: bool,

    /// Solver seed; runs are reproducible under a fixed seed
    #[arg(long, conflicts_with = "random")]
    pub seed: Option<u64>,

    /// Draw the seed at random and report it
    #[arg(long)]
    pub random: bool,

    /// Print the model summary and exit
    #[arg(long)]
    pub show_only: bool,

    /// Repeat the run this many times and summarize the timings
    #[arg(long)]
    pub experiment: Option<u32>,

    /// Use full resets between incremental runs (control measurement)
    #[arg(long)]
    pub control: bool,

    /// No user output
    #[arg(long, conflicts_with_all = ["whisper", "verbose"])]
    pub silent: bool,

    /// Progress summaries only
    #[arg(long, conflicts_with = "verbose")]
    pub whisper: bool,

    /// Full progress output
    #[arg(long)]
    pub verbose: bool,

    /// Write user output to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Unrolling cap for bounded mode
    #[arg(long, default_value_t = 50)]
    pub max_depth: usize,
}

#[derive(Debug, Subcommand)]
pub enum ModelArg {
    /// Reversible pebbling of a DAG read from a .bench netlist
    Pebbling {
        /// Circuit file (.bench)
        file: PathBuf,
    },
    /// The Peterson mutual-exclusion protocol
    Peterson {
        /// Number of active processes
        procs: u32,
        /// Maximum process count the encoding allows for
        #[arg(long)]
        max: Option<u32>,
        /// Bound the number of context switches
        #[arg(long)]
        switches: Option<u32>,
    },
}

impl Config {
    pub fn out_lvl(&self) -> OutLvl {
        if self.silent {
            OutLvl::Silent
        } else if self.verbose {
            OutLvl::Verbose
        } else {
            OutLvl::Whisper
        }
    }

    pub fn context(&self) -> Context {
        Context::new(self.delta, self.resolve_seed(), self.mic_retries)
    }

    fn resolve_seed(&self) -> u64 {
        match (self.seed, self.random) {
            (Some(s), _) => s,
            (None, true) => rand::random(),
            (None, false) => 0,
        }
    }
}

/// What a run carries everywhere: the variable allocator, the seed, the
/// frame encoding choice and the minimization budget.
pub struct Context {
    pub vars: VarPool,
    pub seed: u64,
    pub delta: bool,
    pub mic_retries: usize,
}

impl Context {
    pub fn new(delta: bool, seed: u64, mic_retries: usize) -> Context {
        Context {
            vars: VarPool::new(),
            seed,
            delta,
            mic_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_pebbling_invocation() {
        let cfg = Config::parse_from([
            "ipdr",
            "--mode",
            "ipdr",
            "--tactic",
            "relax",
            "--delta",
            "--pebbles",
            "2",
            "pebbling",
            "circuit.bench",
        ]);
        assert_eq!(cfg.mode, Mode::Ipdr);
        assert_eq!(cfg.tactic, Tactic::Relax);
        assert!(cfg.delta);
        assert_eq!(cfg.pebbles, Some(2));
        assert!(matches!(cfg.model, ModelArg::Pebbling { .. }));
    }

    #[test]
    fn parses_a_peterson_invocation() {
        let cfg = Config::parse_from([
            "ipdr", "--silent", "peterson", "3", "--max", "5", "--switches", "4",
        ]);
        assert_eq!(cfg.out_lvl(), OutLvl::Silent);
        match cfg.model {
            ModelArg::Peterson { procs, max, switches } => {
                assert_eq!((procs, max, switches), (3, Some(5), Some(4)));
            }
            _ => panic!("wrong model"),
        }
    }

    #[test]
    fn seed_and_random_are_exclusive() {
        let r = Config::try_parse_from(["ipdr", "--seed", "1", "--random", "peterson", "2"]);
        assert!(r.is_err());
    }
}
