//! Command-line surface
//!
//! Level 2 - argument parsing
//!
//! Shaped exactly as `spec.md` §6 and `Legion.py`'s `argparse` setup:
//! `file` and `seeds` positionals, plus every named flag the original
//! exposes. Defaults match `legion_core::config`'s `DEFAULT_*` constants so
//! the CLI and the library never disagree about a default value.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use legion_core::config::{
    DEFAULT_BUG_RETURN_CODE, DEFAULT_MAX_BYTES, DEFAULT_MAX_SAMPLES, DEFAULT_MIN_SAMPLES,
    DEFAULT_TIME_COEFF,
};

/// How a C source file is turned into an instrumented binary before fuzzing.
///
/// Restored from `Legion.py`'s `--compile` argument (`make` / `svcomp` /
/// `trace-cc`), out of the core's scope per `spec.md` §1 but wired to real
/// `Command` invocations here rather than left a stub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum CompileMode {
    /// `make -B <stem>.instr`.
    Make,
    /// Two-stage assembly instrumentation via `tracejump.py`.
    Svcomp,
    /// Single invocation of the `trace-cc` wrapper compiler.
    TraceCc,
}

#[derive(Parser, Debug)]
#[command(name = "legion", about = "Coverage-driven, MCTS-controlled concolic fuzzer")]
pub struct Cli {
    /// Minimum number of samples drawn per selected node.
    #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: usize,

    /// Maximum number of samples drawn per selected node.
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,

    /// Penalty coefficient applied to slow constraint solving.
    #[arg(long = "time-penalty", default_value_t = DEFAULT_TIME_COEFF)]
    pub time_coeff: f64,

    /// Keep fuzzing after a bug is found, instead of stopping.
    #[arg(long)]
    pub coverage_only: bool,

    /// Persist raw byte inputs for every new path under `inputs/`.
    #[arg(long)]
    pub save_inputs: bool,

    /// Persist TEST-COMP XML testcases for every new path under `tests/`.
    #[arg(long)]
    pub save_tests: bool,

    /// Increase output verbosity to debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output binary location, when `file` is a C source.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// C compiler to use together with `--compile svcomp`.
    #[arg(long, default_value = "cc")]
    pub cc: String,

    /// How to compile a C source `file` into an instrumented binary.
    #[arg(long, value_enum, default_value_t = CompileMode::Make)]
    pub compile: CompileMode,

    /// Exit code that signals a discovered bug.
    #[arg(long, default_value_t = DEFAULT_BUG_RETURN_CODE)]
    pub bug_return_code: i32,

    /// Byte length of an uninformed (purely random) sample.
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: usize,

    /// Stop once this many new paths have been found.
    #[arg(long)]
    pub max_paths: Option<u64>,

    /// Stop once this many MCTS rounds have run.
    #[arg(long)]
    pub max_rounds: Option<u64>,

    /// Fix the run's RNG seed, for reproducible tie-breaks and sampling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Binary or C source file (`.c`/`.i` is recognized as source).
    pub file: PathBuf,

    /// Optional input seeds, each encoded as a UTF-8 byte string.
    pub seeds: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_spec_values() {
        let cli = Cli::parse_from(["legion", "target.instr"]);
        assert_eq!(cli.min_samples, DEFAULT_MIN_SAMPLES);
        assert_eq!(cli.max_samples, DEFAULT_MAX_SAMPLES);
        assert_eq!(cli.time_coeff, DEFAULT_TIME_COEFF);
        assert_eq!(cli.bug_return_code, DEFAULT_BUG_RETURN_CODE);
        assert_eq!(cli.cc, "cc");
        assert!(matches!(cli.compile, CompileMode::Make));
        assert!(!cli.coverage_only);
        assert!(cli.seeds.is_empty());
    }

    #[test]
    fn seeds_are_collected_as_trailing_positionals() {
        let cli = Cli::parse_from(["legion", "target.instr", "seedA", "seedB"]);
        assert_eq!(cli.seeds, vec!["seedA".to_string(), "seedB".to_string()]);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "legion",
            "--min-samples",
            "10",
            "--max-samples",
            "50",
            "--coverage-only",
            "--compile",
            "trace-cc",
            "prog.c",
        ]);
        assert_eq!(cli.min_samples, 10);
        assert_eq!(cli.max_samples, 50);
        assert!(cli.coverage_only);
        assert!(matches!(cli.compile, CompileMode::TraceCc));
    }
}
