//! Legion CLI - command-line front end
//!
//! Out of the core's scope per `spec.md` §1 (the command-line front-end is
//! named there as an external collaborator), but wired end-to-end here: it
//! parses flags, optionally compiles a C source, picks an artefact sink, and
//! drives `legion_mcts::Orchestrator` to completion - the same shape as the
//! teacher's `hexwar-cli` wiring `hexwar-core`/`hexwar-mcts`/`hexwar-server`
//! behind `clap` subcommands.
//!
//! Exit codes, per `spec.md` §6: 0 on clean termination (with or without a
//! bug found), 2 on internal/timeout failure.

mod cli;
mod compile;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use legion_core::{RunConfig, RunState};
use legion_mcts::{ArtefactSink, NullSink, Orchestrator};
use legion_sink::{run_dir_name, sha256_hex, FileSink, Metadata};
use legion_symex::{Cfg, ReferenceEngine};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!(%err, "legion run failed");
            std::process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let start_epoch_secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let source_is_c = compile::is_source(&cli.file);
    let binary = if source_is_c {
        compile::compile(&cli.file, cli.compile, cli.output.as_deref(), &cli.cc)?
    } else {
        cli.file.clone()
    };

    let binary_name = binary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.display().to_string());
    let run_dir = run_dir_name(&binary_name, cli.min_samples, cli.time_coeff, start_epoch_secs);

    let cwd = std::env::current_dir()?;
    let mut sink: Box<dyn ArtefactSink> = if cli.save_inputs || cli.save_tests {
        let file_sink = FileSink::new(&cwd, &run_dir, cli.save_inputs, cli.save_tests)?;
        if source_is_c && cli.save_tests {
            let hash = sha256_hex(&cli.file)?;
            let creationtime = chrono::Local::now().to_rfc3339();
            file_sink.write_metadata(&Metadata {
                programfile: &cli.file.display().to_string(),
                programhash: &hash,
                creationtime: &creationtime,
            })?;
        }
        Box::new(file_sink)
    } else {
        Box::new(NullSink)
    };

    let config = RunConfig {
        min_samples: cli.min_samples,
        max_samples: cli.max_samples,
        time_coeff: cli.time_coeff,
        max_bytes: cli.max_bytes,
        bug_return_code: cli.bug_return_code,
        coverage_only: cli.coverage_only,
        max_paths: cli.max_paths,
        max_rounds: cli.max_rounds,
        save_inputs: cli.save_inputs,
        save_tests: cli.save_tests,
        ..RunConfig::default()
    };
    let mut state = match cli.seed {
        Some(seed) => RunState::with_seed(seed),
        None => RunState::new(),
    };

    let seeds = cli.seeds.iter().map(|s| s.as_bytes().to_vec()).collect();

    // Placeholder in-process SymEngine: a real deployment swaps this for an
    // adapter bridging a genuine symbolic executor (e.g. angr), which is
    // explicitly out of scope per `spec.md` §1. With an empty control-flow
    // graph, `step` finds no successors from any real address, so newly
    // discovered nodes go straight to `fully_explored` instead of being
    // coloured Red/Black - the orchestrator still runs a fully functional
    // concrete-trace-driven search with uninformed random sampling, exactly
    // as `spec.md` §4.E specifies for a Gold node with no constraints.
    let engine = ReferenceEngine::new(Cfg::new(legion_symex::ENTRY_PLACEHOLDER_ADDR));

    info!(binary = %binary.display(), ?run_dir, "starting run");
    let orchestrator = Orchestrator::new(&engine, Path::new(&binary));
    let tree = orchestrator.run(&config, &mut state, seeds, sink.as_mut())?;

    info!(
        rounds = state.round,
        bug_found = state.bug_found,
        paths = tree.get(tree.root()).sim_win,
        "run complete"
    );
    Ok(())
}
