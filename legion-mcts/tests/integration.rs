//! End-to-end runs of the orchestrator against a scripted fake target and
//! the in-process `ReferenceEngine`, standing in for a real instrumented
//! binary and a real symbolic executor respectively.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use legion_core::{RunConfig, RunState};
use legion_mcts::{ArtefactSink, LegionError, NullSink, Orchestrator};
use legion_runner::ExecutionOutcome;
use legion_symex::{Branch, Cfg, ReferenceEngine};

/// A scripted target, written out as an executable shell script, deleted on
/// drop. Every script must write its trace (little-endian 8-byte
/// addresses) to stderr and may exit however it likes.
struct ScriptedTarget {
    path: PathBuf,
}

impl ScriptedTarget {
    fn new(name: &str, body: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "legion-mcts-test-{}-{}",
            name,
            std::process::id()
        ));
        fs::write(&path, body).expect("write scripted target");
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptedTarget {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Little-endian 8-byte `printf` escape sequence for one address.
fn trace_byte_literal(addr: i64) -> String {
    addr.to_le_bytes()
        .iter()
        .map(|b| format!("\\x{:02x}", b))
        .collect()
}

#[derive(Default)]
struct RecordingSink {
    recorded: Vec<Vec<u8>>,
}

impl ArtefactSink for RecordingSink {
    fn record(&mut self, input: &Vec<u8>, _outcome: &ExecutionOutcome) -> anyhow::Result<()> {
        self.recorded.push(input.clone());
        Ok(())
    }
}

#[test]
fn round_budget_terminates_a_never_diverging_target() {
    // The target always reports the same single basic block and exits
    // cleanly; the reference engine has no edges from that address either,
    // so every round resamples the same unconstrained Gold node forever
    // unless something bounds it. `max_rounds` must be the thing that does.
    let script = ScriptedTarget::new(
        "flat",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' >&2\nexit 0\n",
            trace_byte_literal(0x1000)
        ),
    );

    let engine = ReferenceEngine::new(Cfg::new(0x1000));
    let orchestrator = Orchestrator::new(&engine, script.path());

    let mut config = RunConfig::for_tests();
    config.max_rounds = Some(3);
    let mut state = RunState::with_seed(42);
    let mut sink = RecordingSink::default();

    let tree = orchestrator
        .run(&config, &mut state, Vec::new(), &mut sink)
        .expect("run should complete within its round budget");

    assert_eq!(state.round, 3);
    assert!(!legion_mcts::has_budget(&tree, &config, &state));
}

#[test]
fn bug_discovery_stops_the_run_without_exhausting_round_budget() {
    // The target unconditionally signals the configured bug return code;
    // `has_budget` must see `bug_found` and stop before `max_rounds` is hit.
    let script = ScriptedTarget::new(
        "buggy",
        &format!(
            "#!/bin/sh\ncat >/dev/null\nprintf '{}' >&2\nexit 100\n",
            trace_byte_literal(0x1000)
        ),
    );

    let engine = ReferenceEngine::new(Cfg::new(0x1000));
    let orchestrator = Orchestrator::new(&engine, script.path());

    let mut config = RunConfig::for_tests();
    config.max_rounds = Some(1000);
    let mut state = RunState::with_seed(7);
    let mut sink = NullSink;

    orchestrator
        .run(&config, &mut state, Vec::new(), &mut sink)
        .expect("run should complete");

    assert!(state.bug_found);
    assert!(state.round < 1000);
}

#[test]
fn inconsistent_entry_addresses_are_rejected() {
    // Two seeds whose traces disagree on the very first address violate the
    // "all traces start at main" assumption initialisation depends on.
    let script = ScriptedTarget::new(
        "inconsistent",
        "#!/bin/sh\nfirst=$(head -c1)\nif [ \"$first\" = \"a\" ]; then\n  printf '\\x00\\x10\\x00\\x00\\x00\\x00\\x00\\x00' >&2\nelse\n  printf '\\x00\\x20\\x00\\x00\\x00\\x00\\x00\\x00' >&2\nfi\nexit 0\n",
    );

    let engine = ReferenceEngine::new(Cfg::new(0x1000).guarded(
        0x1000,
        0x1100,
        Branch { byte_index: 0, bit: 0, value: true },
    ));
    let orchestrator = Orchestrator::new(&engine, script.path());

    let config = RunConfig::for_tests();
    let mut state = RunState::with_seed(1);
    let mut sink = NullSink;

    let seeds = vec![b"aaaa".to_vec(), b"bbbb".to_vec()];
    let err = orchestrator
        .run(&config, &mut state, seeds, &mut sink)
        .expect_err("disagreeing entry addresses must be rejected");

    assert!(matches!(err, LegionError::InconsistentEntry));
}
