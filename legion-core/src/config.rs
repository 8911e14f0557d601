//! Run configuration and mutable run state
//!
//! Level 4 - Configuration
//!
//! The original tool kept its hyper-parameters and counters as module-level
//! globals (`MIN_SAMPLES`, `FOUND_BUG`, `SOLVING_COUNT`, ...). Here they are
//! split into an immutable `RunConfig` built once from CLI flags and a small
//! mutable `RunState` that is threaded explicitly through the orchestrator -
//! no hidden globals, no `static`.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default minimum number of samples drawn per selected node.
pub const DEFAULT_MIN_SAMPLES: usize = 5;
/// Default maximum number of samples drawn per selected node.
pub const DEFAULT_MAX_SAMPLES: usize = 100;
/// Default penalty coefficient applied to slow constraint solving.
pub const DEFAULT_TIME_COEFF: f64 = 0.0;
/// Default byte length of a purely-random (uninformed) sample.
pub const DEFAULT_MAX_BYTES: usize = 100;
/// Default process return code that signals a discovered bug.
pub const DEFAULT_BUG_RETURN_CODE: i32 = 100;
/// Per-execution timeout: 30 hours, matching the original's "effectively
/// never" safety net.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30 * 60 * 60);

/// Hyper-parameters and budgets for one run, built once from CLI flags (or
/// test fixtures) and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Minimum samples to gather per selected Gold node before stopping.
    pub min_samples: usize,
    /// Maximum samples to gather per selected Gold node.
    pub max_samples: usize,
    /// Penalty coefficient for slow constraint solving (`TIME_COEFF`).
    pub time_coeff: f64,
    /// Byte length of a random (uninformed) sample.
    pub max_bytes: usize,
    /// Exit code that signals a discovered bug.
    pub bug_return_code: i32,
    /// Keep fuzzing after a bug is found instead of stopping.
    pub coverage_only: bool,
    /// Stop once `root.sim_win` reaches this many new paths.
    pub max_paths: Option<u64>,
    /// Stop once this many MCTS rounds have run.
    pub max_rounds: Option<u64>,
    /// Per-target-execution timeout.
    pub exec_timeout: Duration,
    /// Persist raw byte inputs for every new path.
    pub save_inputs: bool,
    /// Persist TEST-COMP XML test cases for every new path.
    pub save_tests: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            max_samples: DEFAULT_MAX_SAMPLES,
            time_coeff: DEFAULT_TIME_COEFF,
            max_bytes: DEFAULT_MAX_BYTES,
            bug_return_code: DEFAULT_BUG_RETURN_CODE,
            coverage_only: false,
            max_paths: None,
            max_rounds: None,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
            save_inputs: false,
            save_tests: false,
        }
    }
}

impl RunConfig {
    /// Build a config for CPU-bound, deterministic tests: tiny budgets, no
    /// artefact persistence.
    pub fn for_tests() -> Self {
        Self {
            min_samples: 2,
            max_samples: 8,
            max_bytes: 16,
            exec_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }
}

/// Mutable counters and the shared RNG, threaded explicitly through every
/// orchestrator call - the Rust analogue of the original's
/// `CUR_ROUND` / `FOUND_BUG` / `SOLVING_COUNT` globals.
pub struct RunState {
    /// Number of MCTS rounds completed so far.
    pub round: u64,
    /// Whether a bug return code has been observed this run.
    pub bug_found: bool,
    /// Number of times a constraint-guided sampling call has been made;
    /// used to name persisted test artefacts.
    pub solving_count: u64,
    /// Shared randomness source for tie-breaks and uninformed sampling.
    pub rng: ChaCha8Rng,
}

impl RunState {
    /// Start a fresh run state seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            round: 0,
            bug_found: false,
            solving_count: 0,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Start a fresh run state with a fixed seed, for reproducible tests
    /// and the CLI's optional `--seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            round: 0,
            bug_found: false,
            solving_count: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
