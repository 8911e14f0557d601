//! Legion Sink - the test-artefact persistence boundary
//!
//! Implements `legion_mcts::ArtefactSink` (component G, `spec.md` §4.G/§6):
//! for every execution that contributed a new path, optionally write the raw
//! byte input under `inputs/<run-dir>/` and/or a TEST-COMP XML testcase under
//! `tests/<run-dir>/`, plus a once-per-run `metadata.xml` sibling.
//!
//! ## Architecture
//! - Level 2: [`FileSink`] - the concrete `ArtefactSink`
//! - Level 4: [`naming`], [`xml`], [`SinkError`], [`sha256_hex`]

mod error;
mod naming;
mod xml;

pub use error::SinkError;
pub use naming::run_dir_name;
pub use xml::Metadata;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::debug;

use legion_core::ByteInput;
use legion_mcts::ArtefactSink;
use legion_runner::ExecutionOutcome;

/// Persists new-path artefacts to disk under a run-specific directory name.
///
/// Mirrors `Legion.py`'s `save_news_to_file` / `save_tests_to_file` /
/// `save_input_to_file`: every `record` call is for one execution that
/// already contributed a new path (the orchestrator filters non-new
/// executions before calling in), and the call itself never fails the run -
/// persistence errors are logged and returned to the caller to decide what
/// to do with, not panicked on.
pub struct FileSink {
    tests_dir: Option<PathBuf>,
    inputs_dir: Option<PathBuf>,
    /// Monotonic per-record counter, standing in for the original's global
    /// `SOLVING_COUNT` (there, the number of constraint-solving calls made
    /// so far) as a cheap within-run disambiguator for the file name.
    counter: u64,
}

impl FileSink {
    /// Create directories for the artefact kinds requested. `run_dir` is the
    /// value of [`run_dir_name`]; `root` is the directory `tests/`/`inputs/`
    /// are created under (the current working directory in the CLI).
    pub fn new(root: &Path, run_dir: &str, save_inputs: bool, save_tests: bool) -> Result<Self, SinkError> {
        let tests_dir = if save_tests {
            let dir = root.join("tests").join(run_dir);
            create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };
        let inputs_dir = if save_inputs {
            let dir = root.join("inputs").join(run_dir);
            create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };
        Ok(Self { tests_dir, inputs_dir, counter: 0 })
    }

    /// Write the once-per-run `tests/<run-dir>/metadata.xml` sibling file.
    /// No-op unless `--save-tests` created a tests directory.
    pub fn write_metadata(&self, fields: &Metadata<'_>) -> Result<(), SinkError> {
        let Some(dir) = &self.tests_dir else { return Ok(()) };
        let path = dir.join("metadata.xml");
        fs::write(&path, xml::metadata_xml(fields)).map_err(|source| SinkError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ArtefactSink for FileSink {
    fn record(&mut self, input: &ByteInput, outcome: &ExecutionOutcome) -> anyhow::Result<()> {
        let timestamp = now_epoch_secs();
        let counter = self.counter;
        self.counter += 1;

        if let Some(dir) = &self.inputs_dir {
            let path = dir.join(format!("{}_{}", timestamp, counter));
            fs::write(&path, input).map_err(|source| SinkError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }

        if let Some(dir) = &self.tests_dir {
            let path = dir.join(format!("{}_{}.xml", timestamp, counter));
            let stdout = String::from_utf8(outcome.stdout.clone()).map_err(SinkError::NonUtf8Stdout)?;
            fs::write(&path, xml::testcase_xml(&stdout)).map_err(|source| SinkError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }

        debug!(timestamp, counter, "recorded new-path artefact");
        Ok(())
    }
}

fn create_dir_all(path: &Path) -> Result<(), SinkError> {
    fs::create_dir_all(path).map_err(|source| SinkError::CreateDir {
        path: path.display().to_string(),
        source,
    })
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Lowercase hex SHA-256 digest of a file's bytes, `sha256sum`-equivalent -
/// `Legion.py` shells out to `sha256sum`; here the `sha2` crate computes the
/// same digest in-process.
pub fn sha256_hex(path: &Path) -> Result<String, SinkError> {
    let bytes = fs::read(path).map_err(|source| SinkError::Hash {
        path: path.display().to_string(),
        source,
    })?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
