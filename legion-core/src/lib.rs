//! Legion Core - shared types and run configuration
//!
//! This crate provides the vocabulary shared by every other Legion crate:
//! - Address / trace / byte-input types
//! - The immutable run configuration (`RunConfig`) and mutable run state
//!   (`RunState`) that replace the original tool's global variables
//!
//! ## Architecture
//! - Level 4: plain data, no behaviour beyond simple accessors

pub mod config;

pub use config::{RunConfig, RunState};

/// A basic-block address as emitted by the instrumented target.
///
/// The pre-initialisation root uses the sentinel value `-1`; every other
/// address is a real `main`-relative or absolute code address reported by
/// the target's trace stream.
pub type Address = i64;

/// The sentinel address of the tree root before the first round runs.
pub const ROOT_SENTINEL_ADDR: Address = -1;

/// A single execution trace: the sequence of basic-block addresses emitted
/// on stderr by one run of the target binary, in order, starting at `main`.
pub type Trace = Vec<Address>;

/// A concrete input fed to the target's standard input.
pub type ByteInput = Vec<u8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_sentinel_is_negative_one() {
        assert_eq!(ROOT_SENTINEL_ADDR, -1);
    }
}
