//! Per-run directory naming
//!
//! Level 4 - pure string formatting
//!
//! `spec.md` §6: `"<binary-basename>_<MIN_SAMPLES>_<TIME_COEFF>_<start_epoch_seconds>"`,
//! restored verbatim from `Legion.py`'s `DIR_NAME` global.

/// The name of the per-run directory under `tests/` and/or `inputs/`.
pub fn run_dir_name(binary_name: &str, min_samples: usize, time_coeff: f64, start_epoch_secs: u64) -> String {
    format!("{}_{}_{}_{}", binary_name, min_samples, time_coeff, start_epoch_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fields_in_order() {
        let name = run_dir_name("target.instr", 5, 0.0, 1_700_000_000);
        assert_eq!(name, "target.instr_5_0_1700000000");
    }
}
