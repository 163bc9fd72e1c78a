pub(crate) mod dates;
pub mod extract;
pub mod fingerprint;
pub mod format;
pub mod infer;
pub mod line;
pub mod session;

pub use extract::{extract_candidates, extract_for_commit, Extraction};
pub use fingerprint::{duplicate_hash, HASH_LEN};
pub use format::{AmountType, FormatConfig};
pub use infer::{FormatInferrer, HeuristicInferrer, InferError};
pub use line::split_line;
pub use session::{ImportError, ImportOutcome, ImportSession, Importer, SessionState};

pub mod ingest {
    use crate::*;
    use std::collections::HashSet;

    /// Proposes a parsing format from the leading lines of a statement.
    pub fn infer_format(sample: &str) -> FormatConfig {
        crate::infer::infer_heuristic(sample)
    }

    pub fn extract_candidates(
        bytes: &[u8],
        format: &FormatConfig,
        existing_hashes: &HashSet<String>,
    ) -> Extraction {
        crate::extract::extract_candidates(bytes, format, existing_hashes)
    }

    pub fn extract_for_commit(
        bytes: &[u8],
        format: &FormatConfig,
        existing_hashes: &HashSet<String>,
        skip_duplicates: bool,
    ) -> Extraction {
        crate::extract::extract_for_commit(bytes, format, existing_hashes, skip_duplicates)
    }

    pub fn compute_hash(
        date: chrono::NaiveDate,
        amount_cents: i64,
        description: &str,
    ) -> String {
        crate::fingerprint::duplicate_hash(date, amount_cents, description)
    }
}
