use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::dates;
use crate::fingerprint::duplicate_hash;
use crate::format::{AmountType, FormatConfig};
use crate::line::split_line;
use tally_core::{parse_amount, AmountError, TransactionCandidate};

/// Extraction result plus the counters an import outcome reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub candidates: Vec<TransactionCandidate>,
    /// Rows dropped because they did not parse.
    pub rows_skipped: usize,
    /// Rows omitted by the skip-duplicates policy (commit mode only).
    pub duplicates_skipped: usize,
}

#[derive(Debug, Error)]
enum RowError {
    #[error("missing column {0}")]
    MissingColumn(usize),
    #[error("unparsable date {0:?}")]
    BadDate(String),
    #[error("unparsable amount: {0}")]
    BadAmount(#[from] AmountError),
    #[error("amount out of range")]
    AmountOverflow,
}

#[derive(Clone, Copy, PartialEq)]
enum DedupMode {
    /// Preview: keep duplicates, mark them.
    Flag,
    /// Commit with skip-duplicates: omit and count them.
    Skip,
    /// Commit without skip-duplicates: keep them, unmarked.
    Keep,
}

/// Preview extraction: every parsed row becomes a candidate, and rows whose
/// hash is already stored, or already seen earlier in this same file, carry
/// `is_duplicate = true`.
pub fn extract_candidates(
    bytes: &[u8],
    format: &FormatConfig,
    existing: &HashSet<String>,
) -> Extraction {
    extract(bytes, format, existing, DedupMode::Flag)
}

/// Commit extraction: with `skip_duplicates`, hash-matching rows are omitted
/// from the output and counted instead of flagged.
pub fn extract_for_commit(
    bytes: &[u8],
    format: &FormatConfig,
    existing: &HashSet<String>,
    skip_duplicates: bool,
) -> Extraction {
    let mode = if skip_duplicates {
        DedupMode::Skip
    } else {
        DedupMode::Keep
    };
    extract(bytes, format, existing, mode)
}

fn extract(
    bytes: &[u8],
    format: &FormatConfig,
    existing: &HashSet<String>,
    mode: DedupMode,
) -> Extraction {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Extraction::default();
    // Seen hashes accumulate across the batch so two identical rows in one
    // file count as duplicates of each other, not just of stored data.
    let mut seen: HashSet<String> = HashSet::new();

    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());
    if format.has_header {
        lines.next();
    }

    for (idx, line) in lines {
        let fields = split_line(line, format.delimiter);
        let (date, description, amount_cents) = match extract_row(&fields, format) {
            Ok(row) => row,
            Err(err) => {
                out.rows_skipped += 1;
                warn!(line = idx + 1, %err, "skipping unparsable row");
                continue;
            }
        };

        let hash = duplicate_hash(date, amount_cents, &description);
        let is_duplicate = existing.contains(&hash) || seen.contains(&hash);
        seen.insert(hash.clone());

        match mode {
            DedupMode::Skip if is_duplicate => out.duplicates_skipped += 1,
            _ => out.candidates.push(TransactionCandidate {
                date,
                description,
                amount_cents,
                duplicate_hash: hash,
                is_duplicate: mode == DedupMode::Flag && is_duplicate,
            }),
        }
    }
    out
}

// One row in, one candidate's fields out. Every failure path is a value so
// the caller can log and move on; nothing here aborts the batch.
fn extract_row(
    fields: &[String],
    format: &FormatConfig,
) -> Result<(NaiveDate, String, i64), RowError> {
    let raw_date = fields
        .get(format.date_column)
        .ok_or(RowError::MissingColumn(format.date_column))?;
    let date = dates::parse_date(raw_date, &format.date_format)
        .ok_or_else(|| RowError::BadDate(raw_date.trim().to_string()))?;

    let description = fields
        .get(format.description_column)
        .ok_or(RowError::MissingColumn(format.description_column))?
        .trim()
        .to_string();

    let amount_cents = match format.amount_type {
        AmountType::Signed => {
            let column = format.amount_column.unwrap_or(0);
            let raw = fields
                .get(column)
                .ok_or(RowError::MissingColumn(column))?;
            parse_amount(raw)?
        }
        // Split columns default to zero when missing or unparsable, so a
        // credit-only row still extracts.
        AmountType::Split => cell_amount(fields, format.credit_column)
            .checked_sub(cell_amount(fields, format.debit_column))
            .ok_or(RowError::AmountOverflow)?,
    };

    Ok((date, description, amount_cents))
}

fn cell_amount(fields: &[String], column: Option<usize>) -> i64 {
    column
        .and_then(|c| fields.get(c))
        .and_then(|raw| parse_amount(raw).ok())
        .unwrap_or(0)
}
