use thiserror::Error;

use crate::dates;
use crate::format::{AmountType, FormatConfig};
use crate::line::split_line;
use tally_core::parse_amount;

/// How many leading lines inference looks at.
pub(crate) const SAMPLE_LINES: usize = 6;

#[derive(Debug, Error)]
pub enum InferError {
    #[error("inference service error: {0}")]
    Remote(String),
}

/// Abstraction over format detection. Implementations take a few leading
/// lines of the file and propose a `FormatConfig`; callers fall back to the
/// heuristic when an implementation fails.
pub trait FormatInferrer: Send + Sync {
    fn infer(&self, sample: &str) -> Result<FormatConfig, InferError>;
}

// ── Heuristic inference (always available) ────────────────────────────────────

/// Pure line-counting heuristics. Never fails: anything it cannot work out
/// falls back to the defaults in [`FormatConfig::default`].
pub struct HeuristicInferrer;

impl FormatInferrer for HeuristicInferrer {
    fn infer(&self, sample: &str) -> Result<FormatConfig, InferError> {
        Ok(infer_heuristic(sample))
    }
}

pub(crate) fn infer_heuristic(sample: &str) -> FormatConfig {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    let Some(first) = lines.first() else {
        return FormatConfig::default();
    };

    let delimiter = detect_delimiter(first);

    // A first line containing any field that is neither a number nor a date
    // reads as column names.
    let has_header = split_line(first, delimiter)
        .iter()
        .any(|f| !is_numeric(f) && dates::detect_format(f).is_none());

    // Column roles are probed on the second line when there is one, since
    // the first may be the header just detected.
    let test_row = lines.get(1).copied().unwrap_or(first);
    let fields = split_line(test_row, delimiter);

    let (date_column, date_format) = fields
        .iter()
        .enumerate()
        .find_map(|(i, f)| dates::detect_format(f).map(|fmt| (i, fmt)))
        .unwrap_or((0, "%Y-%m-%d"));

    let amount_column = fields
        .iter()
        .enumerate()
        .find(|(i, f)| *i != date_column && is_numeric(f.as_str()))
        .map(|(i, _)| i)
        .or_else(|| {
            // Only the date column is numeric: reuse it.
            fields
                .get(date_column)
                .filter(|f| is_numeric(f.as_str()))
                .map(|_| date_column)
        })
        .unwrap_or(0);

    let description_column = fields
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_column && *i != amount_column)
        .fold(None::<(usize, usize)>, |best, (i, f)| {
            let len = f.chars().count();
            match best {
                Some((_, best_len)) if len <= best_len => best,
                _ => Some((i, len)),
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    FormatConfig {
        delimiter,
        has_header,
        date_column,
        date_format: date_format.to_string(),
        description_column,
        // Split debit/credit layouts are never inferred, only set by
        // explicit override.
        amount_type: AmountType::Signed,
        amount_column: Some(amount_column),
        debit_column: None,
        credit_column: None,
    }
}

fn detect_delimiter(line: &str) -> char {
    let commas = line.matches(',').count();
    let semis = line.matches(';').count();
    let tabs = line.matches('\t').count();
    // An alternative only wins by strictly beating the comma count.
    let (alt, alt_count) = if semis >= tabs { (';', semis) } else { ('\t', tabs) };
    if alt_count > commas {
        alt
    } else {
        ','
    }
}

fn is_numeric(field: &str) -> bool {
    parse_amount(field).is_ok()
}

// ── Remote inference (optional, gated behind `remote-infer` feature) ──────────

#[cfg(feature = "remote-infer")]
pub mod remote {
    use serde::Serialize;

    use super::{FormatInferrer, InferError};
    use crate::format::FormatConfig;

    /// Posts the sample to a detection service and expects a serialized
    /// `FormatConfig` back. Any transport or shape failure surfaces as
    /// [`InferError::Remote`]; callers then fall back to the heuristic.
    pub struct RemoteInferrer {
        endpoint: String,
        client: reqwest::blocking::Client,
    }

    #[derive(Serialize)]
    struct InferRequest<'a> {
        sample: &'a str,
    }

    impl RemoteInferrer {
        pub fn new(endpoint: impl Into<String>) -> Self {
            Self {
                endpoint: endpoint.into(),
                client: reqwest::blocking::Client::new(),
            }
        }
    }

    impl FormatInferrer for RemoteInferrer {
        fn infer(&self, sample: &str) -> Result<FormatConfig, InferError> {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&InferRequest { sample })
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .map_err(|e| InferError::Remote(e.to_string()))?;
            response
                .json::<FormatConfig>()
                .map_err(|e| InferError::Remote(e.to_string()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
