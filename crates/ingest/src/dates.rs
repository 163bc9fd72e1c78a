use chrono::NaiveDate;

/// Patterns probed, in order, when inferring a file's date column.
pub(crate) const INFER_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

// Generic fallbacks tried after the configured format during extraction.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
];

/// Parses with the configured format first, then the generic fallback list.
pub(crate) fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
        return Some(date);
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// First inference pattern that parses the value exactly, if any.
pub(crate) fn detect_format(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    INFER_DATE_FORMATS
        .iter()
        .find(|fmt| NaiveDate::parse_from_str(trimmed, fmt).is_ok())
        .copied()
}
