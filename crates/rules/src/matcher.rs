use chrono::{Datelike, NaiveDate};
use regex::{Regex, RegexBuilder};

use crate::document::{AmountDocument, DateDocument, DescriptionDocument, RuleError};

// Compiled patterns larger than this are rejected outright.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Description conditions. `contains` needles are OR'd together; everything
/// else is AND'd. All comparisons are case-insensitive.
#[derive(Debug, Clone)]
pub struct DescriptionMatcher {
    contains: Vec<String>,
    equals: Option<String>,
    starts_with: Option<String>,
    ends_with: Option<String>,
    regex: Option<Regex>,
}

impl DescriptionMatcher {
    pub(crate) fn compile(
        doc: DescriptionDocument,
        rule_name: &str,
    ) -> Result<Option<Self>, RuleError> {
        let contains: Vec<String> = doc
            .contains
            .iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        let equals = nonblank_lowered(doc.equals);
        let starts_with = nonblank_lowered(doc.starts_with);
        let ends_with = nonblank_lowered(doc.ends_with);

        let regex = match doc.regex.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .size_limit(REGEX_SIZE_LIMIT)
                    .build()
                    .map_err(|e| RuleError::BadRegex(rule_name.to_string(), e.to_string()))?,
            ),
            None => None,
        };

        if contains.is_empty()
            && equals.is_none()
            && starts_with.is_none()
            && ends_with.is_none()
            && regex.is_none()
        {
            return Ok(None);
        }
        Ok(Some(DescriptionMatcher {
            contains,
            equals,
            starts_with,
            ends_with,
            regex,
        }))
    }

    pub fn matches(&self, description: &str) -> bool {
        let text = description.to_lowercase();
        if !self.contains.is_empty() && !self.contains.iter().any(|n| text.contains(n.as_str())) {
            return false;
        }
        if let Some(eq) = &self.equals {
            if text != *eq {
                return false;
            }
        }
        if let Some(prefix) = &self.starts_with {
            if !text.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(suffix) = &self.ends_with {
            if !text.ends_with(suffix.as_str()) {
                return false;
            }
        }
        if let Some(re) = &self.regex {
            if !re.is_match(description) {
                return false;
            }
        }
        true
    }
}

fn nonblank_lowered(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Amount conditions in cents. `greater_than`/`less_than` are strict;
/// `range` is inclusive on both ends.
#[derive(Debug, Clone)]
pub struct AmountMatcher {
    equals: Option<i64>,
    greater_than: Option<i64>,
    less_than: Option<i64>,
    range: Option<(i64, i64)>,
}

impl AmountMatcher {
    pub(crate) fn compile(doc: AmountDocument, rule_name: &str) -> Result<Option<Self>, RuleError> {
        let range = match doc.range {
            Some([lo, hi]) => {
                let (lo, hi) = (to_cents(lo, rule_name)?, to_cents(hi, rule_name)?);
                if lo > hi {
                    return Err(RuleError::ReversedRange(rule_name.to_string()));
                }
                Some((lo, hi))
            }
            None => None,
        };
        let matcher = AmountMatcher {
            equals: doc.equals.map(|v| to_cents(v, rule_name)).transpose()?,
            greater_than: doc.greater_than.map(|v| to_cents(v, rule_name)).transpose()?,
            less_than: doc.less_than.map(|v| to_cents(v, rule_name)).transpose()?,
            range,
        };
        if matcher.equals.is_none()
            && matcher.greater_than.is_none()
            && matcher.less_than.is_none()
            && matcher.range.is_none()
        {
            return Ok(None);
        }
        Ok(Some(matcher))
    }

    pub fn matches(&self, amount_cents: i64) -> bool {
        if let Some(eq) = self.equals {
            if amount_cents != eq {
                return false;
            }
        }
        if let Some(gt) = self.greater_than {
            if amount_cents <= gt {
                return false;
            }
        }
        if let Some(lt) = self.less_than {
            if amount_cents >= lt {
                return false;
            }
        }
        if let Some((lo, hi)) = self.range {
            if amount_cents < lo || amount_cents > hi {
                return false;
            }
        }
        true
    }
}

// TOML admits `nan` and `inf` floats; a non-finite bound is a document error,
// never silently cast.
fn to_cents(units: f64, rule_name: &str) -> Result<i64, RuleError> {
    if !units.is_finite() {
        return Err(RuleError::NonFiniteAmount(rule_name.to_string()));
    }
    Ok((units * 100.0).round() as i64)
}

/// Date conditions: ISO weekday (Monday=1 through Sunday=7) and day of month.
#[derive(Debug, Clone)]
pub struct DateMatcher {
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
}

impl DateMatcher {
    pub(crate) fn compile(doc: DateDocument, rule_name: &str) -> Result<Option<Self>, RuleError> {
        if let Some(dow) = doc.day_of_week {
            if !(1..=7).contains(&dow) {
                return Err(RuleError::BadDayOfWeek(rule_name.to_string(), dow));
            }
        }
        if let Some(dom) = doc.day_of_month {
            if !(1..=31).contains(&dom) {
                return Err(RuleError::BadDayOfMonth(rule_name.to_string(), dom));
            }
        }
        if doc.day_of_week.is_none() && doc.day_of_month.is_none() {
            return Ok(None);
        }
        Ok(Some(DateMatcher {
            day_of_week: doc.day_of_week,
            day_of_month: doc.day_of_month,
        }))
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        if let Some(dow) = self.day_of_week {
            if date.weekday().number_from_monday() as u8 != dow {
                return false;
            }
        }
        if let Some(dom) = self.day_of_month {
            if date.day() as u8 != dom {
                return false;
            }
        }
        true
    }
}
