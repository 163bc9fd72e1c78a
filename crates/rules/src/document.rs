use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::{AmountMatcher, DateMatcher, DescriptionMatcher};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("invalid rule document: {0}")]
    Toml(String),
    #[error("rule name must not be empty")]
    EmptyName,
    #[error("rule {0:?} has no conditions")]
    NoConditions(String),
    #[error("rule {0:?} has an invalid regex: {1}")]
    BadRegex(String, String),
    #[error("rule {0:?}: day_of_week must be 1-7 (Monday=1), got {1}")]
    BadDayOfWeek(String, u8),
    #[error("rule {0:?}: day_of_month must be 1-31, got {1}")]
    BadDayOfMonth(String, u8),
    #[error("rule {0:?}: range bounds are reversed")]
    ReversedRange(String),
    #[error("rule {0:?}: amount bounds must be finite numbers")]
    NonFiniteAmount(String),
}

/// One TOML document describes one rule:
///
/// ```toml
/// name = "coffee shops"
/// priority = 10            # lower numbers evaluate first; defaults to 100
/// category = "Dining"
/// tags = ["coffee"]
///
/// [match.description]
/// contains = ["starbucks", "blue bottle"]
///
/// [match.amount]
/// less_than = 0.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, rename = "match")]
    pub matchers: MatcherDocument,
}

fn default_priority() -> i32 {
    100
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherDocument {
    pub description: Option<DescriptionDocument>,
    pub amount: Option<AmountDocument>,
    pub date: Option<DateDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionDocument {
    #[serde(default)]
    pub contains: Vec<String>,
    pub equals: Option<String>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub regex: Option<String>,
}

/// Amount bounds are given in currency units (`45.32`), converted to cents
/// when the document is compiled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmountDocument {
    pub equals: Option<f64>,
    pub greater_than: Option<f64>,
    pub less_than: Option<f64>,
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateDocument {
    pub day_of_week: Option<u8>,
    pub day_of_month: Option<u8>,
}

/// A validated rule with its matcher tree compiled. Construction is the only
/// place a rule can fail; evaluation is total.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub priority: i32,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub active: bool,
    pub description: Option<DescriptionMatcher>,
    pub amount: Option<AmountMatcher>,
    pub date: Option<DateMatcher>,
}

impl Rule {
    /// Parses and validates a single TOML rule document.
    pub fn parse(doc: &str) -> Result<Rule, RuleError> {
        let document: RuleDocument =
            toml::from_str(doc).map_err(|e| RuleError::Toml(e.to_string()))?;
        Rule::from_document(document)
    }

    /// Compiles a deserialized document into a typed rule. A group that is
    /// present but has only blank sub-conditions counts as absent; a rule
    /// whose groups are all absent is invalid.
    pub fn from_document(doc: RuleDocument) -> Result<Rule, RuleError> {
        let name = doc.name.trim().to_string();
        if name.is_empty() {
            return Err(RuleError::EmptyName);
        }

        let description = doc
            .matchers
            .description
            .map(|d| DescriptionMatcher::compile(d, &name))
            .transpose()?
            .flatten();
        let amount = doc
            .matchers
            .amount
            .map(|a| AmountMatcher::compile(a, &name))
            .transpose()?
            .flatten();
        let date = doc
            .matchers
            .date
            .map(|d| DateMatcher::compile(d, &name))
            .transpose()?
            .flatten();

        if description.is_none() && amount.is_none() && date.is_none() {
            return Err(RuleError::NoConditions(name));
        }

        let tags = doc
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Rule {
            name,
            priority: doc.priority,
            category: doc.category.filter(|c| !c.trim().is_empty()),
            tags,
            active: doc.active,
            description,
            amount,
            date,
        })
    }

    /// True when every present matcher group matches the transaction.
    pub fn matches(&self, tx: &tally_core::TransactionRecord) -> bool {
        if let Some(d) = &self.description {
            if !d.matches(&tx.description) {
                return false;
            }
        }
        if let Some(a) = &self.amount {
            if !a.matches(tx.amount_cents) {
                return false;
            }
        }
        if let Some(d) = &self.date {
            if !d.matches(tx.date) {
                return false;
            }
        }
        true
    }
}

/// Checks a document without keeping the compiled rule. The error's display
/// string is suitable for showing to the rule's author as-is.
pub fn validate_document(doc: &str) -> Result<(), RuleError> {
    Rule::parse(doc).map(|_| ())
}

/// Lenient bulk loader for stored documents: broken ones are reported with
/// their position, never aborting the rest.
pub fn parse_rule_set<'a, I>(docs: I) -> (Vec<Rule>, Vec<(usize, RuleError)>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut rules = Vec::new();
    let mut failures = Vec::new();
    for (idx, doc) in docs.into_iter().enumerate() {
        match Rule::parse(doc) {
            Ok(rule) => rules.push(rule),
            Err(err) => failures.push((idx, err)),
        }
    }
    (rules, failures)
}
