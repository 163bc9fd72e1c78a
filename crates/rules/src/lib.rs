pub mod document;
pub mod engine;
pub mod matcher;

pub use document::{parse_rule_set, validate_document, Rule, RuleDocument, RuleError};
pub use engine::RuleEngine;
pub use matcher::{AmountMatcher, DateMatcher, DescriptionMatcher};
