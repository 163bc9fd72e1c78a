use tally_core::{CategoryId, TransactionRecord};
use tracing::warn;

use crate::document::Rule;

/// Evaluates rules in priority order against transactions. Rules are
/// filtered and sorted once at construction; evaluation never fails.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut rules: Vec<Rule> = rules.into_iter().filter(|r| r.active).collect();
        // Lowest priority number first; the sort is stable so insertion
        // order breaks ties.
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First matching rule, or `None`. No match is a normal outcome, not an
    /// error.
    pub fn evaluate(&self, tx: &TransactionRecord) -> Option<&Rule> {
        self.rules.iter().find(|r| r.matches(tx))
    }

    /// Applies the first matching rule to every transaction. The category
    /// name is resolved through `lookup_category` (case-insensitive is the
    /// lookup's contract); an unknown name skips the category but still
    /// applies tags. Tags are a set union, so re-running a batch is
    /// idempotent. Returns how many transactions changed.
    pub fn apply_to_batch<F>(&self, transactions: &mut [TransactionRecord], lookup_category: F) -> usize
    where
        F: Fn(&str) -> Option<CategoryId>,
    {
        let mut changed = 0;
        for tx in transactions.iter_mut() {
            let Some(rule) = self.evaluate(tx) else {
                continue;
            };
            let mut touched = false;
            if let Some(name) = &rule.category {
                match lookup_category(name) {
                    Some(id) => {
                        if tx.category != Some(id) {
                            tx.category = Some(id);
                            touched = true;
                        }
                    }
                    None => {
                        warn!(
                            rule = %rule.name,
                            category = %name,
                            "rule names an unknown category, applying tags only"
                        );
                    }
                }
            }
            for tag in &rule.tags {
                if !tx.tags.contains(tag) {
                    tx.tags.insert(tag.clone());
                    touched = true;
                }
            }
            if touched {
                changed += 1;
            }
        }
        changed
    }
}
