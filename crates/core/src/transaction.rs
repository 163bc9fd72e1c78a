use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::{AccountId, CategoryId, TransactionId};

/// A parsed statement row, not yet persisted. Candidates only live inside an
/// import session: previews render them, confirmation converts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub duplicate_hash: String,
    /// Set for preview output only; commit-mode extraction leaves it false.
    pub is_duplicate: bool,
}

/// The create shape handed to a store at confirmation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub duplicate_hash: String,
}

impl From<TransactionCandidate> for NewTransaction {
    fn from(c: TransactionCandidate) -> Self {
        NewTransaction {
            date: c.date,
            description: c.description,
            amount_cents: c.amount_cents,
            duplicate_hash: c.duplicate_hash,
        }
    }
}

/// A persisted transaction. `duplicate_hash` is computed once at creation and
/// never recomputed, so later edits to the record cannot un-duplicate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub account: AccountId,
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub duplicate_hash: String,
    pub category: Option<CategoryId>,
    pub tags: BTreeSet<String>,
    pub notes: Option<String>,
}

impl TransactionRecord {
    pub fn from_new(id: TransactionId, account: AccountId, new: NewTransaction) -> Self {
        TransactionRecord {
            id,
            account,
            date: new.date,
            description: new.description,
            amount_cents: new.amount_cents,
            duplicate_hash: new.duplicate_hash,
            category: None,
            tags: BTreeSet::new(),
            notes: None,
        }
    }
}
