pub mod memory;

pub use memory::MemoryStore;

use std::collections::HashSet;
use thiserror::Error;

use tally_core::{AccountId, CategoryId, NewTransaction, ProfileId, TransactionId, TransactionRecord};
use tally_rules::Rule;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The storage collaborator the import pipeline talks to. tally ships no
/// persistence engine; embedders implement this over whatever they keep
/// transactions in, and [`MemoryStore`] serves tests and small tools.
pub trait TransactionStore {
    /// Duplicate hashes of every transaction already recorded for the
    /// account.
    fn existing_hashes(&self, account: AccountId) -> Result<HashSet<String>, StoreError>;

    /// Persists a batch and returns the created records, ids assigned.
    fn create_transactions(
        &mut self,
        account: AccountId,
        new: Vec<NewTransaction>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Writes back the category and tags of a record previously returned by
    /// this store.
    fn update_categorization(&mut self, tx: &TransactionRecord) -> Result<(), StoreError>;

    /// Case-insensitive category lookup by name, scoped to a profile.
    fn find_category(&self, profile: ProfileId, name: &str)
        -> Result<Option<CategoryId>, StoreError>;

    /// Active categorization rules for a profile, ascending priority.
    /// Documents that no longer compile are skipped, not fatal.
    fn active_rules(&self, profile: ProfileId) -> Result<Vec<Rule>, StoreError>;
}
