use std::collections::{HashMap, HashSet};
use tracing::warn;

use tally_core::{
    AccountId, CategoryId, NewTransaction, ProfileId, TransactionId, TransactionRecord,
};
use tally_rules::{parse_rule_set, Rule, RuleError};

use crate::{StoreError, TransactionStore};

/// HashMap-backed [`TransactionStore`]. Rule documents are kept as raw TOML
/// and compiled on read, the same shape a database-backed store would have.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_transaction_id: i64,
    next_category_id: i64,
    transactions: HashMap<AccountId, Vec<TransactionRecord>>,
    categories: HashMap<ProfileId, Vec<(CategoryId, String)>>,
    rule_docs: HashMap<ProfileId, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, profile: ProfileId, name: &str) -> CategoryId {
        self.next_category_id += 1;
        let id = CategoryId(self.next_category_id);
        self.categories
            .entry(profile)
            .or_default()
            .push((id, name.to_string()));
        id
    }

    /// Validates and stores a rule document.
    pub fn add_rule(&mut self, profile: ProfileId, doc: &str) -> Result<(), RuleError> {
        Rule::parse(doc)?;
        self.rule_docs
            .entry(profile)
            .or_default()
            .push(doc.to_string());
        Ok(())
    }

    /// Stores a document without validating it, as happens when documents
    /// were written before stricter checks or edited out-of-band.
    pub fn add_rule_raw(&mut self, profile: ProfileId, doc: &str) {
        self.rule_docs
            .entry(profile)
            .or_default()
            .push(doc.to_string());
    }

    pub fn transactions(&self, account: AccountId) -> &[TransactionRecord] {
        self.transactions.get(&account).map_or(&[], Vec::as_slice)
    }
}

impl TransactionStore for MemoryStore {
    fn existing_hashes(&self, account: AccountId) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .transactions
            .get(&account)
            .map(|txs| txs.iter().map(|t| t.duplicate_hash.clone()).collect())
            .unwrap_or_default())
    }

    fn create_transactions(
        &mut self,
        account: AccountId,
        new: Vec<NewTransaction>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let list = self.transactions.entry(account).or_default();
        let mut created = Vec::with_capacity(new.len());
        for n in new {
            self.next_transaction_id += 1;
            let record = TransactionRecord::from_new(
                TransactionId(self.next_transaction_id),
                account,
                n,
            );
            list.push(record.clone());
            created.push(record);
        }
        Ok(created)
    }

    fn update_categorization(&mut self, tx: &TransactionRecord) -> Result<(), StoreError> {
        let list = self
            .transactions
            .get_mut(&tx.account)
            .ok_or(StoreError::AccountNotFound(tx.account))?;
        let slot = list
            .iter_mut()
            .find(|t| t.id == tx.id)
            .ok_or(StoreError::TransactionNotFound(tx.id))?;
        slot.category = tx.category;
        slot.tags = tx.tags.clone();
        Ok(())
    }

    fn find_category(
        &self,
        profile: ProfileId,
        name: &str,
    ) -> Result<Option<CategoryId>, StoreError> {
        Ok(self.categories.get(&profile).and_then(|cats| {
            cats.iter()
                .find(|(_, n)| n.eq_ignore_ascii_case(name))
                .map(|(id, _)| *id)
        }))
    }

    fn active_rules(&self, profile: ProfileId) -> Result<Vec<Rule>, StoreError> {
        let docs = self.rule_docs.get(&profile);
        let (mut rules, failures) = parse_rule_set(
            docs.into_iter()
                .flatten()
                .map(String::as_str),
        );
        for (idx, err) in failures {
            warn!(%profile, document = idx, %err, "skipping rule document that does not compile");
        }
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }
}
