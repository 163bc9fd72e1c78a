use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extract;
use crate::format::FormatConfig;
use crate::infer::{infer_heuristic, FormatInferrer, SAMPLE_LINES};
use tally_core::{AccountId, NewTransaction, ProfileId};
use tally_rules::RuleEngine;
use tally_store::{StoreError, TransactionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => write!(f, "pending"),
            SessionState::Processing => write!(f, "processing"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// A durable import record: uploaded bytes, the format resolved for them,
/// and an explicit state machine. `Completed` and `Failed` are terminal;
/// a failed import is re-submitted as a new session, never retried in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: Uuid,
    pub profile: ProfileId,
    pub account: AccountId,
    pub state: SessionState,
    pub format: FormatConfig,
    /// Original file bytes; cleared once the session completes.
    pub raw: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import session {0} is {1}, not pending")]
    Conflict(Uuid, SessionState),
    #[error("import session {0} has no stored file data")]
    MissingData(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub rows_skipped: usize,
    pub categorized: usize,
}

/// Sequences an import: begin (resolve format, store bytes) → preview
/// (read-only) → confirm (persist, categorize). The store is passed per
/// call; the importer owns only its format inferrer.
///
/// Known race, accepted: the stored-hash snapshot is read once per preview
/// or confirm and not revalidated mid-batch, so two concurrent imports into
/// the same account can both admit an identical row. Imports are
/// user-initiated and single-actor per account in practice.
pub struct Importer<I: FormatInferrer> {
    inferrer: I,
}

impl<I: FormatInferrer> Importer<I> {
    pub fn new(inferrer: I) -> Self {
        Self { inferrer }
    }

    /// Opens a session in `Pending`. An explicit format override wins;
    /// otherwise the inferrer proposes one from the leading lines, with the
    /// heuristic as the fallback when a backend fails.
    pub fn begin(
        &self,
        profile: ProfileId,
        account: AccountId,
        bytes: Vec<u8>,
        override_format: Option<FormatConfig>,
    ) -> ImportSession {
        let format = match override_format {
            Some(format) => format,
            None => {
                let text = String::from_utf8_lossy(&bytes);
                let sample = text.lines().take(SAMPLE_LINES).collect::<Vec<_>>().join("\n");
                match self.inferrer.infer(&sample) {
                    Ok(format) => format,
                    Err(err) => {
                        warn!(%err, "format inference backend failed, using heuristics");
                        infer_heuristic(&sample)
                    }
                }
            }
        };
        let session = ImportSession {
            id: Uuid::new_v4(),
            profile,
            account,
            state: SessionState::Pending,
            format,
            raw: Some(bytes),
        };
        info!(session = %session.id, account = %account, "opened import session");
        session
    }

    /// Extracts candidates with duplicates flagged. Never writes and never
    /// moves the session out of `Pending`.
    pub fn preview<S: TransactionStore>(
        &self,
        session: &ImportSession,
        store: &S,
    ) -> Result<extract::Extraction, ImportError> {
        if session.state != SessionState::Pending {
            return Err(ImportError::Conflict(session.id, session.state));
        }
        let raw = session
            .raw
            .as_deref()
            .ok_or(ImportError::MissingData(session.id))?;
        let existing = store.existing_hashes(session.account)?;
        Ok(extract::extract_candidates(raw, &session.format, &existing))
    }

    /// Persists the file: `Pending` → `Processing` → `Completed` on success,
    /// `Failed` on any storage error (rows already written stay written).
    /// A session that is not `Pending` is rejected as a conflict; re-running
    /// a completed import is refused, not recomputed.
    pub fn confirm<S: TransactionStore>(
        &self,
        session: &mut ImportSession,
        store: &mut S,
        skip_duplicates: bool,
    ) -> Result<ImportOutcome, ImportError> {
        if session.state != SessionState::Pending {
            return Err(ImportError::Conflict(session.id, session.state));
        }
        session.state = SessionState::Processing;
        debug!(session = %session.id, "processing import");

        match run_confirm(session, store, skip_duplicates) {
            Ok(outcome) => {
                session.state = SessionState::Completed;
                // The uploaded bytes have served their purpose.
                session.raw = None;
                info!(
                    session = %session.id,
                    imported = outcome.imported,
                    duplicates_skipped = outcome.duplicates_skipped,
                    rows_skipped = outcome.rows_skipped,
                    categorized = outcome.categorized,
                    "import completed"
                );
                Ok(outcome)
            }
            Err(err) => {
                session.state = SessionState::Failed;
                warn!(session = %session.id, %err, "import failed");
                Err(err)
            }
        }
    }
}

fn run_confirm<S: TransactionStore>(
    session: &ImportSession,
    store: &mut S,
    skip_duplicates: bool,
) -> Result<ImportOutcome, ImportError> {
    let raw = session
        .raw
        .as_deref()
        .ok_or(ImportError::MissingData(session.id))?;

    // 1. Snapshot the account's stored hashes.
    let existing = store.existing_hashes(session.account)?;

    // 2. Extract, dropping unparsable rows and applying the dedup policy.
    let extraction = extract::extract_for_commit(raw, &session.format, &existing, skip_duplicates);
    let rows_skipped = extraction.rows_skipped;
    let duplicates_skipped = extraction.duplicates_skipped;

    // 3. Persist the surviving candidates.
    let new: Vec<NewTransaction> = extraction
        .candidates
        .into_iter()
        .map(NewTransaction::from)
        .collect();
    let mut created = store.create_transactions(session.account, new)?;

    // 4. Categorize the fresh records against the profile's active rules.
    let engine = RuleEngine::new(store.active_rules(session.profile)?);
    let profile = session.profile;
    let categorized = engine.apply_to_batch(&mut created, |name| {
        match store.find_category(profile, name) {
            Ok(found) => found,
            Err(err) => {
                warn!(%err, category = name, "category lookup failed");
                None
            }
        }
    });

    // 5. Write back what the rules touched.
    for record in created
        .iter()
        .filter(|r| r.category.is_some() || !r.tags.is_empty())
    {
        store.update_categorization(record)?;
    }

    Ok(ImportOutcome {
        imported: created.len(),
        duplicates_skipped,
        rows_skipped,
        categorized,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::AmountType;
    use crate::infer::HeuristicInferrer;
    use std::collections::HashSet;
    use tally_core::TransactionRecord;
    use tally_store::MemoryStore;

    const STATEMENT: &[u8] = b"2024-01-01,Grocery Store,-45.32\n2024-01-02,Salary,2500.00";

    fn importer() -> Importer<HeuristicInferrer> {
        Importer::new(HeuristicInferrer)
    }

    fn statement_format() -> FormatConfig {
        FormatConfig {
            delimiter: ',',
            has_header: false,
            date_column: 0,
            date_format: "%Y-%m-%d".to_string(),
            description_column: 1,
            amount_type: AmountType::Signed,
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
        }
    }

    fn pending_session(store_bytes: &[u8]) -> ImportSession {
        importer().begin(
            ProfileId(1),
            AccountId(1),
            store_bytes.to_vec(),
            Some(statement_format()),
        )
    }

    #[test]
    fn begin_honors_the_override() {
        let session = pending_session(STATEMENT);
        assert_eq!(session.state, SessionState::Pending);
        assert_eq!(session.format, statement_format());
        assert_eq!(session.raw.as_deref(), Some(STATEMENT));
    }

    #[test]
    fn begin_infers_without_an_override() {
        let session = importer().begin(
            ProfileId(1),
            AccountId(1),
            b"Date,Description,Amount\n2024-01-01,Coffee,-4.50".to_vec(),
            None,
        );
        assert!(session.format.has_header);
        assert_eq!(session.format.amount_column, Some(2));
        assert_eq!(session.format.description_column, 1);
    }

    #[test]
    fn preview_is_read_only() {
        let mut store = MemoryStore::new();
        let session = pending_session(STATEMENT);

        let extraction = importer().preview(&session, &store).unwrap();
        assert_eq!(extraction.candidates.len(), 2);
        assert!(extraction.candidates.iter().all(|c| !c.is_duplicate));
        assert_eq!(session.state, SessionState::Pending);
        assert!(store.transactions(AccountId(1)).is_empty());

        // Import the file, then preview it again through a new session.
        let mut first = pending_session(STATEMENT);
        importer().confirm(&mut first, &mut store, true).unwrap();
        let again = importer().preview(&session, &store).unwrap();
        assert!(again.candidates.iter().all(|c| c.is_duplicate));
    }

    #[test]
    fn confirm_imports_and_completes() {
        let mut store = MemoryStore::new();
        let mut session = pending_session(STATEMENT);

        let outcome = importer().confirm(&mut session, &mut store, true).unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.duplicates_skipped, 0);
        assert_eq!(outcome.rows_skipped, 0);
        assert_eq!(session.state, SessionState::Completed);
        assert!(session.raw.is_none());
        assert_eq!(store.transactions(AccountId(1)).len(), 2);
    }

    #[test]
    fn confirm_twice_is_a_conflict() {
        let mut store = MemoryStore::new();
        let mut session = pending_session(STATEMENT);
        importer().confirm(&mut session, &mut store, true).unwrap();

        let err = importer()
            .confirm(&mut session, &mut store, true)
            .unwrap_err();
        assert!(matches!(err, ImportError::Conflict(_, SessionState::Completed)));
        assert_eq!(store.transactions(AccountId(1)).len(), 2);

        assert!(matches!(
            importer().preview(&session, &store),
            Err(ImportError::Conflict(_, SessionState::Completed))
        ));
    }

    #[test]
    fn reimporting_the_same_file_imports_nothing() {
        let mut store = MemoryStore::new();
        let mut first = pending_session(STATEMENT);
        importer().confirm(&mut first, &mut store, true).unwrap();

        let mut second = pending_session(STATEMENT);
        let outcome = importer().confirm(&mut second, &mut store, true).unwrap();
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.duplicates_skipped, 2);
        assert_eq!(second.state, SessionState::Completed);
        assert_eq!(store.transactions(AccountId(1)).len(), 2);
    }

    #[test]
    fn confirm_categorizes_new_records() {
        let mut store = MemoryStore::new();
        let groceries = store.add_category(ProfileId(1), "Groceries");
        store
            .add_rule(
                ProfileId(1),
                r#"
                name = "grocery stores"
                category = "groceries"
                tags = ["food"]
                [match.description]
                contains = ["grocery"]
                "#,
            )
            .unwrap();

        let mut session = pending_session(STATEMENT);
        let outcome = importer().confirm(&mut session, &mut store, true).unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.categorized, 1);

        let records = store.transactions(AccountId(1));
        let grocery_row = records
            .iter()
            .find(|r| r.description == "Grocery Store")
            .unwrap();
        assert_eq!(grocery_row.category, Some(groceries));
        assert!(grocery_row.tags.contains("food"));
        let salary_row = records.iter().find(|r| r.description == "Salary").unwrap();
        assert_eq!(salary_row.category, None);
    }

    struct FailingStore;

    impl TransactionStore for FailingStore {
        fn existing_hashes(&self, _: AccountId) -> Result<HashSet<String>, StoreError> {
            Ok(HashSet::new())
        }
        fn create_transactions(
            &mut self,
            _: AccountId,
            _: Vec<NewTransaction>,
        ) -> Result<Vec<TransactionRecord>, StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        fn update_categorization(&mut self, _: &TransactionRecord) -> Result<(), StoreError> {
            Ok(())
        }
        fn find_category(
            &self,
            _: ProfileId,
            _: &str,
        ) -> Result<Option<tally_core::CategoryId>, StoreError> {
            Ok(None)
        }
        fn active_rules(&self, _: ProfileId) -> Result<Vec<tally_rules::Rule>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn storage_failure_marks_the_session_failed() {
        let mut store = FailingStore;
        let mut session = pending_session(STATEMENT);

        let err = importer()
            .confirm(&mut session, &mut store, true)
            .unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
        assert_eq!(session.state, SessionState::Failed);
        // The bytes are kept so the failure can be diagnosed.
        assert!(session.raw.is_some());

        // Terminal: a failed session cannot be confirmed again.
        assert!(matches!(
            importer().confirm(&mut session, &mut store, true),
            Err(ImportError::Conflict(_, SessionState::Failed))
        ));
    }

    #[test]
    fn session_survives_serialization() {
        let session = pending_session(STATEMENT);
        let json = serde_json::to_string(&session).unwrap();
        let back: ImportSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(back.state, SessionState::Pending);
        assert_eq!(back.format, session.format);
        assert_eq!(back.raw.as_deref(), Some(STATEMENT));
    }
}
