pub mod ids;
pub mod money;
pub mod transaction;

pub use ids::{AccountId, CategoryId, ProfileId, TransactionId};
pub use money::{format_cents, parse_amount, AmountError};
pub use transaction::{NewTransaction, TransactionCandidate, TransactionRecord};
