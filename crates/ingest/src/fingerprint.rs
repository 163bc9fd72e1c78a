use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use tally_core::format_cents;

/// Hex length of a duplicate hash: 64 bits, plenty below any realistic
/// collision probability for per-account transaction volumes.
pub const HASH_LEN: usize = 16;

/// Content fingerprint of a transaction, a pure function of
/// `(date, amount, description)`. The canonical form is
/// `"{date as %Y-%m-%d}|{amount with two decimals}|{DESCRIPTION UPPERCASED}"`,
/// hashed with SHA-256 and truncated. Identical rows always collide, which is
/// the point: the same computation serves preview comparison and commit-time
/// skipping.
pub fn duplicate_hash(date: NaiveDate, amount_cents: i64, description: &str) -> String {
    let canonical = format!(
        "{}|{}|{}",
        date.format("%Y-%m-%d"),
        format_cents(amount_cents),
        description.to_uppercase()
    );
    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deterministic() {
        let a = duplicate_hash(date(2024, 1, 1), -4532, "Grocery Store");
        let b = duplicate_hash(date(2024, 1, 1), -4532, "Grocery Store");
        assert_eq!(a, b);
    }

    #[test]
    fn fixed_length_lowercase_hex() {
        let h = duplicate_hash(date(2024, 1, 1), -4532, "Grocery Store");
        assert_eq!(h.len(), HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn each_component_matters() {
        let base = duplicate_hash(date(2024, 1, 1), -4532, "Grocery Store");
        assert_ne!(base, duplicate_hash(date(2024, 1, 2), -4532, "Grocery Store"));
        assert_ne!(base, duplicate_hash(date(2024, 1, 1), -4533, "Grocery Store"));
        assert_ne!(base, duplicate_hash(date(2024, 1, 1), -4532, "Grocery Stores"));
    }

    #[test]
    fn description_case_is_canonicalized() {
        assert_eq!(
            duplicate_hash(date(2024, 1, 1), -4532, "grocery store"),
            duplicate_hash(date(2024, 1, 1), -4532, "GROCERY STORE"),
        );
    }

    #[test]
    fn sign_distinguishes() {
        assert_ne!(
            duplicate_hash(date(2024, 1, 1), 4532, "Refund"),
            duplicate_hash(date(2024, 1, 1), -4532, "Refund"),
        );
    }
}
