use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountType {
    /// One column with a signed value, positive = income.
    Signed,
    /// Separate debit and credit columns; amount = credit - debit.
    Split,
}

/// How to interpret a delimited statement file. Produced by inference or
/// supplied by the caller as an override, and immutable once an import
/// session holds it, so preview and confirm read the file identically.
///
/// This is also the serialized shape of a saved format mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    pub delimiter: char,
    pub has_header: bool,
    pub date_column: usize,
    pub date_format: String,
    pub description_column: usize,
    pub amount_type: AmountType,
    /// Read when `amount_type` is `Signed`; ignored otherwise.
    pub amount_column: Option<usize>,
    /// Read when `amount_type` is `Split`; ignored otherwise.
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: false,
            date_column: 0,
            date_format: "%Y-%m-%d".to_string(),
            description_column: 0,
            amount_type: AmountType::Signed,
            amount_column: Some(0),
            debit_column: None,
            credit_column: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_inference_fallback() {
        let f = FormatConfig::default();
        assert_eq!(f.delimiter, ',');
        assert!(!f.has_header);
        assert_eq!(f.date_column, 0);
        assert_eq!(f.date_format, "%Y-%m-%d");
        assert_eq!(f.amount_type, AmountType::Signed);
        assert_eq!(f.amount_column, Some(0));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(FormatConfig::default()).unwrap();
        assert_eq!(json["delimiter"], ",");
        assert_eq!(json["hasHeader"], false);
        assert_eq!(json["dateColumn"], 0);
        assert_eq!(json["dateFormat"], "%Y-%m-%d");
        assert_eq!(json["amountType"], "signed");
        assert_eq!(json["amountColumn"], 0);
        assert!(json["debitColumn"].is_null());
    }

    #[test]
    fn round_trips_split_config() {
        let config = FormatConfig {
            delimiter: ';',
            has_header: true,
            date_column: 1,
            date_format: "%d/%m/%Y".to_string(),
            description_column: 2,
            amount_type: AmountType::Split,
            amount_column: None,
            debit_column: Some(3),
            credit_column: Some(4),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: FormatConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
