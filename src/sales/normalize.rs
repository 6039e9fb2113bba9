//! Row normalization applied before schema validation

use crate::types::{JsonObject, JsonValue};

/// Characters of `transaction_date` kept (`YYYY-MM-DDTHH:MM:SS`)
pub const TRANSACTION_DATE_LEN: usize = 19;

const TRANSACTION_DATE: &str = "transaction_date";

/// Normalize a field name
///
/// One leading underscore is dropped and embedded double quotes are removed:
/// `_id` becomes `id`, `"venue"` becomes `venue`.
pub fn normalize_key(key: &str) -> String {
    let key = key.strip_prefix('_').unwrap_or(key);
    key.replace('"', "")
}

/// Normalize the field names of one row and trim `transaction_date`
///
/// A string `transaction_date` keeps its first 19 characters, which drops
/// fractional seconds and offsets. Other values pass through untouched.
pub fn normalize_record(record: &JsonObject) -> JsonObject {
    record
        .iter()
        .map(|(key, value)| {
            let key = normalize_key(key);
            let value = match value {
                JsonValue::String(s) if key == TRANSACTION_DATE => {
                    JsonValue::String(s.chars().take(TRANSACTION_DATE_LEN).collect())
                }
                other => other.clone(),
            };
            (key, value)
        })
        .collect()
}
