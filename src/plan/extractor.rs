//! Plan extractor — recovers a JSON plan object from model output.
//!
//! Models wrap JSON in prose or code fences. Strict parse first, then the
//! span from the first `{` to the last `}`. Anything else is `None` and the
//! caller falls back to the calculated plan.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extract a JSON object from free text.
pub fn extract(text: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Extract and deserialize into `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract(text).and_then(|v| serde_json::from_value(v).ok())
}
