use serde_json::{Map, Value};

use crate::error::Result;

/// A JSON object item from `response.body.items`.
pub type JsonItem = Map<String, Value>;

/// Parses an API JSON response and returns its items.
pub fn parse_items(body: &str) -> Result<Vec<JsonItem>> {
    let json: Value = serde_json::from_str(body)?;
    Ok(extract_items(&json))
}

/// Resolves `response.body.items` into a flat list of objects.
///
/// The API returns `items` either as an array of objects or as an object
/// whose `item` key holds one object or an array of them. Any other shape
/// (missing path, empty string, scalars) yields no items. Non-object entries
/// inside an array are skipped.
pub fn extract_items(json: &Value) -> Vec<JsonItem> {
    let items = json
        .get("response")
        .and_then(|response| response.get("body"))
        .and_then(|body| body.get("items"));

    match items {
        Some(Value::Array(entries)) => objects(entries),
        Some(Value::Object(wrapper)) => match wrapper.get("item") {
            Some(Value::Array(entries)) => objects(entries),
            Some(Value::Object(single)) => vec![single.clone()],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn objects(entries: &[Value]) -> Vec<JsonItem> {
    entries
        .iter()
        .filter_map(|entry| entry.as_object().cloned())
        .collect()
}

/// Renders a JSON value as literal cell text.
///
/// Strings are returned verbatim, other scalars use their JSON text and
/// `null` is empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
