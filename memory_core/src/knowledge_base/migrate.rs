//! Per-field decoding used when loading or importing a blob.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Child field of an optional JSON object.
pub(crate) fn field<'a>(parent: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    parent.and_then(|p| p.get(name))
}

/// Decode an array, dropping elements that fail individually.
pub(crate) fn list<T: DeserializeOwned>(value: Option<&Value>, name: &str) -> Vec<T> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match T::deserialize(item) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(field = name, index, error = %e, "Dropping undecodable element");
                    None
                }
            })
            .collect(),
        Some(_) => {
            warn!(field = name, "Expected an array, using empty default");
            Vec::new()
        }
    }
}

/// Decode an object into a map, dropping entries that fail individually.
pub(crate) fn map<T: DeserializeOwned>(value: Option<&Value>, name: &str) -> BTreeMap<String, T> {
    match value {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(key, item)| match T::deserialize(item) {
                Ok(decoded) => Some((key.clone(), decoded)),
                Err(e) => {
                    warn!(field = name, key = %key, error = %e, "Dropping undecodable entry");
                    None
                }
            })
            .collect(),
        Some(_) => {
            warn!(field = name, "Expected an object, using empty default");
            BTreeMap::new()
        }
    }
}

pub(crate) fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
