use crate::cache::CacheError;
use crate::model::SuggestionType;
use serde_json::Value;
use std::collections::BTreeMap;

/// Derives the stable cache key for a suggestion request.
///
/// The context map is canonicalized (object keys sorted recursively) before
/// hashing so that semantically identical requests with differently-ordered
/// fields collide on the same key. A missing context normalizes to `{}`.
pub fn fingerprint(
    deviation_id: &str,
    suggestion_type: SuggestionType,
    context: Option<&serde_json::Map<String, Value>>,
) -> Result<String, CacheError> {
    let context = context
        .map(|m| Value::Object(m.clone()))
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let mut fields = BTreeMap::new();
    fields.insert("context", canonicalize(context));
    fields.insert("deviation_id", Value::String(deviation_id.to_string()));
    fields.insert(
        "type",
        Value::String(suggestion_type.as_str().to_string()),
    );

    let canonical = serde_json::to_string(&fields)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Rebuilds a JSON value with all object keys in sorted order. Array order is
/// semantic and preserved.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            // Re-serialize through BTreeMap so iteration order is key order
            // regardless of how the Map was built.
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
