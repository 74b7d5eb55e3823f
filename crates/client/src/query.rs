//! Query string and path segment encoding

use crate::error::{ClientError, Result};
use serde::Serialize;
use serde_json::Value;

/// Encode an options record as a URL query string
///
/// `None`/null fields are skipped, sequences repeat their key, and scalars are
/// written in their JSON text form (strings unquoted). Returns an empty string
/// when nothing is set, otherwise the encoded pairs with a leading `?`.
///
/// # Errors
///
/// Returns an [`ErrorKind::Encode`](crate::ErrorKind::Encode) error if the
/// options do not serialize to a map
pub fn encode_query<T: Serialize + ?Sized>(options: &T) -> Result<String> {
    let value = serde_json::to_value(options).map_err(|e| ClientError::encode(e.to_string()))?;
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(String::new()),
        other => {
            return Err(ClientError::encode(format!(
                "query options must be a map, got {other}"
            )));
        }
    };

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        serializer.append_pair(key, &text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    serializer.append_pair(key, &text);
                }
            }
        }
    }

    let encoded = serializer.finish();
    if encoded.is_empty() {
        Ok(encoded)
    } else {
        Ok(format!("?{encoded}"))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Percent-encode one path segment
///
/// Everything but ASCII alphanumerics and `-._*` is escaped, so `/`, `?` and
/// `#` inside an identifier cannot change the route.
pub fn encode_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        // form encoding writes spaces as '+'; a literal '+' is already %2B
        .replace('+', "%20")
}
