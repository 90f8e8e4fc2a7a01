//! Outgoing payload normalization.
//!
//! External services treat `""` differently from an absent field, so every
//! request body is passed through [`sanitize`] once before it is sent.

use serde_json::{Map, Value};

/// Replace empty or whitespace-only strings with `null`.
///
/// Objects are walked recursively. Arrays and non-string scalars pass
/// through unchanged, including any blank strings nested inside arrays.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        Value::Object(map) => Value::Object(sanitize_map(map)),
        other => other,
    }
}

fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_strings_become_null() {
        let out = sanitize(json!({ "a": "", "b": "   ", "c": "x" }));
        assert_eq!(out, json!({ "a": null, "b": null, "c": "x" }));
    }

    #[test]
    fn nested_objects_are_sanitized() {
        let out = sanitize(json!({ "outer": { "inner": { "motion": "\t" } } }));
        assert_eq!(out, json!({ "outer": { "inner": { "motion": null } } }));
    }

    #[test]
    fn arrays_and_scalars_pass_through() {
        let input = json!({ "lines": ["", "hi"], "n": 0, "flag": false, "none": null });
        assert_eq!(sanitize(input.clone()), input);
    }

    #[test]
    fn top_level_blank_string_is_null() {
        assert_eq!(sanitize(json!(" ")), Value::Null);
    }
}
