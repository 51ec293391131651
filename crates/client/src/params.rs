//! Encoding of nested arguments into Moodle's flat form parameters
//!
//! Moodle's REST server only accepts flat `key=value` pairs, so nested lists
//! and objects are spelled out in the key itself:
//!
//! ```
//! use moodle_client::params::rest_api_parameters;
//! use serde_json::json;
//!
//! let flat = rest_api_parameters(&json!({"courses": [{"id": 1, "name": "course1"}]}));
//! assert_eq!(flat["courses[0][id]"], json!(1));
//! assert_eq!(flat["courses[0][name]"], json!("course1"));
//! ```
use std::collections::BTreeMap;

use serde_json::Value;

/// Flattened parameters, keyed by their bracketed path
pub type FlatParams = BTreeMap<String, Value>;

/// Flatten `args` into a fresh set of parameters.
///
/// A bare scalar ends up under the empty key, and empty lists or objects
/// produce nothing at all.
pub fn rest_api_parameters(args: &Value) -> FlatParams {
    let mut out = FlatParams::new();
    flatten_into(args, "", &mut out);
    out
}

/// Flatten `args` into `out`, with every key starting from `prefix`.
///
/// Paths that flatten to the same key overwrite each other.
pub fn flatten_into(args: &Value, prefix: &str, out: &mut FlatParams) {
    match args {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                flatten_into(item, &segment(prefix, &idx.to_string()), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(item, &segment(prefix, key), out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.clone());
        }
    }
}

fn segment(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}[{}]", prefix, key)
    }
}

/// The form-encoded text for a flattened scalar, or `None` if it should be left out.
///
/// Booleans are sent as `1`/`0`, which is what Moodle's `PARAM_BOOL` expects.
pub fn form_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Empty strings and containers, zero, `false` and `null` are false; everything else is true
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_prefix() {
        let mut out = FlatParams::new();
        flatten_into(&json!({"id": 3}), "courses[2]", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out["courses[2][id]"], json!(3));
    }

    #[test]
    fn test_accumulator_is_shared() {
        let mut out = FlatParams::new();
        flatten_into(&json!([1]), "a", &mut out);
        flatten_into(&json!([2]), "b", &mut out);
        assert_eq!(out["a[0]"], json!(1));
        assert_eq!(out["b[0]"], json!(2));
    }

    #[test]
    fn test_collision_last_wins() {
        let flat = rest_api_parameters(&json!({"a[0]": "flat", "a": ["nested"]}));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["a[0]"], json!("nested"));
    }

    #[test]
    fn test_form_value() {
        assert_eq!(form_value(&json!("x")), Some("x".to_string()));
        assert_eq!(form_value(&json!(12)), Some("12".to_string()));
        assert_eq!(form_value(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(form_value(&json!(true)), Some("1".to_string()));
        assert_eq!(form_value(&json!(false)), Some("0".to_string()));
        assert_eq!(form_value(&Value::Null), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("invalid_parameter_exception")));
        assert!(is_truthy(&json!(7)));
    }
}
