//! Canonical JSON serialization shared by every id computation.
//!
//! Object keys are emitted in sorted order at every depth and integral floats
//! are written as integers, so `{"a":1,"b":2.0}` and `{"b":2,"a":1}` produce
//! the same text.
//!
//! NaN and infinities have no JSON form and serialize as `null`, so content
//! that differs only in such values maps to the same text. Callers that need
//! them kept apart must reject non-finite numbers before hashing.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::TwidResult;

/// Largest float magnitude that still round-trips exactly through i64.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Remove `keys` from every object in `value`, at any depth.
pub fn strip_volatile(value: &mut Value, keys: &[String]) {
    match value {
        Value::Object(map) => {
            for key in keys {
                map.remove(key.as_str());
            }
            for child in map.values_mut() {
                strip_volatile(child, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_volatile(item, keys);
            }
        }
        _ => {}
    }
}

/// Rebuild `value` with sorted object keys and normalized numbers.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => Value::Number(normalize_number(n)),
        _ => value.clone(),
    }
}

fn normalize_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }

    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < EXACT_INT_LIMIT => Number::from(f as i64),
        _ => n.clone(),
    }
}

/// Serialize `content` to canonical text with `volatile_keys` removed.
pub fn canonical_json<T: Serialize + ?Sized>(
    content: &T,
    volatile_keys: &[String],
) -> TwidResult<String> {
    let mut value = serde_json::to_value(content)?;
    strip_volatile(&mut value, volatile_keys);
    Ok(serde_json::to_string(&canonicalize(&value))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys() -> Vec<String> {
        vec!["$id".to_string(), "labelFormatter".to_string()]
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"term": {"id": "agedx"}, "q": {"mode": "discrete", "bin_size": 5}});
        let b = json!({"q": {"bin_size": 5, "mode": "discrete"}, "term": {"id": "agedx"}});

        assert_eq!(
            canonical_json(&a, &keys()).unwrap(),
            canonical_json(&b, &keys()).unwrap()
        );
    }

    #[test]
    fn test_volatile_keys_removed_at_depth() {
        let v = json!({"$id": "x", "q": {"labelFormatter": "fn", "lst": [{"$id": "y", "label": "a"}]}});
        let text = canonical_json(&v, &keys()).unwrap();

        assert_eq!(text, r#"{"q":{"lst":[{"label":"a"}]}}"#);
    }

    #[test]
    fn test_integral_floats_normalized() {
        let a = json!({"bin_size": 5.0});
        let b = json!({"bin_size": 5});
        assert_eq!(
            canonical_json(&a, &[]).unwrap(),
            canonical_json(&b, &[]).unwrap()
        );

        let c = json!({"bin_size": 5.5});
        assert_ne!(
            canonical_json(&a, &[]).unwrap(),
            canonical_json(&c, &[]).unwrap()
        );
    }

    #[test]
    fn test_non_finite_floats_collapse_to_null() {
        let nan = canonical_json(&[f64::NAN], &[]).unwrap();
        let inf = canonical_json(&[f64::INFINITY], &[]).unwrap();
        assert_eq!(nan, "[null]");
        assert_eq!(nan, inf);
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = json!({"lst": [1, 2]});
        let b = json!({"lst": [2, 1]});
        assert_ne!(
            canonical_json(&a, &[]).unwrap(),
            canonical_json(&b, &[]).unwrap()
        );
    }
}
