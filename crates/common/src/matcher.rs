//! Partial JSON matching for request body expectations

use serde_json::Value;

/// First point at which `actual` stops matching `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: String,
    pub reason: String,
}

/// Check that `actual` contains everything in `expected`.
///
/// Objects may carry extra keys. Arrays must have the same length and
/// match element by element. Numbers compare by value, so `2` matches
/// `2.0`.
pub fn match_object(actual: &Value, expected: &Value) -> Result<(), Mismatch> {
    match_at("$", actual, expected)
}

fn match_at(path: &str, actual: &Value, expected: &Value) -> Result<(), Mismatch> {
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for (key, want_value) in want {
                let child = format!("{}.{}", path, key);
                match got.get(key) {
                    Some(got_value) => match_at(&child, got_value, want_value)?,
                    None => {
                        return Err(Mismatch {
                            path: child,
                            reason: "missing".to_string(),
                        })
                    }
                }
            }
            Ok(())
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() != got.len() {
                return Err(Mismatch {
                    path: path.to_string(),
                    reason: format!("expected {} elements, got {}", want.len(), got.len()),
                });
            }
            for (i, (w, g)) in want.iter().zip(got).enumerate() {
                match_at(&format!("{}[{}]", path, i), g, w)?;
            }
            Ok(())
        }
        (Value::Number(want), Value::Number(got)) => {
            if want.as_f64() == got.as_f64() {
                Ok(())
            } else {
                Err(Mismatch {
                    path: path.to_string(),
                    reason: format!("expected {}, got {}", want, got),
                })
            }
        }
        (want, got) if want == got => Ok(()),
        (want, got) => Err(Mismatch {
            path: path.to_string(),
            reason: format!("expected {}, got {}", want, got),
        }),
    }
}

/// Check that every named top-level property exists in `body`.
///
/// Fails with the first missing name. A non-object body has no properties.
pub fn require_properties<'a>(body: &Value, properties: &[&'a str]) -> Result<(), &'a str> {
    let object = body.as_object();
    match properties
        .iter()
        .copied()
        .find(|p| object.map(|o| !o.contains_key(*p)).unwrap_or(true))
    {
        Some(missing) => Err(missing),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_keys_are_allowed() {
        let actual = json!({ "storeId": "4", "franchiseId": 2, "extra": true });
        let expected = json!({ "storeId": "4", "franchiseId": 2 });
        assert!(match_object(&actual, &expected).is_ok());
    }

    #[test]
    fn test_nested_mismatch_reports_path() {
        let actual = json!({ "items": [{ "menuId": 1 }, { "menuId": 3 }] });
        let expected = json!({ "items": [{ "menuId": 1 }, { "menuId": 2 }] });
        let err = match_object(&actual, &expected).unwrap_err();
        assert_eq!(err.path, "$.items[1].menuId");
    }

    #[test]
    fn test_array_length_must_agree() {
        let actual = json!({ "items": [1, 2, 3] });
        let expected = json!({ "items": [1, 2] });
        let err = match_object(&actual, &expected).unwrap_err();
        assert_eq!(err.path, "$.items");
        assert!(err.reason.contains("expected 2 elements"));
    }

    #[test]
    fn test_string_and_number_are_distinct() {
        let err = match_object(&json!({ "storeId": 4 }), &json!({ "storeId": "4" })).unwrap_err();
        assert_eq!(err.path, "$.storeId");
        assert!(match_object(&json!({ "franchiseId": 2.0 }), &json!({ "franchiseId": 2 })).is_ok());
    }

    #[test]
    fn test_require_properties() {
        let body = json!({ "email": "d@jwt.com" });
        assert_eq!(require_properties(&body, &["email", "password"]), Err("password"));
        assert_eq!(require_properties(&body, &["email"]), Ok(()));
        assert_eq!(require_properties(&json!([]), &["email"]), Err("email"));
        // null still counts as present
        assert_eq!(require_properties(&json!({ "name": null }), &["name"]), Ok(()));
    }
}
