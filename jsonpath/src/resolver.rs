use std::{error::Error, fmt::Display};

use serde_json::Value;

use crate::tokenizer::PathToken;

/// Walks `document` one token at a time, left to right, and returns the
/// addressed sub-value. The document is never mutated; an empty token
/// sequence returns the root unchanged.
///
/// Array indices may be negative, addressing from the end the way
/// `[-1]` addresses the last element.
pub fn resolve<'json>(
    document: &'json Value,
    tokens: &[PathToken<'_>],
) -> Result<&'json Value, ResolveErr> {
    let mut current = document;
    for token in tokens {
        match token {
            PathToken::Key(key) => match current {
                Value::Object(map) => match map.get(*key) {
                    Some(child) => current = child,
                    None => {
                        return Err(ResolveErr::KeyNotFound {
                            key: key.to_string(),
                        })
                    }
                },
                other => {
                    return Err(ResolveErr::TypeMismatch {
                        token: token.to_string(),
                        expected: "object",
                        actual: kind_name(other),
                    })
                }
            },
            PathToken::Index(index) => match current {
                Value::Array(values) => {
                    let len = values.len();
                    let resolved = if *index < 0 {
                        // negative indices count back from the end
                        (len as i64).checked_add(*index)
                    } else {
                        Some(*index)
                    };

                    match resolved {
                        Some(i) if i >= 0 && i < len as i64 => {
                            current = &values[i as usize];
                        }
                        _ => {
                            return Err(ResolveErr::IndexOutOfRange {
                                index: *index,
                                len,
                            })
                        }
                    }
                }
                other => {
                    return Err(ResolveErr::TypeMismatch {
                        token: token.to_string(),
                        expected: "array",
                        actual: kind_name(other),
                    })
                }
            },
        }
    }
    Ok(current)
}

/// Structural kind of a value, as named in error messages.
fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolveErr {
    /// The token requires a container kind the current value is not.
    TypeMismatch {
        /// the offending token in canonical form
        token: String,
        expected: &'static str,
        actual: &'static str,
    },
    KeyNotFound {
        key: String,
    },
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
}

impl Error for ResolveErr {}
impl Display for ResolveErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveErr::TypeMismatch {
                token,
                expected,
                actual,
            } => {
                write!(f, "Expected {} at {}, got {}", expected, token, actual)
            }
            ResolveErr::KeyNotFound { key } => write!(f, "Key {:?} not found", key),
            ResolveErr::IndexOutOfRange { index, len } => {
                write!(f, "Index [{}] out of range (length {})", index, len)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{resolve, ResolveErr};
    use crate::tokenizer::{parse, PathToken};

    #[test]
    fn empty_token_sequence_returns_the_root() {
        let document = json!({"a": 1});
        assert_eq!(&document, resolve(&document, &[]).unwrap());
    }

    #[test]
    fn descends_through_objects_and_arrays() {
        let document = json!({
            "company": {"name": "Initech"},
            "employees": [
                {"name": "Peter", "skills": ["staplers"]},
                {"name": "Milton"}
            ]
        });

        let tokens = parse("$.company.name").unwrap();
        assert_eq!(&json!("Initech"), resolve(&document, &tokens).unwrap());

        let tokens = parse("$.employees[0].skills").unwrap();
        assert_eq!(&json!(["staplers"]), resolve(&document, &tokens).unwrap());
    }

    #[test]
    fn resolves_bracket_quoted_keys() {
        let document = json!({"key with spaces": 42});
        let tokens = parse("$[\"key with spaces\"]").unwrap();
        assert_eq!(&json!(42), resolve(&document, &tokens).unwrap());
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let document = json!([10, 20, 30]);
        assert_eq!(
            &json!(30),
            resolve(&document, &[PathToken::Index(-1)]).unwrap()
        );
        assert_eq!(
            &json!(10),
            resolve(&document, &[PathToken::Index(-3)]).unwrap()
        );
        assert_eq!(
            ResolveErr::IndexOutOfRange { index: -4, len: 3 },
            resolve(&document, &[PathToken::Index(-4)]).unwrap_err()
        );
    }

    #[test]
    fn rejects_indices_past_the_end() {
        let document = json!([10, 20, 30]);
        assert_eq!(
            ResolveErr::IndexOutOfRange { index: 3, len: 3 },
            resolve(&document, &[PathToken::Index(3)]).unwrap_err()
        );
        assert_eq!(
            ResolveErr::IndexOutOfRange { index: 0, len: 0 },
            resolve(&json!([]), &[PathToken::Index(0)]).unwrap_err()
        );
    }

    #[test]
    fn reports_missing_keys() {
        let document = json!({"a": 1});
        assert_eq!(
            ResolveErr::KeyNotFound {
                key: "b".to_string()
            },
            resolve(&document, &[PathToken::Key("b")]).unwrap_err()
        );
    }

    #[test]
    fn type_mismatches_name_both_kinds() {
        // key against an array
        assert_eq!(
            ResolveErr::TypeMismatch {
                token: ".name".to_string(),
                expected: "object",
                actual: "array",
            },
            resolve(&json!([1, 2]), &[PathToken::Key("name")]).unwrap_err()
        );

        // index against an object
        assert_eq!(
            ResolveErr::TypeMismatch {
                token: "[0]".to_string(),
                expected: "array",
                actual: "object",
            },
            resolve(&json!({"a": 1}), &[PathToken::Index(0)]).unwrap_err()
        );

        // scalars terminate descent
        assert_eq!(
            ResolveErr::TypeMismatch {
                token: ".x".to_string(),
                expected: "object",
                actual: "string",
            },
            resolve(&json!("leaf"), &[PathToken::Key("x")]).unwrap_err()
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let document = json!({"a": {"b": [1, 2, 3]}});
        let tokens = parse("$.a.b[1]").unwrap();
        let first = resolve(&document, &tokens).unwrap();
        let second = resolve(&document, &tokens).unwrap();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn error_messages_carry_enough_context() {
        assert_eq!(
            "Expected object at .name, got array",
            ResolveErr::TypeMismatch {
                token: ".name".to_string(),
                expected: "object",
                actual: "array",
            }
            .to_string()
        );
        assert_eq!(
            "Index [-4] out of range (length 3)",
            ResolveErr::IndexOutOfRange { index: -4, len: 3 }.to_string()
        );
        assert_eq!(
            "Key \"b\" not found",
            ResolveErr::KeyNotFound {
                key: "b".to_string()
            }
            .to_string()
        );
    }
}
