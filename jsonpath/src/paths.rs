use serde_json::Value;

use crate::tokenizer::PathToken;

/// Lists every path expression that addresses a value in `document`,
/// in canonical form, excluding the root itself.
///
/// The walk is pre-order depth-first: a parent's path is emitted
/// strictly before any of its descendants', objects are visited in key
/// insertion order, arrays in index order. A bare scalar at the root
/// yields an empty list.
///
/// The traversal runs off an explicit work stack, so document depth is
/// bounded by the heap rather than the call stack.
pub fn enumerate(document: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    let mut stack = Vec::new();
    push_children(document, "$", &mut stack);

    while let Some((path, value)) = stack.pop() {
        push_children(value, &path, &mut stack);
        paths.push(path);
    }

    paths
}

/// Pushes `value`'s immediate children in reverse order, so that the
/// first child is popped (and therefore emitted) first.
fn push_children<'json>(
    value: &'json Value,
    prefix: &str,
    stack: &mut Vec<(String, &'json Value)>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter().rev() {
                let path = format!("{}{}", prefix, PathToken::Key(key.as_str()));
                stack.push((path, child));
            }
        }
        Value::Array(values) => {
            for (index, child) in values.iter().enumerate().rev() {
                let path = format!("{}{}", prefix, PathToken::Index(index as i64));
                stack.push((path, child));
            }
        }
        // scalars terminate the walk
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
