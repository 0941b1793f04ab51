//! Compact `{field: expected}` conditional syntax.
//!
//! Every entry must hold. An expected value that is an object with
//! `$`-prefixed keys is read as a set of comparisons:
//!
//! ```json
//! { "country": { "$in": ["us", "ca"] }, "age": { "$gte": 18 } }
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::condition::{compare_numeric, contains, is_empty, is_member, strict_eq};
use crate::path::resolve;

/// Field path to expected value (or comparison object).
pub type SimpleConditions = BTreeMap<String, Value>;

/// Evaluates the implicit AND of all entries.
pub fn evaluate_simple(conditions: &SimpleConditions, values: &Value) -> bool {
    conditions
        .iter()
        .all(|(field, expected)| matches_entry(resolve(values, field), expected))
}

fn matches_entry(actual: Option<&Value>, expected: &Value) -> bool {
    match expected {
        Value::Object(map) if map.keys().any(|key| key.starts_with('$')) => {
            matches_operators(actual, map)
        }
        _ => actual.is_some_and(|actual| strict_eq(actual, expected)),
    }
}

fn matches_operators(actual: Option<&Value>, operators: &Map<String, Value>) -> bool {
    operators.iter().all(|(key, operand)| match key.as_str() {
        "$in" => is_member(actual, operand.as_array().map(Vec::as_slice)).unwrap_or(false),
        "$notIn" => is_member(actual, operand.as_array().map(Vec::as_slice))
            .map(|hit| !hit)
            .unwrap_or(true),
        "$gt" => compare_numeric(actual, Some(operand), |a, b| a > b),
        "$lt" => compare_numeric(actual, Some(operand), |a, b| a < b),
        "$gte" => compare_numeric(actual, Some(operand), |a, b| a >= b),
        "$lte" => compare_numeric(actual, Some(operand), |a, b| a <= b),
        "$contains" => contains(actual, Some(operand)).unwrap_or(false),
        "$isEmpty" => match operand {
            Value::Bool(expect_empty) => is_empty(actual) == *expect_empty,
            _ => false,
        },
        other => {
            debug!(operator = other, "unrecognized simple-syntax operator; treating as unmet");
            false
        }
    })
}
