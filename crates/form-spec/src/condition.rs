use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::path::resolve;

/// Comparison operators understood by atomic conditions.
///
/// Any operator name outside this set deserializes to [`Operator::Unknown`],
/// which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    NotContains,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    #[serde(other)]
    Unknown,
}

/// One `field operator operand` check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub field: String,
    #[schemars(with = "String")]
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

/// Boolean combination of conditions. Exactly one connective per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComplexCondition {
    And(Vec<ConditionalLogic>),
    Or(Vec<ConditionalLogic>),
    Not(Box<ConditionalLogic>),
}

/// Either an atomic condition or a combinator tree.
///
/// Shape dispatch happens once at deserialization: a node carrying a `field`
/// key is atomic, anything else must be an `and`/`or`/`not` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConditionalLogic {
    Condition(Condition),
    Complex(ComplexCondition),
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
            values: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = Some(values);
        self
    }

    /// Evaluates the condition against a values snapshot.
    pub fn evaluate(&self, values: &Value) -> bool {
        let actual = resolve(values, &self.field);
        let operand = self.value.as_ref();
        let result = match self.operator {
            Operator::Equals => matches_equal(actual, operand),
            Operator::NotEquals => !matches_equal(actual, operand),
            Operator::GreaterThan => compare_numeric(actual, operand, |a, b| a > b),
            Operator::LessThan => compare_numeric(actual, operand, |a, b| a < b),
            Operator::GreaterThanOrEqual => compare_numeric(actual, operand, |a, b| a >= b),
            Operator::LessThanOrEqual => compare_numeric(actual, operand, |a, b| a <= b),
            Operator::Contains => contains(actual, operand).unwrap_or(false),
            Operator::NotContains => contains(actual, operand).map(|hit| !hit).unwrap_or(true),
            Operator::In => is_member(actual, self.values.as_deref()).unwrap_or(false),
            Operator::NotIn => is_member(actual, self.values.as_deref())
                .map(|hit| !hit)
                .unwrap_or(true),
            Operator::IsEmpty => is_empty(actual),
            Operator::IsNotEmpty => !is_empty(actual),
            Operator::Unknown => {
                debug!(field = %self.field, "unknown condition operator; treating as unmet");
                false
            }
        };
        trace!(field = %self.field, operator = ?self.operator, result, "condition evaluated");
        result
    }
}

impl ComplexCondition {
    pub fn evaluate(&self, values: &Value) -> bool {
        match self {
            ComplexCondition::And(conditions) => {
                conditions.iter().all(|condition| condition.evaluate(values))
            }
            ComplexCondition::Or(conditions) => {
                conditions.iter().any(|condition| condition.evaluate(values))
            }
            ComplexCondition::Not(condition) => !condition.evaluate(values),
        }
    }
}

impl ConditionalLogic {
    pub fn evaluate(&self, values: &Value) -> bool {
        match self {
            ConditionalLogic::Condition(condition) => condition.evaluate(values),
            ConditionalLogic::Complex(complex) => complex.evaluate(values),
        }
    }
}

impl From<Condition> for ConditionalLogic {
    fn from(condition: Condition) -> Self {
        ConditionalLogic::Condition(condition)
    }
}

impl From<ComplexCondition> for ConditionalLogic {
    fn from(complex: ComplexCondition) -> Self {
        ConditionalLogic::Complex(complex)
    }
}

/// Evaluates an atomic or complex condition against a values snapshot.
pub fn evaluate_conditional_logic(logic: &ConditionalLogic, values: &Value) -> bool {
    logic.evaluate(values)
}

/// Strict equality: same kind, numbers compared by value, containers
/// compared element-wise.
pub(crate) fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| strict_eq(x, y)))
        }
        _ => left == right,
    }
}

pub(crate) fn matches_equal(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (Some(actual), Some(expected)) => strict_eq(actual, expected),
        (None, None) => true,
        _ => false,
    }
}

/// Numeric coercion used by ordering operators. Absent values, objects,
/// and unparsable strings become NaN.
pub(crate) fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    }
}

pub(crate) fn compare_numeric<F>(actual: Option<&Value>, expected: Option<&Value>, op: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let left = to_number(actual);
    let right = to_number(expected);
    if left.is_nan() || right.is_nan() {
        return false;
    }
    op(left, right)
}

/// Substring check for text, membership check for sequences, `None` when
/// the field value is neither.
pub(crate) fn contains(actual: Option<&Value>, needle: Option<&Value>) -> Option<bool> {
    match actual? {
        Value::String(text) => Some(
            needle
                .and_then(scalar_text)
                .is_some_and(|needle| text.contains(needle.as_str())),
        ),
        Value::Array(items) => Some(
            needle.is_some_and(|needle| items.iter().any(|item| strict_eq(item, needle))),
        ),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Membership of the field value in a candidate list; `None` when the list
/// is absent.
pub(crate) fn is_member(actual: Option<&Value>, candidates: Option<&[Value]>) -> Option<bool> {
    let candidates = candidates?;
    Some(actual.is_some_and(|actual| candidates.iter().any(|item| strict_eq(item, actual))))
}

/// Empty means absent, `null`, `""`, or a zero-length sequence.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
