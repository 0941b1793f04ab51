pub mod custom;
pub mod field;
pub mod form;

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::messages::{MessageCatalog, MessageOverrides};
use crate::spec::field::FieldSpec;
use crate::spec::form::FormSchema;

pub use custom::{
    CustomOutcome, CustomRuleError, CustomValidator, SyncRule, async_rule, sync_rule,
};
pub use field::FieldValidator;
pub use form::FormValidator;

/// Field path to message. Absence of a key means the field passed.
pub type ErrorMap = BTreeMap<String, String>;

/// Schema authoring mistakes detected while compiling validators.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("field '{field}' has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("array field '{field}' has no itemSchema")]
    MissingItemSchema { field: String },
    #[error("field '{path}' is declared more than once")]
    DuplicateField { path: String },
    #[error("field '{field}' has a lower {rule} bound above its upper bound")]
    ConflictingBounds { field: String, rule: &'static str },
}

/// Compiles one field's rules, layering `overrides` over the defaults.
pub fn create_field_validation_schema(
    field: &FieldSpec,
    overrides: Option<&MessageOverrides>,
) -> Result<FieldValidator, CompileError> {
    FieldValidator::compile(field, &MessageCatalog::from_overrides(overrides))
}

/// Compiles a whole form schema into one validator.
pub fn create_form_validation_schema(
    schema: &FormSchema,
    overrides: Option<&MessageOverrides>,
) -> Result<FormValidator, CompileError> {
    FormValidator::compile(schema, &MessageCatalog::from_overrides(overrides))
}

/// Validates one value outside of a whole-form pass (on change / on blur).
pub async fn validate_single(
    field: &FieldSpec,
    value: &Value,
    values: &Value,
    messages: &MessageCatalog,
) -> Result<Option<String>, CompileError> {
    let validator = FieldValidator::compile(field, messages)?;
    Ok(validator.validate(Some(value), values).await)
}

/// Validates `value` as the field `name`. Without a values snapshot the
/// field is validated against `{name: value}`.
pub async fn validate_field_value(
    name: &str,
    value: &Value,
    field: &FieldSpec,
    values: Option<&Value>,
    overrides: Option<&MessageOverrides>,
) -> Result<Option<String>, CompileError> {
    let messages = MessageCatalog::from_overrides(overrides);
    match values {
        Some(values) => validate_single(field, value, values, &messages).await,
        None => {
            let mut scope = Map::new();
            scope.insert(name.to_string(), value.clone());
            validate_single(field, value, &Value::Object(scope), &messages).await
        }
    }
}

/// Compiles `schema` and validates `data` in one step.
pub async fn validate_form_data(
    data: &Value,
    schema: &FormSchema,
    overrides: Option<&MessageOverrides>,
) -> Result<ErrorMap, CompileError> {
    let validator = create_form_validation_schema(schema, overrides)?;
    Ok(validator.validate(data).await)
}
