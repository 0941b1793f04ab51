//! Validation message catalog.
//!
//! Templates are handlebars strings (`"Must be at least {{min}}"`). A message
//! is looked up on the field first, then in the form-level overrides, then in
//! the built-in defaults. Lookups happen while compiling, so a compiled
//! validator only carries finished strings.

use std::collections::BTreeMap;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::spec::field::FieldSpec;

/// Form-level message overrides, keyed by rule name.
pub type MessageOverrides = BTreeMap<String, String>;

/// Names of the rules that can produce a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKey {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Email,
    Url,
    Min,
    Max,
    MinItems,
    MaxItems,
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
    Custom,
}

impl RuleKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKey::Required => "required",
            RuleKey::MinLength => "minLength",
            RuleKey::MaxLength => "maxLength",
            RuleKey::Pattern => "pattern",
            RuleKey::Email => "email",
            RuleKey::Url => "url",
            RuleKey::Min => "min",
            RuleKey::Max => "max",
            RuleKey::MinItems => "minItems",
            RuleKey::MaxItems => "maxItems",
            RuleKey::String => "string",
            RuleKey::Number => "number",
            RuleKey::Boolean => "boolean",
            RuleKey::Date => "date",
            RuleKey::Array => "array",
            RuleKey::Object => "object",
            RuleKey::Custom => "custom",
        }
    }

    /// Built-in template for the rule.
    pub fn default_template(&self) -> &'static str {
        match self {
            RuleKey::Required => "This field is required",
            RuleKey::MinLength => "Must be at least {{min}} characters",
            RuleKey::MaxLength => "Must be at most {{max}} characters",
            RuleKey::Pattern => "Invalid format",
            RuleKey::Email => "Invalid email address",
            RuleKey::Url => "Invalid URL",
            RuleKey::Min => "Must be at least {{min}}",
            RuleKey::Max => "Must be at most {{max}}",
            RuleKey::MinItems => "Must have at least {{min}} items",
            RuleKey::MaxItems => "Must have at most {{max}} items",
            RuleKey::String => "Must be text",
            RuleKey::Number => "Must be a number",
            RuleKey::Boolean => "Must be true or false",
            RuleKey::Date => "Invalid date",
            RuleKey::Array => "Must be a list",
            RuleKey::Object => "Must be an object",
            RuleKey::Custom => "Validation failed",
        }
    }
}

/// Immutable message configuration handed to the compilers.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    overrides: MessageOverrides,
    renderer: Handlebars<'static>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new(MessageOverrides::new())
    }
}

impl MessageCatalog {
    pub fn new(overrides: MessageOverrides) -> Self {
        let mut renderer = Handlebars::new();
        renderer.register_escape_fn(handlebars::no_escape);
        Self {
            overrides,
            renderer,
        }
    }

    pub fn from_overrides(overrides: Option<&MessageOverrides>) -> Self {
        Self::new(overrides.cloned().unwrap_or_default())
    }

    pub fn overrides(&self) -> &MessageOverrides {
        &self.overrides
    }

    /// Picks the template for `key`: field override, form override, default.
    pub fn template<'a>(&'a self, key: RuleKey, field: &'a FieldSpec) -> &'a str {
        field
            .validation_messages
            .get(key.as_str())
            .or_else(|| self.overrides.get(key.as_str()))
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }

    /// Resolves and renders the message for `key`. `params` supplies rule
    /// bounds such as `min`/`max`; `name` and `label` are always available.
    pub fn resolve(&self, key: RuleKey, field: &FieldSpec, params: Map<String, Value>) -> String {
        let template = self.template(key, field);
        let mut context = params;
        context.insert("name".into(), Value::String(field.name.clone()));
        context.insert("label".into(), Value::String(field.display_label().to_string()));
        match self.renderer.render_template(template, &Value::Object(context)) {
            Ok(rendered) => rendered,
            Err(err) => {
                debug!(
                    field = %field.name,
                    rule = key.as_str(),
                    error = %err,
                    "message template failed to render"
                );
                template.to_string()
            }
        }
    }
}

/// Numeric template parameter; integral values render without a fraction.
pub(crate) fn numeric_param(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

pub(crate) fn bound(name: &str, value: f64) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(name.to_string(), numeric_param(value));
    params
}
