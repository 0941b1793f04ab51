use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::condition::ConditionalLogic;
use crate::simple::SimpleConditions;
use crate::spec::form::SchemaItem;
use crate::validate::custom::CustomValidator;

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Password,
    Url,
    Tel,
    Textarea,
    Hidden,
    Number,
    Checkbox,
    Date,
    Datetime,
    Time,
    Select,
    Radio,
    Autocomplete,
    File,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Url => "url",
            FieldType::Tel => "tel",
            FieldType::Textarea => "textarea",
            FieldType::Hidden => "hidden",
            FieldType::Number => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Time => "time",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Autocomplete => "autocomplete",
            FieldType::File => "file",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// Required-ness predicate computed in code from the full form values.
#[derive(Clone)]
pub struct ComputedRequired(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl ComputedRequired {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn evaluate(&self, values: &Value) -> bool {
        (self.0)(values)
    }
}

impl fmt::Debug for ComputedRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputedRequired(..)")
    }
}

impl PartialEq for ComputedRequired {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// `validation.required`: a flag, a declarative condition, or a closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RequiredRule {
    Flag(bool),
    When(ConditionalLogic),
    #[serde(skip)]
    Computed(ComputedRequired),
}

impl RequiredRule {
    pub fn computed<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        RequiredRule::Computed(ComputedRequired::new(predicate))
    }

    /// Whether the rule demands a value given the current form values.
    pub fn is_required(&self, values: &Value) -> bool {
        match self {
            RequiredRule::Flag(flag) => *flag,
            RequiredRule::When(logic) => logic.evaluate(values),
            RequiredRule::Computed(predicate) => predicate.evaluate(values),
        }
    }
}

/// Asynchronous cross-field rule.
///
/// `dependencies` lists the paths whose changes should trigger
/// re-validation; the compiled validator never reads it.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CustomRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub validator: Option<Arc<dyn CustomValidator>>,
}

impl CustomRule {
    pub fn new<V>(validator: V) -> Self
    where
        V: CustomValidator + 'static,
    {
        Self {
            dependencies: Vec::new(),
            validator: Some(Arc::new(validator)),
        }
    }

    pub fn depends_on<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(paths.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("dependencies", &self.dependencies)
            .field("attached", &self.validator.is_some())
            .finish()
    }
}

impl PartialEq for CustomRule {
    fn eq(&self, other: &Self) -> bool {
        let same_validator = match (&self.validator, &other.validator) {
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            (None, None) => true,
            _ => false,
        };
        same_validator && self.dependencies == other.dependencies
    }
}

/// Declarative rule set attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<RequiredRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub email: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomRule>,
}

/// Declarative description of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_messages: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalLogic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<SimpleConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_when: Option<SimpleConditions>,
    /// Choices for select, radio and autocomplete inputs; primitives or objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    /// Item template for `array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_schema: Option<Vec<SchemaItem>>,
    /// Sub-fields for `object` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    /// Remaining presentation props, kept verbatim.
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            description: None,
            placeholder: None,
            default_value: None,
            required: false,
            disabled: false,
            validation: None,
            validation_messages: BTreeMap::new(),
            conditional: None,
            visible_when: None,
            disabled_when: None,
            options: Vec::new(),
            item_schema: None,
            fields: Vec::new(),
            props: Map::new(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationRules) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.validation_messages.insert(rule.into(), message.into());
        self
    }

    /// Attaches an async custom rule, keeping any declared dependencies.
    pub fn with_custom<V>(mut self, validator: V) -> Self
    where
        V: CustomValidator + 'static,
    {
        self.attach_custom(Arc::new(validator));
        self
    }

    pub fn attach_custom(&mut self, validator: Arc<dyn CustomValidator>) {
        let rules = self.validation.get_or_insert_with(ValidationRules::default);
        let custom = rules.custom.get_or_insert_with(CustomRule::default);
        custom.validator = Some(validator);
    }

    pub fn rules(&self) -> Option<&ValidationRules> {
        self.validation.as_ref()
    }

    /// Paths a custom rule declared as re-validation triggers.
    pub fn dependencies(&self) -> &[String] {
        self.validation
            .as_ref()
            .and_then(|rules| rules.custom.as_ref())
            .map(|custom| custom.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Label used in messages, falling back to the name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}
