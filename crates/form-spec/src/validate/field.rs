use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::{debug, warn};

use crate::condition::is_empty;
use crate::messages::{MessageCatalog, RuleKey, bound};
use crate::spec::field::{FieldSpec, FieldType, RequiredRule, ValidationRules};
use crate::validate::CompileError;
use crate::validate::custom::{CustomOutcome, CustomValidator};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

static NULL: Value = Value::Null;

/// Which calendar shape a date-like field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateShape {
    Date,
    DateTime,
    Time,
}

#[derive(Debug, Clone)]
enum Rule {
    IsString,
    IsNumber,
    IsBoolean,
    IsDate(DateShape),
    IsArray,
    IsObject,
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Email(Regex),
    Url,
    Min(f64),
    Max(f64),
    MinItems(usize),
    MaxItems(usize),
}

#[derive(Debug, Clone)]
struct Check {
    rule: Rule,
    message: String,
}

impl Check {
    fn new(rule: Rule, message: String) -> Self {
        Self { rule, message }
    }

    /// Returns the message when `value` violates the rule.
    fn apply(&self, value: &Value) -> Option<&str> {
        let passed = match &self.rule {
            Rule::IsString => value.is_string(),
            Rule::IsNumber => as_number(value).is_some(),
            Rule::IsBoolean => value.is_boolean(),
            Rule::IsDate(shape) => is_valid_date(value, *shape),
            Rule::IsArray => value.is_array(),
            Rule::IsObject => value.is_object(),
            Rule::MinLength(min) => value.as_str().is_none_or(|text| text.chars().count() >= *min),
            Rule::MaxLength(max) => value.as_str().is_none_or(|text| text.chars().count() <= *max),
            Rule::Pattern(regex) | Rule::Email(regex) => {
                value.as_str().is_none_or(|text| regex.is_match(text))
            }
            Rule::Url => value
                .as_str()
                .is_none_or(|text| url::Url::parse(text).is_ok()),
            Rule::Min(min) => as_number(value).is_none_or(|number| number >= *min),
            Rule::Max(max) => as_number(value).is_none_or(|number| number <= *max),
            Rule::MinItems(min) => value.as_array().is_none_or(|items| items.len() >= *min),
            Rule::MaxItems(max) => value.as_array().is_none_or(|items| items.len() <= *max),
        };
        (!passed).then_some(self.message.as_str())
    }
}

/// Absent-like values that skip the type and rule checks.
fn is_blank(value: &Value) -> bool {
    matches!(value, Value::Null) || value.as_str() == Some("")
}

/// JSON number or numeric string.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_valid_date(value: &Value, shape: DateShape) -> bool {
    let text = match value {
        Value::String(text) => text.as_str(),
        Value::Number(number) => return shape != DateShape::Time && number.is_i64(),
        _ => return false,
    };
    match shape {
        DateShape::Date => {
            Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok()
                || OffsetDateTime::parse(text, &Rfc3339).is_ok()
        }
        DateShape::DateTime => {
            OffsetDateTime::parse(text, &Rfc3339).is_ok()
                || PrimitiveDateTime::parse(
                    text,
                    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
                )
                .is_ok()
                || PrimitiveDateTime::parse(
                    text,
                    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
                )
                .is_ok()
        }
        DateShape::Time => {
            Time::parse(text, format_description!("[hour]:[minute]")).is_ok()
                || Time::parse(text, format_description!("[hour]:[minute]:[second]")).is_ok()
        }
    }
}

type Builder =
    fn(&FieldSpec, &ValidationRules, &MessageCatalog) -> Result<Vec<Check>, CompileError>;

/// Per-type builder table.
fn builder_for(kind: FieldType) -> Builder {
    match kind {
        FieldType::Text
        | FieldType::Email
        | FieldType::Password
        | FieldType::Url
        | FieldType::Tel
        | FieldType::Textarea
        | FieldType::Hidden => build_string,
        FieldType::Number => build_number,
        FieldType::Checkbox => build_boolean,
        FieldType::Date | FieldType::Datetime | FieldType::Time => build_date,
        FieldType::Select | FieldType::Radio | FieldType::Autocomplete | FieldType::File => {
            build_mixed
        }
        FieldType::Array => build_array,
        FieldType::Object => build_object,
    }
}

fn ensure_ordered<T: PartialOrd + Copy>(
    field: &FieldSpec,
    lower: Option<T>,
    upper: Option<T>,
    rule: &'static str,
) -> Result<(), CompileError> {
    if let (Some(lower), Some(upper)) = (lower, upper)
        && lower > upper
    {
        return Err(CompileError::ConflictingBounds {
            field: field.name.clone(),
            rule,
        });
    }
    Ok(())
}

fn build_string(
    field: &FieldSpec,
    rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    ensure_ordered(field, rules.min_length, rules.max_length, "length")?;
    let mut checks = vec![Check::new(
        Rule::IsString,
        messages.resolve(RuleKey::String, field, Map::new()),
    )];
    if let Some(min) = rules.min_length {
        checks.push(Check::new(
            Rule::MinLength(min),
            messages.resolve(RuleKey::MinLength, field, bound("min", min as f64)),
        ));
    }
    if let Some(max) = rules.max_length {
        checks.push(Check::new(
            Rule::MaxLength(max),
            messages.resolve(RuleKey::MaxLength, field, bound("max", max as f64)),
        ));
    }
    if let Some(pattern) = &rules.pattern {
        let regex = Regex::new(pattern).map_err(|source| CompileError::InvalidPattern {
            field: field.name.clone(),
            source,
        })?;
        checks.push(Check::new(
            Rule::Pattern(regex),
            messages.resolve(RuleKey::Pattern, field, Map::new()),
        ));
    }
    if rules.email || field.kind == FieldType::Email {
        let regex = Regex::new(EMAIL_PATTERN).map_err(|source| CompileError::InvalidPattern {
            field: field.name.clone(),
            source,
        })?;
        checks.push(Check::new(
            Rule::Email(regex),
            messages.resolve(RuleKey::Email, field, Map::new()),
        ));
    }
    if field.kind == FieldType::Url {
        checks.push(Check::new(
            Rule::Url,
            messages.resolve(RuleKey::Url, field, Map::new()),
        ));
    }
    Ok(checks)
}

fn build_number(
    field: &FieldSpec,
    rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    ensure_ordered(field, rules.min, rules.max, "range")?;
    let mut checks = vec![Check::new(
        Rule::IsNumber,
        messages.resolve(RuleKey::Number, field, Map::new()),
    )];
    if let Some(min) = rules.min {
        checks.push(Check::new(
            Rule::Min(min),
            messages.resolve(RuleKey::Min, field, bound("min", min)),
        ));
    }
    if let Some(max) = rules.max {
        checks.push(Check::new(
            Rule::Max(max),
            messages.resolve(RuleKey::Max, field, bound("max", max)),
        ));
    }
    Ok(checks)
}

fn build_boolean(
    field: &FieldSpec,
    _rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    Ok(vec![Check::new(
        Rule::IsBoolean,
        messages.resolve(RuleKey::Boolean, field, Map::new()),
    )])
}

fn build_date(
    field: &FieldSpec,
    _rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    let shape = match field.kind {
        FieldType::Datetime => DateShape::DateTime,
        FieldType::Time => DateShape::Time,
        _ => DateShape::Date,
    };
    Ok(vec![Check::new(
        Rule::IsDate(shape),
        messages.resolve(RuleKey::Date, field, Map::new()),
    )])
}

fn build_mixed(
    _field: &FieldSpec,
    _rules: &ValidationRules,
    _messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    Ok(Vec::new())
}

fn build_array(
    field: &FieldSpec,
    rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    ensure_ordered(field, rules.min_items, rules.max_items, "items")?;
    let mut checks = vec![Check::new(
        Rule::IsArray,
        messages.resolve(RuleKey::Array, field, Map::new()),
    )];
    if let Some(min) = rules.min_items {
        checks.push(Check::new(
            Rule::MinItems(min),
            messages.resolve(RuleKey::MinItems, field, bound("min", min as f64)),
        ));
    }
    if let Some(max) = rules.max_items {
        checks.push(Check::new(
            Rule::MaxItems(max),
            messages.resolve(RuleKey::MaxItems, field, bound("max", max as f64)),
        ));
    }
    Ok(checks)
}

fn build_object(
    field: &FieldSpec,
    _rules: &ValidationRules,
    messages: &MessageCatalog,
) -> Result<Vec<Check>, CompileError> {
    Ok(vec![Check::new(
        Rule::IsObject,
        messages.resolve(RuleKey::Object, field, Map::new()),
    )])
}

#[derive(Clone)]
struct CompiledCustom {
    validator: Arc<dyn CustomValidator>,
    message: String,
}

/// Executable validator for one field.
#[derive(Clone)]
pub struct FieldValidator {
    name: String,
    kind: FieldType,
    checks: Vec<Check>,
    required_flag: bool,
    required_rule: Option<RequiredRule>,
    required_message: String,
    custom: Option<CompiledCustom>,
    dependencies: Vec<String>,
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("checks", &self.checks.len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl FieldValidator {
    /// Compiles the declarative rules of `field` into a validator.
    pub fn compile(field: &FieldSpec, messages: &MessageCatalog) -> Result<Self, CompileError> {
        let default_rules = ValidationRules::default();
        let rules = field.validation.as_ref().unwrap_or(&default_rules);
        let checks = builder_for(field.kind)(field, rules, messages)?;

        let custom = match rules.custom.as_ref() {
            Some(rule) => match &rule.validator {
                Some(validator) => Some(CompiledCustom {
                    validator: Arc::clone(validator),
                    message: messages.resolve(RuleKey::Custom, field, Map::new()),
                }),
                None => {
                    debug!(
                        field = %field.name,
                        "custom rule declared without an attached validator"
                    );
                    None
                }
            },
            None => None,
        };

        debug!(
            field = %field.name,
            kind = field.kind.as_str(),
            checks = checks.len(),
            custom = custom.is_some(),
            "compiled field validator"
        );

        Ok(Self {
            name: field.name.clone(),
            kind: field.kind,
            checks,
            required_flag: field.required,
            required_rule: rules.required.clone(),
            required_message: messages.resolve(RuleKey::Required, field, Map::new()),
            custom,
            dependencies: field.dependencies().to_vec(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldType {
        self.kind
    }

    /// Paths whose changes should re-trigger this validator.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether a value is demanded given the current form values.
    pub fn is_required(&self, values: &Value) -> bool {
        self.required_flag
            || self
                .required_rule
                .as_ref()
                .is_some_and(|rule| rule.is_required(values))
    }

    /// Validates one value. `None` means the value passed.
    ///
    /// An empty value on a required field reports the required message.
    /// Otherwise absent, `null` and `""` skip the type and rule checks, while
    /// every other value runs them. The custom rule runs last, also for blank
    /// values (absent is passed as `null`).
    pub async fn validate(&self, value: Option<&Value>, values: &Value) -> Option<String> {
        if is_empty(value) && self.is_required(values) {
            return Some(self.required_message.clone());
        }

        let value = value.unwrap_or(&NULL);
        if !is_blank(value)
            && let Some(message) = self.checks.iter().find_map(|check| check.apply(value))
        {
            return Some(message.to_string());
        }

        let custom = self.custom.as_ref()?;
        match custom.validator.check(value, values).await {
            Ok(CustomOutcome::Valid) => None,
            Ok(CustomOutcome::Invalid(message)) => {
                Some(message.unwrap_or_else(|| custom.message.clone()))
            }
            Err(err) => {
                warn!(field = %self.name, error = %err, "custom rule raised an error");
                Some(custom.message.clone())
            }
        }
    }
}
