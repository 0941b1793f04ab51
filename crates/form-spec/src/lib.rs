#![allow(missing_docs)]

pub mod condition;
pub mod messages;
pub mod path;
pub mod remote;
pub mod simple;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use condition::{
    ComplexCondition, Condition, ConditionalLogic, Operator, evaluate_conditional_logic,
};
pub use messages::{MessageCatalog, MessageOverrides, RuleKey};
pub use path::resolve;
pub use remote::{
    LatestRequest, RemoteError, SearchMethod, SearchRequest, UploadResponse,
    normalize_search_response,
};
pub use simple::{SimpleConditions, evaluate_simple};
pub use spec::{
    ComputedRequired, CustomRule, FieldGroup, FieldSpec, FieldType, FormSchema, RequiredRule,
    SchemaItem, ValidationRules,
};
pub use validate::{
    CompileError, CustomOutcome, CustomRuleError, CustomValidator, ErrorMap, FieldValidator,
    FormValidator, async_rule, create_field_validation_schema, create_form_validation_schema,
    sync_rule, validate_field_value, validate_form_data, validate_single,
};
pub use visibility::{
    FieldState, VisibilityMap, resolve_visibility, should_field_be_disabled,
    should_field_be_visible,
};
