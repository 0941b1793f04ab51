pub mod field;
pub mod form;

pub use field::{
    ComputedRequired, CustomRule, FieldSpec, FieldType, RequiredRule, ValidationRules,
};
pub use form::{FieldGroup, FormSchema, SchemaItem};
