use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::condition::ConditionalLogic;
use crate::path::join;
use crate::simple::{SimpleConditions, evaluate_simple};
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::{FieldGroup, FormSchema, SchemaItem};

/// Visible/disabled decision for one field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub visible: bool,
    pub disabled: bool,
}

pub type VisibilityMap = BTreeMap<String, FieldState>;

/// Visibility conditions of one field or group.
///
/// `conditional` wins over `visibleWhen`; with neither the target is visible.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VisibilityRule {
    Conditional(ConditionalLogic),
    Simple(SimpleConditions),
}

impl VisibilityRule {
    fn pick(
        conditional: Option<&ConditionalLogic>,
        visible_when: Option<&SimpleConditions>,
    ) -> Option<Self> {
        match (conditional, visible_when) {
            (Some(logic), _) => Some(VisibilityRule::Conditional(logic.clone())),
            (None, Some(simple)) => Some(VisibilityRule::Simple(simple.clone())),
            (None, None) => None,
        }
    }

    pub(crate) fn for_field(field: &FieldSpec) -> Option<Self> {
        Self::pick(field.conditional.as_ref(), field.visible_when.as_ref())
    }

    pub(crate) fn for_group(group: &FieldGroup) -> Option<Self> {
        Self::pick(group.conditional.as_ref(), group.visible_when.as_ref())
    }

    pub(crate) fn is_visible(&self, values: &Value) -> bool {
        match self {
            VisibilityRule::Conditional(logic) => logic.evaluate(values),
            VisibilityRule::Simple(simple) => evaluate_simple(simple, values),
        }
    }
}

/// Whether `field` should be shown for the given values.
pub fn should_field_be_visible(field: &FieldSpec, values: &Value) -> bool {
    if let Some(logic) = &field.conditional {
        return logic.evaluate(values);
    }
    if let Some(simple) = &field.visible_when {
        return evaluate_simple(simple, values);
    }
    true
}

/// Whether `field` should be disabled for the given values.
///
/// Only the static flag and `disabledWhen` are honored; disablement has no
/// complex-conditional form.
pub fn should_field_be_disabled(field: &FieldSpec, values: &Value) -> bool {
    if field.disabled {
        return true;
    }
    field
        .disabled_when
        .as_ref()
        .is_some_and(|simple| evaluate_simple(simple, values))
}

/// Resolves visibility and disablement for every field in the schema.
///
/// Fields inside a hidden group are hidden. Object sub-fields are keyed
/// `parent.child`; array item templates are not expanded.
pub fn resolve_visibility(schema: &FormSchema, values: &Value) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    walk_items(&schema.fields, values, "", true, &mut map);
    map
}

fn walk_items(
    items: &[SchemaItem],
    values: &Value,
    prefix: &str,
    parent_visible: bool,
    map: &mut VisibilityMap,
) {
    for item in items {
        match item {
            SchemaItem::Field(field) => walk_field(field, values, prefix, parent_visible, map),
            SchemaItem::Group(group) => {
                let visible = parent_visible
                    && VisibilityRule::for_group(group).is_none_or(|rule| rule.is_visible(values));
                walk_items(&group.fields, values, prefix, visible, map);
            }
        }
    }
}

fn walk_field(
    field: &FieldSpec,
    values: &Value,
    prefix: &str,
    parent_visible: bool,
    map: &mut VisibilityMap,
) {
    let path = join(prefix, &field.name);
    let state = FieldState {
        visible: parent_visible && should_field_be_visible(field, values),
        disabled: should_field_be_disabled(field, values),
    };
    if field.kind == FieldType::Object {
        for child in &field.fields {
            walk_field(child, values, &path, state.visible, map);
        }
    }
    map.insert(path, state);
}
