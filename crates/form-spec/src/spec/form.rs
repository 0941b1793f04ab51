use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::ConditionalLogic;
use crate::simple::SimpleConditions;
use crate::spec::field::{FieldSpec, FieldType};
use crate::validate::custom::CustomValidator;

/// Titled set of fields that may be shown or hidden together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<SchemaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalLogic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<SimpleConditions>,
}

/// Entry of a form schema: a field or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SchemaItem {
    Field(FieldSpec),
    Group(FieldGroup),
}

impl From<FieldSpec> for SchemaItem {
    fn from(field: FieldSpec) -> Self {
        SchemaItem::Field(field)
    }
}

impl From<FieldGroup> for SchemaItem {
    fn from(group: FieldGroup) -> Self {
        SchemaItem::Group(group)
    }
}

/// Top-level form definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<SchemaItem>,
}

impl FormSchema {
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SchemaItem>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Finds a field by dotted path. Groups are transparent; object fields
    /// descend into their sub-fields and array fields into their item
    /// template (`contacts.email` names the `email` field of each item).
    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = find_in_items(&self.fields, first)?;
        for segment in segments {
            current = match current.kind {
                FieldType::Object => current.fields.iter().find(|field| field.name == segment)?,
                FieldType::Array => find_in_items(current.item_schema.as_deref()?, segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn field_mut(&mut self, path: &str) -> Option<&mut FieldSpec> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = find_in_items_mut(&mut self.fields, first)?;
        for segment in segments {
            current = match current.kind {
                FieldType::Object => current
                    .fields
                    .iter_mut()
                    .find(|field| field.name == segment)?,
                FieldType::Array => find_in_items_mut(current.item_schema.as_mut()?, segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Attaches an async custom rule to the field at `path`.
    /// Returns `false` when no such field exists.
    pub fn attach_custom<V>(&mut self, path: &str, validator: V) -> bool
    where
        V: CustomValidator + 'static,
    {
        match self.field_mut(path) {
            Some(field) => {
                field.attach_custom(Arc::new(validator));
                true
            }
            None => false,
        }
    }
}

fn find_in_items<'a>(items: &'a [SchemaItem], name: &str) -> Option<&'a FieldSpec> {
    items.iter().find_map(|item| match item {
        SchemaItem::Field(field) if field.name == name => Some(field),
        SchemaItem::Field(_) => None,
        SchemaItem::Group(group) => find_in_items(&group.fields, name),
    })
}

fn find_in_items_mut<'a>(items: &'a mut [SchemaItem], name: &str) -> Option<&'a mut FieldSpec> {
    items.iter_mut().find_map(|item| match item {
        SchemaItem::Field(field) if field.name == name => Some(field),
        SchemaItem::Field(_) => None,
        SchemaItem::Group(group) => find_in_items_mut(&mut group.fields, name),
    })
}
