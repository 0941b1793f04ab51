use std::collections::BTreeSet;

use futures::future::{BoxFuture, FutureExt, join_all};
use serde_json::Value;
use tracing::debug;

use crate::messages::MessageCatalog;
use crate::path::{join, resolve};
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::{FormSchema, SchemaItem};
use crate::validate::field::FieldValidator;
use crate::validate::{CompileError, ErrorMap};
use crate::visibility::VisibilityRule;

static MISSING: Value = Value::Null;

type Finding<'a> = BoxFuture<'a, Option<(String, String)>>;

#[derive(Debug, Clone)]
enum Children {
    /// Array item template, validated once per item. Names and visibility
    /// rules resolve inside the item; rules still see the whole form values.
    Items(FormValidator),
    /// Object sub-fields, validated against the enclosing form values.
    Fields(FormValidator),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    gates: Vec<VisibilityRule>,
    validator: FieldValidator,
    children: Option<Children>,
}

impl Node {
    fn is_visible(&self, values: &Value) -> bool {
        self.gates.iter().all(|gate| gate.is_visible(values))
    }
}

/// Whole-form validator compiled from a [`FormSchema`].
#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    nodes: Vec<Node>,
}

impl FormValidator {
    pub fn compile(schema: &FormSchema, messages: &MessageCatalog) -> Result<Self, CompileError> {
        let validator = Self::compile_items(&schema.fields, messages, "")?;
        debug!(
            form = schema.id.as_deref().unwrap_or("<anonymous>"),
            fields = validator.nodes.len(),
            "compiled form validator"
        );
        Ok(validator)
    }

    fn compile_items(
        items: &[SchemaItem],
        messages: &MessageCatalog,
        prefix: &str,
    ) -> Result<Self, CompileError> {
        let mut builder = ScopeBuilder {
            messages,
            prefix,
            nodes: Vec::new(),
            seen: BTreeSet::new(),
        };
        builder.add_items(items, &[])?;
        Ok(Self {
            nodes: builder.nodes,
        })
    }

    /// Number of top-level validators in this scope.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validates every field and collects all failures keyed by dotted path.
    pub async fn validate(&self, data: &Value) -> ErrorMap {
        self.run(data, false).await
    }

    /// Like [`FormValidator::validate`], skipping fields hidden by their
    /// own or an enclosing group's visibility rules.
    pub async fn validate_visible(&self, data: &Value) -> ErrorMap {
        self.run(data, true).await
    }

    async fn run(&self, data: &Value, visible_only: bool) -> ErrorMap {
        let mut findings = Vec::new();
        self.collect(data, data, data, "", visible_only, &mut findings);
        let checked = findings.len();
        let errors: ErrorMap = join_all(findings).await.into_iter().flatten().collect();
        debug!(checked, failed = errors.len(), "form validation finished");
        errors
    }

    fn collect<'a>(
        &'a self,
        scope: &'a Value,
        visibility: &'a Value,
        values: &'a Value,
        prefix: &str,
        visible_only: bool,
        findings: &mut Vec<Finding<'a>>,
    ) {
        for node in &self.nodes {
            if visible_only && !node.is_visible(visibility) {
                continue;
            }
            let path = join(prefix, &node.name);
            let value = resolve(scope, &node.name);
            match &node.children {
                Some(Children::Fields(fields)) => {
                    let inner = match value {
                        Some(object) if object.is_object() => Some(object),
                        None | Some(Value::Null) => Some(&MISSING),
                        Some(_) => None,
                    };
                    if let Some(inner) = inner {
                        fields.collect(inner, visibility, values, &path, visible_only, findings);
                    }
                }
                Some(Children::Items(template)) => {
                    if let Some(Value::Array(entries)) = value {
                        for (index, entry) in entries.iter().enumerate() {
                            let item_path = join(&path, &index.to_string());
                            template.collect(
                                entry,
                                entry,
                                values,
                                &item_path,
                                visible_only,
                                findings,
                            );
                        }
                    }
                }
                None => {}
            }
            findings.push(finding(&node.validator, value, values, path));
        }
    }

    /// Validates the single field at `path` (`items.0.name`, `address.city`)
    /// with its compiled validator. Unknown paths report nothing.
    pub async fn validate_at(&self, path: &str, data: &Value) -> Option<String> {
        let Some((validator, value)) = self.locate(path, data) else {
            debug!(path, "no validator compiled for path");
            return None;
        };
        validator.validate(value, data).await
    }

    fn locate<'a>(
        &'a self,
        path: &str,
        data: &'a Value,
    ) -> Option<(&'a FieldValidator, Option<&'a Value>)> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut rest = segments.as_slice();
        let mut form = self;
        let mut scope = data;
        loop {
            let (name, tail) = rest.split_first()?;
            let node = form.nodes.iter().find(|node| node.name == *name)?;
            let value = resolve(scope, name);
            if tail.is_empty() {
                return Some((&node.validator, value));
            }
            match node.children.as_ref()? {
                Children::Fields(fields) => {
                    form = fields;
                    scope = value.unwrap_or(&MISSING);
                    rest = tail;
                }
                Children::Items(template) => {
                    let (index, after) = tail.split_first()?;
                    let index = index.parse::<usize>().ok()?;
                    let entry = value?.as_array()?.get(index)?;
                    form = template;
                    scope = entry;
                    rest = after;
                }
            }
        }
    }

    /// Custom-rule dependency lists, keyed by field path. Array item paths
    /// use `*` in place of the index.
    pub fn dependencies(&self) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        self.collect_dependencies("", &mut out);
        out
    }

    fn collect_dependencies(&self, prefix: &str, out: &mut Vec<(String, Vec<String>)>) {
        for node in &self.nodes {
            let path = join(prefix, &node.name);
            match &node.children {
                Some(Children::Fields(fields)) => fields.collect_dependencies(&path, out),
                Some(Children::Items(template)) => {
                    template.collect_dependencies(&join(&path, "*"), out)
                }
                None => {}
            }
            if !node.validator.dependencies().is_empty() {
                out.push((path, node.validator.dependencies().to_vec()));
            }
        }
    }
}

fn finding<'a>(
    validator: &'a FieldValidator,
    value: Option<&'a Value>,
    values: &'a Value,
    path: String,
) -> Finding<'a> {
    async move {
        validator
            .validate(value, values)
            .await
            .map(|message| (path, message))
    }
    .boxed()
}

struct ScopeBuilder<'m> {
    messages: &'m MessageCatalog,
    prefix: &'m str,
    nodes: Vec<Node>,
    seen: BTreeSet<String>,
}

impl ScopeBuilder<'_> {
    fn add_items(
        &mut self,
        items: &[SchemaItem],
        gates: &[VisibilityRule],
    ) -> Result<(), CompileError> {
        for item in items {
            match item {
                SchemaItem::Field(field) => self.add_field(field, gates)?,
                SchemaItem::Group(group) => {
                    let mut inner = gates.to_vec();
                    inner.extend(VisibilityRule::for_group(group));
                    self.add_items(&group.fields, &inner)?;
                }
            }
        }
        Ok(())
    }

    fn add_field(
        &mut self,
        field: &FieldSpec,
        gates: &[VisibilityRule],
    ) -> Result<(), CompileError> {
        let path = join(self.prefix, &field.name);
        if !self.seen.insert(field.name.clone()) {
            return Err(CompileError::DuplicateField { path });
        }

        let validator = FieldValidator::compile(field, self.messages)?;
        let children = match field.kind {
            FieldType::Array => {
                let template = field
                    .item_schema
                    .as_deref()
                    .ok_or_else(|| CompileError::MissingItemSchema { field: path.clone() })?;
                let item_prefix = join(&path, "*");
                Some(Children::Items(FormValidator::compile_items(
                    template,
                    self.messages,
                    &item_prefix,
                )?))
            }
            FieldType::Object => {
                let mut nested = ScopeBuilder {
                    messages: self.messages,
                    prefix: &path,
                    nodes: Vec::new(),
                    seen: BTreeSet::new(),
                };
                for child in &field.fields {
                    nested.add_field(child, &[])?;
                }
                Some(Children::Fields(FormValidator {
                    nodes: nested.nodes,
                }))
            }
            _ => None,
        };

        let mut node_gates = gates.to_vec();
        node_gates.extend(VisibilityRule::for_field(field));
        self.nodes.push(Node {
            name: field.name.clone(),
            gates: node_gates,
            validator,
            children,
        });
        Ok(())
    }
}
