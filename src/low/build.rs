// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builds low-level schemas from parsed JSON or YAML documents.
//!
//! The builder reads one schema object at a time. Child schemas become deferred
//! [`SchemaProxy`] handles and are only built when asked for. Unknown keys are ignored;
//! keys holding a value of the wrong JSON type are reported with their pointer.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::*;

/// Errors raised while building a low-level schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// JSON text could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(Arc<str>),
    /// YAML text could not be parsed.
    #[error("YAML parse error: {0}")]
    Yaml(Arc<str>),
    /// A schema position holds something other than an object.
    #[error("expected a schema object at '#{pointer}'")]
    NotAnObject { pointer: Arc<str> },
    /// A known key holds a value of the wrong type.
    #[error("invalid value at '#{pointer}': expected {expected}")]
    InvalidField {
        pointer: Arc<str>,
        expected: &'static str,
    },
    /// A `$ref` fragment was asked to build; resolution happens before this crate.
    #[error("unresolved reference '{reference}' at '#{pointer}'")]
    UnresolvedReference {
        pointer: Arc<str>,
        reference: Arc<str>,
    },
}

impl From<serde_json::Error> for BuildError {
    fn from(error: serde_json::Error) -> Self {
        BuildError::Json(format!("{error}").into())
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for BuildError {
    fn from(error: serde_yaml::Error) -> Self {
        BuildError::Yaml(format!("{error}").into())
    }
}

pub fn from_json_str(s: &str) -> Result<Schema, BuildError> {
    let value: Value = serde_json::from_str(s)?;
    build_schema(&value, &Node::new(""))
}

#[cfg(feature = "yaml")]
pub fn from_yaml_str(s: &str) -> Result<Schema, BuildError> {
    let value: Value = serde_yaml::from_str(s)?;
    build_schema(&value, &Node::new(""))
}

/// One `key: value` member of an object being built.
struct Field<'a> {
    value: &'a Value,
    key_node: Arc<Node>,
    value_node: Arc<Node>,
}

impl<'a> Field<'a> {
    fn new(parent: &Node, key: &str, value: &'a Value) -> Self {
        let node = parent.child(key);
        Self {
            value,
            key_node: Arc::new(node.clone()),
            value_node: Arc::new(node),
        }
    }

    fn reference<T>(&self, value: T) -> NodeReference<T> {
        NodeReference::new(
            value,
            Some(Arc::clone(&self.key_node)),
            Some(Arc::clone(&self.value_node)),
        )
    }

    fn invalid(&self, expected: &'static str) -> BuildError {
        BuildError::InvalidField {
            pointer: self.value_node.pointer().into(),
            expected,
        }
    }

    fn string(&self) -> Result<NodeReference<String>, BuildError> {
        match self.value {
            Value::String(s) => Ok(self.reference(s.clone())),
            _ => Err(self.invalid("a string")),
        }
    }

    fn number(&self) -> Result<NodeReference<f64>, BuildError> {
        self.value
            .as_f64()
            .map(|n| self.reference(n))
            .ok_or_else(|| self.invalid("a number"))
    }

    fn unsigned(&self) -> Result<NodeReference<u64>, BuildError> {
        self.value
            .as_u64()
            .map(|n| self.reference(n))
            .ok_or_else(|| self.invalid("a non-negative integer"))
    }

    fn boolean(&self) -> Result<NodeReference<bool>, BuildError> {
        self.value
            .as_bool()
            .map(|b| self.reference(b))
            .ok_or_else(|| self.invalid("a boolean"))
    }

    fn any(&self) -> NodeReference<Value> {
        self.reference(self.value.clone())
    }

    fn object(&self) -> Result<&'a Map<String, Value>, BuildError> {
        self.value.as_object().ok_or_else(|| self.invalid("an object"))
    }

    fn strings(&self) -> Result<NodeReference<Vec<ValueReference<String>>>, BuildError> {
        let items = self.value.as_array().ok_or_else(|| self.invalid("an array"))?;
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let node = Arc::new(self.value_node.element(idx));
            match item {
                Value::String(s) => out.push(ValueReference::new(s.clone(), node)),
                _ => {
                    return Err(BuildError::InvalidField {
                        pointer: node.pointer().into(),
                        expected: "a string",
                    })
                }
            }
        }
        Ok(self.reference(out))
    }

    fn values(&self) -> Result<NodeReference<Vec<ValueReference<Value>>>, BuildError> {
        let items = self.value.as_array().ok_or_else(|| self.invalid("an array"))?;
        let out = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                ValueReference::new(item.clone(), Arc::new(self.value_node.element(idx)))
            })
            .collect();
        Ok(self.reference(out))
    }

    /// A list of child schemas. `single` allows a lone schema object in place of the list,
    /// as OpenAPI 3.0 does for `items` and `not`.
    fn schemas(&self, single: bool) -> Result<NodeReference<SchemaList>, BuildError> {
        match self.value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let node = Arc::new(self.value_node.element(idx));
                    out.push(ValueReference::new(child_proxy(item, &node)?, node));
                }
                Ok(self.reference(out))
            }
            Value::Object(_) if single => {
                let node = Arc::clone(&self.value_node);
                let proxy = child_proxy(self.value, &node)?;
                Ok(self.reference(vec![ValueReference::new(proxy, node)]))
            }
            _ if single => Err(self.invalid("a schema or an array of schemas")),
            _ => Err(self.invalid("an array of schemas")),
        }
    }

    fn properties(&self) -> Result<NodeReference<PropertyList>, BuildError> {
        let members = self.object()?;
        let mut out = Vec::with_capacity(members.len());
        for (key, value) in members {
            let node = Arc::new(self.value_node.child(key));
            let proxy = child_proxy(value, &node)?;
            out.push((
                KeyReference::new(key.clone(), Arc::clone(&node)),
                ValueReference::new(proxy, node),
            ));
        }
        Ok(self.reference(out))
    }
}

fn child_proxy(value: &Value, node: &Arc<Node>) -> Result<Arc<SchemaProxy>, BuildError> {
    if !value.is_object() {
        return Err(BuildError::NotAnObject {
            pointer: node.pointer().into(),
        });
    }
    Ok(Arc::new(SchemaProxy::deferred(value.clone(), Arc::clone(node))))
}

fn extensions(object: &Map<String, Value>, node: &Node) -> ExtensionList {
    object
        .iter()
        .filter(|(key, _)| key.starts_with("x-"))
        .map(|(key, value)| {
            let field = Field::new(node, key, value);
            (
                KeyReference::new(key.clone(), field.key_node),
                ValueReference::new(value.clone(), field.value_node),
            )
        })
        .collect()
}

/// Build the schema object `value` located at `node`. Children are left deferred.
pub fn build_schema(value: &Value, node: &Node) -> Result<Schema, BuildError> {
    let object = value.as_object().ok_or_else(|| BuildError::NotAnObject {
        pointer: node.pointer().into(),
    })?;

    let mut schema = Schema {
        extensions: extensions(object, node),
        ..Schema::default()
    };

    for (key, value) in object {
        let field = Field::new(node, key, value);
        match key.as_str() {
            "title" => schema.title = Some(field.string()?),
            "multipleOf" => schema.multiple_of = Some(field.number()?),
            "maximum" => schema.maximum = Some(field.number()?),
            "exclusiveMaximum" => schema.exclusive_maximum = Some(field.boolean()?),
            "minimum" => schema.minimum = Some(field.number()?),
            "exclusiveMinimum" => schema.exclusive_minimum = Some(field.boolean()?),
            "maxLength" => schema.max_length = Some(field.unsigned()?),
            "minLength" => schema.min_length = Some(field.unsigned()?),
            "pattern" => schema.pattern = Some(field.string()?),
            "format" => schema.format = Some(field.string()?),
            "maxItems" => schema.max_items = Some(field.unsigned()?),
            "minItems" => schema.min_items = Some(field.unsigned()?),
            "uniqueItems" => schema.unique_items = Some(field.boolean()?),
            "maxProperties" => schema.max_properties = Some(field.unsigned()?),
            "minProperties" => schema.min_properties = Some(field.unsigned()?),
            "required" => schema.required = Some(field.strings()?),
            "enum" => schema.enum_values = Some(field.values()?),
            "type" => schema.type_ = Some(field.string()?),
            "allOf" => schema.all_of = Some(field.schemas(false)?),
            "oneOf" => schema.one_of = Some(field.schemas(false)?),
            "anyOf" => schema.any_of = Some(field.schemas(false)?),
            "not" => schema.not = Some(field.schemas(true)?),
            "items" => schema.items = Some(field.schemas(true)?),
            "properties" => schema.properties = Some(field.properties()?),
            "additionalProperties" => schema.additional_properties = Some(field.any()),
            "description" => schema.description = Some(field.string()?),
            "default" => schema.default = Some(field.any()),
            "nullable" => schema.nullable = Some(field.boolean()?),
            "discriminator" => schema.discriminator = Some(discriminator(&field)?),
            "readOnly" => schema.read_only = Some(field.boolean()?),
            "writeOnly" => schema.write_only = Some(field.boolean()?),
            "xml" => schema.xml = Some(xml(&field)?),
            "externalDocs" => schema.external_docs = Some(external_doc(&field)?),
            "example" => schema.example = Some(field.any()),
            "deprecated" => schema.deprecated = Some(field.boolean()?),
            _ => {}
        }
    }

    Ok(schema)
}

fn discriminator(field: &Field<'_>) -> Result<NodeReference<Discriminator>, BuildError> {
    let node = &field.value_node;
    let mut out = Discriminator::default();
    for (key, value) in field.object()? {
        let member = Field::new(node, key, value);
        match key.as_str() {
            "propertyName" => out.property_name = Some(member.string()?),
            "mapping" => {
                for (name, target) in member.object()? {
                    let entry = Field::new(&member.value_node, name, target);
                    let target = entry.string()?.value;
                    out.mapping.push((
                        KeyReference::new(name.clone(), entry.key_node),
                        ValueReference::new(target, entry.value_node),
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(field.reference(out))
}

fn xml(field: &Field<'_>) -> Result<NodeReference<Xml>, BuildError> {
    let node = &field.value_node;
    let object = field.object()?;
    let mut out = Xml {
        extensions: extensions(object, node),
        ..Xml::default()
    };
    for (key, value) in object {
        let member = Field::new(node, key, value);
        match key.as_str() {
            "name" => out.name = Some(member.string()?),
            "namespace" => out.namespace = Some(member.string()?),
            "prefix" => out.prefix = Some(member.string()?),
            "attribute" => out.attribute = Some(member.boolean()?),
            "wrapped" => out.wrapped = Some(member.boolean()?),
            _ => {}
        }
    }
    Ok(field.reference(out))
}

fn external_doc(field: &Field<'_>) -> Result<NodeReference<ExternalDoc>, BuildError> {
    let node = &field.value_node;
    let object = field.object()?;
    let mut out = ExternalDoc {
        extensions: extensions(object, node),
        ..ExternalDoc::default()
    };
    for (key, value) in object {
        let member = Field::new(node, key, value);
        match key.as_str() {
            "description" => out.description = Some(member.string()?),
            "url" => out.url = Some(member.string()?),
            _ => {}
        }
    }
    Ok(field.reference(out))
}
