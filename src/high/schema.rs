// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{extract_extensions, value_of, Discriminator, ExternalDoc, Provenance, SchemaProxy, Xml};
use crate::low;
use crate::materialize::{MaterializeError, Materializer};

/// The structural categories that hold ordered lists of nested schemas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Composition {
    AllOf,
    OneOf,
    AnyOf,
    Not,
    Items,
}

impl Composition {
    /// Every composition category, in materialization order.
    pub const ALL: [Composition; 5] = [
        Composition::AllOf,
        Composition::OneOf,
        Composition::AnyOf,
        Composition::Not,
        Composition::Items,
    ];

    /// Name of the category as spelled in OpenAPI documents.
    pub fn name(self) -> &'static str {
        match self {
            Composition::AllOf => "allOf",
            Composition::OneOf => "oneOf",
            Composition::AnyOf => "anyOf",
            Composition::Not => "not",
            Composition::Items => "items",
        }
    }

    /// The low-level references held by this category; empty when the field is absent.
    pub fn of_low(self, low: &low::Schema) -> &[low::ValueReference<Arc<low::SchemaProxy>>] {
        let field = match self {
            Composition::AllOf => &low.all_of,
            Composition::OneOf => &low.one_of,
            Composition::AnyOf => &low.any_of,
            Composition::Not => &low.not,
            Composition::Items => &low.items,
        };
        field.as_ref().map(|r| r.value.as_slice()).unwrap_or_default()
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Materialized, immutable view of an OpenAPI 3.0 schema object.
///
/// Scalar fields are copied from the low-level schema. Composition fields and properties hold
/// [`SchemaProxy`] handles in declaration order. The originating low-level schema stays
/// reachable through [`Schema::as_low`].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use schemaview::{low, Schema};
///
/// let low = low::Schema::from_json_str(r#"{
///     "type": "object",
///     "allOf": [{ "title": "a" }, { "title": "b" }],
///     "properties": { "id": { "type": "integer" } }
/// }"#).unwrap();
///
/// let schema = Schema::new(Arc::new(low)).unwrap();
/// assert_eq!(schema.all_of.len(), 2);
/// assert!(schema.properties.contains_key("id"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub title: Option<String>,
    pub multiple_of: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    pub exclusive_minimum: bool,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub required: Vec<String>,
    pub enum_values: Vec<String>,
    pub type_: Option<String>,
    pub all_of: Vec<SchemaProxy>,
    pub one_of: Vec<SchemaProxy>,
    pub any_of: Vec<SchemaProxy>,
    pub not: Vec<SchemaProxy>,
    pub items: Vec<SchemaProxy>,
    pub properties: IndexMap<String, SchemaProxy>,
    pub additional_properties: Option<Value>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub nullable: bool,
    pub discriminator: Option<Discriminator>,
    pub read_only: bool,
    pub write_only: bool,
    pub xml: Option<Xml>,
    pub external_docs: Option<ExternalDoc>,
    pub example: Option<Value>,
    pub deprecated: bool,
    pub extensions: IndexMap<String, Value>,
    low: Provenance<low::Schema>,
}

impl Schema {
    /// Materialize `low` using the effective configuration.
    ///
    /// See [`Materializer`] for control over worker count and timeout.
    pub fn new(low: Arc<low::Schema>) -> Result<Self, MaterializeError> {
        Materializer::new().materialize(low)
    }

    /// The low-level schema this value was materialized from.
    pub fn as_low(&self) -> &Arc<low::Schema> {
        self.low.as_arc()
    }

    /// The proxies of one composition category.
    pub fn composition(&self, category: Composition) -> &[SchemaProxy] {
        match category {
            Composition::AllOf => &self.all_of,
            Composition::OneOf => &self.one_of,
            Composition::AnyOf => &self.any_of,
            Composition::Not => &self.not,
            Composition::Items => &self.items,
        }
    }

    pub(crate) fn composition_mut(&mut self, category: Composition) -> &mut Vec<SchemaProxy> {
        match category {
            Composition::AllOf => &mut self.all_of,
            Composition::OneOf => &mut self.one_of,
            Composition::AnyOf => &mut self.any_of,
            Composition::Not => &mut self.not,
            Composition::Items => &mut self.items,
        }
    }

    /// Copy every scalar field of `low`, leaving compositions and properties empty.
    ///
    /// Runs on the calling thread and cannot fail.
    pub(crate) fn transcribe_scalars(low: Arc<low::Schema>) -> Self {
        let l = &*low;
        Self {
            title: value_of(&l.title),
            multiple_of: value_of(&l.multiple_of),
            maximum: value_of(&l.maximum),
            exclusive_maximum: value_of(&l.exclusive_maximum).unwrap_or_default(),
            minimum: value_of(&l.minimum),
            exclusive_minimum: value_of(&l.exclusive_minimum).unwrap_or_default(),
            max_length: value_of(&l.max_length),
            min_length: value_of(&l.min_length),
            pattern: value_of(&l.pattern),
            format: value_of(&l.format),
            max_items: value_of(&l.max_items),
            min_items: value_of(&l.min_items),
            unique_items: value_of(&l.unique_items).unwrap_or_default(),
            max_properties: value_of(&l.max_properties),
            min_properties: value_of(&l.min_properties),
            required: l
                .required
                .iter()
                .flat_map(|r| r.value.iter().map(|v| v.value.clone()))
                .collect(),
            enum_values: l
                .enum_values
                .iter()
                .flat_map(|r| r.value.iter().map(|v| flatten_enum_value(&v.value)))
                .collect(),
            type_: value_of(&l.type_),
            all_of: Vec::new(),
            one_of: Vec::new(),
            any_of: Vec::new(),
            not: Vec::new(),
            items: Vec::new(),
            properties: IndexMap::new(),
            additional_properties: value_of(&l.additional_properties),
            description: value_of(&l.description),
            default: value_of(&l.default),
            nullable: value_of(&l.nullable).unwrap_or_default(),
            discriminator: l.discriminator.as_ref().map(|d| Discriminator::new(&d.value)),
            read_only: value_of(&l.read_only).unwrap_or_default(),
            write_only: value_of(&l.write_only).unwrap_or_default(),
            xml: l.xml.as_ref().map(|x| Xml::new(&x.value)),
            external_docs: l.external_docs.as_ref().map(|d| ExternalDoc::new(&d.value)),
            example: value_of(&l.example),
            deprecated: value_of(&l.deprecated).unwrap_or_default(),
            extensions: extract_extensions(&l.extensions),
            low: Provenance::new(low),
        }
    }
}

// Strings are kept verbatim; any other enum member is rendered as compact JSON.
fn flatten_enum_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
