// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Low-level schema model.
//!
//! A low-level schema is the parsed, reference-resolved form of one schema fragment. Every field
//! remembers where it came from in the source document through [`NodeReference`], which carries
//! the [`Node`] of the key and of the value. Optional fields are `Option<NodeReference<T>>`:
//! `None` means the key was absent from the document.
//!
//! Child schemas are never stored inline. They are held behind [`SchemaProxy`] handles so that
//! building one schema never recurses into its children, which keeps self-referential documents
//! finite.

use core::fmt;
use std::sync::{Arc, OnceLock};

pub mod build;

pub use build::BuildError;

/// Location of a parsed key or value, identified by its JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pointer: Arc<str>,
}

impl Node {
    pub fn new(pointer: impl Into<Arc<str>>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }

    /// The JSON pointer of this node. The document root is the empty pointer.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Pointer of a child member, escaped per RFC 6901.
    pub fn child(&self, segment: &str) -> Node {
        let escaped = segment.replace('~', "~0").replace('/', "~1");
        Node::new(format!("{}/{escaped}", self.pointer))
    }

    /// Pointer of an array element.
    pub fn element(&self, index: usize) -> Node {
        Node::new(format!("{}/{index}", self.pointer))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer.is_empty() {
            f.write_str("#")
        } else {
            write!(f, "#{}", self.pointer)
        }
    }
}

/// A field value together with the nodes of its key and value.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReference<T> {
    pub value: T,
    pub key_node: Option<Arc<Node>>,
    pub value_node: Option<Arc<Node>>,
}

impl<T> NodeReference<T> {
    pub fn new(value: T, key_node: Option<Arc<Node>>, value_node: Option<Arc<Node>>) -> Self {
        Self {
            value,
            key_node,
            value_node,
        }
    }

    /// A reference with no source location, for programmatically built schemas.
    pub fn detached(value: T) -> Self {
        Self::new(value, None, None)
    }
}

/// A map key together with its node.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyReference<T> {
    pub value: T,
    pub key_node: Arc<Node>,
}

impl<T> KeyReference<T> {
    pub fn new(value: T, key_node: Arc<Node>) -> Self {
        Self { value, key_node }
    }
}

/// A list element or map value together with its node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReference<T> {
    pub value: T,
    pub value_node: Arc<Node>,
}

impl<T> ValueReference<T> {
    pub fn new(value: T, value_node: Arc<Node>) -> Self {
        Self { value, value_node }
    }
}

/// Ordered list of child schema references, as held by `allOf`, `oneOf` and friends.
pub type SchemaList = Vec<ValueReference<Arc<SchemaProxy>>>;

/// Ordered `properties` entries. Keys are expected to be distinct.
pub type PropertyList = Vec<(KeyReference<String>, ValueReference<Arc<SchemaProxy>>)>;

/// Ordered `x-` extension entries.
pub type ExtensionList = Vec<(KeyReference<String>, ValueReference<serde_json::Value>)>;

/// Low-level OpenAPI 3.0 schema object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub title: Option<NodeReference<String>>,
    pub multiple_of: Option<NodeReference<f64>>,
    pub maximum: Option<NodeReference<f64>>,
    pub exclusive_maximum: Option<NodeReference<bool>>,
    pub minimum: Option<NodeReference<f64>>,
    pub exclusive_minimum: Option<NodeReference<bool>>,
    pub max_length: Option<NodeReference<u64>>,
    pub min_length: Option<NodeReference<u64>>,
    pub pattern: Option<NodeReference<String>>,
    pub format: Option<NodeReference<String>>,
    pub max_items: Option<NodeReference<u64>>,
    pub min_items: Option<NodeReference<u64>>,
    pub unique_items: Option<NodeReference<bool>>,
    pub max_properties: Option<NodeReference<u64>>,
    pub min_properties: Option<NodeReference<u64>>,
    pub required: Option<NodeReference<Vec<ValueReference<String>>>>,
    pub enum_values: Option<NodeReference<Vec<ValueReference<serde_json::Value>>>>,
    pub type_: Option<NodeReference<String>>,
    pub all_of: Option<NodeReference<SchemaList>>,
    pub one_of: Option<NodeReference<SchemaList>>,
    pub any_of: Option<NodeReference<SchemaList>>,
    pub not: Option<NodeReference<SchemaList>>,
    pub items: Option<NodeReference<SchemaList>>,
    pub properties: Option<NodeReference<PropertyList>>,
    pub additional_properties: Option<NodeReference<serde_json::Value>>,
    pub description: Option<NodeReference<String>>,
    pub default: Option<NodeReference<serde_json::Value>>,
    pub nullable: Option<NodeReference<bool>>,
    pub discriminator: Option<NodeReference<Discriminator>>,
    pub read_only: Option<NodeReference<bool>>,
    pub write_only: Option<NodeReference<bool>>,
    pub xml: Option<NodeReference<Xml>>,
    pub external_docs: Option<NodeReference<ExternalDoc>>,
    pub example: Option<NodeReference<serde_json::Value>>,
    pub deprecated: Option<NodeReference<bool>>,
    pub extensions: ExtensionList,
}

impl Schema {
    /// Load a low-level schema from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, BuildError> {
        build::from_json_str(s)
    }

    /// Load a low-level schema from a YAML document.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(s: &str) -> Result<Self, BuildError> {
        build::from_yaml_str(s)
    }

    /// Build a low-level schema from an already parsed document rooted at `node`.
    pub fn from_serde_json_value(value: &serde_json::Value, node: &Node) -> Result<Self, BuildError> {
        build::build_schema(value, node)
    }
}

/// Low-level discriminator object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discriminator {
    pub property_name: Option<NodeReference<String>>,
    pub mapping: Vec<(KeyReference<String>, ValueReference<String>)>,
}

/// Low-level XML metadata object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Xml {
    pub name: Option<NodeReference<String>>,
    pub namespace: Option<NodeReference<String>>,
    pub prefix: Option<NodeReference<String>>,
    pub attribute: Option<NodeReference<bool>>,
    pub wrapped: Option<NodeReference<bool>>,
    pub extensions: ExtensionList,
}

/// Low-level external documentation object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDoc {
    pub description: Option<NodeReference<String>>,
    pub url: Option<NodeReference<String>>,
    pub extensions: ExtensionList,
}

/// Handle to a child schema.
///
/// A proxy is either built from an existing low-level schema, or deferred: it keeps the raw
/// document fragment and builds the low-level schema the first time [`SchemaProxy::schema`] is
/// called. Fragments carrying `$ref` are references; resolving them belongs to the resolver
/// that produced the graph, so they refuse to build.
pub struct SchemaProxy {
    node: Arc<Node>,
    source: ProxySource,
}

enum ProxySource {
    Built(Arc<Schema>),
    Deferred {
        fragment: serde_json::Value,
        built: OnceLock<Result<Arc<Schema>, BuildError>>,
    },
}

impl SchemaProxy {
    /// Wrap an already built low-level schema.
    pub fn from_schema(schema: Arc<Schema>, node: Arc<Node>) -> Self {
        Self {
            node,
            source: ProxySource::Built(schema),
        }
    }

    /// Defer building of `fragment` until it is requested.
    pub fn deferred(fragment: serde_json::Value, node: Arc<Node>) -> Self {
        Self {
            node,
            source: ProxySource::Deferred {
                fragment,
                built: OnceLock::new(),
            },
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// The `$ref` target, if this proxy stands for a reference.
    pub fn reference(&self) -> Option<&str> {
        match &self.source {
            ProxySource::Built(_) => None,
            ProxySource::Deferred { fragment, .. } => fragment.get("$ref")?.as_str(),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference().is_some()
    }

    /// The low-level schema behind this proxy, built on first use.
    pub fn schema(&self) -> Result<Arc<Schema>, BuildError> {
        match &self.source {
            ProxySource::Built(schema) => Ok(Arc::clone(schema)),
            ProxySource::Deferred { fragment, built } => built
                .get_or_init(|| {
                    if let Some(reference) = self.reference() {
                        return Err(BuildError::UnresolvedReference {
                            pointer: self.node.pointer().into(),
                            reference: reference.into(),
                        });
                    }
                    build::build_schema(fragment, &self.node).map(Arc::new)
                })
                .clone(),
        }
    }
}

impl fmt::Debug for SchemaProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SchemaProxy");
        s.field("node", &self.node);
        match &self.source {
            ProxySource::Built(_) => s.field("built", &true),
            ProxySource::Deferred { built, .. } => s.field("built", &built.get().is_some()),
        };
        if let Some(reference) = self.reference() {
            s.field("reference", &reference);
        }
        s.finish()
    }
}

impl PartialEq for SchemaProxy {
    fn eq(&self, other: &Self) -> bool {
        if self.node != other.node {
            return false;
        }
        match (&self.source, &other.source) {
            (ProxySource::Built(a), ProxySource::Built(b)) => Arc::ptr_eq(a, b) || a == b,
            (
                ProxySource::Deferred { fragment: a, .. },
                ProxySource::Deferred { fragment: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}
