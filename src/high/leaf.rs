// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use indexmap::IndexMap;

use super::{extract_extensions, value_of};
use crate::low;

/// Discriminator object used to select between `oneOf` / `anyOf` alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub property_name: Option<String>,
    pub mapping: IndexMap<String, String>,
}

impl Discriminator {
    pub fn new(low: &low::Discriminator) -> Self {
        Self {
            property_name: value_of(&low.property_name),
            mapping: low
                .mapping
                .iter()
                .map(|(k, v)| (k.value.clone(), v.value.clone()))
                .collect(),
        }
    }
}

/// XML serialization metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Xml {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub attribute: bool,
    pub wrapped: bool,
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl Xml {
    pub fn new(low: &low::Xml) -> Self {
        Self {
            name: value_of(&low.name),
            namespace: value_of(&low.namespace),
            prefix: value_of(&low.prefix),
            attribute: value_of(&low.attribute).unwrap_or_default(),
            wrapped: value_of(&low.wrapped).unwrap_or_default(),
            extensions: extract_extensions(&low.extensions),
        }
    }
}

/// Pointer to external documentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDoc {
    pub description: Option<String>,
    pub url: Option<String>,
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl ExternalDoc {
    pub fn new(low: &low::ExternalDoc) -> Self {
        Self {
            description: value_of(&low.description),
            url: value_of(&low.url),
            extensions: extract_extensions(&low.extensions),
        }
    }
}
