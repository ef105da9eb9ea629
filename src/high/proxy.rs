// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use super::{Provenance, Schema};
use crate::low;
use crate::materialize::MaterializeError;

/// Lazy handle to a nested schema.
///
/// Wrapping is O(1) and never looks inside the referenced schema. Deep materialization happens
/// only through [`SchemaProxy::schema`], which is what lets self-referential schema graphs be
/// transcribed without unbounded recursion.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProxy {
    reference: low::NodeReference<Provenance<low::SchemaProxy>>,
}

impl SchemaProxy {
    /// Wrap a list element such as an `allOf` entry.
    pub fn wrap(value: &low::ValueReference<Arc<low::SchemaProxy>>) -> Self {
        Self {
            reference: low::NodeReference::new(
                Provenance::new(Arc::clone(&value.value)),
                None,
                Some(Arc::clone(&value.value_node)),
            ),
        }
    }

    /// Wrap a `properties` entry, keeping the key node for provenance.
    pub fn wrap_property(
        key: &low::KeyReference<String>,
        value: &low::ValueReference<Arc<low::SchemaProxy>>,
    ) -> Self {
        Self {
            reference: low::NodeReference::new(
                Provenance::new(Arc::clone(&value.value)),
                Some(Arc::clone(&key.key_node)),
                Some(Arc::clone(&value.value_node)),
            ),
        }
    }

    /// The wrapped low-level proxy.
    pub fn as_low(&self) -> &Arc<low::SchemaProxy> {
        self.reference.value.as_arc()
    }

    pub fn key_node(&self) -> Option<&Arc<low::Node>> {
        self.reference.key_node.as_ref()
    }

    pub fn value_node(&self) -> Option<&Arc<low::Node>> {
        self.reference.value_node.as_ref()
    }

    pub fn is_reference(&self) -> bool {
        self.reference.value.is_reference()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.value.reference()
    }

    /// Materialize the referenced schema.
    ///
    /// Each call builds a fresh high-level value; the low-level schema behind it is built once
    /// and shared.
    pub fn schema(&self) -> Result<Schema, MaterializeError> {
        let low = self.reference.value.schema()?;
        Schema::new(low)
    }
}
