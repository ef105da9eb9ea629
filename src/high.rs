// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! High-level schema view.
//!
//! High-level values are immutable transcriptions of low-level nodes. Nested schemas stay behind
//! [`SchemaProxy`] handles and are materialized only when dereferenced, and every value keeps a
//! [`Provenance`] back-reference to the low-level node it came from.

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::low;

mod leaf;
mod proxy;
mod schema;

pub use leaf::{Discriminator, ExternalDoc, Xml};
pub use proxy::SchemaProxy;
pub use schema::{Composition, Schema};

/// Shared back-reference to the low-level value a high-level value was built from.
///
/// Equality is identity: two provenances are equal only when they point at the same
/// low-level allocation.
pub struct Provenance<T>(Arc<T>);

impl<T> Provenance<T> {
    pub fn new(low: Arc<T>) -> Self {
        Self(low)
    }

    pub fn as_arc(&self) -> &Arc<T> {
        &self.0
    }

    /// Whether this provenance points at `low`.
    pub fn is(&self, low: &Arc<T>) -> bool {
        Arc::ptr_eq(&self.0, low)
    }
}

impl<T> Clone for Provenance<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Provenance<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> PartialEq for Provenance<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for Provenance<T> {}

impl<T> fmt::Debug for Provenance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provenance({:p})", Arc::as_ptr(&self.0))
    }
}

/// Collect low-level `x-` extensions into an ordered map.
pub fn extract_extensions(extensions: &low::ExtensionList) -> IndexMap<String, serde_json::Value> {
    extensions
        .iter()
        .map(|(key, value)| (key.value.clone(), value.value.clone()))
        .collect()
}

/// Copy the value out of an optional low-level field.
fn value_of<T: Clone>(field: &Option<low::NodeReference<T>>) -> Option<T> {
    field.as_ref().map(|r| r.value.clone())
}
