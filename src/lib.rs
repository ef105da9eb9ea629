// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

pub mod high;
pub mod low;
pub mod materialize;

pub use high::{Schema, SchemaProxy};
pub use materialize::{
    fallback_materialize_config, set_fallback_materialize_config, MaterializeConfig,
    MaterializeError, Materializer,
};
