// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Concurrent materialization of high-level schemas.
//!
//! Materializing a low-level schema happens in three steps:
//!
//! 1. Scalar fields are copied on the calling thread.
//! 2. Every element of every non-empty composition slot (`allOf`, `oneOf`, `anyOf`, `not`,
//!    `items`) and every `properties` entry becomes one unit of work. Units run on a bounded
//!    [`WorkerPool`]; each wraps its low-level reference in a [`SchemaProxy`] and stores it in
//!    a cell reserved for it.
//! 3. The calling thread waits on a [`CompletionBarrier`] expecting one signal per non-empty
//!    slot plus one per property, then drains the cells sequentially.
//!
//! Composition cells are addressed by the element's index in its slot, so the output order is
//! the declaration order no matter which worker finishes first. Property cells are private to
//! their unit and merged after the join in input order, so no lock guards the property map.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use tracing::{debug, debug_span};

use crate::high::{Composition, Schema, SchemaProxy};
use crate::low;

mod barrier;
mod config;
mod error;
mod pool;

pub use barrier::{CompletionBarrier, Signal};
pub use config::{fallback_materialize_config, set_fallback_materialize_config, MaterializeConfig};
pub use error::MaterializeError;
pub use pool::WorkerPool;

/// Materializes high-level schemas from low-level ones.
///
/// A materializer without its own configuration uses the process-wide fallback set through
/// [`set_fallback_materialize_config`], or [`MaterializeConfig::default`] when there is none.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    config: Option<MaterializeConfig>,
}

/// One unit of work, as seen by the hook passed to [`Materializer::materialize_observed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Element {
        category: Composition,
        index: usize,
        len: usize,
    },
    Property {
        index: usize,
    },
}

impl Materializer {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(config: MaterializeConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Override (or with `None`, stop overriding) the fallback configuration.
    pub fn set_config(&mut self, config: Option<MaterializeConfig>) {
        self.config = config;
    }

    /// The configuration a call to [`Materializer::materialize`] would use right now.
    pub fn config(&self) -> MaterializeConfig {
        self.config
            .or_else(fallback_materialize_config)
            .unwrap_or_default()
    }

    /// Materialize `low` into a fully populated high-level schema.
    pub fn materialize(&self, low: Arc<low::Schema>) -> Result<Schema, MaterializeError> {
        self.materialize_observed(low, &|_| Ok(()))
    }

    /// Materialize with `observe` invoked on the worker thread before each unit runs. An error
    /// from `observe` fails the unit.
    pub(crate) fn materialize_observed(
        &self,
        low: Arc<low::Schema>,
        observe: &(dyn Fn(Unit) -> Result<(), MaterializeError> + Sync),
    ) -> Result<Schema, MaterializeError> {
        let config = self.config();
        let mut schema = Schema::transcribe_scalars(Arc::clone(&low));

        let slots: Vec<SlotBuilder<'_>> = Composition::ALL
            .into_iter()
            .filter_map(|category| SlotBuilder::new(category, category.of_low(&low)))
            .collect();
        let properties = PropertyMapBuilder::new(
            low.properties
                .as_ref()
                .map(|p| p.value.as_slice())
                .unwrap_or_default(),
        )?;

        let elements: usize = slots.iter().map(SlotBuilder::len).sum();
        let units = elements + properties.len();
        let expected = slots.len() + properties.len();

        let span = debug_span!(
            "materialize",
            slots = slots.len(),
            elements,
            properties = properties.len(),
            workers = config.workers.get()
        );
        let _enter = span.enter();

        if expected > 0 {
            let barrier = CompletionBarrier::new(expected);
            WorkerPool::new(config.workers).run(units, &barrier, config.timeout, |mut unit| {
                for slot in &slots {
                    if unit < slot.len() {
                        observe(Unit::Element {
                            category: slot.category,
                            index: unit,
                            len: slot.len(),
                        })?;
                        return slot.build(unit, &barrier);
                    }
                    unit -= slot.len();
                }
                observe(Unit::Property { index: unit })?;
                properties.build(unit, &barrier)
            })?;
            debug!(signals = barrier.expected(), "all units joined");
        }

        for slot in slots {
            let category = slot.category;
            *schema.composition_mut(category) = slot.finish()?;
        }
        schema.properties = properties.finish()?;

        Ok(schema)
    }
}

/// Collects the proxies of one composition slot.
///
/// Cells are pre-sized and written by index. The unit that fills the last cell signals the
/// barrier, so each slot reports exactly once.
struct SlotBuilder<'a> {
    category: Composition,
    input: &'a [low::ValueReference<Arc<low::SchemaProxy>>],
    cells: Vec<OnceLock<SchemaProxy>>,
    pending: AtomicUsize,
}

impl<'a> SlotBuilder<'a> {
    fn new(
        category: Composition,
        input: &'a [low::ValueReference<Arc<low::SchemaProxy>>],
    ) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        Some(Self {
            category,
            input,
            cells: input.iter().map(|_| OnceLock::new()).collect(),
            pending: AtomicUsize::new(input.len()),
        })
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn build(&self, index: usize, barrier: &CompletionBarrier) -> Result<(), MaterializeError> {
        let proxy = SchemaProxy::wrap(&self.input[index]);
        if self.cells[index].set(proxy).is_err() {
            return Err(MaterializeError::Internal(
                format!("{} element {index} built twice", self.category).into(),
            ));
        }
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            barrier.signal(Signal::Slot);
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<SchemaProxy>, MaterializeError> {
        let expected = self.cells.len();
        let out: Vec<SchemaProxy> = self
            .cells
            .into_iter()
            .filter_map(OnceLock::into_inner)
            .collect();
        if out.len() != expected {
            return Err(MaterializeError::IncompleteSlot {
                category: self.category,
                filled: out.len(),
                expected,
            });
        }
        Ok(out)
    }
}

/// Collects `properties` entries, one private cell per entry.
struct PropertyMapBuilder<'a> {
    input: &'a [(
        low::KeyReference<String>,
        low::ValueReference<Arc<low::SchemaProxy>>,
    )],
    cells: Vec<OnceLock<SchemaProxy>>,
}

impl<'a> PropertyMapBuilder<'a> {
    /// Rejects inputs with repeated keys; every later step relies on keys being distinct.
    fn new(
        input: &'a [(
            low::KeyReference<String>,
            low::ValueReference<Arc<low::SchemaProxy>>,
        )],
    ) -> Result<Self, MaterializeError> {
        let mut seen = HashSet::with_capacity(input.len());
        for (key, _) in input {
            if !seen.insert(key.value.as_str()) {
                return Err(MaterializeError::DuplicateProperty {
                    key: key.value.as_str().into(),
                    pointer: key.key_node.pointer().into(),
                });
            }
        }
        Ok(Self {
            input,
            cells: input.iter().map(|_| OnceLock::new()).collect(),
        })
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn build(&self, index: usize, barrier: &CompletionBarrier) -> Result<(), MaterializeError> {
        let (key, value) = &self.input[index];
        if self.cells[index]
            .set(SchemaProxy::wrap_property(key, value))
            .is_err()
        {
            return Err(MaterializeError::Internal(
                format!("property '{}' built twice", key.value).into(),
            ));
        }
        barrier.signal(Signal::Property);
        Ok(())
    }

    fn finish(self) -> Result<IndexMap<String, SchemaProxy>, MaterializeError> {
        let mut out = IndexMap::with_capacity(self.input.len());
        for ((key, _), cell) in self.input.iter().zip(self.cells) {
            let proxy = cell
                .into_inner()
                .ok_or_else(|| MaterializeError::IncompleteProperty {
                    key: key.value.as_str().into(),
                })?;
            out.insert(key.value.clone(), proxy);
        }
        Ok(out)
    }
}
