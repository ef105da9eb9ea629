// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::time::Duration;
use std::sync::Arc;

use thiserror::Error;

use crate::high::Composition;
use crate::low::BuildError;

/// Errors reported by the materialization engine.
///
/// A failed materialization never yields a partially populated value; the first error raised by
/// any unit is returned and the remaining units are cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    /// Two `properties` entries share a key.
    #[error("duplicate property '{key}' at '#{pointer}'")]
    DuplicateProperty { key: Arc<str>, pointer: Arc<str> },

    /// A composition slot was joined with cells that no unit filled.
    #[error("{category} slot completed with {filled} of {expected} elements")]
    IncompleteSlot {
        category: Composition,
        filled: usize,
        expected: usize,
    },

    /// A property cell was left empty after the join.
    #[error("property '{key}' was not materialized")]
    IncompleteProperty { key: Arc<str> },

    /// A unit wrote a cell that was already filled.
    #[error("internal error: {0}")]
    Internal(Arc<str>),

    /// The barrier wait ran past the configured deadline.
    #[error("materialization exceeded time limit (elapsed={elapsed:?}, limit={limit:?})")]
    Timeout { elapsed: Duration, limit: Duration },

    /// A worker thread panicked while running a unit.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(Arc<str>),

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(Arc<str>),

    /// Building the low-level schema behind a proxy failed.
    #[error(transparent)]
    Build(#[from] BuildError),
}
