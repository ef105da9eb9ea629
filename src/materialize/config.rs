// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::num::NonZeroUsize;
use core::time::Duration;

use spin::Mutex;

/// Configuration of the materialization engine.
///
/// `workers` caps the number of threads a single materialization may use; the engine never
/// starts more threads than it has units of work. When `timeout` is set, the join gives up once
/// the deadline passes, cancels outstanding units and reports
/// [`MaterializeError::Timeout`](super::MaterializeError::Timeout).
///
/// Deserializing fills missing fields from [`MaterializeConfig::default`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterializeConfig {
    /// Maximum number of worker threads per materialization.
    pub workers: NonZeroUsize,
    /// Optional wall-clock budget for the join.
    ///
    /// Once it passes, no further units are started and the call fails with `Timeout`, but
    /// units already running are joined first. A unit that never returns still blocks the call.
    pub timeout: Option<Duration>,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            timeout: None,
        }
    }
}

impl MaterializeConfig {
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

static FALLBACK_MATERIALIZE_CONFIG: Mutex<Option<MaterializeConfig>> = Mutex::new(None);

/// Sets the process-wide fallback configuration. [`Materializer`](super::Materializer)
/// instances without their own configuration use it; when no fallback is set either,
/// [`MaterializeConfig::default`] applies.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use schemaview::{fallback_materialize_config, set_fallback_materialize_config, MaterializeConfig};
///
/// let config = MaterializeConfig::default().with_workers(NonZeroUsize::new(2).unwrap());
/// set_fallback_materialize_config(Some(config));
/// assert_eq!(fallback_materialize_config(), Some(config));
/// ```
pub fn set_fallback_materialize_config(config: Option<MaterializeConfig>) {
    *FALLBACK_MATERIALIZE_CONFIG.lock() = config;
}

/// Returns the process-wide fallback configuration, if any.
pub fn fallback_materialize_config() -> Option<MaterializeConfig> {
    let guard = FALLBACK_MATERIALIZE_CONFIG.lock();
    guard.as_ref().copied()
}
