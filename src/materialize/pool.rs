// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded pool of scoped worker threads.
//!
//! Workers claim unit indices from a shared atomic cursor until the units run out or the
//! barrier is cancelled. The calling thread waits on the barrier while the workers run; the
//! thread scope guarantees no worker outlives [`WorkerPool::run`].

use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tracing::{trace, warn};

use super::{CompletionBarrier, MaterializeError};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl WorkerPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Run `job` once for every index in `0..units`, then wait on `barrier`.
    ///
    /// `job` is responsible for signalling the barrier. A job error or panic is recorded in the
    /// barrier and cancels the units not yet claimed. No threads are started when `units` is 0.
    ///
    /// `timeout` bounds the barrier wait only. Units already running are not interrupted, and
    /// this call returns after the last of them finishes.
    pub fn run<F>(
        &self,
        units: usize,
        barrier: &CompletionBarrier,
        timeout: Option<Duration>,
        job: F,
    ) -> Result<(), MaterializeError>
    where
        F: Fn(usize) -> Result<(), MaterializeError> + Sync,
    {
        if units == 0 {
            return Ok(());
        }

        let workers = self.workers.get().min(units);
        let cursor = AtomicUsize::new(0);

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let (cursor, job) = (&cursor, &job);
                let spawned = thread::Builder::new()
                    .name(format!("schemaview-worker-{worker}"))
                    .spawn_scoped(s, move || work(worker, units, cursor, barrier, job));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        barrier.fail(MaterializeError::Spawn(format!("{e}").into()));
                        break;
                    }
                }
            }

            let result = barrier.wait(timeout);
            if let Err(e) = &result {
                warn!(error = %e, "materialization cancelled");
                barrier.cancel();
            }

            for handle in handles {
                if let Err(payload) = handle.join() {
                    // Units run under catch_unwind, so this only fires if the worker loop
                    // itself panicked.
                    return Err(MaterializeError::WorkerPanicked(describe_panic(&*payload)));
                }
            }
            result
        })
    }
}

fn work<F>(
    worker: usize,
    units: usize,
    cursor: &AtomicUsize,
    barrier: &CompletionBarrier,
    job: &F,
) where
    F: Fn(usize) -> Result<(), MaterializeError> + Sync,
{
    while !barrier.is_cancelled() {
        let unit = cursor.fetch_add(1, Ordering::Relaxed);
        if unit >= units {
            break;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| job(unit))) {
            Ok(Ok(())) => trace!(worker, unit, "unit completed"),
            Ok(Err(e)) => {
                barrier.fail(e);
                break;
            }
            Err(payload) => {
                barrier.fail(MaterializeError::WorkerPanicked(describe_panic(&*payload)));
                break;
            }
        }
    }
}

fn describe_panic(payload: &(dyn core::any::Any + Send)) -> Arc<str> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Arc::from(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Arc::from(s.as_str())
    } else {
        Arc::from("non-string panic payload")
    }
}
