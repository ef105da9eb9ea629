// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/*
CompletionBarrier joins a known number of completion signals coming from two kinds of
units: composition slots (one signal per non-empty slot) and property entries (one signal
per entry). Both kinds count the same towards the expected total.

The barrier carries no payload. Units publish their results into cells owned by the caller
before signalling; because every signal goes through the barrier's mutex and the waiter
re-acquires that mutex before returning, everything a unit wrote before signalling is
visible to the waiter once wait() returns.

A unit that fails records its error with fail(). The first recorded error wins, the barrier
is marked cancelled so that workers stop claiming new units, and the waiter is released
with that error instead of waiting for signals that will never come. A deadline passed to
wait() behaves the same way, producing MaterializeError::Timeout.
*/

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::MaterializeError;

/// Kind of unit reporting completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Every element of one composition slot has been wrapped.
    Slot,
    /// One property entry has been wrapped.
    Property,
}

#[derive(Debug, Default)]
struct State {
    slots: usize,
    properties: usize,
    failure: Option<MaterializeError>,
}

impl State {
    fn arrived(&self) -> usize {
        self.slots + self.properties
    }
}

/// Join counter released once `expected` signals have arrived or a unit fails.
#[derive(Debug)]
pub struct CompletionBarrier {
    expected: usize,
    state: Mutex<State>,
    released: Condvar,
    cancelled: AtomicBool,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            state: Mutex::new(State::default()),
            released: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of signals received so far, as `(slots, properties)`.
    pub fn arrived(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.slots, state.properties)
    }

    /// Report one completed unit.
    pub fn signal(&self, signal: Signal) {
        let mut state = self.state.lock();
        match signal {
            Signal::Slot => state.slots += 1,
            Signal::Property => state.properties += 1,
        }
        if state.arrived() >= self.expected {
            self.released.notify_all();
        }
    }

    /// Record a unit failure and cancel the remaining work. Only the first error is kept.
    pub fn fail(&self, error: MaterializeError) {
        let mut state = self.state.lock();
        if state.failure.is_none() {
            state.failure = Some(error);
        }
        self.cancelled.store(true, Ordering::Release);
        self.released.notify_all();
    }

    /// Stop workers from claiming further units.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Block until every expected signal has arrived, a unit fails, or `timeout` elapses.
    ///
    /// Returns immediately when no signals are expected.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<(), MaterializeError> {
        if self.expected == 0 {
            return Ok(());
        }

        let start = Instant::now();
        let deadline = timeout.map(|limit| (start + limit, limit));
        let mut state = self.state.lock();
        loop {
            if let Some(error) = &state.failure {
                return Err(error.clone());
            }
            if state.arrived() >= self.expected {
                return Ok(());
            }
            match deadline {
                Some((at, limit)) => {
                    let timed_out = self.released.wait_until(&mut state, at).timed_out();
                    if timed_out && state.failure.is_none() && state.arrived() < self.expected {
                        self.cancel();
                        return Err(MaterializeError::Timeout {
                            elapsed: start.elapsed(),
                            limit,
                        });
                    }
                }
                None => self.released.wait(&mut state),
            }
        }
    }
}
