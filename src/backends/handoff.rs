// SPDX-License-Identifier: GPL-3.0-only

//! GPU to CPU frame handoff
//!
//! A single-slot rendezvous between the render context and the capture path.
//! The capture path takes the slot before it requests a transfer, then waits
//! until the render context signals that the CPU copy is complete. Holding
//! the lock across the request closes the window where a fast render context
//! could signal before the waiter is ready.
//!
//! Invariant: at most one outstanding transfer. The frame dispatcher
//! serializes the capture path, so a new transfer cannot start until the
//! previous wait returned and the frame processor consumed its buffer.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// The rendezvous slot shared by the capture path and the render context.
#[derive(Debug, Default)]
pub struct HandoffGate {
    ready: Mutex<bool>,
    cond: Condvar,
}

/// An in-flight transfer. Created before the transfer request is issued;
/// consumed by waiting for the render context's completion signal.
#[must_use = "a transfer that is never awaited leaves the slot locked"]
pub struct PendingTransfer<'a> {
    gate: &'a HandoffGate,
    slot: MutexGuard<'a, bool>,
}

impl HandoffGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture-path side: take the slot ahead of requesting a transfer.
    ///
    /// The returned guard keeps the slot locked until [`PendingTransfer::wait_ready`]
    /// runs, so the completion signal cannot be missed.
    pub fn begin_transfer(&self) -> PendingTransfer<'_> {
        let slot = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        PendingTransfer { gate: self, slot }
    }

    /// Render-context side: mark the CPU copy complete and wake the waiter.
    ///
    /// Must be called from a context other than the one holding the pending
    /// transfer; it blocks until that context is parked in `wait_ready`.
    pub fn complete_transfer(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        *ready = true;
        self.cond.notify_one();
    }
}

impl PendingTransfer<'_> {
    /// Block until the render context signals completion, then clear the
    /// flag for the next transfer.
    pub fn wait_ready(self) {
        let gate = self.gate;
        let mut slot = self.slot;
        while !*slot {
            slot = gate
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *slot = false;
    }
}
