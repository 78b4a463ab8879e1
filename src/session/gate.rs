//! At-most-one pending redirect.
//!
//! A permit is released on drop unless [`RedirectPermit::hold`] is called,
//! in which case the gate stays raised until [`RedirectGate::release`]. The
//! store holds it while a redirect is issued but has not landed yet.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct RedirectGate {
    in_flight: AtomicBool,
}

/// Claim on the gate; releases it on drop unless held.
#[derive(Debug)]
pub struct RedirectPermit<'a> {
    gate: &'a RedirectGate,
    held: bool,
}

impl RedirectGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` if another redirect is pending.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RedirectPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            // Must stay lazy: a permit built and dropped on failure would release the gate.
            .then(|| RedirectPermit { gate: self, held: false })
    }

    /// Lower a gate left raised by [`RedirectPermit::hold`].
    pub fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl RedirectPermit<'_> {
    /// Keep the gate raised after this permit goes away.
    pub fn hold(mut self) {
        self.held = true;
    }
}

impl Drop for RedirectPermit<'_> {
    fn drop(&mut self) {
        if !self.held {
            self.gate.release();
        }
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
