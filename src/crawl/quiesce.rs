//! Run-wide quiescence detection
//!
//! One in-flight counter covers every task of a crawl run. The completion
//! signal is event-driven: it fires on the zero crossing itself, not from a
//! polling timer, so there is no window where freshly spawned children are
//! invisible to a checker.
//!
//! Ordering contract: when a task spawns children, every child's
//! `on_submit` must happen before the parent's own `on_terminal`. The
//! orchestrator guarantees this by fanning out inside the task body and
//! decrementing only after the body returns; under that contract a zero
//! counter means the whole task tree is done.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Tracks the number of in-flight crawl tasks and signals completion
/// exactly once
#[derive(Debug)]
pub struct QuiescenceDetector {
    active: AtomicUsize,
    fired: AtomicBool,
    signal: watch::Sender<bool>,
}

impl Default for QuiescenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QuiescenceDetector {
    /// Creates a detector with a zero counter and an unfired signal
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            active: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
            signal,
        }
    }

    /// Registers one submitted task
    pub fn on_submit(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Registers one task reaching its terminal state
    ///
    /// The first decrement that returns the counter to zero fires the
    /// completion signal; the atomic swap guarantees a concurrent
    /// reentrant crossing cannot fire it twice.
    pub fn on_terminal(&self) {
        let previous = self.active.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "on_terminal without matching on_submit");
        if previous == 1 && !self.fired.swap(true, Ordering::SeqCst) {
            // send_replace stores the value even while no waiter is
            // subscribed yet
            self.signal.send_replace(true);
        }
    }

    /// Number of tasks currently in flight
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the completion signal has fired
    pub fn completed(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Waits for the completion signal
    ///
    /// Resolves immediately if the signal already fired; any number of
    /// waiters may observe it.
    pub async fn wait(&self) {
        if self.completed() {
            return;
        }
        let mut receiver = self.signal.subscribe();
        if *receiver.borrow() {
            return;
        }
        while receiver.changed().await.is_ok() {
            if *receiver.borrow() {
                return;
            }
        }
    }
}
