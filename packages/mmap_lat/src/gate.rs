//! Simultaneous release of the worker threads of a phase.

use std::sync::atomic::{AtomicBool, Ordering};

/// Releases all worker threads of a phase at approximately the same instant.
///
/// The gate starts closed. Workers call [`wait_until_open()`][Self::wait_until_open]
/// before their timed work and spin until the coordinator calls
/// [`open()`][Self::open], which it does only once every worker of the phase has
/// been spawned. [`reset()`][Self::reset] closes the gate again so it can be
/// reused for the next phase.
///
/// Waiting spins on the flag instead of parking the thread. A parked thread
/// would pay scheduler wakeup latency on release, and that latency would be
/// charged to the first measured operation. The spin window is bounded by
/// thread creation time, so the burned CPU is negligible.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use mmap_lat::StartGate;
///
/// let gate = Arc::new(StartGate::new());
///
/// let worker = thread::spawn({
///     let gate = Arc::clone(&gate);
///     move || {
///         gate.wait_until_open();
///         // Timed work starts here.
///     }
/// });
///
/// gate.open();
/// worker.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StartGate {
    open: AtomicBool,
}

impl StartGate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    /// Opens the gate, releasing every thread spinning in
    /// [`wait_until_open()`][Self::wait_until_open].
    ///
    /// The store uses release ordering, so everything the opener did before
    /// this call is visible to the released workers.
    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Spins until the gate is open, then returns.
    ///
    /// Never blocks in the scheduler. A worker waiting on a gate that is never
    /// opened spins forever; the coordinator guarantees it opens the gate once
    /// per phase, even when spawning the phase's workers failed part-way.
    pub fn wait_until_open(&self) {
        while !self.open.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    /// Closes the gate again for reuse by the next phase.
    ///
    /// Must only be called once every thread released by the previous
    /// [`open()`][Self::open] has been joined.
    pub fn reset(&self) {
        self.open.store(false, Ordering::Release);
    }
}
