//! Cycle-accurate measurement of anonymous memory map and unmap latency under
//! single- and multi-threaded load.
//!
//! A run maps a configured total amount of anonymous memory as a series of
//! equally sized regions, spread across a configurable number of worker threads,
//! then unmaps every region again. Each phase is timed per operation with the
//! processor cycle counter and the per-operation deltas are summed into a
//! per-phase total.
//!
//! The core pieces are:
//! - [`RunConfig`] - immutable description of a run (total size, operation and
//!   thread counts, mapping options)
//! - [`execute`] - drives the two phases (map, then unmap) and aggregates the
//!   per-thread cycle totals into a [`RunReport`]
//! - [`StartGate`] - spin gate that releases all worker threads of a phase at
//!   approximately the same instant
//! - [`AddressBook`] - per-worker record of the regions produced by the map
//!   phase and consumed by the unmap phase
//!
//! This package is not meant for use in production, serving only as a
//! development tool for benchmarking and performance analysis.
//!
//! # Operating principles
//!
//! Worker threads never block while a phase is in flight: they spin on the
//! start gate until the coordinator has finished spawning every worker, then
//! run their slice of operations back to back. A blocking wait primitive would
//! charge scheduler wakeup latency to the first measured operation, which is
//! exactly the kind of noise a cycle-accurate harness must avoid. The phases
//! are strictly sequential - no unmap worker is spawned before every map
//! worker has been joined.
//!
//! Individual map failures do not abort a run. A worker that cannot obtain a
//! region records the attempt's cycles, stores a sentinel handle and moves on;
//! the failure shows up in the [`PhaseReport`] counters instead.
//!
//! # Example
//!
//! ```
//! use mmap_lat::{MapOptions, RunConfig, execute};
//! use new_zealand::nz;
//!
//! # fn main() -> Result<(), mmap_lat::Error> {
//! // 16 pages in total, two threads mapping two regions each.
//! let config = RunConfig {
//!     total_bytes: nz!(16 * 4096),
//!     ops_per_thread: nz!(2),
//!     thread_count: nz!(2),
//!     map_options: MapOptions {
//!         populate: false,
//!         huge_pages: false,
//!     },
//! };
//!
//! let report = execute(&config)?;
//!
//! println!("map phase:   {} cycles", report.map.total_cycles);
//! println!("unmap phase: {} cycles", report.unmap.total_cycles);
//! # Ok(())
//! # }
//! ```

mod book;
mod clock;
mod config;
mod error;
mod gate;
mod region;
mod run;

pub use book::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use gate::*;
pub use region::*;
pub use run::*;
