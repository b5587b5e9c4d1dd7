//! The coordinator and the per-thread workers of a benchmark run.

use std::num::NonZero;
use std::sync::Arc;
use std::thread;

use crate::book::AddressBook;
use crate::clock;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::gate::StartGate;
use crate::region::{self, MapOptions};

/// Timing and failure totals for one phase of a run, summed across all of the
/// phase's worker threads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PhaseReport {
    /// Sum over all workers of the cycles spent inside individual operations.
    ///
    /// Preparation and gate-waiting are not included - the clock is sampled
    /// immediately around each map or unmap call.
    pub total_cycles: u64,

    /// Number of operations attempted across all workers, always equal to
    /// `thread_count × ops_per_thread` for a completed phase.
    pub ops_attempted: u64,

    /// Operations that did not produce (map phase) or release (unmap phase)
    /// a region. Failed attempts still contribute their cycles to
    /// [`total_cycles`][Self::total_cycles].
    pub ops_failed: u64,
}

impl PhaseReport {
    fn absorb(&mut self, cycles: u64, attempted: u64, failed: u64) {
        self.total_cycles = self.total_cycles.saturating_add(cycles);
        self.ops_attempted = self.ops_attempted.saturating_add(attempted);
        self.ops_failed = self.ops_failed.saturating_add(failed);
    }
}

/// The outcome of a complete run: one report per phase plus the derived
/// per-operation region size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use = "a benchmark run is only useful for its report"]
pub struct RunReport {
    /// Totals for the map phase.
    pub map: PhaseReport,

    /// Totals for the unmap phase.
    pub unmap: PhaseReport,

    /// The size of the region mapped by each individual operation.
    pub bytes_per_op: NonZero<usize>,
}

/// What a map worker hands back to the coordinator when joined.
struct MapOutcome {
    book: AddressBook,
    cycles: u64,
    failed: u64,
}

/// What an unmap worker hands back to the coordinator when joined.
struct UnmapOutcome {
    cycles: u64,
    failed: u64,
}

/// Executes a complete run: the map phase followed by the unmap phase.
///
/// Per phase, the coordinator spawns one worker thread per configured thread,
/// opens the start gate once every spawn has succeeded, joins every worker and
/// sums the returned accumulators. The phases are strictly sequential: no
/// unmap worker exists before every map worker has been joined, so every
/// address book is fully populated before it is consumed.
///
/// Individual operation failures are counted in the report, never retried and
/// never fatal. See [`PhaseReport`] for what exactly is aggregated.
///
/// # Errors
///
/// Returns [`Error::RegionTooSmall`] when the configuration does not give
/// every operation at least one byte, detected before any thread is spawned,
/// and [`Error::SpawnWorker`] when the operating system refuses to create a
/// worker thread, which aborts the run without a partial report. Regions
/// mapped before such an abort are released on the way out.
pub fn execute(config: &RunConfig) -> Result<RunReport> {
    let bytes_per_op = config.bytes_per_op()?;
    let ops_per_thread = config.ops_per_thread.get();
    let ops_per_thread_u64 =
        u64::try_from(ops_per_thread).expect("usize fits in u64 on all supported targets");

    let gate = Arc::new(StartGate::new());

    let map_workers = (0..config.thread_count.get())
        .map(|_| {
            let gate = Arc::clone(&gate);
            let book = AddressBook::with_capacity(ops_per_thread);
            let options = config.map_options;

            move || map_worker(&gate, book, bytes_per_op, options)
        })
        .collect::<Vec<_>>();

    let map_outcomes = run_phase(&gate, "map-worker", map_workers)?;

    let mut map = PhaseReport::default();
    let mut unmap_workers = Vec::with_capacity(map_outcomes.len());

    for outcome in map_outcomes {
        map.absorb(outcome.cycles, ops_per_thread_u64, outcome.failed);

        let gate = Arc::clone(&gate);
        let book = outcome.book;

        unmap_workers.push(move || unmap_worker(&gate, book));
    }

    let unmap_outcomes = run_phase(&gate, "unmap-worker", unmap_workers)?;

    let mut unmap = PhaseReport::default();

    for outcome in unmap_outcomes {
        unmap.absorb(outcome.cycles, ops_per_thread_u64, outcome.failed);
    }

    Ok(RunReport {
        map,
        unmap,
        bytes_per_op,
    })
}

/// Spawns one thread per worker, releases them through the gate, joins them
/// all and leaves the gate closed again for the next phase.
///
/// The gate is opened even when spawning fails part-way: already-running
/// workers would otherwise spin on it forever and could never be joined. In
/// that case the error is reported only after every successfully spawned
/// worker has been joined, and any outcomes produced so far are dropped
/// (releasing their regions).
fn run_phase<F, T>(gate: &Arc<StartGate>, name: &str, workers: Vec<F>) -> Result<Vec<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut join_handles = Vec::with_capacity(workers.len());
    let mut spawn_error = None;

    for worker in workers {
        match thread::Builder::new().name(name.to_string()).spawn(worker) {
            Ok(handle) => join_handles.push(handle),
            Err(error) => {
                // Workers not yet spawned are dropped here; their address
                // books release any regions they carry.
                spawn_error = Some(error);
                break;
            }
        }
    }

    gate.open();

    let mut outcomes = Vec::with_capacity(join_handles.len());

    for handle in join_handles {
        outcomes.push(handle.join().expect("worker thread panicked"));
    }

    gate.reset();

    match spawn_error {
        None => Ok(outcomes),
        Some(error) => Err(Error::SpawnWorker(error)),
    }
}

/// Performs one worker's share of the map phase: waits for the gate, then maps
/// one region per address book slot, in slot order, timing each map call
/// individually.
///
/// A failed map stores the sentinel handle and is counted; its cycles stay in
/// the accumulator because the time was genuinely spent. The worker never
/// retries and never aborts its slice.
fn map_worker(
    gate: &StartGate,
    mut book: AddressBook,
    region_len: NonZero<usize>,
    options: MapOptions,
) -> MapOutcome {
    gate.wait_until_open();

    let mut cycles: u64 = 0;
    let mut failed: u64 = 0;

    for index in 0..book.len() {
        let start = clock::cycles();
        let handle = region::map_region(region_len.get(), &options);
        let end = clock::cycles();

        // Wrapping rather than checked: the thread may have migrated between
        // the two samples and counters on different processors can be skewed.
        cycles = cycles.saturating_add(end.wrapping_sub(start));

        if !handle.is_valid() {
            failed = failed.saturating_add(1);
        }

        book.set(index, handle);
    }

    MapOutcome {
        book,
        cycles,
        failed,
    }
}

/// Performs one worker's share of the unmap phase: waits for the gate, then
/// releases the region of every address book slot, in the same order the map
/// phase filled them, timing each unmap call individually.
///
/// Slots holding the sentinel of a failed map are counted as failed and
/// skipped without touching the clock.
fn unmap_worker(gate: &StartGate, mut book: AddressBook) -> UnmapOutcome {
    gate.wait_until_open();

    let mut cycles: u64 = 0;
    let mut failed: u64 = 0;

    for index in 0..book.len() {
        let handle = book.take(index);

        if !handle.is_valid() {
            failed = failed.saturating_add(1);
            continue;
        }

        let start = clock::cycles();
        let released = region::unmap_region(handle);
        let end = clock::cycles();

        cycles = cycles.saturating_add(end.wrapping_sub(start));

        if !released {
            failed = failed.saturating_add(1);
        }
    }

    UnmapOutcome { cycles, failed }
}

#[cfg(test)]
#[cfg(not(miri))] // Spawns real threads and maps real memory.
mod tests {
    use new_zealand::nz;

    use super::*;
    use crate::region::RegionHandle;

    const PAGE: usize = 4096;

    fn plain_options() -> MapOptions {
        MapOptions {
            populate: false,
            huge_pages: false,
        }
    }

    fn opened_gate() -> StartGate {
        let gate = StartGate::new();
        gate.open();
        gate
    }

    #[test]
    fn one_thread_one_op_maps_the_full_size() {
        let config = RunConfig {
            total_bytes: nz!(4 * PAGE),
            ops_per_thread: nz!(1),
            thread_count: nz!(1),
            map_options: plain_options(),
        };

        let report = execute(&config).unwrap();

        assert_eq!(report.bytes_per_op, nz!(4 * PAGE));
        assert_eq!(report.map.ops_attempted, 1);
        assert_eq!(report.map.ops_failed, 0);
        assert_eq!(report.unmap.ops_attempted, 1);
        assert_eq!(report.unmap.ops_failed, 0);
    }

    #[test]
    fn work_is_partitioned_across_threads_and_ops() {
        let config = RunConfig {
            total_bytes: nz!(8 * PAGE),
            ops_per_thread: nz!(4),
            thread_count: nz!(2),
            map_options: plain_options(),
        };

        let report = execute(&config).unwrap();

        // 8 operations of one page each, in both phases.
        assert_eq!(report.bytes_per_op, nz!(PAGE));
        assert_eq!(report.map.ops_attempted, 8);
        assert_eq!(report.map.ops_failed, 0);
        assert_eq!(report.unmap.ops_attempted, 8);
        assert_eq!(report.unmap.ops_failed, 0);
    }

    #[test]
    fn requested_bytes_round_trip_modulo_bounded_remainder() {
        let config = RunConfig {
            total_bytes: nz!(8 * PAGE + 123),
            ops_per_thread: nz!(2),
            thread_count: nz!(4),
            map_options: plain_options(),
        };

        let report = execute(&config).unwrap();

        let covered = report.bytes_per_op.get() * 8;
        assert!(covered <= config.total_bytes.get());
        assert!(config.total_bytes.get() - covered < 8);
    }

    #[test]
    fn undividable_config_is_rejected_before_spawning() {
        let config = RunConfig {
            total_bytes: nz!(5),
            ops_per_thread: nz!(4),
            thread_count: nz!(2),
            map_options: plain_options(),
        };

        assert!(matches!(
            execute(&config),
            Err(Error::RegionTooSmall { .. })
        ));
    }

    #[test]
    fn populated_run_succeeds() {
        let config = RunConfig {
            total_bytes: nz!(4 * PAGE),
            ops_per_thread: nz!(2),
            thread_count: nz!(2),
            map_options: MapOptions {
                populate: true,
                huge_pages: false,
            },
        };

        let report = execute(&config).unwrap();

        assert_eq!(report.map.ops_failed, 0);
        assert_eq!(report.unmap.ops_failed, 0);
    }

    #[test]
    fn huge_page_failures_are_absorbed_not_fatal() {
        // Whether huge pages are available depends on the host. Either every
        // operation succeeds or the failures are counted; the run itself must
        // complete either way.
        let config = RunConfig {
            total_bytes: nz!(4 * 1024 * 1024),
            ops_per_thread: nz!(2),
            thread_count: nz!(1),
            map_options: MapOptions {
                populate: false,
                huge_pages: true,
            },
        };

        let report = execute(&config).unwrap();

        assert_eq!(report.map.ops_attempted, 2);
        assert!(report.map.ops_failed <= 2);
        assert_eq!(report.unmap.ops_failed, report.map.ops_failed);
    }

    #[test]
    fn map_worker_fills_every_slot_with_a_usable_region() {
        let gate = opened_gate();
        let book = AddressBook::with_capacity(3);

        let mut outcome = map_worker(&gate, book, nz!(PAGE), plain_options());

        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.book.len(), 3);

        for index in 0..3 {
            let handle = outcome.book.take(index);
            assert!(handle.is_valid());
            assert_eq!(handle.len(), PAGE);
            assert!(region::unmap_region(handle));
        }
    }

    #[test]
    fn map_worker_keeps_measuring_when_every_map_fails() {
        let gate = opened_gate();
        let book = AddressBook::with_capacity(3);

        // No host can map half the address space per operation, so every
        // attempt fails - deterministically, unlike exhausting huge pages.
        let unmappable = nz!(usize::MAX >> 1);

        let mut outcome = map_worker(&gate, book, unmappable, plain_options());

        // Every slot was attempted, every attempt failed, and the cycles
        // spent on the failed attempts are still in the accumulator.
        assert_eq!(outcome.failed, 3);
        assert!(outcome.cycles > 0);

        for index in 0..3 {
            assert!(!outcome.book.take(index).is_valid());
        }
    }

    #[test]
    fn unmap_worker_releases_each_mapped_slot_exactly_once() {
        let gate = opened_gate();
        let book = AddressBook::with_capacity(4);

        let map_outcome = map_worker(&gate, book, nz!(PAGE), plain_options());
        assert_eq!(map_outcome.failed, 0);

        let unmap_outcome = unmap_worker(&gate, map_outcome.book);

        assert_eq!(unmap_outcome.failed, 0);
    }

    #[test]
    fn unmap_worker_skips_sentinel_slots_and_keeps_going() {
        let gate = opened_gate();
        let mut book = AddressBook::with_capacity(3);

        book.set(0, region::map_region(PAGE, &plain_options()));
        book.set(1, RegionHandle::invalid());
        book.set(2, region::map_region(PAGE, &plain_options()));

        let outcome = unmap_worker(&gate, book);

        // Only the sentinel slot failed; the slots around it were released.
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn phase_cycle_totals_accumulate_across_workers() {
        let config = RunConfig {
            total_bytes: nz!(8 * PAGE),
            ops_per_thread: nz!(2),
            thread_count: nz!(4),
            map_options: plain_options(),
        };

        let report = execute(&config).unwrap();

        // Real system calls took place, so a zero total would mean the clock
        // was never consulted.
        assert!(report.map.total_cycles > 0);
        assert!(report.unmap.total_cycles > 0);
    }
}
