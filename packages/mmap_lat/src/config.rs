//! Immutable description of a benchmark run.

use std::num::NonZero;

use num_integer::Integer;

use crate::error::{Error, Result};
use crate::region::MapOptions;

/// Everything a run needs to know up front. Immutable once the run starts.
///
/// The configured total size is divided evenly across
/// `thread_count × ops_per_thread` map operations; whatever integer division
/// leaves over is simply not mapped. The division must leave every operation
/// at least one byte, which [`bytes_per_op()`][Self::bytes_per_op] verifies
/// before any thread is spawned.
///
/// # Examples
///
/// ```
/// use mmap_lat::{MapOptions, RunConfig};
/// use new_zealand::nz;
///
/// let config = RunConfig {
///     total_bytes: nz!(8 * 4096),
///     ops_per_thread: nz!(4),
///     thread_count: nz!(2),
///     map_options: MapOptions::default(),
/// };
///
/// // 8 operations in total, one page each.
/// assert_eq!(config.total_ops().get(), 8);
/// assert_eq!(config.bytes_per_op().unwrap().get(), 4096);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunConfig {
    /// Total number of bytes to spread across all map operations of the run.
    pub total_bytes: NonZero<usize>,

    /// Number of map (and later unmap) operations each worker thread performs.
    pub ops_per_thread: NonZero<usize>,

    /// Number of worker threads spawned for each phase.
    pub thread_count: NonZero<usize>,

    /// Options applied to every map operation.
    pub map_options: MapOptions,
}

impl RunConfig {
    /// The number of map operations across all threads of a phase.
    #[must_use]
    pub fn total_ops(&self) -> NonZero<usize> {
        self.thread_count
            .checked_mul(self.ops_per_thread)
            .expect("thread and operation counts are vastly below the usize range")
    }

    /// The size of the region mapped by a single operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegionTooSmall`] when the configured total does not
    /// stretch to at least one byte per operation.
    pub fn bytes_per_op(&self) -> Result<NonZero<usize>> {
        let total_ops = self.total_ops();

        let (per_op, _remainder) = self.total_bytes.get().div_rem(&total_ops.get());

        NonZero::new(per_op).ok_or(Error::RegionTooSmall {
            total_bytes: self.total_bytes.get(),
            total_ops: total_ops.get(),
        })
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    fn config(total_bytes: NonZero<usize>, ops: NonZero<usize>, threads: NonZero<usize>) -> RunConfig {
        RunConfig {
            total_bytes,
            ops_per_thread: ops,
            thread_count: threads,
            map_options: MapOptions::default(),
        }
    }

    #[test]
    fn evenly_divisible_size_has_no_remainder() {
        let config = config(nz!(8 * 4096), nz!(4), nz!(2));

        assert_eq!(config.total_ops(), nz!(8));
        assert_eq!(config.bytes_per_op().unwrap(), nz!(4096));
    }

    #[test]
    fn division_remainder_is_bounded_by_operation_count() {
        let config = config(nz!(8 * 4096 + 100), nz!(4), nz!(2));

        let per_op = config.bytes_per_op().unwrap().get();
        let covered = per_op * config.total_ops().get();

        assert!(covered <= config.total_bytes.get());
        assert!(config.total_bytes.get() - covered < config.total_ops().get());
    }

    #[test]
    fn too_small_total_is_rejected() {
        let config = config(nz!(5), nz!(4), nz!(2));

        assert!(matches!(
            config.bytes_per_op(),
            Err(Error::RegionTooSmall {
                total_bytes: 5,
                total_ops: 8,
            })
        ));
    }

    #[test]
    fn single_thread_single_op_gets_the_full_size() {
        let config = config(nz!(4096), nz!(1), nz!(1));

        assert_eq!(config.bytes_per_op().unwrap(), nz!(4096));
    }
}
