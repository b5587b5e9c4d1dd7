use thiserror::Error;

/// Errors that can occur when configuring or executing a benchmark run.
///
/// Individual map or unmap operations failing is deliberately *not* an error:
/// those are absorbed into the per-phase failure counters so that a single
/// refused allocation cannot void an otherwise complete measurement. Only
/// conditions that compromise the coordination of a whole run surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured total size cannot give every operation at least one byte.
    ///
    /// Detected before any worker thread is spawned.
    #[error(
        "total size of {total_bytes} bytes cannot be split into {total_ops} operations of non-zero size"
    )]
    RegionTooSmall {
        /// The configured total number of bytes.
        total_bytes: usize,

        /// The product of thread count and operations per thread.
        total_ops: usize,
    },

    /// The operating system refused to create a worker thread.
    ///
    /// Fatal to the whole run - no partial report is produced, though regions
    /// mapped before the failure are still released.
    #[error("failed to spawn worker thread: {0}")]
    SpawnWorker(#[from] std::io::Error),
}

/// A specialized `Result` type returning the crate's [`Error`] type as the
/// error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
